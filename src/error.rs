//! Error types

use std::io;

use thiserror::Error;

/// Errors surfaced by the chunked hasher.
///
/// `E` is the error type of the underlying block engine. For every hash from
/// the `digest` crate this is [`core::convert::Infallible`], so the error can
/// never actually be constructed.
#[derive(Debug, Error)]
pub enum Error<E> {
    /// The block engine refused to absorb bytes.
    ///
    /// `absorbed` counts the bytes of the failing call that were absorbed
    /// before the failure. Feeding the remaining suffix again continues the
    /// hash correctly. Sum operations absorb no caller input and report `0`.
    #[error("digest engine failed after absorbing {absorbed} bytes")]
    DigestEngineFailure {
        /// Bytes absorbed by the failing call.
        absorbed: usize,
        /// Engine error.
        #[source]
        source: E,
    },
}

impl<E> Error<E> {
    /// Bytes absorbed by the failing call before the engine error.
    pub fn absorbed(&self) -> usize {
        match self {
            Error::DigestEngineFailure { absorbed, .. } => *absorbed,
        }
    }

    /// Consume the error, returning the engine error.
    pub fn into_source(self) -> E {
        match self {
            Error::DigestEngineFailure { source, .. } => source,
        }
    }
}

impl<E> From<Error<E>> for io::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: Error<E>) -> Self {
        io::Error::other(err)
    }
}

/// Failure to parse a hex-encoded digest.
#[derive(Debug, Error, PartialEq)]
pub enum ParseDigestError {
    /// Input did not have exactly 32 hex characters.
    #[error("invalid digest length: expected {expected} hex characters, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Input contained a non-hex character.
    #[error("invalid hex digest: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Unwrap a result whose error can never exist.
pub(crate) fn infallible<T>(result: Result<T, Error<core::convert::Infallible>>) -> T {
    match result {
        Ok(value) => value,
        Err(Error::DigestEngineFailure { source, .. }) => match source {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("engine jammed")]
    struct Jammed;

    #[test]
    fn display_reports_progress() {
        let err = Error::DigestEngineFailure {
            absorbed: 4096,
            source: Jammed,
        };
        assert_eq!(
            err.to_string(),
            "digest engine failed after absorbing 4096 bytes"
        );
        assert_eq!(err.absorbed(), 4096);
    }

    #[test]
    fn source_is_engine_error() {
        use std::error::Error as _;

        let err = Error::DigestEngineFailure {
            absorbed: 0,
            source: Jammed,
        };
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("engine jammed"));
    }

    #[test]
    fn converts_into_io_error() {
        let err = Error::DigestEngineFailure {
            absorbed: 1,
            source: Jammed,
        };
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::Other);
        assert!(io_err.to_string().contains("after absorbing 1 bytes"));
    }
}
