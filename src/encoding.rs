//! Text encoding of digests

use crate::error::ParseDigestError;
use crate::implementation::{ChunkDigest, DIGEST_SIZE};

/// Lowercase hex encoding of a digest, most significant nibble first.
///
/// A 16-byte digest always yields 32 characters without separators.
pub fn to_hex(digest: &[u8]) -> String {
    hex::encode(digest)
}

/// Parse a 32 character hex string (either case) into a digest.
pub fn parse_digest(text: &str) -> Result<ChunkDigest, ParseDigestError> {
    if text.len() != DIGEST_SIZE * 2 {
        return Err(ParseDigestError::InvalidLength {
            expected: DIGEST_SIZE * 2,
            actual: text.len(),
        });
    }
    let mut out = ChunkDigest::default();
    hex::decode_to_slice(text, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implementation::MD4_EMPTY;

    #[test]
    fn hex_is_lowercase_and_ordered() {
        let digest = [
            0x00, 0x01, 0x0a, 0xab, 0xf0, 0xff, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80,
            0x90, 0xa0,
        ];
        assert_eq!(to_hex(&digest), "00010aabf0ff102030405060708090a0");
    }

    #[test]
    fn empty_md4_text() {
        assert_eq!(to_hex(&MD4_EMPTY), "31d6cfe0d16ae931b73c59d7e0c089c0");
    }

    #[test]
    fn parse_accepts_both_cases() {
        let lower = parse_digest("31d6cfe0d16ae931b73c59d7e0c089c0").unwrap();
        let upper = parse_digest("31D6CFE0D16AE931B73C59D7E0C089C0").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.as_slice(), &MD4_EMPTY[..]);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert_eq!(
            parse_digest("31d6cfe0"),
            Err(ParseDigestError::InvalidLength {
                expected: 32,
                actual: 8
            })
        );
    }

    #[test]
    fn parse_rejects_non_hex() {
        let err = parse_digest("zzd6cfe0d16ae931b73c59d7e0c089c0").unwrap_err();
        assert!(matches!(err, ParseDigestError::InvalidHex(_)));
    }
}
