#![doc = include_str!("../README.md")]

use crate::implementation::{Blue, Ed2kImpl, Red, RedBlue};

/// The "official" ED2K hashing algorithm. Identical to Ed2kBlue.
pub type Ed2k = Ed2kBlue;
/// The old, "buggy" ED2K hashing algorithm. See crate docs for more details.
pub type Ed2kRed = Ed2kImpl<Red>;
/// The new, "fixed" ED2K hashing algorithm. See crate docs for more details.
pub type Ed2kBlue = Ed2kImpl<Blue>;
/// This computes the `Ed2kRed` hash concatenated with the `Ed2kBlue` hash.
/// See crate docs for more details.
pub type Ed2kRedBlue = Ed2kImpl<RedBlue>;

pub use digest;

pub use crate::error::{Error, ParseDigestError};
pub use crate::implementation::{BlockDigest, ChunkDigest, CHUNK_SIZE, DIGEST_SIZE, MD4_EMPTY};

pub mod encoding;
pub mod error;
pub mod implementation;
