//! Digest primitives for Hashstream.
//!
//! Computes and verifies [`Multihash`](hashstream_types::Multihash) digests.
//! BLAKE3 is the default algorithm; SHA2-256 is accepted for interop.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;

pub use hasher::{HashAlgorithm, HasherError, StreamingHasher};
