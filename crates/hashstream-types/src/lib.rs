//! Foundation types for Hashstream.
//!
//! Every other Hashstream crate depends on `hashstream-types`.
//!
//! # Key Types
//!
//! - [`Multihash`]: Self-describing digest (algorithm code + 32-byte digest)
//! - [`Location`]: Where bytes physically live: a digest key or an opaque path
//! - [`ByteRange`]: An `(offset, length)` slice labelled with the digest it should hash to
//! - [`VerifiableBlob`]: Bytes paired with the digest they claim to hash to

pub mod blob;
pub mod error;
pub mod location;
pub mod multihash;
pub mod varint;

pub use blob::{BlobKind, ByteRange, VerifiableBlob};
pub use error::TypeError;
pub use location::Location;
pub use multihash::{Multihash, BLAKE3_CODE, DIGEST_LEN, SHA2_256_CODE};
