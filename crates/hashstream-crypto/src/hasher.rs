use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Digest;

use hashstream_types::{Multihash, BLAKE3_CODE, DIGEST_LEN, SHA2_256_CODE};

/// Digest algorithm used to address packs and blobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha2_256,
}

impl HashAlgorithm {
    /// Multicodec code carried in the produced multihashes.
    pub fn code(&self) -> u64 {
        match self {
            Self::Blake3 => BLAKE3_CODE,
            Self::Sha2_256 => SHA2_256_CODE,
        }
    }

    /// Resolve the algorithm that produced a multihash.
    pub fn from_code(code: u64) -> Result<Self, HasherError> {
        match code {
            BLAKE3_CODE => Ok(Self::Blake3),
            SHA2_256_CODE => Ok(Self::Sha2_256),
            other => Err(HasherError::UnsupportedCode(other)),
        }
    }

    /// Hash raw bytes.
    pub fn digest(&self, data: &[u8]) -> Multihash {
        let mut hasher = self.streaming();
        hasher.update(data);
        hasher.finalize()
    }

    /// Start an incremental digest.
    pub fn streaming(&self) -> StreamingHasher {
        match self {
            Self::Blake3 => StreamingHasher::Blake3(Box::new(blake3::Hasher::new())),
            Self::Sha2_256 => StreamingHasher::Sha2_256(sha2::Sha256::new()),
        }
    }

    /// Verify that `data` hashes to `expected` under the algorithm named by
    /// `expected`'s own code.
    pub fn verify(data: &[u8], expected: &Multihash) -> Result<bool, HasherError> {
        let algorithm = Self::from_code(expected.code())?;
        Ok(algorithm.digest(data) == *expected)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3 => write!(f, "blake3"),
            Self::Sha2_256 => write!(f, "sha2-256"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = HasherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blake3" => Ok(Self::Blake3),
            "sha2-256" | "sha256" => Ok(Self::Sha2_256),
            other => Err(HasherError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Incremental digest over bytes fed in pieces.
pub enum StreamingHasher {
    Blake3(Box<blake3::Hasher>),
    Sha2_256(sha2::Sha256),
}

impl StreamingHasher {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Blake3(h) => {
                h.update(data);
            }
            Self::Sha2_256(h) => h.update(data),
        }
    }

    pub fn finalize(self) -> Multihash {
        let (code, digest): (u64, [u8; DIGEST_LEN]) = match self {
            Self::Blake3(h) => (BLAKE3_CODE, *h.finalize().as_bytes()),
            Self::Sha2_256(h) => (SHA2_256_CODE, h.finalize().into()),
        };
        // Both codes are known to `Multihash::wrap`.
        match Multihash::wrap(code, digest) {
            Ok(mh) => mh,
            Err(_) => unreachable!("supported algorithm codes always wrap"),
        }
    }
}

impl fmt::Debug for StreamingHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3(_) => f.write_str("StreamingHasher(blake3)"),
            Self::Sha2_256(_) => f.write_str("StreamingHasher(sha2-256)"),
        }
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("unsupported multihash code: {0:#x}")]
    UnsupportedCode(u64),

    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),
}
