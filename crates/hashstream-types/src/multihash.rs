use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;
use crate::varint;

/// Multicodec code for BLAKE3 (256-bit output).
pub const BLAKE3_CODE: u64 = 0x1e;
/// Multicodec code for SHA2-256.
pub const SHA2_256_CODE: u64 = 0x12;
/// Digest length carried by every supported algorithm.
pub const DIGEST_LEN: usize = 32;

/// Self-describing content digest.
///
/// A `Multihash` pairs a multicodec algorithm code with the digest bytes, so
/// two digests of the same bytes under different algorithms never compare
/// equal. The binary form is `varint(code) || varint(len) || digest` and the
/// text form is the lowercase hex of the binary form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Multihash {
    code: u64,
    digest: [u8; DIGEST_LEN],
}

impl Multihash {
    /// Wrap a pre-computed digest.
    ///
    /// Fails for codes this crate does not know how to size.
    pub fn wrap(code: u64, digest: [u8; DIGEST_LEN]) -> Result<Self, TypeError> {
        match code {
            BLAKE3_CODE | SHA2_256_CODE => Ok(Self { code, digest }),
            other => Err(TypeError::UnsupportedCode(other)),
        }
    }

    /// Algorithm code.
    pub fn code(&self) -> u64 {
        self.code
    }

    /// The raw digest bytes.
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Binary multihash encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(DIGEST_LEN + 4);
        varint::encode(&mut buf, self.code);
        varint::encode(&mut buf, DIGEST_LEN as u64);
        buf.extend_from_slice(&self.digest);
        buf
    }

    /// Parse the binary encoding. Trailing bytes are rejected.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TypeError> {
        let (code, used_code) = varint::decode(data)?;
        let (len, used_len) = varint::decode(&data[used_code..])?;
        let start = used_code + used_len;
        if len as usize != DIGEST_LEN {
            return Err(TypeError::InvalidLength {
                expected: DIGEST_LEN,
                actual: len as usize,
            });
        }
        let rest = &data[start..];
        if rest.len() != DIGEST_LEN {
            return Err(TypeError::InvalidLength {
                expected: DIGEST_LEN,
                actual: rest.len(),
            });
        }
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(rest);
        Self::wrap(code, digest)
    }

    /// Hex-encoded binary form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Short hex of the digest (first 8 characters), for logs.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.digest[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s.trim()).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multihash({:#x}:{})", self.code, self.short_hex())
    }
}

impl fmt::Display for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Multihash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Multihash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Multihash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
