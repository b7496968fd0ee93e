use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use hashstream_crypto::HashAlgorithm;

use crate::error::{PackError, PackResult};

/// Container layout used for stored packs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackFormat {
    /// Multi-blob container with a header and length-prefixed entries.
    #[default]
    Car,
    /// One blob per pack, stored as its raw bytes.
    Raw,
}

impl PackFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for PackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackFormat {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "car" => Ok(Self::Car),
            "raw" => Ok(Self::Raw),
            other => Err(PackError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Configuration for [`PackWriter`](crate::PackWriter).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Container layout for stored packs.
    pub pack_format: PackFormat,
    /// Maximum size of one blob in bytes.
    pub blob_size: usize,
    /// Maximum blob payload per pack in bytes. Ignored for `raw`.
    pub shard_size: usize,
    /// Digest algorithm for blobs, packs and the containing digest.
    pub hash: HashAlgorithm,
    /// Capacity of the storage → indexing hand-off channel.
    pub channel_capacity: usize,
    /// Index blobs under the containing digest. When false, records are
    /// forwarded to index writers as soon as their pack is stored.
    pub index_containing: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            pack_format: PackFormat::Car,
            blob_size: 1024 * 1024,
            shard_size: 8 * 1024 * 1024,
            hash: HashAlgorithm::Blake3,
            channel_capacity: 1024,
            index_containing: true,
        }
    }
}

impl WriterConfig {
    /// Reject settings the sharder cannot work with.
    pub fn validate(&self) -> PackResult<()> {
        if self.blob_size == 0 {
            return Err(PackError::InvalidOptions("blob_size must be positive".into()));
        }
        if self.pack_format == PackFormat::Car && self.shard_size < self.blob_size {
            return Err(PackError::InvalidOptions(format!(
                "shard_size ({}) must be at least blob_size ({})",
                self.shard_size, self.blob_size
            )));
        }
        if self.channel_capacity == 0 {
            return Err(PackError::InvalidOptions("channel_capacity must be positive".into()));
        }
        Ok(())
    }

    /// Number of blobs grouped into one pack.
    pub fn blobs_per_pack(&self) -> usize {
        match self.pack_format {
            PackFormat::Car => (self.shard_size / self.blob_size.max(1)).max(1),
            PackFormat::Raw => 1,
        }
    }
}
