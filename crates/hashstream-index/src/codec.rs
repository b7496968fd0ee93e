//! Persisted form of index records and the pluggable codec that turns it
//! into bytes.
//!
//! The wire form mirrors the in-memory tree with digests as raw multihash
//! bytes and the record kind as an integer tag. Absent `offset`/`length`
//! fields are omitted rather than written as `null`.

use serde::{Deserialize, Serialize};

use hashstream_types::{Location, Multihash};

use crate::error::{IndexError, IndexResult};
use crate::record::IndexRecord;

/// A location as persisted: multihash bytes or a path string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireLocation {
    Digest(Vec<u8>),
    Path(String),
}

impl WireLocation {
    pub fn into_location(self) -> IndexResult<Location> {
        match self {
            Self::Digest(bytes) => Ok(Location::Digest(Multihash::from_bytes(&bytes)?)),
            Self::Path(path) => Ok(Location::Path(path)),
        }
    }
}

impl From<&Location> for WireLocation {
    fn from(location: &Location) -> Self {
        match location {
            Location::Digest(mh) => Self::Digest(mh.to_bytes()),
            Location::Path(path) => Self::Path(path.clone()),
        }
    }
}

/// Recursive persisted record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    pub multihash: Vec<u8>,
    #[serde(rename = "type")]
    pub kind: u8,
    pub location: WireLocation,
    #[serde(default)]
    pub sub_records: Vec<WireRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
}

/// A wire record tagged with the record type it was added under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEnvelope {
    #[serde(rename = "type")]
    pub record_type: String,
    pub data: WireRecord,
}

impl WireEnvelope {
    pub fn new(record_type: &str, record: &IndexRecord) -> Self {
        Self {
            record_type: record_type.to_string(),
            data: record.to_wire(),
        }
    }

    pub fn into_record(self) -> IndexResult<(String, IndexRecord)> {
        Ok((self.record_type, IndexRecord::from_wire(self.data)?))
    }
}

/// Turns envelopes into bytes and back.
pub trait RecordCodec: Send + Sync {
    fn encode(&self, envelope: &WireEnvelope) -> IndexResult<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> IndexResult<WireEnvelope>;
}

/// JSON codec, the default for every bundled index store.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl RecordCodec for JsonCodec {
    fn encode(&self, envelope: &WireEnvelope) -> IndexResult<Vec<u8>> {
        serde_json::to_vec(envelope).map_err(|e| IndexError::Codec(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> IndexResult<WireEnvelope> {
        serde_json::from_slice(bytes).map_err(|e| IndexError::Codec(e.to_string()))
    }
}
