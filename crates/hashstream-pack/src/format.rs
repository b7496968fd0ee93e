//! Pack container encoding and the layout indexer.
//!
//! `car` layout:
//!
//! ```text
//! "HSPK" | u32be version | u32be blob count
//! { varint(multihash len) | multihash | varint(data len) | data }*
//! ```

use bytes::Bytes;

use hashstream_types::{varint, Multihash};

use crate::config::PackFormat;
use crate::error::{PackError, PackResult};

pub const PACK_MAGIC: &[u8; 4] = b"HSPK";
pub const PACK_VERSION: u32 = 1;
const HEADER_LEN: usize = 12;

/// Where one blob sits inside a pack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlobSlot {
    pub multihash: Multihash,
    /// Offset of the blob's data (not its entry header).
    pub offset: u64,
    pub length: u64,
}

impl PackFormat {
    /// Encode `blobs` into one pack.
    pub fn encode(&self, blobs: &[(Multihash, Bytes)]) -> PackResult<Bytes> {
        match self {
            Self::Car => Ok(encode_car(blobs)),
            Self::Raw => match blobs {
                [(_, data)] => Ok(data.clone()),
                _ => Err(PackError::InvalidOptions(format!(
                    "raw packs hold exactly one blob, got {}",
                    blobs.len()
                ))),
            },
        }
    }

    /// Recover the blob layout of an encoded pack whose own digest is
    /// `digest`.
    pub fn layout(&self, data: &[u8], digest: Multihash) -> PackResult<Vec<BlobSlot>> {
        match self {
            Self::Car => index_car(data),
            Self::Raw => Ok(vec![BlobSlot {
                multihash: digest,
                offset: 0,
                length: data.len() as u64,
            }]),
        }
    }
}

/// Build a `car` pack from `(multihash, data)` pairs.
pub fn encode_car(blobs: &[(Multihash, Bytes)]) -> Bytes {
    let payload: usize = blobs.iter().map(|(_, data)| data.len() + 48).sum();
    let mut out = Vec::with_capacity(HEADER_LEN + payload);

    out.extend_from_slice(PACK_MAGIC);
    out.extend_from_slice(&PACK_VERSION.to_be_bytes());
    out.extend_from_slice(&(blobs.len() as u32).to_be_bytes());

    for (multihash, data) in blobs {
        let mh = multihash.to_bytes();
        varint::encode(&mut out, mh.len() as u64);
        out.extend_from_slice(&mh);
        varint::encode(&mut out, data.len() as u64);
        out.extend_from_slice(data);
    }
    Bytes::from(out)
}

/// Parse a `car` pack into its blob slots, in stored order.
pub fn index_car(data: &[u8]) -> PackResult<Vec<BlobSlot>> {
    if data.len() < HEADER_LEN {
        return Err(PackError::CorruptEntry {
            offset: 0,
            reason: "pack data too short".into(),
        });
    }
    if &data[0..4] != PACK_MAGIC {
        return Err(PackError::InvalidMagic {
            expected: String::from_utf8_lossy(PACK_MAGIC).into(),
            actual: String::from_utf8_lossy(&data[0..4]).into(),
        });
    }
    let version = read_u32(&data[4..8]);
    if version != PACK_VERSION {
        return Err(PackError::UnsupportedVersion(version));
    }
    let count = read_u32(&data[8..12]) as usize;

    let mut slots = Vec::with_capacity(count.min(4096));
    let mut pos = HEADER_LEN;
    for _ in 0..count {
        let entry_start = pos as u64;
        let corrupt = |reason: &str| PackError::CorruptEntry {
            offset: entry_start,
            reason: reason.to_string(),
        };

        let (mh_len, used) = varint::decode(&data[pos..]).map_err(|e| corrupt(&e.to_string()))?;
        pos += used;
        let mh_end = checked_end(pos, mh_len, data.len()).ok_or_else(|| corrupt("multihash extends beyond pack"))?;
        let multihash = Multihash::from_bytes(&data[pos..mh_end])?;
        pos = mh_end;

        let (length, used) = varint::decode(&data[pos..]).map_err(|e| corrupt(&e.to_string()))?;
        pos += used;
        let end = checked_end(pos, length, data.len()).ok_or_else(|| corrupt("blob data extends beyond pack"))?;

        slots.push(BlobSlot {
            multihash,
            offset: pos as u64,
            length,
        });
        pos = end;
    }

    if pos != data.len() {
        return Err(PackError::CorruptEntry {
            offset: pos as u64,
            reason: format!("{} trailing bytes after last entry", data.len() - pos),
        });
    }
    Ok(slots)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_be_bytes(buf)
}

fn checked_end(start: usize, len: u64, limit: usize) -> Option<usize> {
    let end = start.checked_add(usize::try_from(len).ok()?)?;
    (end <= limit).then_some(end)
}
