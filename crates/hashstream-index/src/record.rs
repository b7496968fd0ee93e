//! Index record model.
//!
//! An index record says where the bytes behind a multihash live. Records
//! form a shallow tree: a containing record groups packs and blobs, a pack
//! record groups the blobs at known offsets inside it, and a blob record is
//! a leaf naming a byte range.
//!
//! Records are plain values. Stores keep them in maps keyed by multihash and
//! merge two records with the same `(multihash, kind)` by concatenating their
//! children; nothing holds a live reference to another record.

use serde::{Deserialize, Serialize};

use hashstream_types::{ByteRange, Location, Multihash};

use crate::codec::{WireLocation, WireRecord};
use crate::error::{IndexError, IndexResult};

/// Discriminant of an [`IndexRecord`], also its integer wire tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Blob,
    Pack,
    Containing,
}

impl RecordKind {
    /// Integer tag used in the persisted form.
    pub fn code(&self) -> u8 {
        match self {
            Self::Blob => 0,
            Self::Pack => 1,
            Self::Containing => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Blob),
            1 => Some(Self::Pack),
            2 => Some(Self::Containing),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Pack => write!(f, "pack"),
            Self::Containing => write!(f, "containing"),
        }
    }
}

/// A leaf: `length` bytes at `offset` inside `location`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobRecord {
    pub multihash: Multihash,
    pub location: Location,
    pub offset: u64,
    pub length: u64,
}

impl BlobRecord {
    /// An inline blob is stored under its own digest rather than in a pack.
    pub fn is_inline(&self) -> bool {
        self.location.as_digest() == Some(&self.multihash)
    }

    /// The byte range to request from the pack store.
    pub fn range(&self) -> ByteRange {
        ByteRange::new(self.multihash, self.offset, self.length)
    }
}

/// A pack stored under its own digest.
///
/// An empty `blobs` list means the pack is opaque: its layout was never
/// indexed and it can only be fetched whole.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackRecord {
    pub multihash: Multihash,
    pub blobs: Vec<BlobRecord>,
}

/// A logical object made of the packs and blobs beneath it. Never fetched
/// as bytes itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainingRecord {
    pub multihash: Multihash,
    pub sub_records: Vec<IndexRecord>,
}

/// Persisted location metadata for one multihash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexRecord {
    Blob(BlobRecord),
    Pack(PackRecord),
    Containing(ContainingRecord),
}

impl IndexRecord {
    pub fn from_blob(multihash: Multihash, location: Location, offset: u64, length: u64) -> Self {
        Self::Blob(BlobRecord {
            multihash,
            location,
            offset,
            length,
        })
    }

    /// An inline blob: stored whole at its own digest.
    pub fn from_inline_blob(multihash: Multihash, length: u64) -> Self {
        Self::from_blob(multihash, Location::Digest(multihash), 0, length)
    }

    pub fn from_pack(multihash: Multihash, blobs: Vec<BlobRecord>) -> Self {
        Self::Pack(PackRecord { multihash, blobs })
    }

    pub fn from_containing(multihash: Multihash, sub_records: Vec<IndexRecord>) -> Self {
        Self::Containing(ContainingRecord {
            multihash,
            sub_records,
        })
    }

    pub fn multihash(&self) -> &Multihash {
        match self {
            Self::Blob(b) => &b.multihash,
            Self::Pack(p) => &p.multihash,
            Self::Containing(c) => &c.multihash,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Blob(_) => RecordKind::Blob,
            Self::Pack(_) => RecordKind::Pack,
            Self::Containing(_) => RecordKind::Containing,
        }
    }

    /// Where the bytes live. Packs and containing records name themselves.
    pub fn location(&self) -> Location {
        match self {
            Self::Blob(b) => b.location.clone(),
            Self::Pack(p) => Location::Digest(p.multihash),
            Self::Containing(c) => Location::Digest(c.multihash),
        }
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        match self {
            Self::Blob(_) => 0,
            Self::Pack(p) => p.blobs.len(),
            Self::Containing(c) => c.sub_records.len(),
        }
    }

    /// Key under which two records are considered the same entity.
    pub fn merge_key(&self) -> (Multihash, RecordKind) {
        (*self.multihash(), self.kind())
    }

    /// Append `other`'s children to `self`.
    ///
    /// Records with different merge keys are handed back untouched. Two
    /// blob records with the same key describe the same bytes; the existing
    /// placement is kept.
    pub fn merge(&mut self, other: IndexRecord) -> Result<(), IndexRecord> {
        if self.merge_key() != other.merge_key() {
            return Err(other);
        }
        match (self, other) {
            (Self::Pack(mine), Self::Pack(theirs)) => mine.blobs.extend(theirs.blobs),
            (Self::Containing(mine), Self::Containing(theirs)) => {
                mine.sub_records.extend(theirs.sub_records)
            }
            (Self::Blob(_), Self::Blob(_)) => {}
            (_, other) => return Err(other),
        }
        Ok(())
    }

    /// Encode into the persisted form.
    pub fn to_wire(&self) -> WireRecord {
        match self {
            Self::Blob(b) => WireRecord {
                multihash: b.multihash.to_bytes(),
                kind: RecordKind::Blob.code(),
                location: WireLocation::from(&b.location),
                sub_records: Vec::new(),
                offset: Some(b.offset),
                length: Some(b.length),
            },
            Self::Pack(p) => WireRecord {
                multihash: p.multihash.to_bytes(),
                kind: RecordKind::Pack.code(),
                location: WireLocation::Digest(p.multihash.to_bytes()),
                sub_records: p
                    .blobs
                    .iter()
                    .map(|b| Self::Blob(b.clone()).to_wire())
                    .collect(),
                offset: None,
                length: None,
            },
            Self::Containing(c) => WireRecord {
                multihash: c.multihash.to_bytes(),
                kind: RecordKind::Containing.code(),
                location: WireLocation::Digest(c.multihash.to_bytes()),
                sub_records: c.sub_records.iter().map(Self::to_wire).collect(),
                offset: None,
                length: None,
            },
        }
    }

    /// Decode from the persisted form, validating the tree shape.
    pub fn from_wire(wire: WireRecord) -> IndexResult<Self> {
        let multihash = Multihash::from_bytes(&wire.multihash)?;
        let kind = RecordKind::from_code(wire.kind)
            .ok_or_else(|| IndexError::MalformedRecord(format!("unknown record type {}", wire.kind)))?;

        match kind {
            RecordKind::Blob => {
                let (Some(offset), Some(length)) = (wire.offset, wire.length) else {
                    return Err(IndexError::MalformedRecord(format!(
                        "blob {multihash} is missing offset or length"
                    )));
                };
                if !wire.sub_records.is_empty() {
                    return Err(IndexError::MalformedRecord(format!(
                        "blob {multihash} has sub-records"
                    )));
                }
                Ok(Self::from_blob(
                    multihash,
                    wire.location.into_location()?,
                    offset,
                    length,
                ))
            }
            RecordKind::Pack => {
                let blobs = wire
                    .sub_records
                    .into_iter()
                    .map(|child| match Self::from_wire(child)? {
                        Self::Blob(b) => Ok(b),
                        other => Err(IndexError::MalformedRecord(format!(
                            "pack {multihash} contains a {} record",
                            other.kind()
                        ))),
                    })
                    .collect::<IndexResult<Vec<_>>>()?;
                Ok(Self::from_pack(multihash, blobs))
            }
            RecordKind::Containing => {
                let sub_records = wire
                    .sub_records
                    .into_iter()
                    .map(Self::from_wire)
                    .collect::<IndexResult<Vec<_>>>()?;
                Ok(Self::from_containing(multihash, sub_records))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashstream_types::BLAKE3_CODE;

    fn mh(byte: u8) -> Multihash {
        Multihash::wrap(BLAKE3_CODE, [byte; 32]).unwrap()
    }

    fn blob(byte: u8, pack: u8, offset: u64) -> BlobRecord {
        BlobRecord {
            multihash: mh(byte),
            location: Location::Digest(mh(pack)),
            offset,
            length: 10,
        }
    }

    #[test]
    fn kind_codes_roundtrip() {
        for kind in [RecordKind::Blob, RecordKind::Pack, RecordKind::Containing] {
            assert_eq!(RecordKind::from_code(kind.code()), Some(kind));
        }
        assert!(RecordKind::from_code(3).is_none());
    }

    #[test]
    fn pack_and_containing_locate_themselves() {
        let pack = IndexRecord::from_pack(mh(1), vec![]);
        assert_eq!(pack.location(), Location::Digest(mh(1)));
        let containing = IndexRecord::from_containing(mh(2), vec![pack]);
        assert_eq!(containing.location(), Location::Digest(mh(2)));
        assert_eq!(containing.child_count(), 1);
    }

    #[test]
    fn inline_blob_detection() {
        let inline = IndexRecord::from_inline_blob(mh(5), 42);
        let IndexRecord::Blob(b) = &inline else {
            panic!("expected blob");
        };
        assert!(b.is_inline());
        assert_eq!(b.offset, 0);
        assert!(!blob(6, 7, 0).is_inline());
    }

    #[test]
    fn merge_concatenates_pack_children() {
        let mut a = IndexRecord::from_pack(mh(1), vec![blob(10, 1, 0)]);
        let b = IndexRecord::from_pack(mh(1), vec![blob(11, 1, 10)]);
        a.merge(b).unwrap();
        assert_eq!(a.child_count(), 2);
    }

    #[test]
    fn merge_concatenates_containing_children() {
        let mut a = IndexRecord::from_containing(mh(9), vec![IndexRecord::from_pack(mh(1), vec![])]);
        let b = IndexRecord::from_containing(mh(9), vec![IndexRecord::from_pack(mh(2), vec![])]);
        a.merge(b).unwrap();
        assert_eq!(a.child_count(), 2);
    }

    #[test]
    fn merge_rejects_different_keys() {
        let mut a = IndexRecord::from_pack(mh(1), vec![]);
        let other_kind = IndexRecord::from_containing(mh(1), vec![]);
        assert!(a.merge(other_kind).is_err());
        let other_hash = IndexRecord::from_pack(mh(2), vec![]);
        assert!(a.merge(other_hash).is_err());
    }

    #[test]
    fn wire_roundtrip_nested_tree() {
        let tree = IndexRecord::from_containing(
            mh(9),
            vec![
                IndexRecord::from_pack(mh(1), vec![blob(10, 1, 0), blob(11, 1, 10)]),
                IndexRecord::from_inline_blob(mh(12), 7),
                IndexRecord::from_blob(mh(13), Location::Path("raw/file".into()), 3, 4),
            ],
        );
        let decoded = IndexRecord::from_wire(tree.to_wire()).unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn wire_pack_has_no_offsets() {
        let wire = IndexRecord::from_pack(mh(1), vec![]).to_wire();
        assert!(wire.offset.is_none());
        assert!(wire.length.is_none());
        assert_eq!(wire.kind, 1);
    }

    #[test]
    fn from_wire_rejects_blob_without_offset() {
        let mut wire = IndexRecord::Blob(blob(1, 2, 0)).to_wire();
        wire.offset = None;
        assert!(matches!(
            IndexRecord::from_wire(wire).unwrap_err(),
            IndexError::MalformedRecord(_)
        ));
    }

    #[test]
    fn from_wire_rejects_pack_with_pack_child() {
        let mut wire = IndexRecord::from_pack(mh(1), vec![]).to_wire();
        wire.sub_records.push(IndexRecord::from_pack(mh(2), vec![]).to_wire());
        assert!(matches!(
            IndexRecord::from_wire(wire).unwrap_err(),
            IndexError::MalformedRecord(_)
        ));
    }

    #[test]
    fn from_wire_rejects_unknown_type() {
        let mut wire = IndexRecord::from_pack(mh(1), vec![]).to_wire();
        wire.kind = 7;
        assert!(IndexRecord::from_wire(wire).is_err());
    }

    #[test]
    fn from_wire_rejects_bad_digest() {
        let mut wire = IndexRecord::from_pack(mh(1), vec![]).to_wire();
        wire.multihash.truncate(5);
        assert!(matches!(
            IndexRecord::from_wire(wire).unwrap_err(),
            IndexError::InvalidDigest(_)
        ));
    }
}
