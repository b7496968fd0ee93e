use std::fmt;

use crate::multihash::Multihash;

/// Where an entity's bytes physically reside.
///
/// Most locations are content-addressed keys. A `Path` is an opaque,
/// store-relative name for bytes that were never stored under a digest.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Location {
    Digest(Multihash),
    Path(String),
}

impl Location {
    /// The digest, if this location is content-addressed.
    pub fn as_digest(&self) -> Option<&Multihash> {
        match self {
            Self::Digest(mh) => Some(mh),
            Self::Path(_) => None,
        }
    }

    /// Returns `true` for opaque path locations.
    pub fn is_path(&self) -> bool {
        matches!(self, Self::Path(_))
    }
}

impl From<Multihash> for Location {
    fn from(mh: Multihash) -> Self {
        Self::Digest(mh)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Digest(mh) => write!(f, "{mh}"),
            Self::Path(path) => write!(f, "path:{path}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multihash::BLAKE3_CODE;

    #[test]
    fn digest_accessors() {
        let mh = Multihash::wrap(BLAKE3_CODE, [3u8; 32]).unwrap();
        let loc = Location::from(mh);
        assert_eq!(loc.as_digest(), Some(&mh));
        assert!(!loc.is_path());
    }

    #[test]
    fn path_has_no_digest() {
        let loc = Location::Path("uploads/a.bin".into());
        assert!(loc.is_path());
        assert!(loc.as_digest().is_none());
        assert_eq!(loc.to_string(), "path:uploads/a.bin");
    }
}
