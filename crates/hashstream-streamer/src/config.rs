use serde::{Deserialize, Serialize};

use hashstream_types::Multihash;

/// Configuration for [`HashStreamer`](crate::HashStreamer).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// Recompute every yielded blob's digest and fail on mismatch.
    pub verify: bool,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self { verify: true }
    }
}

/// Per-call options for [`HashStreamer::stream`](crate::HashStreamer::stream).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// Resolve the target inside this containing record first.
    pub containing: Option<Multihash>,
}

impl StreamOptions {
    pub fn containing(multihash: Multihash) -> Self {
        Self {
            containing: Some(multihash),
        }
    }
}
