use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use hashstream_types::Location;

use crate::error::StoreResult;
use crate::traits::PackStore;

/// In-memory, HashMap-based pack store.
///
/// Intended for tests and embedding. Packs are held behind a `RwLock`;
/// `Bytes` clones are reference-counted, so reads do not copy pack data.
pub struct InMemoryPackStore {
    packs: RwLock<HashMap<Location, Bytes>>,
}

impl InMemoryPackStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            packs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of packs currently stored.
    pub fn len(&self) -> usize {
        self.packs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.packs.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored packs.
    pub fn total_bytes(&self) -> u64 {
        self.packs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|b| b.len() as u64)
            .sum()
    }

    /// Overwrite a stored pack in place. Test hook for corruption scenarios.
    pub fn replace(&self, target: &Location, bytes: Bytes) {
        self.packs
            .write()
            .expect("lock poisoned")
            .insert(target.clone(), bytes);
    }
}

impl Default for InMemoryPackStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackStore for InMemoryPackStore {
    async fn put(&self, target: &Location, bytes: Bytes) -> StoreResult<()> {
        let mut map = self.packs.write().expect("lock poisoned");
        // Immutable: the first write for a key wins.
        map.entry(target.clone()).or_insert(bytes);
        Ok(())
    }

    async fn get(&self, target: &Location) -> StoreResult<Option<Bytes>> {
        let map = self.packs.read().expect("lock poisoned");
        Ok(map.get(target).cloned())
    }
}

impl std::fmt::Debug for InMemoryPackStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryPackStore")
            .field("pack_count", &self.len())
            .finish()
    }
}
