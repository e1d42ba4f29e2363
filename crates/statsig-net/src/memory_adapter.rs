// statsig-net/src/memory_adapter.rs
// ============================================================================
// Module: In-Memory Data Adapter
// Description: DataAdapter backed by a HashMap guarded by a tokio RwLock.
// Purpose: Provide a save-through cache for local mode and tests without a
//          durable backing store.
// Dependencies: statsig-core, tokio
// ============================================================================

//! ## Overview
//! [`InMemoryDataAdapter`] keeps no state across process restarts; it exists
//! for local mode (where there is no network to begin with) and for tests
//! that need a `DataAdapter` collaborator without standing up a real cache.
//! It never advertises steady-state polling support: its only role is
//! bootstrap and save-through persistence for the lifetime of the process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use statsig_core::AdapterError;
use statsig_core::AdapterKeyName;
use statsig_core::DataAdapter;
use statsig_core::Timestamp;
use tokio::sync::RwLock;

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// An entry's raw bytes plus the `lastUpdateTime` it was saved with.
#[derive(Debug, Clone)]
struct Entry {
    /// Raw stored bytes.
    value: Vec<u8>,
    /// `lastUpdateTime` the entry was saved with.
    time: Timestamp,
}

/// Process-local, non-durable [`DataAdapter`].
#[derive(Debug, Default)]
pub struct InMemoryDataAdapter {
    entries: RwLock<HashMap<AdapterKeyName, Entry>>,
}

impl InMemoryDataAdapter {
    /// Creates an empty adapter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `key` with `value` before the adapter is handed to a spec
    /// store, useful for bootstrapping tests with a known snapshot.
    pub async fn seed(&self, key: AdapterKeyName, value: Vec<u8>, time: Timestamp) {
        self.entries.write().await.insert(key, Entry { value, time });
    }
}

#[async_trait]
impl DataAdapter for InMemoryDataAdapter {
    async fn initialize(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn shutdown(&self) {}

    async fn get(&self, key: &AdapterKeyName) -> Result<Option<Vec<u8>>, AdapterError> {
        Ok(self.entries.read().await.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &AdapterKeyName, value: Vec<u8>, time: Timestamp) -> Result<(), AdapterError> {
        self.entries.write().await.insert(key.clone(), Entry { value, time });
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let adapter = InMemoryDataAdapter::new();
        let key = AdapterKeyName::rulesets();
        adapter.set(&key, b"payload".to_vec(), Timestamp::from_millis(1)).await.unwrap();
        assert_eq!(adapter.get(&key).await.unwrap(), Some(b"payload".to_vec()));
    }

    #[tokio::test]
    async fn unknown_key_returns_none() {
        let adapter = InMemoryDataAdapter::new();
        assert_eq!(adapter.get(&AdapterKeyName::id_lists()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn seed_is_visible_through_get() {
        let adapter = InMemoryDataAdapter::new();
        let key = AdapterKeyName::rulesets();
        adapter.seed(key.clone(), b"bootstrap".to_vec(), Timestamp::from_millis(1)).await;
        assert_eq!(adapter.get(&key).await.unwrap(), Some(b"bootstrap".to_vec()));
    }
}
