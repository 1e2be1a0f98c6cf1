//! In-memory [`SessionStore`] that publishes updates to a channel.

use std::collections::HashMap;
use std::sync::Arc;

use fourline_channel::Publisher;
use fourline_protocol::{RoomCode, SessionRecord};
use tokio::sync::Mutex;

use crate::{SessionStore, StoreError};

/// A [`SessionStore`] backed by a `HashMap`, modelling a hosted backend
/// with real-time subscriptions.
///
/// Every successful `update` is handed to the publisher while the map lock
/// is still held, so subscribers see updates in the order they were stored.
/// Clones share the same records.
#[derive(Clone)]
pub struct MemoryStore<P: Publisher> {
    records: Arc<Mutex<HashMap<RoomCode, SessionRecord>>>,
    publisher: P,
}

impl<P: Publisher> MemoryStore<P> {
    pub fn new(publisher: P) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            publisher,
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

impl<P: Publisher> SessionStore for MemoryStore<P> {
    async fn get(
        &self,
        room_code: &RoomCode,
    ) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.records.lock().await.get(room_code).cloned())
    }

    async fn create(
        &self,
        mut record: SessionRecord,
    ) -> Result<SessionRecord, StoreError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.room_code) {
            return Err(StoreError::AlreadyExists(record.room_code));
        }
        record.version = 1;
        records.insert(record.room_code.clone(), record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        mut record: SessionRecord,
        expected_version: u64,
    ) -> Result<SessionRecord, StoreError> {
        let mut records = self.records.lock().await;
        let Some(stored) = records.get_mut(&record.room_code) else {
            return Err(StoreError::NotFound(record.room_code));
        };
        if stored.version != expected_version {
            return Err(StoreError::VersionMismatch {
                room_code: record.room_code,
                expected: expected_version,
                actual: stored.version,
            });
        }
        record.version = stored.version + 1;
        *stored = record.clone();
        self.publisher.publish(&record);
        Ok(record)
    }
}
