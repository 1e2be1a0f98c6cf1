//! The persistence hook.
//!
//! Fourline doesn't own a database. It defines the [`SessionStore`] trait,
//! the three calls it needs from one, and ships an in-memory implementation
//! ([`MemoryStore`](crate::MemoryStore)) for tests and demos.

use std::future::Future;

use fourline_protocol::{RoomCode, SessionRecord};

use crate::StoreError;

/// Key-value storage for session records, keyed by room code.
///
/// Implementations assign `version`: a created record gets version 1 and
/// every successful `update` stores `previous + 1`, whatever the caller put
/// in the field. After each successful `update` the new record must be
/// published to the room's subscribers; `create` publishes nothing.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` so one store can be shared by every client task.
pub trait SessionStore: Send + Sync + 'static {
    /// Reads the record for `room_code`, if there is one.
    fn get(
        &self,
        room_code: &RoomCode,
    ) -> impl Future<Output = Result<Option<SessionRecord>, StoreError>> + Send;

    /// Inserts a new record.
    ///
    /// # Errors
    /// [`StoreError::AlreadyExists`] if the key is taken.
    fn create(
        &self,
        record: SessionRecord,
    ) -> impl Future<Output = Result<SessionRecord, StoreError>> + Send;

    /// Overwrites an existing record with `record`, but only if the stored
    /// version is still `expected_version`. The comparison and the write
    /// must be atomic.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if there is nothing to overwrite
    /// - [`StoreError::VersionMismatch`] if someone else wrote first
    fn update(
        &self,
        record: SessionRecord,
        expected_version: u64,
    ) -> impl Future<Output = Result<SessionRecord, StoreError>> + Send;
}
