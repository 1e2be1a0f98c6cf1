//! In-process update channel built on `tokio::sync::broadcast`.
//!
//! One broadcast channel per room. Every subscriber of a room gets its own
//! receiver; publishing clones an `Arc` into each of them. A subscriber that
//! falls more than `capacity` updates behind sees [`ChannelError::Lagged`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fourline_protocol::{RoomCode, SessionRecord};
use tokio::sync::broadcast;

use crate::{ChannelError, Publisher, UpdateChannel, UpdateStream};

/// Buffered updates per room before a slow subscriber lags.
const DEFAULT_CAPACITY: usize = 256;

type RoomSenders = HashMap<RoomCode, broadcast::Sender<Arc<SessionRecord>>>;

/// An in-memory pub/sub channel. Cloneable; clones share the same rooms.
#[derive(Clone)]
pub struct MemoryChannel {
    rooms: Arc<Mutex<RoomSenders>>,
    capacity: usize,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a channel buffering `capacity` updates per room.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Number of live subscribers of `room_code`.
    pub fn subscriber_count(&self, room_code: &RoomCode) -> usize {
        self.rooms()
            .get(room_code)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Number of rooms that still hold a sender.
    pub fn room_count(&self) -> usize {
        self.rooms().len()
    }

    fn rooms(&self) -> MutexGuard<'_, RoomSenders> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Forgets rooms whose subscribers have all gone.
fn prune(rooms: &mut RoomSenders) {
    rooms.retain(|_, sender| sender.receiver_count() > 0);
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher for MemoryChannel {
    fn publish(&self, record: &SessionRecord) {
        let mut rooms = self.rooms();
        prune(&mut rooms);
        if let Some(sender) = rooms.get(&record.room_code) {
            // `send` only fails when nobody is listening.
            let delivered = sender.send(Arc::new(record.clone())).unwrap_or(0);
            tracing::trace!(
                room_code = %record.room_code,
                version = record.version,
                delivered,
                "published update"
            );
        }
    }
}

impl UpdateChannel for MemoryChannel {
    type Stream = MemoryStream;

    async fn open(
        &self,
        room_code: &RoomCode,
    ) -> Result<MemoryStream, ChannelError> {
        let mut rooms = self.rooms();
        prune(&mut rooms);
        let receiver = rooms
            .entry(room_code.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        Ok(MemoryStream { receiver })
    }
}

/// Receiving end of a [`MemoryChannel`] subscription.
pub struct MemoryStream {
    receiver: broadcast::Receiver<Arc<SessionRecord>>,
}

impl UpdateStream for MemoryStream {
    async fn recv(&mut self) -> Result<Option<SessionRecord>, ChannelError> {
        match self.receiver.recv().await {
            Ok(record) => Ok(Some(SessionRecord::clone(&record))),
            Err(broadcast::error::RecvError::Closed) => Ok(None),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                Err(ChannelError::Lagged(missed))
            }
        }
    }
}
