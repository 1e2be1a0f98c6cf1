//! Update channel layer for Fourline.
//!
//! Provides the [`UpdateChannel`] / [`UpdateStream`] traits that abstract over
//! the publish/subscribe service delivering updated session records, the
//! [`Publisher`] trait the storage side uses to emit them, and
//! [`subscribe`], which turns a channel into callbacks.
//!
//! Delivery is at-least-once and unordered with respect to racing writes.
//! A writer may or may not receive its own update back; consumers must
//! tolerate both.
//!
//! # Feature Flags
//!
//! - `websocket` (default): a WebSocket relay and client via
//!   `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
mod memory;
mod subscriber;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::ChannelError;
pub use memory::{MemoryChannel, MemoryStream};
pub use subscriber::{SubscriptionHandle, subscribe};
#[cfg(feature = "websocket")]
pub use websocket::{RelayHandle, RelayStream, WebSocketChannel, WebSocketRelay};

use std::future::Future;

use fourline_protocol::{RoomCode, SessionRecord};

/// Opens subscriptions to the updates of one room.
pub trait UpdateChannel: Send + Sync + 'static {
    /// The stream produced by [`open`](Self::open).
    type Stream: UpdateStream;

    /// Starts receiving updates for `room_code`.
    ///
    /// Every update published after this returns `Ok` is delivered to the
    /// stream at least once.
    fn open(
        &self,
        room_code: &RoomCode,
    ) -> impl Future<Output = Result<Self::Stream, ChannelError>> + Send;
}

/// A live stream of updated records.
pub trait UpdateStream: Send + 'static {
    /// Waits for the next updated record.
    ///
    /// Returns `Ok(None)` when the channel has closed cleanly.
    fn recv(
        &mut self,
    ) -> impl Future<Output = Result<Option<SessionRecord>, ChannelError>> + Send;
}

/// The storage side of the channel: emits a record after every update.
pub trait Publisher: Send + Sync + 'static {
    /// Delivers `record` to every current subscriber of its room.
    ///
    /// Fire-and-forget; a room with no subscribers is not an error.
    fn publish(&self, record: &SessionRecord);
}

/// A [`Publisher`] that drops everything. For stores with no live channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl Publisher for NullPublisher {
    fn publish(&self, _record: &SessionRecord) {}
}
