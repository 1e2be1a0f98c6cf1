//! Error types for the gateway layer.

use fourline_protocol::RoomCode;

/// Errors reported by a [`SessionStore`](crate::SessionStore).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// `create` was called with a room code that already has a record.
    #[error("record {0} already exists")]
    AlreadyExists(RoomCode),

    /// `update` was called for a room code with no record.
    #[error("record {0} not found")]
    NotFound(RoomCode),

    /// `update` expected a different stored version.
    #[error("record {room_code} is at version {actual}, expected {expected}")]
    VersionMismatch {
        room_code: RoomCode,
        expected: u64,
        actual: u64,
    },

    /// The backend couldn't be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by [`Gateway`](crate::Gateway) operations.
///
/// None of these are retried by the gateway itself (apart from collisions
/// inside `create_with_fresh_code`); the caller decides.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No session exists for the code, or the code is malformed.
    #[error("no session found for code {0:?}")]
    NotFound(String),

    /// A session with this code already exists. Retry with a fresh code.
    #[error("room code {0} is already taken")]
    CreateCollision(RoomCode),

    /// The session already has a joiner.
    #[error("session {0} already has two participants")]
    AlreadyFull(RoomCode),

    /// The write would break a rule of the stored record: an immutable
    /// field changed, the game is over, or the write is based on an
    /// outdated version.
    #[error("conflicting write: {0}")]
    Conflict(String),

    /// The store itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
