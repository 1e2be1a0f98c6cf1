//! Error types for the protocol layer.
//!
//! Each crate in Fourline defines its own error enum. A `ProtocolError`
//! always means the problem is with the *shape* of data (bytes that don't
//! decode, a room code with punctuation in it), never with storage or the
//! network.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust value).
    ///
    /// Common causes: malformed JSON, missing required fields, or a frame
    /// type this build doesn't know about.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The input can't be a room code: empty after trimming, or containing
    /// characters outside `A-Z0-9`.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),

    /// The username is empty after trimming or too long.
    #[error("invalid username: {0}")]
    InvalidUsername(String),
}
