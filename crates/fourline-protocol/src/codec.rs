//! Codec trait and implementations for serializing records and frames.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The update relay doesn't care HOW a [`ChannelFrame`](crate::ChannelFrame)
//! is serialized; it just needs something that implements [`Codec`].

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a codec is shared by every connection
/// task of the relay.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Records are small (a few dozen cells) and JSON keeps relay traffic easy
/// to inspect in browser DevTools or a log line.
///
/// ## Example
///
/// ```rust
/// use fourline_protocol::{
///     ChannelFrame, Codec, JsonCodec, ParticipantId, RoomCode, SessionRecord,
///     Username,
/// };
///
/// let codec = JsonCodec;
/// let record = SessionRecord::new(
///     RoomCode::parse("AB12C3").unwrap(),
///     Username::parse("alice").unwrap(),
///     ParticipantId::new("userA"),
/// );
/// let frame = ChannelFrame::Update { record };
///
/// let bytes = codec.encode(&frame).unwrap();
/// let decoded: ChannelFrame = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
