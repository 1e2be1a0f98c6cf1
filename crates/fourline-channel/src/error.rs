use fourline_protocol::ProtocolError;

/// Errors that can occur on the update channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Opening a subscription failed (relay unreachable, handshake refused).
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the relay or accepting a subscriber failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The channel closed underneath a live subscription.
    #[error("update channel closed")]
    Closed,

    /// The subscriber fell behind and the channel discarded updates.
    #[error("subscriber missed {0} updates")]
    Lagged(u64),

    /// The peer sent a frame that isn't valid at this point.
    #[error("unexpected frame: {0}")]
    UnexpectedFrame(String),

    /// A frame couldn't be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
