//! Error types for the sync layer.

use fourline_channel::ChannelError;
use fourline_gateway::GatewayError;

/// The sticky, user-facing error a client shows until it is retried.
///
/// Cloneable so it can live inside [`FlowState`](crate::FlowState); the
/// underlying gateway or channel error is logged where it happens and
/// reduced to a message here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// Unknown or malformed room code.
    #[error("enter a valid code")]
    NotFound,

    #[error("that session already has two players")]
    AlreadyFull,

    /// Every generated room code was taken.
    #[error("could not reserve a room code, try again")]
    CreateCollision,

    /// A write was rejected by the gateway.
    #[error("write rejected: {0}")]
    Conflict(String),

    /// The live update subscription failed. The game state already held
    /// stays as it is.
    #[error("live updates stopped: {0}")]
    Channel(String),

    #[error("storage unavailable: {0}")]
    Store(String),
}

impl From<&GatewayError> for FlowError {
    fn from(err: &GatewayError) -> Self {
        match err {
            GatewayError::NotFound(_) => Self::NotFound,
            GatewayError::AlreadyFull(_) => Self::AlreadyFull,
            GatewayError::CreateCollision(_) => Self::CreateCollision,
            GatewayError::Conflict(reason) => Self::Conflict(reason.clone()),
            GatewayError::Store(e) => Self::Store(e.to_string()),
        }
    }
}

impl From<&ChannelError> for FlowError {
    fn from(err: &ChannelError) -> Self {
        Self::Channel(err.to_string())
    }
}

/// Why a move couldn't be turned into a new record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("no game type chosen yet")]
    NoGameType,

    #[error("the game is already over")]
    GameOver,

    #[error("it is not your turn")]
    NotYourTurn,

    /// The rule engine rejected the move.
    #[error("illegal move: {0}")]
    IllegalMove(String),
}
