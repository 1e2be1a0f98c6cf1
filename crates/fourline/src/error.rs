//! Unified error type for Fourline.

use fourline_channel::ChannelError;
use fourline_gateway::GatewayError;
use fourline_protocol::ProtocolError;
use fourline_sync::{MoveError, Phase};

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `fourline` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum FourlineError {
    /// Malformed input (room code, username) or an encoding failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The update subscription couldn't be opened.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// A create, join, fetch or write was rejected.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The move is out of turn or against the rules.
    #[error(transparent)]
    Move(#[from] MoveError),

    /// The action isn't available in the current phase.
    #[error("not allowed while {0}")]
    InvalidPhase(Phase),

    /// Only the room's creator may choose the game type.
    #[error("only the creator can choose the game type")]
    NotCreator,
}

#[cfg(test)]
mod tests {
    use fourline_protocol::RoomCode;

    use super::*;

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidUsername("".into());
        let fourline_err: FourlineError = err.into();
        assert!(matches!(fourline_err, FourlineError::Protocol(_)));
    }

    #[test]
    fn test_from_channel_error() {
        let fourline_err: FourlineError = ChannelError::Closed.into();
        assert!(matches!(fourline_err, FourlineError::Channel(_)));
        assert_eq!(fourline_err.to_string(), "update channel closed");
    }

    #[test]
    fn test_from_gateway_error() {
        let err = GatewayError::AlreadyFull(RoomCode::parse("AB12C3").unwrap());
        let fourline_err: FourlineError = err.into();
        assert!(matches!(fourline_err, FourlineError::Gateway(_)));
        assert!(fourline_err.to_string().contains("AB12C3"));
    }

    #[test]
    fn test_from_move_error() {
        let fourline_err: FourlineError = MoveError::NotYourTurn.into();
        assert!(matches!(
            fourline_err,
            FourlineError::Move(MoveError::NotYourTurn)
        ));
    }

    #[test]
    fn test_invalid_phase_names_phase() {
        let err = FourlineError::InvalidPhase(Phase::AwaitingPartner);
        assert_eq!(err.to_string(), "not allowed while AwaitingPartner");
    }
}
