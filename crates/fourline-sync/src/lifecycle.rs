//! Session lifecycle phases.
//!
//! The phase is never stored. It is re-derived from the fields a client
//! currently holds every time someone asks, so it can't drift out of sync
//! with them.
//!
//! ```text
//! NoUsername → ChoosingMode ─┬─ PickingSinglePlayerGame → SinglePlayer
//!                            │
//!                            └─ ChoosingCreateOrJoin
//!                                 → (EnteringCode) → AwaitingRemoteResult
//!                                 → SessionEstablished → (AwaitingPartner)
//!                                 → GameTypeChosen → InProgress → Terminal
//! ```
//!
//! `AwaitingPartner` only happens on the creator's side, when a game type
//! was picked before anyone joined. `Error` overrides everything until the
//! error is cleared.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Single player against the local rule engine, or a shared session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    SinglePlayer,
    Multiplayer,
}

/// Whether this client created the room, joined it, or hasn't decided.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum CreatedCode {
    #[default]
    Unknown,
    Created,
    Joined,
}

/// Everything the phase depends on, flattened to plain facts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleInputs {
    pub has_username: bool,
    pub mode: Option<Mode>,
    pub created_code: CreatedCode,
    /// A create or join call is in flight.
    pub awaiting_remote: bool,
    /// A session record is held locally.
    pub has_record: bool,
    pub both_present: bool,
    /// In single-player mode: a game was picked. Otherwise: the effective
    /// record has a game type.
    pub has_game_type: bool,
    pub has_moves: bool,
    pub has_winner: bool,
    pub has_error: bool,
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The discrete stage of the create/join/play flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    NoUsername,
    ChoosingMode,
    PickingSinglePlayerGame,
    SinglePlayer,
    ChoosingCreateOrJoin,
    /// Chose to join; no code submitted yet.
    EnteringCode,
    AwaitingRemoteResult,
    /// A record is held but no game type is stored yet.
    SessionEstablished,
    /// Creator picked a game type locally; nobody has joined.
    AwaitingPartner,
    GameTypeChosen,
    InProgress,
    Terminal,
    Error,
}

impl Phase {
    /// Returns `true` while moves may be made.
    pub fn is_playable(self) -> bool {
        matches!(self, Self::GameTypeChosen | Self::InProgress)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Derives the phase from `inputs`. Pure: same inputs, same phase.
pub fn derive_phase(inputs: &LifecycleInputs) -> Phase {
    if inputs.has_error {
        return Phase::Error;
    }
    if !inputs.has_username {
        return Phase::NoUsername;
    }
    let Some(mode) = inputs.mode else {
        return Phase::ChoosingMode;
    };
    if mode == Mode::SinglePlayer {
        return if inputs.has_game_type {
            Phase::SinglePlayer
        } else {
            Phase::PickingSinglePlayerGame
        };
    }

    if !inputs.has_record {
        return match inputs.created_code {
            CreatedCode::Unknown => Phase::ChoosingCreateOrJoin,
            _ if inputs.awaiting_remote => Phase::AwaitingRemoteResult,
            CreatedCode::Joined => Phase::EnteringCode,
            CreatedCode::Created => Phase::AwaitingRemoteResult,
        };
    }

    if inputs.has_winner {
        Phase::Terminal
    } else if !inputs.has_game_type {
        Phase::SessionEstablished
    } else if !inputs.both_present {
        Phase::AwaitingPartner
    } else if !inputs.has_moves {
        Phase::GameTypeChosen
    } else {
        Phase::InProgress
    }
}
