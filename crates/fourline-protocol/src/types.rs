//! Core types for Fourline's shared session state.
//!
//! The centrepiece is [`SessionRecord`]: one per room, stored by the
//! persistence service and pushed in full to both clients on every update.
//! Everything else in this module is an identifier or a small enum that
//! appears inside it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::code::generate_code;

/// Length of a generated room code.
pub const ROOM_CODE_LEN: usize = 6;

/// Length of a generated participant identity.
pub const PARTICIPANT_ID_LEN: usize = 16;

/// Longest username accepted, in characters.
pub const USERNAME_MAX_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The short, shareable key of a session.
///
/// Lookups are case-insensitive: [`RoomCode::parse`] trims and uppercases
/// whatever the user typed. Generated codes are already upper-case, so a
/// code survives being read aloud and retyped in lower case.
///
/// `#[serde(transparent)]` serializes this as the bare string.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalizes user input into a room code.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRoomCode`] if the trimmed input is
    /// empty or contains anything other than ASCII letters and digits.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty()
            || !normalized.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ProtocolError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(normalized))
    }

    /// Draws a fresh random code of `len` characters.
    pub fn generate(len: usize) -> Self {
        Self(generate_code(len))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A per-client random identity, stamped into
/// [`SessionRecord::last_updated_by`] on every write.
///
/// It only exists so a client can recognise its own writes when the update
/// channel echoes them back. It is not a credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wraps an existing identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh [`PARTICIPANT_ID_LEN`]-character identity.
    pub fn generate() -> Self {
        Self(generate_code(PARTICIPANT_ID_LEN))
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A display name chosen by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Trims and validates a username.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidUsername`] if the result is empty or
    /// longer than [`USERNAME_MAX_LEN`] characters.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProtocolError::InvalidUsername(
                "username must not be empty".into(),
            ));
        }
        if trimmed.chars().count() > USERNAME_MAX_LEN {
            return Err(ProtocolError::InvalidUsername(format!(
                "username must be at most {USERNAME_MAX_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the username as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Seats, variants, outcomes
// ---------------------------------------------------------------------------

/// One of the two places at the table.
///
/// The creator always plays X and moves first; the joiner plays O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    Creator,
    Joiner,
}

impl Seat {
    /// The seat across the table.
    pub fn other(self) -> Self {
        match self {
            Self::Creator => Self::Joiner,
            Self::Joiner => Self::Creator,
        }
    }

    /// The mark this seat places on the board.
    pub fn mark(self) -> char {
        match self {
            Self::Creator => 'X',
            Self::Joiner => 'O',
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creator => write!(f, "creator"),
            Self::Joiner => write!(f, "joiner"),
        }
    }
}

/// The rule variant a session is played with.
///
/// Stored under the short names `ADD`, `MULT` and `ALG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameType {
    #[serde(rename = "ADD")]
    Addition,
    #[serde(rename = "MULT")]
    Multiplication,
    #[serde(rename = "ALG")]
    Algebra,
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addition => write!(f, "ADD"),
            Self::Multiplication => write!(f, "MULT"),
            Self::Algebra => write!(f, "ALG"),
        }
    }
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Won(Seat),
    Draw,
}

// ---------------------------------------------------------------------------
// SessionRecord
// ---------------------------------------------------------------------------

/// Username slots for the two seats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participants {
    #[serde(default)]
    pub creator: Option<Username>,
    #[serde(default)]
    pub joiner: Option<Username>,
}

impl Participants {
    /// The username sitting in `seat`, if anyone is.
    pub fn get(&self, seat: Seat) -> Option<&Username> {
        match seat {
            Seat::Creator => self.creator.as_ref(),
            Seat::Joiner => self.joiner.as_ref(),
        }
    }

    /// `true` once both seats are taken.
    pub fn both_present(&self) -> bool {
        self.creator.is_some() && self.joiner.is_some()
    }
}

/// The authoritative shared state of one two-participant game.
///
/// Stored by the persistence service keyed by `room_code` and delivered in
/// full on every update. Writes are whole-record overwrites (last write
/// wins); `version` is assigned by the store and only used for ordering.
///
/// Serialized in camelCase:
///
/// ```json
/// { "roomCode": "AB12C3", "participants": { "creator": "alice", "joiner": null },
///   "gameType": null, "board": [], "currentTurn": "Creator", "version": 1, ... }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Primary key; never changes after creation.
    pub room_code: RoomCode,

    /// Creator is set at creation, joiner at join time. Immutable once set.
    #[serde(default)]
    pub participants: Participants,

    /// Chosen by the creator; immutable once stored.
    #[serde(default)]
    pub game_type: Option<GameType>,

    /// Grid contents, row-major. Empty until a game type is chosen.
    #[serde(default)]
    pub board: Vec<Option<Seat>>,

    /// Cells the next move may be played in.
    #[serde(default)]
    pub active_region: Vec<usize>,

    #[serde(default)]
    pub move_count: u32,

    /// Cell index of every move, in play order.
    #[serde(default)]
    pub move_history: Vec<usize>,

    /// Who may move next.
    pub current_turn: Seat,

    /// Set once the game is over, then never cleared.
    #[serde(default)]
    pub winner: Option<Outcome>,

    #[serde(default)]
    pub winning_line: Vec<usize>,

    /// Identity of the participant whose write produced this version.
    #[serde(default)]
    pub last_updated_by: Option<ParticipantId>,

    /// Storage version, bumped by the store on every write.
    #[serde(default)]
    pub version: u64,
}

impl SessionRecord {
    /// Builds the record a creator writes when opening a room.
    ///
    /// The board stays empty until the creator picks a game type.
    pub fn new(
        room_code: RoomCode,
        creator: Username,
        participant: ParticipantId,
    ) -> Self {
        Self {
            room_code,
            participants: Participants {
                creator: Some(creator),
                joiner: None,
            },
            game_type: None,
            board: Vec::new(),
            active_region: Vec::new(),
            move_count: 0,
            move_history: Vec::new(),
            current_turn: Seat::Creator,
            winner: None,
            winning_line: Vec::new(),
            last_updated_by: Some(participant),
            version: 0,
        }
    }

    /// `true` once a winner (or draw) has been recorded.
    pub fn is_terminal(&self) -> bool {
        self.winner.is_some()
    }

    /// Copies every slot that is still unset here from `other`.
    ///
    /// Covers the fields that only ever go from "absent" to "present":
    /// usernames, game type, the initial board, and the outcome. Used to
    /// fall back to an older snapshot for fields a newer one hasn't
    /// populated yet.
    pub fn fill_missing_from(&mut self, other: &SessionRecord) {
        if self.participants.creator.is_none() {
            self.participants.creator = other.participants.creator.clone();
        }
        if self.participants.joiner.is_none() {
            self.participants.joiner = other.participants.joiner.clone();
        }
        if self.game_type.is_none() {
            self.game_type = other.game_type;
        }
        if self.board.is_empty() && !other.board.is_empty() {
            self.board = other.board.clone();
            self.active_region = other.active_region.clone();
        }
        if self.winner.is_none() && other.winner.is_some() {
            self.winner = other.winner;
            self.winning_line = other.winning_line.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelFrame: what the update relay speaks
// ---------------------------------------------------------------------------

/// Frames exchanged between an update relay and its subscribers.
///
/// Internally tagged, so a frame looks like
/// `{ "type": "Subscribe", "roomCode": "AB12C3" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChannelFrame {
    /// Subscriber → relay: "send me updates for this room". Must be the
    /// first frame on a connection.
    Subscribe {
        #[serde(rename = "roomCode")]
        room_code: RoomCode,
    },

    /// Relay → subscriber: the subscription is registered; every update
    /// published from now on will be delivered.
    Subscribed {
        #[serde(rename = "roomCode")]
        room_code: RoomCode,
    },

    /// Relay → subscriber: a record was updated.
    Update { record: SessionRecord },
}
