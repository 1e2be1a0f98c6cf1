//! Shared data model for Fourline.
//!
//! This crate defines what the two clients and the backend agree on:
//!
//! - **Types** ([`SessionRecord`], [`RoomCode`], [`ParticipantId`], etc.):
//!   the authoritative per-room record and the identifiers that address it.
//! - **Code generation** ([`generate_code`]): short random identifiers for
//!   rooms and participants.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how records and channel
//!   frames are turned into bytes for the update relay.
//! - **Errors** ([`ProtocolError`]): encoding failures and malformed input.
//!
//! # Architecture
//!
//! The protocol layer is the leaf of the workspace. It knows nothing about
//! storage, subscriptions or phases. Only the shape of the data.
//!
//! ```text
//! Gateway / Channel (move records around) → Protocol (what a record is)
//! ```

mod code;
mod codec;
mod error;
mod types;

pub use code::{ROOM_CODE_ALPHABET, generate_code};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ChannelFrame, GameType, Outcome, PARTICIPANT_ID_LEN, ParticipantId,
    Participants, ROOM_CODE_LEN, RoomCode, Seat, SessionRecord,
    USERNAME_MAX_LEN, Username,
};
