//! The client flow as an immutable reducer.
//!
//! Everything a client learns, from user input to gateway results to
//! channel updates, arrives as a [`FlowEvent`]. [`FlowState::apply`]
//! consumes the old state and returns the new one; nothing else mutates it.
//! The phase is derived from the result on demand.

use fourline_protocol::{GameType, ParticipantId, Seat, SessionRecord, Username};

use crate::lifecycle::{CreatedCode, LifecycleInputs, Mode, Phase, derive_phase};
use crate::reconciler::{DropReason, Reconciled, reconcile};
use crate::{FlowError, LocalSessionView};

/// Everything that can happen to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    UsernameEntered(Username),
    ModeChosen(Mode),
    SinglePlayerGameChosen(GameType),
    CreateChosen,
    JoinChosen,
    /// A create or join call was sent.
    RequestStarted,
    /// A create or join call succeeded.
    SessionEstablished {
        record: SessionRecord,
        participant: ParticipantId,
        seat: Seat,
    },
    /// An optimistic write, before the gateway answers.
    LocalWrite(SessionRecord),
    /// The gateway stored a write.
    WriteConfirmed(SessionRecord),
    /// The gateway rejected a write. The optimistic slot is dropped.
    WriteFailed(FlowError),
    /// A record arrived on the update channel.
    RemoteUpdate(SessionRecord),
    /// A gateway or channel call failed.
    Failed(FlowError),
    /// Clears the sticky error.
    Retry,
    /// Leaves the session. The username is kept.
    Reset,
}

/// The state of one client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowState {
    pub username: Option<Username>,
    pub mode: Option<Mode>,
    pub created_code: CreatedCode,
    pub awaiting_remote: bool,
    pub single_player_game: Option<GameType>,
    pub view: Option<LocalSessionView>,
    /// Sticky until [`FlowEvent::Retry`].
    pub error: Option<FlowError>,
}

impl FlowState {
    /// Returns the state after `event`.
    pub fn apply(mut self, event: FlowEvent) -> Self {
        match event {
            FlowEvent::UsernameEntered(username) => {
                self.username = Some(username);
            }
            FlowEvent::ModeChosen(mode) => {
                self.mode = Some(mode);
            }
            FlowEvent::SinglePlayerGameChosen(game_type) => {
                self.single_player_game = Some(game_type);
            }
            FlowEvent::CreateChosen => {
                self.created_code = CreatedCode::Created;
            }
            FlowEvent::JoinChosen => {
                self.created_code = CreatedCode::Joined;
            }
            FlowEvent::RequestStarted => {
                self.awaiting_remote = true;
            }
            FlowEvent::SessionEstablished {
                record,
                participant,
                seat,
            } => {
                self.awaiting_remote = false;
                self.created_code = match seat {
                    Seat::Creator => CreatedCode::Created,
                    Seat::Joiner => CreatedCode::Joined,
                };
                self.view = Some(LocalSessionView::new(record, participant, seat));
            }
            FlowEvent::LocalWrite(record) => {
                self.update_view(record, LocalSessionView::with_local);
            }
            FlowEvent::WriteConfirmed(record) => {
                self.update_view(record, LocalSessionView::with_confirmed);
            }
            FlowEvent::WriteFailed(error) => {
                self.view = self.view.take().map(LocalSessionView::without_local);
                self.error = Some(error);
            }
            FlowEvent::RemoteUpdate(record) => {
                self.view = match self.view.take() {
                    Some(view) => Some(accept_remote(view, record)),
                    None => {
                        tracing::debug!(
                            room_code = %record.room_code,
                            "update without a session, dropped"
                        );
                        None
                    }
                };
            }
            FlowEvent::Failed(error) => {
                self.awaiting_remote = false;
                self.error = Some(error);
            }
            FlowEvent::Retry => {
                self.error = None;
                // A failed create has nothing to go back to but the choice.
                if self.view.is_none() && self.created_code == CreatedCode::Created {
                    self.created_code = CreatedCode::Unknown;
                }
            }
            FlowEvent::Reset => {
                self = Self {
                    username: self.username,
                    ..Self::default()
                };
            }
        }
        self
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        derive_phase(&self.inputs())
    }

    /// The facts [`phase`](Self::phase) is derived from.
    pub fn inputs(&self) -> LifecycleInputs {
        let effective = self.view.as_ref().map(LocalSessionView::effective);
        let has_game_type = match self.mode {
            Some(Mode::SinglePlayer) => self.single_player_game.is_some(),
            _ => effective.as_ref().is_some_and(|r| r.game_type.is_some()),
        };
        LifecycleInputs {
            has_username: self.username.is_some(),
            mode: self.mode,
            created_code: self.created_code,
            awaiting_remote: self.awaiting_remote,
            has_record: effective.is_some(),
            both_present: effective
                .as_ref()
                .is_some_and(|r| r.participants.both_present()),
            has_game_type,
            has_moves: effective.as_ref().is_some_and(|r| r.move_count > 0),
            has_winner: effective.as_ref().is_some_and(SessionRecord::is_terminal),
            has_error: self.error.is_some(),
        }
    }

    /// The record the user sees, if a session is held.
    pub fn effective(&self) -> Option<SessionRecord> {
        self.view.as_ref().map(LocalSessionView::effective)
    }

    /// The creator's locally held game type choice, ready to be written now
    /// that a partner is present.
    ///
    /// Returns the effective record to build the write from, or `None` if
    /// there is nothing to flush: not the creator, no local choice, the
    /// choice is already stored, or still nobody has joined.
    pub fn pending_game_type(&self) -> Option<SessionRecord> {
        let view = self.view.as_ref()?;
        if view.seat != Seat::Creator {
            return None;
        }
        view.local.as_ref()?.game_type?;
        let stored = view.initial.game_type.is_some()
            || view.remote.as_ref().is_some_and(|r| r.game_type.is_some());
        if stored {
            return None;
        }
        let effective = view.effective();
        effective.participants.both_present().then_some(effective)
    }

    /// Applies one of our own writes to the view, if it is for our room.
    fn update_view(
        &mut self,
        record: SessionRecord,
        f: impl FnOnce(LocalSessionView, SessionRecord) -> LocalSessionView,
    ) {
        let Some(view) = self.view.take() else {
            return;
        };
        self.view = Some(if view.room_code == record.room_code {
            f(view, record)
        } else {
            tracing::warn!(
                room_code = %view.room_code,
                received = %record.room_code,
                "write for another room ignored"
            );
            view
        });
    }
}

fn accept_remote(view: LocalSessionView, record: SessionRecord) -> LocalSessionView {
    let version = record.version;
    match reconcile(&view, record) {
        Reconciled::Accepted(accepted) => {
            tracing::debug!(room_code = %accepted.room_code, version, "remote update accepted");
            accepted
        }
        Reconciled::Dropped(DropReason::Echo) => {
            tracing::debug!(room_code = %view.room_code, version, "echo of own write dropped");
            view
        }
        Reconciled::Dropped(DropReason::MismatchedRoom) => {
            tracing::warn!(room_code = %view.room_code, version, "update for another room dropped");
            view
        }
    }
}
