//! The per-client projection of a session.
//!
//! A client holds up to three snapshots of the same record:
//!
//! - `initial`: what its own gateway calls returned (create, join, and
//!   confirmed writes),
//! - `local`: an optimistic write not yet confirmed,
//! - `remote`: the last update accepted from the channel.
//!
//! [`LocalSessionView::effective`] merges them into what the user sees.

use fourline_protocol::{ParticipantId, RoomCode, Seat, SessionRecord};

/// A client's non-authoritative view of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSessionView {
    pub room_code: RoomCode,
    /// This client's identity, the echo-suppression key.
    pub participant: ParticipantId,
    pub seat: Seat,
    pub initial: SessionRecord,
    pub local: Option<SessionRecord>,
    pub remote: Option<SessionRecord>,
}

impl LocalSessionView {
    /// Starts a view from the record a create or join call returned.
    pub fn new(initial: SessionRecord, participant: ParticipantId, seat: Seat) -> Self {
        Self {
            room_code: initial.room_code.clone(),
            participant,
            seat,
            initial,
            local: None,
            remote: None,
        }
    }

    /// `true` if `record` was produced by this client's own write.
    pub fn is_echo(&self, record: &SessionRecord) -> bool {
        record.last_updated_by.as_ref() == Some(&self.participant)
    }

    /// The record the user sees.
    ///
    /// The snapshot with the highest version wins; on a tie `remote` beats
    /// `local` beats `initial`. Slots the winner hasn't populated yet
    /// (usernames, game type, initial board, outcome) are then filled from
    /// the other snapshots, newest first. The result depends only on the
    /// three slots, not on the order they were filled in.
    pub fn effective(&self) -> SessionRecord {
        // Tie-break order: earlier entries win.
        let mut snapshots: Vec<&SessionRecord> = [self.remote.as_ref(), self.local.as_ref()]
            .into_iter()
            .flatten()
            .chain(std::iter::once(&self.initial))
            .collect();
        // Stable sort keeps the tie-break order among equal versions.
        snapshots.sort_by(|a, b| b.version.cmp(&a.version));

        let mut merged = snapshots[0].clone();
        for older in &snapshots[1..] {
            merged.fill_missing_from(older);
        }
        merged
    }

    /// Replaces the optimistic slot.
    pub fn with_local(mut self, record: SessionRecord) -> Self {
        self.local = Some(record);
        self
    }

    /// Records a write the gateway accepted.
    ///
    /// The confirmed record becomes the new baseline and the optimistic
    /// slot is dropped once the confirmation covers it.
    pub fn with_confirmed(mut self, record: SessionRecord) -> Self {
        if self
            .local
            .as_ref()
            .is_some_and(|local| local.version <= record.version)
        {
            self.local = None;
        }
        if record.version >= self.initial.version {
            self.initial = record;
        }
        self
    }

    /// Drops the optimistic slot after a rejected write.
    pub fn without_local(mut self) -> Self {
        self.local = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use fourline_protocol::{GameType, Outcome, Username};

    use super::*;

    fn base() -> SessionRecord {
        let mut record = SessionRecord::new(
            RoomCode::parse("AB12C3").unwrap(),
            Username::parse("alice").unwrap(),
            ParticipantId::new("userA"),
        );
        record.version = 1;
        record
    }

    fn view() -> LocalSessionView {
        LocalSessionView::new(base(), ParticipantId::new("userA"), Seat::Creator)
    }

    fn joined(version: u64) -> SessionRecord {
        let mut record = base();
        record.participants.joiner = Some(Username::parse("bob").unwrap());
        record.last_updated_by = Some(ParticipantId::new("userB"));
        record.version = version;
        record
    }

    #[test]
    fn test_new_takes_room_code_from_record() {
        let view = view();
        assert_eq!(view.room_code.as_str(), "AB12C3");
        assert_eq!(view.effective(), base());
    }

    #[test]
    fn test_is_echo_matches_own_identity_only() {
        let view = view();
        assert!(view.is_echo(&base()));
        assert!(!view.is_echo(&joined(2)));

        let mut unstamped = base();
        unstamped.last_updated_by = None;
        assert!(!view.is_echo(&unstamped));
    }

    #[test]
    fn test_effective_prefers_newer_remote() {
        let mut view = view();
        view.remote = Some(joined(2));
        let effective = view.effective();
        assert_eq!(effective.version, 2);
        assert!(effective.participants.both_present());
    }

    #[test]
    fn test_effective_fills_fields_remote_lacks() {
        let mut initial = base();
        initial.game_type = Some(GameType::Addition);
        initial.board = vec![None; 4];
        let mut view = LocalSessionView::new(initial, ParticipantId::new("userA"), Seat::Creator);

        // Newer, but missing the game type and board.
        view.remote = Some(joined(2));

        let effective = view.effective();
        assert_eq!(effective.game_type, Some(GameType::Addition));
        assert_eq!(effective.board.len(), 4);
        assert_eq!(effective.participants.joiner.as_ref().unwrap().as_str(), "bob");
    }

    #[test]
    fn test_effective_tie_prefers_remote_then_fills_from_local() {
        let mut local = base();
        local.game_type = Some(GameType::Multiplication);
        local.version = 2;

        let mut view = view().with_local(local);
        view.remote = Some(joined(2));

        let effective = view.effective();
        assert_eq!(effective.last_updated_by, Some(ParticipantId::new("userB")));
        assert_eq!(effective.game_type, Some(GameType::Multiplication));
        assert!(effective.participants.both_present());
    }

    #[test]
    fn test_effective_stale_remote_does_not_regress() {
        let mut newer = joined(5);
        newer.winner = Some(Outcome::Draw);
        let mut view = view().with_confirmed(newer);
        view.remote = Some(joined(3));

        assert_eq!(view.effective().version, 5);
        assert_eq!(view.effective().winner, Some(Outcome::Draw));
    }

    #[test]
    fn test_with_confirmed_clears_covered_local() {
        let mut local = joined(3);
        local.last_updated_by = Some(ParticipantId::new("userA"));
        let view = view().with_local(local.clone()).with_confirmed(local);

        assert!(view.local.is_none());
        assert_eq!(view.initial.version, 3);
    }

    #[test]
    fn test_with_confirmed_keeps_newer_local() {
        let view = view().with_local(joined(4)).with_confirmed(joined(3));
        assert_eq!(view.local.as_ref().map(|r| r.version), Some(4));
    }

    #[test]
    fn test_without_local_drops_optimistic_write() {
        let view = view().with_local(joined(2)).without_local();
        assert!(view.local.is_none());
        assert_eq!(view.effective(), base());
    }
}
