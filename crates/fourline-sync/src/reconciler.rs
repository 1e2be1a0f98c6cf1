//! Merging incoming channel updates into a [`LocalSessionView`].
//!
//! Three rules, in order:
//!
//! 1. an update for another room is dropped,
//! 2. an update this client wrote itself (an echo) is dropped,
//! 3. anything else replaces the remote snapshot wholesale.
//!
//! Accepting does not compare versions. The store is last-write-wins and so
//! is the remote slot; [`LocalSessionView::effective`] is what keeps an
//! older snapshot from hiding a newer one.

use fourline_protocol::SessionRecord;

use crate::LocalSessionView;

/// Why an update was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MismatchedRoom,
    Echo,
}

/// The outcome of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    Accepted(LocalSessionView),
    Dropped(DropReason),
}

/// Applies `incoming` to `view`. Pure; `view` itself is never changed.
pub fn reconcile(view: &LocalSessionView, incoming: SessionRecord) -> Reconciled {
    if incoming.room_code != view.room_code {
        return Reconciled::Dropped(DropReason::MismatchedRoom);
    }
    if view.is_echo(&incoming) {
        return Reconciled::Dropped(DropReason::Echo);
    }
    let mut accepted = view.clone();
    accepted.remote = Some(incoming);
    Reconciled::Accepted(accepted)
}

#[cfg(test)]
mod tests {
    use fourline_protocol::{ParticipantId, RoomCode, Seat, Username};

    use super::*;

    fn view() -> LocalSessionView {
        let record = SessionRecord::new(
            RoomCode::parse("AB12C3").unwrap(),
            Username::parse("alice").unwrap(),
            ParticipantId::new("userA"),
        );
        LocalSessionView::new(record, ParticipantId::new("userA"), Seat::Creator)
    }

    fn update(code: &str, by: &str, version: u64) -> SessionRecord {
        let mut record = SessionRecord::new(
            RoomCode::parse(code).unwrap(),
            Username::parse("alice").unwrap(),
            ParticipantId::new(by),
        );
        record.participants.joiner = Some(Username::parse("bob").unwrap());
        record.version = version;
        record
    }

    #[test]
    fn test_reconcile_other_room_is_dropped() {
        assert_eq!(
            reconcile(&view(), update("ZZZZZZ", "userB", 2)),
            Reconciled::Dropped(DropReason::MismatchedRoom)
        );
    }

    #[test]
    fn test_reconcile_room_check_runs_before_echo_check() {
        assert_eq!(
            reconcile(&view(), update("ZZZZZZ", "userA", 2)),
            Reconciled::Dropped(DropReason::MismatchedRoom)
        );
    }

    #[test]
    fn test_reconcile_own_write_is_echo() {
        assert_eq!(
            reconcile(&view(), update("AB12C3", "userA", 2)),
            Reconciled::Dropped(DropReason::Echo)
        );
    }

    #[test]
    fn test_reconcile_other_writer_replaces_remote() {
        let incoming = update("AB12C3", "userB", 2);
        let Reconciled::Accepted(view) = reconcile(&view(), incoming.clone()) else {
            panic!("expected the update to be accepted");
        };
        assert_eq!(view.remote, Some(incoming));
    }

    #[test]
    fn test_reconcile_accepts_older_version() {
        let mut current = view();
        current.remote = Some(update("AB12C3", "userB", 4));

        let older = update("AB12C3", "userB", 3);
        let Reconciled::Accepted(view) = reconcile(&current, older.clone()) else {
            panic!("expected the update to be accepted");
        };
        assert_eq!(view.remote, Some(older));
    }
}
