//! Integration tests for the client flow: two participants' `FlowState`s
//! driven through create, join, game type and moves, with updates passed
//! between them the way the channel would.

use fourline_protocol::{
    GameType, Outcome, ParticipantId, RoomCode, Seat, SessionRecord, Username,
};
use fourline_sync::{
    FlowError, FlowEvent, FlowState, GameRules, Mode, Phase, choose_game_type,
    play_move,
};

// =========================================================================
// Mock rules: a 2x2 grid, first to fill a row wins.
// =========================================================================

struct TinyGrid;

impl GameRules for TinyGrid {
    type Move = usize;

    fn initial_board(_game_type: GameType) -> (Vec<Option<Seat>>, Vec<usize>) {
        (vec![None; 4], vec![0, 1, 2, 3])
    }

    fn validate(record: &SessionRecord, _seat: Seat, cell: &usize) -> Result<(), String> {
        if record.active_region.contains(cell) {
            Ok(())
        } else {
            Err(format!("cell {cell} is not playable"))
        }
    }

    fn apply(
        record: &mut SessionRecord,
        seat: Seat,
        cell: usize,
    ) -> Option<(Outcome, Vec<usize>)> {
        record.board[cell] = Some(seat);
        record.move_history.push(cell);
        record.active_region.retain(|c| *c != cell);
        let row = cell / 2 * 2;
        if record.board[row] == Some(seat) && record.board[row + 1] == Some(seat) {
            Some((Outcome::Won(seat), vec![row, row + 1]))
        } else if record.active_region.is_empty() {
            Some((Outcome::Draw, Vec::new()))
        } else {
            None
        }
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn user_a() -> ParticipantId {
    ParticipantId::new("userA")
}

fn user_b() -> ParticipantId {
    ParticipantId::new("userB")
}

fn name(s: &str) -> Username {
    Username::parse(s).unwrap()
}

/// Stands in for the store: stamps the writer and bumps the version.
fn store(mut record: SessionRecord, by: &ParticipantId, prev_version: u64) -> SessionRecord {
    record.last_updated_by = Some(by.clone());
    record.version = prev_version + 1;
    record
}

/// Plays `cell` on top of `base` and stores the result.
fn stored_move(
    base: &SessionRecord,
    seat: Seat,
    cell: usize,
    by: &ParticipantId,
) -> SessionRecord {
    store(play_move::<TinyGrid>(base, seat, cell).unwrap(), by, base.version)
}

fn multiplayer(username: &str) -> FlowState {
    FlowState::default()
        .apply(FlowEvent::UsernameEntered(name(username)))
        .apply(FlowEvent::ModeChosen(Mode::Multiplayer))
}

/// Alice has created AB12C3; returns her state and the stored record.
fn alice_created() -> (FlowState, SessionRecord) {
    let mut record = SessionRecord::new(
        RoomCode::parse("AB12C3").unwrap(),
        name("alice"),
        user_a(),
    );
    record.version = 1;
    let state = multiplayer("alice")
        .apply(FlowEvent::CreateChosen)
        .apply(FlowEvent::RequestStarted)
        .apply(FlowEvent::SessionEstablished {
            record: record.clone(),
            participant: user_a(),
            seat: Seat::Creator,
        });
    (state, record)
}

/// Bob has joined; returns both states and the stored record.
fn both_joined() -> (FlowState, FlowState, SessionRecord) {
    let (alice, created) = alice_created();
    let mut joined = created.clone();
    joined.participants.joiner = Some(name("bob"));
    let joined = store(joined, &user_b(), created.version);

    let bob = multiplayer("bob")
        .apply(FlowEvent::JoinChosen)
        .apply(FlowEvent::RequestStarted)
        .apply(FlowEvent::SessionEstablished {
            record: joined.clone(),
            participant: user_b(),
            seat: Seat::Joiner,
        });
    let alice = alice.apply(FlowEvent::RemoteUpdate(joined.clone()));
    (alice, bob, joined)
}

/// Alice picked a game type and both sides saw it.
fn game_started() -> (FlowState, FlowState, SessionRecord) {
    let (alice, bob, joined) = both_joined();
    let chosen = choose_game_type::<TinyGrid>(&joined, GameType::Addition);
    let stored = store(chosen.clone(), &user_a(), joined.version);

    let alice = alice
        .apply(FlowEvent::LocalWrite(chosen))
        .apply(FlowEvent::WriteConfirmed(stored.clone()))
        .apply(FlowEvent::RemoteUpdate(stored.clone()));
    let bob = bob.apply(FlowEvent::RemoteUpdate(stored.clone()));
    (alice, bob, stored)
}

// =========================================================================
// Lifecycle
// =========================================================================

#[test]
fn test_flow_reaches_choosing_create_or_join() {
    let state = FlowState::default();
    assert_eq!(state.phase(), Phase::NoUsername);

    let state = state.apply(FlowEvent::UsernameEntered(name("alice")));
    assert_eq!(state.phase(), Phase::ChoosingMode);

    let state = state.apply(FlowEvent::ModeChosen(Mode::Multiplayer));
    assert_eq!(state.phase(), Phase::ChoosingCreateOrJoin);
}

#[test]
fn test_single_player_branch() {
    let state = FlowState::default()
        .apply(FlowEvent::UsernameEntered(name("alice")))
        .apply(FlowEvent::ModeChosen(Mode::SinglePlayer));
    assert_eq!(state.phase(), Phase::PickingSinglePlayerGame);

    let state = state.apply(FlowEvent::SinglePlayerGameChosen(GameType::Algebra));
    assert_eq!(state.phase(), Phase::SinglePlayer);
}

#[test]
fn test_creator_sees_established_then_game_type_chosen() {
    let (alice, _) = alice_created();
    assert_eq!(alice.phase(), Phase::SessionEstablished);

    let (alice, bob, _) = game_started();
    assert_eq!(alice.phase(), Phase::GameTypeChosen);
    assert_eq!(bob.phase(), Phase::GameTypeChosen);
}

#[test]
fn test_joiner_waits_in_session_established_for_game_type() {
    let (_, bob, _) = both_joined();
    assert_eq!(bob.phase(), Phase::SessionEstablished);
}

#[test]
fn test_early_game_type_waits_for_partner_then_flushes() {
    let (alice, created) = alice_created();
    let chosen = choose_game_type::<TinyGrid>(&created, GameType::Multiplication);
    let alice = alice.apply(FlowEvent::LocalWrite(chosen));
    assert_eq!(alice.phase(), Phase::AwaitingPartner);
    assert!(alice.pending_game_type().is_none());

    let mut joined = created.clone();
    joined.participants.joiner = Some(name("bob"));
    let joined = store(joined, &user_b(), created.version);
    let alice = alice.apply(FlowEvent::RemoteUpdate(joined));

    let pending = alice.pending_game_type().expect("choice ready to write");
    assert_eq!(pending.game_type, Some(GameType::Multiplication));
    assert!(pending.participants.both_present());
    assert_eq!(pending.board.len(), 4);

    // Once stored, nothing is pending any more.
    let stored = store(pending.clone(), &user_a(), pending.version);
    let alice = alice.apply(FlowEvent::WriteConfirmed(stored));
    assert!(alice.pending_game_type().is_none());
    assert_eq!(alice.phase(), Phase::GameTypeChosen);
}

#[test]
fn test_flow_reaches_terminal() {
    let (alice, bob, started) = game_started();

    let a1 = stored_move(&started, Seat::Creator, 0, &user_a());
    let alice = alice.apply(FlowEvent::WriteConfirmed(a1.clone()));
    let bob = bob.apply(FlowEvent::RemoteUpdate(a1.clone()));
    assert_eq!(alice.phase(), Phase::InProgress);

    let b1 = stored_move(&a1, Seat::Joiner, 2, &user_b());
    let bob = bob.apply(FlowEvent::WriteConfirmed(b1.clone()));
    let alice = alice.apply(FlowEvent::RemoteUpdate(b1.clone()));

    let a2 = stored_move(&b1, Seat::Creator, 1, &user_a());
    let alice = alice.apply(FlowEvent::WriteConfirmed(a2.clone()));
    let bob = bob.apply(FlowEvent::RemoteUpdate(a2));

    assert_eq!(alice.phase(), Phase::Terminal);
    assert_eq!(bob.phase(), Phase::Terminal);
    assert_eq!(
        bob.effective().unwrap().winner,
        Some(Outcome::Won(Seat::Creator))
    );
}

// =========================================================================
// Reconciliation properties
// =========================================================================

#[test]
fn test_echo_leaves_remote_unchanged_for_any_content() {
    let (alice, _, started) = game_started();
    let before = alice.view.clone().unwrap();

    let mut echoes = Vec::new();
    for cell in 0..4 {
        let mut record = play_move::<TinyGrid>(&started, Seat::Creator, cell).unwrap();
        record.last_updated_by = Some(user_a());
        echoes.push(record);
    }
    let mut wild = started.clone();
    wild.version = 999;
    wild.winner = Some(Outcome::Draw);
    wild.last_updated_by = Some(user_a());
    echoes.push(wild);

    let mut state = alice;
    for echo in echoes {
        state = state.apply(FlowEvent::RemoteUpdate(echo));
        assert_eq!(state.view.as_ref().unwrap().remote, before.remote);
    }
}

#[test]
fn test_mismatched_room_never_mutates_view() {
    let (_, bob, started) = game_started();
    let before = bob.clone();

    let mut other = started.clone();
    other.room_code = RoomCode::parse("ZZZZZZ").unwrap();
    other.last_updated_by = Some(user_a());
    other.version = 50;

    let after = bob.apply(FlowEvent::RemoteUpdate(other.clone()));
    assert_eq!(after, before);

    // Our own writes for another room are ignored too.
    let after = after.apply(FlowEvent::LocalWrite(other));
    assert_eq!(after, before);
}

#[test]
fn test_last_write_wins_for_sequential_updates() {
    let (_, bob, started) = game_started();

    let first = stored_move(&started, Seat::Creator, 0, &user_a());
    let mut second = first.clone();
    second.board[3] = Some(Seat::Creator);
    second.move_history.push(3);
    second.version = first.version + 1;

    let bob = bob
        .apply(FlowEvent::RemoteUpdate(first))
        .apply(FlowEvent::RemoteUpdate(second.clone()));
    let view = bob.view.unwrap();
    assert_eq!(view.remote.as_ref(), Some(&second));
    assert_eq!(view.effective(), second);
}

#[test]
fn test_same_events_give_same_state_and_phase() {
    let run = || {
        let (alice, bob, started) = game_started();
        let a1 = stored_move(&started, Seat::Creator, 0, &user_a());
        (
            alice.apply(FlowEvent::WriteConfirmed(a1.clone())),
            bob.apply(FlowEvent::RemoteUpdate(a1)),
        )
    };
    let (alice1, bob1) = run();
    let (alice2, bob2) = run();
    assert_eq!(alice1, alice2);
    assert_eq!(bob1, bob2);
    assert_eq!(alice1.phase(), alice2.phase());
}

#[test]
fn test_move_echo_dropped_for_writer_accepted_by_partner() {
    let (alice, bob, started) = game_started();

    // A plays cell 0; the store stamps it with userA.
    let local = play_move::<TinyGrid>(&started, Seat::Creator, 0).unwrap();
    let stored = store(local.clone(), &user_a(), started.version);
    assert_eq!(stored.last_updated_by, Some(user_a()));

    let alice = alice
        .apply(FlowEvent::LocalWrite(local))
        .apply(FlowEvent::WriteConfirmed(stored.clone()));
    let alice_before_echo = alice.clone();
    let alice = alice.apply(FlowEvent::RemoteUpdate(stored.clone()));
    assert_eq!(alice, alice_before_echo);

    let bob = bob.apply(FlowEvent::RemoteUpdate(stored));
    let seen = bob.effective().unwrap();
    assert_eq!(seen.board[0], Some(Seat::Creator));
    assert_eq!(seen.current_turn, Seat::Joiner);
    assert_eq!(bob.phase(), Phase::InProgress);
}

// =========================================================================
// Errors
// =========================================================================

#[test]
fn test_error_is_sticky_until_retry() {
    let (alice, _, _) = game_started();
    let alice = alice.apply(FlowEvent::Failed(FlowError::Channel("closed".into())));
    assert_eq!(alice.phase(), Phase::Error);

    // Game state is kept underneath the error.
    assert!(alice.effective().unwrap().game_type.is_some());

    let alice = alice.apply(FlowEvent::UsernameEntered(name("alice")));
    assert_eq!(alice.phase(), Phase::Error);

    let alice = alice.apply(FlowEvent::Retry);
    assert_eq!(alice.phase(), Phase::GameTypeChosen);
}

#[test]
fn test_failed_join_returns_to_entering_code() {
    let bob = multiplayer("bob")
        .apply(FlowEvent::JoinChosen)
        .apply(FlowEvent::RequestStarted);
    assert_eq!(bob.phase(), Phase::AwaitingRemoteResult);

    let bob = bob.apply(FlowEvent::Failed(FlowError::NotFound));
    assert_eq!(bob.phase(), Phase::Error);
    assert_eq!(bob.error.as_ref().unwrap().to_string(), "enter a valid code");

    let bob = bob.apply(FlowEvent::Retry);
    assert_eq!(bob.phase(), Phase::EnteringCode);
}

#[test]
fn test_failed_create_returns_to_choice() {
    let alice = multiplayer("alice")
        .apply(FlowEvent::CreateChosen)
        .apply(FlowEvent::RequestStarted)
        .apply(FlowEvent::Failed(FlowError::CreateCollision))
        .apply(FlowEvent::Retry);
    assert_eq!(alice.phase(), Phase::ChoosingCreateOrJoin);
}

#[test]
fn test_rejected_write_rolls_back_optimistic_move() {
    let (alice, _, started) = game_started();
    let local = play_move::<TinyGrid>(&started, Seat::Creator, 0).unwrap();

    let alice = alice.apply(FlowEvent::LocalWrite(local));
    assert_eq!(alice.phase(), Phase::InProgress);

    let alice = alice.apply(FlowEvent::WriteFailed(FlowError::Conflict("stale".into())));
    assert_eq!(alice.effective().unwrap().move_count, 0);

    let alice = alice.apply(FlowEvent::Retry);
    assert_eq!(alice.phase(), Phase::GameTypeChosen);
}

#[test]
fn test_reset_keeps_username_only() {
    let (alice, _, _) = game_started();
    let alice = alice.apply(FlowEvent::Reset);
    assert_eq!(alice.phase(), Phase::ChoosingMode);
    assert!(alice.view.is_none());
    assert_eq!(alice.username, Some(name("alice")));
}

#[test]
fn test_phase_serializes_as_name() {
    let json = serde_json::to_string(&Phase::AwaitingPartner).unwrap();
    assert_eq!(json, "\"AwaitingPartner\"");
}
