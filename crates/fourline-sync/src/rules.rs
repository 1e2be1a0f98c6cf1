//! The `GameRules` trait, the hook for the rule engine.
//!
//! Fourline does not know how four-in-a-row is played. The rule engine
//! lives outside the sync core and plugs in through this trait; the free
//! functions below wrap it with the bookkeeping every game shares (turn
//! order, move count, outcome, version).

use fourline_protocol::{GameType, Outcome, Seat, SessionRecord};

use crate::MoveError;

/// A rule set for one family of games.
///
/// Implementations only touch the board: `apply` updates `board`,
/// `active_region` and `move_history`. Turn order, `move_count`, the
/// outcome fields and `version` are handled by [`play_move`].
pub trait GameRules: Send + Sync + 'static {
    /// One move, e.g. a column index.
    type Move: Send + Sync + Clone + std::fmt::Debug + 'static;

    /// The empty board and the cells playable on the first move.
    fn initial_board(game_type: GameType) -> (Vec<Option<Seat>>, Vec<usize>);

    /// Checks `mv` against the current record before it is applied.
    /// Default: accept everything.
    fn validate(
        _record: &SessionRecord,
        _seat: Seat,
        _mv: &Self::Move,
    ) -> Result<(), String> {
        Ok(())
    }

    /// Plays `mv` for `seat`. Returns the outcome and the winning cells if
    /// the move ended the game.
    fn apply(
        record: &mut SessionRecord,
        seat: Seat,
        mv: Self::Move,
    ) -> Option<(Outcome, Vec<usize>)>;
}

/// The record to write after `seat` plays `mv` on `current`.
///
/// The returned record has `version = current.version + 1`, the turn
/// passed to the other seat unless the game ended, and the outcome filled
/// in if it did.
///
/// # Errors
/// [`MoveError`] if no game type is set, the game is over, it isn't
/// `seat`'s turn, or the rules reject the move.
pub fn play_move<G: GameRules>(
    current: &SessionRecord,
    seat: Seat,
    mv: G::Move,
) -> Result<SessionRecord, MoveError> {
    if current.game_type.is_none() {
        return Err(MoveError::NoGameType);
    }
    if current.is_terminal() {
        return Err(MoveError::GameOver);
    }
    if current.current_turn != seat {
        return Err(MoveError::NotYourTurn);
    }
    G::validate(current, seat, &mv).map_err(MoveError::IllegalMove)?;

    let mut next = current.clone();
    let outcome = G::apply(&mut next, seat, mv);
    next.move_count += 1;
    match outcome {
        Some((outcome, line)) => {
            next.winner = Some(outcome);
            next.winning_line = line;
        }
        None => next.current_turn = seat.other(),
    }
    next.version = current.version + 1;
    Ok(next)
}

/// The record to write when the creator picks `game_type`: the choice plus
/// the rule engine's initial board, one version past `current`.
pub fn choose_game_type<G: GameRules>(
    current: &SessionRecord,
    game_type: GameType,
) -> SessionRecord {
    let (board, active_region) = G::initial_board(game_type);
    let mut next = current.clone();
    next.game_type = Some(game_type);
    next.board = board;
    next.active_region = active_region;
    next.version = current.version + 1;
    next
}
