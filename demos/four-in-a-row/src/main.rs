use std::time::Duration;

use fourline::fourline_channel::RelayHandle;
use fourline::prelude::*;

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

const COLS: usize = 7;
const ROWS: usize = 6;
const LINE: usize = 4;

/// Cells are numbered `row * COLS + col`, row 0 at the bottom.
fn cell(row: usize, col: usize) -> usize {
    row * COLS + col
}

/// The cell a disc dropped into `col` lands on, if the column has room.
fn landing(board: &[Option<Seat>], col: usize) -> Option<usize> {
    (0..ROWS).map(|row| cell(row, col)).find(|&i| board[i].is_none())
}

fn playable(board: &[Option<Seat>]) -> Vec<usize> {
    (0..COLS).filter_map(|col| landing(board, col)).collect()
}

/// The four-long line through `at` held by `seat`, if there is one.
fn line_through(board: &[Option<Seat>], at: usize, seat: Seat) -> Option<Vec<usize>> {
    let (row, col) = ((at / COLS) as isize, (at % COLS) as isize);
    let held = |r: isize, c: isize| {
        (0..ROWS as isize).contains(&r)
            && (0..COLS as isize).contains(&c)
            && board[cell(r as usize, c as usize)] == Some(seat)
    };

    for (dr, dc) in [(0, 1), (1, 0), (1, 1), (1, -1)] {
        let mut line = vec![at];
        for sign in [-1, 1] {
            let (mut r, mut c) = (row + sign * dr, col + sign * dc);
            while held(r, c) {
                line.push(cell(r as usize, c as usize));
                r += sign * dr;
                c += sign * dc;
            }
        }
        if line.len() >= LINE {
            line.sort_unstable();
            return Some(line);
        }
    }
    None
}

fn render(record: &SessionRecord) -> String {
    let mut out = String::new();
    for row in (0..ROWS).rev() {
        for col in 0..COLS {
            out.push(record.board[cell(row, col)].map_or('.', Seat::mark));
            out.push(' ');
        }
        out.push('\n');
    }
    out.extend((0..COLS).map(|c| format!("{c} ")));
    out
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Seven columns, six rows, discs fall to the lowest free cell.
///
/// Every game type plays on the same board; the type only matters to the
/// question deck shown alongside it.
struct FourInARow;

impl GameRules for FourInARow {
    type Move = usize;

    fn initial_board(_game_type: GameType) -> (Vec<Option<Seat>>, Vec<usize>) {
        let board = vec![None; COLS * ROWS];
        let active = playable(&board);
        (board, active)
    }

    fn validate(record: &SessionRecord, _seat: Seat, col: &usize) -> Result<(), String> {
        if *col >= COLS {
            return Err(format!("column must be 0-{}", COLS - 1));
        }
        if record.board.len() != COLS * ROWS {
            return Err("board is not set up".into());
        }
        match landing(&record.board, *col) {
            Some(_) => Ok(()),
            None => Err(format!("column {col} is full")),
        }
    }

    fn apply(
        record: &mut SessionRecord,
        seat: Seat,
        col: usize,
    ) -> Option<(Outcome, Vec<usize>)> {
        let at = landing(&record.board, col)?;
        record.board[at] = Some(seat);
        record.move_history.push(at);
        record.active_region = playable(&record.board);

        if let Some(line) = line_through(&record.board, at, seat) {
            Some((Outcome::Won(seat), line))
        } else if record.active_region.is_empty() {
            Some((Outcome::Draw, Vec::new()))
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Demo
// ---------------------------------------------------------------------------

type Client = FourlineClient<MemoryStore<RelayHandle>, WebSocketChannel, FourInARow>;

/// Waits until `client`'s state satisfies `pred`.
async fn wait(
    client: &Client,
    pred: impl FnMut(&FlowState) -> bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rx = client.watch();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred)).await??;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fourline::telemetry::init();

    let relay = WebSocketRelay::bind("127.0.0.1:0").await?;
    let url = format!("ws://{}", relay.local_addr()?);
    let store = MemoryStore::new(relay.handle());
    tokio::spawn(relay.run());
    tracing::info!(%url, "relay listening");

    let alice: Client = FourlineClientBuilder::new()
        .build::<FourInARow, _, _>(store.clone(), WebSocketChannel::new(url.clone()));
    let bob: Client = FourlineClientBuilder::new()
        .build::<FourInARow, _, _>(store, WebSocketChannel::new(url));

    alice.enter_username("alice")?;
    alice.choose_mode(Mode::Multiplayer)?;
    let code = alice.create_session().await?.room_code;
    println!("alice created room {code}");

    // Picked before anyone joins; written once bob arrives.
    alice.choose_game_type(GameType::Addition).await?;

    bob.enter_username("bob")?;
    bob.choose_mode(Mode::Multiplayer)?;
    bob.choose_join()?;
    bob.join_session(&code.as_str().to_lowercase()).await?;
    println!("bob joined room {code}");

    wait(&bob, |s| s.phase() == Phase::GameTypeChosen).await?;
    // Alice's own write must be confirmed before she builds on it.
    wait(&alice, |s| s.view.as_ref().is_some_and(|v| v.local.is_none())).await?;

    // Alice fills the bottom row from the left; bob stacks on top.
    let script = [0, 0, 1, 1, 2, 2, 3];
    for (n, col) in script.into_iter().enumerate() {
        let (mover, other) = if n % 2 == 0 { (&alice, &bob) } else { (&bob, &alice) };
        let record = mover.make_move(col).await?;
        wait(other, |s| {
            s.effective().is_some_and(|r| r.move_count >= record.move_count)
        })
        .await?;
    }

    let record = bob.session().ok_or("bob lost the session")?;
    println!("{}", render(&record));
    match record.winner {
        Some(Outcome::Won(seat)) => {
            let name = record.participants.get(seat).map_or("?", Username::as_str);
            println!("{name} ({}) wins on {:?}", seat.mark(), record.winning_line);
        }
        Some(Outcome::Draw) => println!("draw"),
        None => println!("unfinished after {} moves", record.move_count),
    }

    alice.leave();
    bob.leave();
    Ok(())
}
