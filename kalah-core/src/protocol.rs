//! Line-oriented message format spoken with the Kalah game server.
//!
//! Server to engine:
//! - `START;North` / `START;South`
//! - `CHANGE;<move>;<board>;<turn>` where `<move>` is a hole number or `SWAP`, `<board>` lists
//!   North holes, North store, South holes, South store, and `<turn>` is `YOU`, `OPP` or `END`
//! - `END`
//!
//! Engine to server: `MOVE;<hole>` and `SWAP`.

use crate::board::{Board, Side};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Start,
    State,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Swap,
    Hole(usize),
}

/// Outcome of a `CHANGE` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveTurn {
    /// The move that was just played, by either side.
    pub last_move: Move,
    /// The match is over.
    pub end: bool,
    /// It is our turn to move.
    pub again: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown message type: {0:?}")]
    UnknownMessage(String),
    #[error("malformed {kind} message: {message:?}")]
    Malformed { kind: &'static str, message: String },
    #[error("invalid number {value:?}")]
    InvalidNumber { value: String },
    #[error("board has {actual} fields, expected {expected}")]
    BoardSize { expected: usize, actual: usize },
}

pub fn message_type(message: &str) -> Result<MessageType, ProtocolError> {
    if message.starts_with("START;") {
        Ok(MessageType::Start)
    } else if message.starts_with("CHANGE;") {
        Ok(MessageType::State)
    } else if message.trim_end() == "END" {
        Ok(MessageType::End)
    } else {
        Err(ProtocolError::UnknownMessage(message.to_owned()))
    }
}

pub fn create_move_msg(hole: usize) -> String {
    format!("MOVE;{hole}\n")
}

pub fn create_swap_msg() -> String {
    "SWAP\n".to_owned()
}

/// Returns the side the engine plays. South moves first.
pub fn interpret_start_msg(message: &str) -> Result<Side, ProtocolError> {
    let malformed = || ProtocolError::Malformed {
        kind: "start",
        message: message.to_owned(),
    };

    let side = message
        .strip_suffix('\n')
        .ok_or_else(malformed)?
        .strip_prefix("START;")
        .ok_or_else(malformed)?;

    match side {
        "North" => Ok(Side::North),
        "South" => Ok(Side::South),
        _ => Err(malformed()),
    }
}

/// Parses a `CHANGE` message and writes the transmitted position into `board`.
///
/// `board` is only modified once the whole message has been validated.
pub fn interpret_state_msg(message: &str, board: &mut Board) -> Result<MoveTurn, ProtocolError> {
    let malformed = || ProtocolError::Malformed {
        kind: "state",
        message: message.to_owned(),
    };

    let body = message
        .strip_suffix('\n')
        .ok_or_else(malformed)?
        .strip_prefix("CHANGE;")
        .ok_or_else(malformed)?;

    let parts = body.split(';').collect::<Vec<_>>();
    let [mv, cells, turn] = parts[..] else {
        return Err(malformed());
    };

    let last_move = match mv {
        "SWAP" => Move::Swap,
        hole => Move::Hole(parse_number(hole)? as usize),
    };

    let holes = board.holes();
    let cells = cells
        .split(',')
        .map(parse_number)
        .collect::<Result<Vec<_>, _>>()?;

    if cells.len() != 2 * (holes + 1) {
        return Err(ProtocolError::BoardSize {
            expected: 2 * (holes + 1),
            actual: cells.len(),
        });
    }

    let (end, again) = match turn {
        "YOU" => (false, true),
        "OPP" => (false, false),
        "END" => (true, false),
        _ => return Err(malformed()),
    };

    for (offset, side) in [(0, Side::North), (holes + 1, Side::South)] {
        for hole in 1..=holes {
            board.set_seeds(side, hole, cells[offset + hole - 1]);
        }
        board.set_store(side, cells[offset + holes]);
    }

    Ok(MoveTurn {
        last_move,
        end,
        again,
    })
}

fn parse_number(value: &str) -> Result<u32, ProtocolError> {
    value.parse().map_err(|_| ProtocolError::InvalidNumber {
        value: value.to_owned(),
    })
}
