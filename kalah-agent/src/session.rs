//! Plays one match against the game server over a line-oriented reader/writer pair.

use crate::agent::Agent;
use figment::Figment;
use kalah_core::{
    board::{Board, Side},
    protocol::{
        create_move_msg, create_swap_msg, interpret_start_msg, interpret_state_msg, message_type,
        MessageType, Move, ProtocolError,
    },
};
use serde::Deserialize;
use std::{
    error::Error,
    io::{BufRead, Write},
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameOptions {
    pub holes: usize,
    pub seeds: u32,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self { holes: 7, seeds: 7 }
    }
}

impl GameOptions {
    /// Reads the `[game]` section, falling back to defaults when it is absent.
    pub fn extract(figment: &Figment) -> Result<Self, figment::Error> {
        #[derive(Default, Deserialize)]
        #[serde(default)]
        struct Root {
            game: GameOptions,
        }

        Ok(figment.extract::<Root>()?.game)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("agent error: {0}")]
    Agent(Box<dyn Error + Send + Sync>),
    #[error("state message received before the start message")]
    NotStarted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Side we ended up playing, after any swap.
    pub side: Option<Side>,
    pub board: Board,
    pub moves_sent: usize,
    pub finished: bool,
}

pub struct Session<'a, W> {
    agent: &'a mut dyn Agent,
    output: W,
    board: Board,
    side: Option<Side>,
    can_swap: bool,
    sent_swap: bool,
    moves_sent: usize,
    finished: bool,
}

impl<'a, W> Session<'a, W>
where
    W: Write,
{
    pub fn new(agent: &'a mut dyn Agent, options: GameOptions, output: W) -> Self {
        Self {
            agent,
            output,
            board: Board::new(options.holes, options.seeds),
            side: None,
            can_swap: false,
            sent_swap: false,
            moves_sent: 0,
            finished: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    /// Handles one message, newline included. Returns `false` once the server ended the match.
    pub fn handle(&mut self, message: &str) -> Result<bool, SessionError> {
        match message_type(message)? {
            MessageType::Start => {
                let side = interpret_start_msg(message)?;
                info!(side = side.name(), "match started");

                self.side = Some(side);
                // only the second player may swap, on its first turn
                self.can_swap = side == Side::North;

                if side == Side::South {
                    self.play(side)?;
                }
            }
            MessageType::State => {
                let mut side = self.side.ok_or(SessionError::NotStarted)?;
                let turn = interpret_state_msg(message, &mut self.board)?;

                debug!(
                    last_move = ?turn.last_move,
                    again = turn.again,
                    end = turn.end,
                    "state changed"
                );

                if turn.last_move == Move::Swap {
                    if self.sent_swap {
                        self.sent_swap = false;
                    } else {
                        side = side.opposite();
                        self.side = Some(side);
                        info!(side = side.name(), "opponent swapped sides");
                    }
                }

                if turn.end {
                    self.finish(side)?;
                } else if turn.again {
                    self.play(side)?;
                }
            }
            MessageType::End => {
                if let Some(side) = self.side {
                    self.finish(side)?;
                }

                return Ok(false);
            }
        }

        Ok(true)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            side: self.side,
            board: self.board.clone(),
            moves_sent: self.moves_sent,
            finished: self.finished,
        }
    }

    fn play(&mut self, side: Side) -> Result<(), SessionError> {
        let mv = self
            .agent
            .next_move(&self.board, side, self.can_swap)
            .map_err(SessionError::Agent)?;
        self.can_swap = false;

        let message = match mv {
            Move::Swap => {
                self.sent_swap = true;
                self.side = Some(side.opposite());
                create_swap_msg()
            }
            Move::Hole(hole) => create_move_msg(hole),
        };

        debug!(message = message.trim_end(), "sending move");

        self.output.write_all(message.as_bytes())?;
        self.output.flush()?;
        self.moves_sent += 1;

        Ok(())
    }

    fn finish(&mut self, side: Side) -> Result<(), SessionError> {
        if self.finished {
            return Ok(());
        }

        self.finished = true;
        self.agent
            .game_over(&self.board, side)
            .map_err(SessionError::Agent)?;

        info!(
            side = side.name(),
            own_store = self.board.store(side),
            opponent_store = self.board.store(side.opposite()),
            "match over"
        );

        Ok(())
    }
}

/// Reads messages from `input` until the server ends the match or the input closes.
pub fn run_session<R, W>(
    agent: &mut dyn Agent,
    options: GameOptions,
    input: R,
    output: W,
) -> Result<SessionSummary, SessionError>
where
    R: BufRead,
    W: Write,
{
    let mut session = Session::new(agent, options, output);

    for line in input.lines() {
        let line = line?;
        let line = line.trim_end();

        if line.is_empty() {
            continue;
        }

        let message = format!("{line}\n");

        if !session.handle(&message)? {
            break;
        }
    }

    Ok(session.summary())
}
