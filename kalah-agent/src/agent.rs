use kalah_core::{
    board::{Board, Side},
    protocol::Move,
};
use std::error::Error;

pub trait Agent {
    /// Chooses a move for `side` on `board`. `can_swap` is only set on the one turn where the
    /// second player may take over the first player's position.
    fn next_move(
        &mut self,
        board: &Board,
        side: Side,
        can_swap: bool,
    ) -> Result<Move, Box<dyn Error + Send + Sync>>;

    /// Called once with the final position when the match ends.
    fn game_over(&mut self, board: &Board, side: Side) -> Result<(), Box<dyn Error + Send + Sync>> {
        let _ = (board, side);
        Ok(())
    }
}
