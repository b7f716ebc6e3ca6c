use crate::{agent::Agent, agent_provider::AgentProvider};
use figment::Figment;
use kalah_core::{
    board::{Board, Side},
    protocol::Move,
};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::Deserialize;
use std::error::Error;

/// Plays a uniformly random non-empty hole and never swaps.
#[derive(Debug)]
pub struct RandomAgent<R = StdRng> {
    rng: R,
}

impl<R> RandomAgent<R>
where
    R: Rng,
{
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R> Agent for RandomAgent<R>
where
    R: Rng,
{
    fn next_move(
        &mut self,
        board: &Board,
        side: Side,
        _can_swap: bool,
    ) -> Result<Move, Box<dyn Error + Send + Sync>> {
        let legal_moves = board.legal_moves(side);
        let hole = legal_moves
            .choose(&mut self.rng)
            .copied()
            .ok_or("no legal moves")?;
        Ok(Move::Hole(hole))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RandomOptions {
    seed: Option<u64>,
}

pub struct RandomProvider;

impl AgentProvider for RandomProvider {
    fn name(&self) -> String {
        "random".to_owned()
    }

    fn create_agent(
        &self,
        options: &Figment,
    ) -> Result<Box<dyn Agent>, Box<dyn Error + Send + Sync>> {
        let options: RandomOptions = options.extract()?;
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Box::new(RandomAgent::new(rng)))
    }
}
