use super::{
    model::{ModelConfig, QNetwork},
    options::KalahDqnOptions,
    trainer::{DqnTrainer, TrainOptions},
};
use crate::{
    agent::Agent,
    error::DqnError,
    exploration::EpsilonGreedyAgent,
    replay::{BoardState, Transition},
};
use kalah_core::{
    board::{Board, Side},
    protocol::Move,
};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::error::Error;
use tch::nn::VarStore;
use tracing::{debug, info};

/// The decision we are waiting to see the outcome of.
#[derive(Debug)]
struct PendingDecision {
    state: BoardState,
    action: usize,
    score_difference: i64,
    /// Side we expect to play after this move.
    side: Side,
}

/// DQN player that learns online from the positions the game server sends back.
///
/// The reward of a move is the change in store difference (own store minus opponent store)
/// until our next decision. The last move of a match also earns `win_reward` (or loses it).
pub struct KalahDqnAgent {
    var_store: VarStore,
    model: QNetwork,
    selector: EpsilonGreedyAgent<StdRng>,
    trainer: Option<DqnTrainer<StdRng>>,
    train_options: TrainOptions,
    rng: StdRng,
    pending: Option<PendingDecision>,
}

impl KalahDqnAgent {
    pub fn new(options: KalahDqnOptions) -> Result<Self, DqnError> {
        let device = options.device.resolve();
        let mut rng = match options.seed {
            Some(seed) => {
                tch::manual_seed(seed as i64);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };

        let var_store = VarStore::new(device);
        let model = QNetwork::new(
            var_store.root().sub("kalah-dqn-agent"),
            ModelConfig::kalah(options.game.holes),
        );
        let selector = EpsilonGreedyAgent::new(
            options.exploration,
            model.config().num_actions,
            StdRng::seed_from_u64(rng.gen()),
        );
        let trainer = if options.train.enabled {
            Some(DqnTrainer::new(
                &var_store,
                &model,
                options.train.clone(),
                StdRng::seed_from_u64(rng.gen()),
            )?)
        } else {
            None
        };

        info!(
            device = ?device,
            holes = options.game.holes,
            training = trainer.is_some(),
            "created kalah dqn agent"
        );

        Ok(Self {
            var_store,
            model,
            selector,
            trainer,
            train_options: options.train,
            rng,
            pending: None,
        })
    }

    pub fn var_store(&self) -> &VarStore {
        &self.var_store
    }

    pub fn model(&self) -> &QNetwork {
        &self.model
    }

    pub fn selector(&self) -> &EpsilonGreedyAgent<StdRng> {
        &self.selector
    }

    pub fn trainer(&self) -> Option<&DqnTrainer<StdRng>> {
        self.trainer.as_ref()
    }

    fn encode(&self, board: &Board, side: Side) -> Result<BoardState, DqnError> {
        let config = self.model.config();
        BoardState::new(config.rows, config.cols, board.to_matrix(side))
    }

    fn record(&mut self, transition: Transition) -> Result<(), DqnError> {
        if let Some(trainer) = &mut self.trainer {
            trainer.observe(transition, &self.model)?;
        }

        Ok(())
    }

    /// Closes the pending decision with the position reached since, seen from `side`.
    ///
    /// A decision made before the opponent swapped sides is dropped, since its outcome was
    /// measured from the other side of the board.
    fn settle(
        &mut self,
        side: Side,
        next_state: Option<BoardState>,
        score_difference: i64,
        bonus: f32,
    ) -> Result<(), DqnError> {
        if let Some(pending) = self.pending.take() {
            if pending.side != side {
                debug!(
                    action = pending.action,
                    side = side.name(),
                    "sides changed, dropping pending decision"
                );
                return Ok(());
            }

            let reward = (score_difference - pending.score_difference) as f32 + bonus;

            self.record(Transition {
                state: pending.state,
                action: pending.action,
                next_state,
                reward,
            })?;
        }

        Ok(())
    }
}

fn action_to_move(action: usize) -> Move {
    match action {
        0 => Move::Swap,
        hole => Move::Hole(hole),
    }
}

fn move_to_action(mv: Move) -> usize {
    match mv {
        Move::Swap => 0,
        Move::Hole(hole) => hole,
    }
}

fn is_legal(board: &Board, side: Side, can_swap: bool, mv: Move) -> bool {
    match mv {
        Move::Swap => can_swap,
        Move::Hole(hole) => board.seeds(side, hole).is_some_and(|seeds| 0 < seeds),
    }
}

impl Agent for KalahDqnAgent {
    fn next_move(
        &mut self,
        board: &Board,
        side: Side,
        can_swap: bool,
    ) -> Result<Move, Box<dyn Error + Send + Sync>> {
        let state = self.encode(board, side)?;
        let score_difference = board.score_difference(side);

        self.settle(side, Some(state.clone()), score_difference, 0.0)?;

        let action = self
            .selector
            .select_action(&state.to_tensor(), &self.model)?;
        let mut mv = action_to_move(action);

        if !is_legal(board, side, can_swap, mv) {
            debug!(action, "selected an illegal move, playing a random one instead");

            self.record(Transition {
                state: state.clone(),
                action,
                next_state: Some(state.clone()),
                reward: self.train_options.illegal_move_penalty,
            })?;

            let legal_moves = board.legal_moves(side);
            let hole = legal_moves
                .choose(&mut self.rng)
                .copied()
                .ok_or("no legal moves")?;
            mv = Move::Hole(hole);
        }

        self.pending = Some(PendingDecision {
            state,
            action: move_to_action(mv),
            score_difference,
            side: match mv {
                Move::Swap => side.opposite(),
                Move::Hole(_) => side,
            },
        });

        Ok(mv)
    }

    fn game_over(&mut self, board: &Board, side: Side) -> Result<(), Box<dyn Error + Send + Sync>> {
        let score_difference = board.score_difference(side);
        let bonus = match score_difference.signum() {
            1 => self.train_options.win_reward,
            -1 => -self.train_options.win_reward,
            _ => 0.0,
        };

        self.settle(side, None, score_difference, bonus)?;

        info!(
            side = side.name(),
            score_difference,
            steps = self.selector.current_step(),
            exploration_rate = self.selector.exploration_rate(),
            "match finished"
        );

        Ok(())
    }
}
