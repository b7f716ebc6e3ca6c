use crate::{agents::kalah_dqn::QNetwork, error::DqnError, nn_utils::argmax_first};
use rand::{rngs::StdRng, Rng};
use serde::Deserialize;
use tch::{no_grad, Tensor};

/// Exponentially decaying exploration rate:
///
/// `rate(step) = end + (start - end) * exp(-decay * step)`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExplorationSchedule {
    pub start: f64,
    pub end: f64,
    pub decay: f64,
}

impl Default for ExplorationSchedule {
    fn default() -> Self {
        Self {
            start: 0.9,
            end: 0.05,
            decay: 0.001,
        }
    }
}

impl ExplorationSchedule {
    pub fn new(start: f64, end: f64, decay: f64) -> Self {
        Self { start, end, decay }
    }

    pub fn rate(&self, step: u64) -> f64 {
        self.end + (self.start - self.end) * (-self.decay * step as f64).exp()
    }
}

/// Epsilon-greedy action selection over a borrowed Q-network.
#[derive(Debug)]
pub struct EpsilonGreedyAgent<R = StdRng> {
    schedule: ExplorationSchedule,
    num_actions: usize,
    current_step: u64,
    rng: R,
}

impl<R> EpsilonGreedyAgent<R>
where
    R: Rng,
{
    pub fn new(schedule: ExplorationSchedule, num_actions: usize, rng: R) -> Self {
        debug_assert!(0 < num_actions);

        Self {
            schedule,
            num_actions,
            current_step: 0,
            rng,
        }
    }

    pub fn schedule(&self) -> &ExplorationSchedule {
        &self.schedule
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    /// Rate that the next call to [`Self::select_action`] will use.
    pub fn exploration_rate(&self) -> f64 {
        self.schedule.rate(self.current_step)
    }

    /// Picks an action for a `[1, rows, cols]` state.
    ///
    /// Every call advances the step counter by one, whichever branch is taken. Exploitation
    /// returns the lowest index among the maximal outputs of `policy_net`.
    pub fn select_action(
        &mut self,
        state: &Tensor,
        policy_net: &QNetwork,
    ) -> Result<usize, DqnError> {
        let rate = self.schedule.rate(self.current_step);
        self.current_step += 1;

        if self.rng.gen::<f64>() < rate {
            return Ok(self.rng.gen_range(0..self.num_actions));
        }

        let output = no_grad(|| policy_net.try_forward(state))?;
        argmax_first(&output.get(0))
    }
}
