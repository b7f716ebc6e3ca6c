//! Turns sampled transitions into per-field tensors and computes the values a DQN update needs.

use crate::{
    agents::kalah_dqn::QNetwork,
    error::DqnError,
    replay::{BoardState, Transition},
};
use tch::{no_grad, Kind, Tensor};

/// Struct-of-tensors view of a batch of transitions, in sampling order.
#[derive(Debug)]
pub struct Batch {
    /// `[n, rows, cols]`
    pub states: Tensor,
    /// `[n]`, int64
    pub actions: Tensor,
    /// `[n, rows, cols]`, terminal rows are zero
    pub next_states: Tensor,
    /// `[n]`, float
    pub rewards: Tensor,
    /// `[n]`, bool
    pub terminals: Tensor,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.actions.size()[0] as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn extract_batch(transitions: &[Transition]) -> Result<Batch, DqnError> {
    let first = transitions.first().ok_or(DqnError::EmptyBatch)?;
    let state_shape = first.state.shape();
    let next_shape = transitions
        .iter()
        .find_map(|t| t.next_state.as_ref().map(BoardState::shape))
        .unwrap_or(state_shape);

    let n = transitions.len();
    let mut states = Vec::with_capacity(n * state_shape.0 * state_shape.1);
    let mut next_states = Vec::with_capacity(n * next_shape.0 * next_shape.1);
    let mut actions = Vec::with_capacity(n);
    let mut rewards = Vec::with_capacity(n);
    let mut terminals = Vec::with_capacity(n);

    for (i, transition) in transitions.iter().enumerate() {
        check_shape("state", i, state_shape, transition.state.shape())?;
        states.extend_from_slice(transition.state.values());

        match &transition.next_state {
            Some(next_state) => {
                check_shape("next_state", i, next_shape, next_state.shape())?;
                next_states.extend_from_slice(next_state.values());
            }
            None => {
                next_states.resize(next_states.len() + next_shape.0 * next_shape.1, 0f32);
            }
        }

        actions.push(transition.action as i64);
        rewards.push(transition.reward);
        terminals.push(transition.is_terminal());
    }

    let n = n as i64;

    Ok(Batch {
        states: Tensor::from_slice(&states).view([
            n,
            state_shape.0 as i64,
            state_shape.1 as i64,
        ]),
        actions: Tensor::from_slice(&actions),
        next_states: Tensor::from_slice(&next_states).view([
            n,
            next_shape.0 as i64,
            next_shape.1 as i64,
        ]),
        rewards: Tensor::from_slice(&rewards),
        terminals: Tensor::from_slice(&terminals),
    })
}

fn check_shape(
    field: &str,
    index: usize,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<(), DqnError> {
    if expected == actual {
        return Ok(());
    }

    Err(DqnError::ShapeMismatch {
        context: format!("{field} of transition {index}"),
        expected: vec![expected.0 as i64, expected.1 as i64],
        actual: vec![actual.0 as i64, actual.1 as i64],
    })
}

/// `Q(s_i, a_i)` for every row, with gradients.
pub fn current_q_values(
    policy_net: &QNetwork,
    states: &Tensor,
    actions: &Tensor,
) -> Result<Tensor, DqnError> {
    let q = policy_net.try_forward(states)?;
    let actions = actions.to_device(q.device()).to_kind(Kind::Int64).view([-1, 1]);

    Ok(q.f_gather(1, &actions, false)?.squeeze_dim(1))
}

/// `max_a Q_target(s'_i, a)` for non-terminal rows and `0` for terminal rows, without gradients.
///
/// The target network only sees the non-terminal rows.
pub fn next_q_values(
    target_net: &QNetwork,
    next_states: &Tensor,
    terminals: &Tensor,
) -> Result<Tensor, DqnError> {
    let n = next_states.size().first().copied().unwrap_or(0);

    if terminals.size() != [n] {
        return Err(DqnError::ShapeMismatch {
            context: "terminal mask".to_owned(),
            expected: vec![n],
            actual: terminals.size(),
        });
    }

    let device = target_net.device();

    no_grad(|| -> Result<Tensor, DqnError> {
        let values = Tensor::zeros([n], (Kind::Float, device));
        let non_final = terminals
            .to_device(device)
            .to_kind(Kind::Bool)
            .logical_not()
            .nonzero()
            .squeeze_dim(1);

        if non_final.numel() == 0 {
            return Ok(values);
        }

        let non_final_states = next_states.to_device(device).index_select(0, &non_final);
        let (max_q, _) = target_net.try_forward(&non_final_states)?.max_dim(1, false);

        Ok(values.f_index_copy(0, &non_final, &max_q)?)
    })
}

/// `r_i + gamma * next_q_i`
pub fn td_targets(rewards: &Tensor, next_q: &Tensor, gamma: f64) -> Tensor {
    rewards.to_device(next_q.device()).to_kind(Kind::Float) + next_q * gamma
}
