use super::model::QNetwork;
use crate::{
    batch::extract_batch,
    error::DqnError,
    replay::{ReplayBuffer, Transition},
};
use rand::{rngs::StdRng, Rng};
use serde::Deserialize;
use tch::nn::{Adam, Optimizer, OptimizerConfig, VarStore};
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    pub enabled: bool,
    pub replay_buffer_size: usize,
    pub batch_size: usize,
    /// Number of observed transitions between two updates.
    pub train_interval: usize,
    pub gamma: f64,
    pub learning_rate: f64,
    pub max_grad_norm: f64,
    pub tau: f64,
    pub illegal_move_penalty: f32,
    pub win_reward: f32,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            replay_buffer_size: 10000,
            batch_size: 32,
            train_interval: 4,
            gamma: 0.9,
            learning_rate: 0.0001,
            max_grad_norm: 1.0,
            tau: 0.001,
            illegal_move_penalty: -1.0,
            win_reward: 10.0,
        }
    }
}

impl TrainOptions {
    /// Rejects batch sizes the replay buffer can never serve.
    pub fn validate(&self) -> Result<(), DqnError> {
        if self.batch_size == 0 {
            return Err(DqnError::InvalidTrainOptions {
                reason: "batch_size must be positive".to_owned(),
            });
        }

        if self.replay_buffer_size < self.batch_size {
            return Err(DqnError::InvalidTrainOptions {
                reason: format!(
                    "batch_size {} exceeds replay_buffer_size {}",
                    self.batch_size, self.replay_buffer_size
                ),
            });
        }

        Ok(())
    }
}

/// Online DQN updates: replay buffer, target network and optimizer for one policy network.
pub struct DqnTrainer<R = StdRng> {
    options: TrainOptions,
    // keeps the target parameters registered for the trainer's lifetime
    _target_var_store: VarStore,
    target: QNetwork,
    optimizer: Optimizer,
    replay_buffer: ReplayBuffer<R>,
    pending_steps: usize,
    updates: usize,
    loss_visualizer: loss_visualizer::LossVisualizer,
}

impl<R> DqnTrainer<R>
where
    R: Rng,
{
    /// `policy` must be built on `var_store`; the optimizer updates every trainable variable
    /// of that store.
    pub fn new(
        var_store: &VarStore,
        policy: &QNetwork,
        options: TrainOptions,
        rng: R,
    ) -> Result<Self, DqnError> {
        options.validate()?;

        let target_var_store = VarStore::new(var_store.device());
        let mut target = QNetwork::new(
            target_var_store.root().sub("train-target"),
            policy.config().clone(),
        );
        target.copy_weights_from(policy, None);

        let optimizer = Adam::default().build(var_store, options.learning_rate)?;
        let replay_buffer = ReplayBuffer::new(options.replay_buffer_size, rng)?;

        Ok(Self {
            options,
            _target_var_store: target_var_store,
            target,
            optimizer,
            replay_buffer,
            pending_steps: 0,
            updates: 0,
            loss_visualizer: loss_visualizer::LossVisualizer::new(),
        })
    }

    pub fn options(&self) -> &TrainOptions {
        &self.options
    }

    pub fn replay_buffer(&self) -> &ReplayBuffer<R> {
        &self.replay_buffer
    }

    pub fn target(&self) -> &QNetwork {
        &self.target
    }

    /// Number of gradient updates performed so far.
    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn mean_loss(&self) -> f64 {
        self.loss_visualizer.mean()
    }

    /// Stores `transition` and runs an update every `train_interval` transitions once the buffer
    /// holds a full batch. Returns the loss of the update, if one ran.
    pub fn observe(
        &mut self,
        transition: Transition,
        policy: &QNetwork,
    ) -> Result<Option<f64>, DqnError> {
        self.replay_buffer.push(transition);
        self.pending_steps += 1;

        if self.pending_steps < self.options.train_interval
            || self.replay_buffer.len() < self.options.batch_size
        {
            return Ok(None);
        }

        self.pending_steps = 0;
        self.train_step(policy).map(Some)
    }

    /// Samples a batch, takes one optimizer step on the TD loss and moves the target network
    /// towards the policy by `tau`.
    pub fn train_step(&mut self, policy: &QNetwork) -> Result<f64, DqnError> {
        let transitions = self.replay_buffer.sample(self.options.batch_size)?;
        let batch = extract_batch(&transitions)?;

        self.optimizer.zero_grad();

        let loss = loss::compute_loss(policy, &self.target, &batch, self.options.gamma)?;
        loss.backward();

        self.optimizer.clip_grad_norm(self.options.max_grad_norm);
        self.optimizer.step();

        self.target.copy_weights_from(policy, Some(self.options.tau));

        let loss = loss.double_value(&[]);
        self.loss_visualizer.add(loss);
        self.updates += 1;

        debug!(update = self.updates, loss, "trained on replay batch");

        if self.updates % 100 == 0 {
            info!(
                updates = self.updates,
                mean_loss = self.loss_visualizer.mean(),
                buffered = self.replay_buffer.len(),
                "training progress"
            );
        }

        Ok(loss)
    }
}

mod loss {
    use crate::{
        agents::kalah_dqn::model::QNetwork,
        batch::{current_q_values, next_q_values, td_targets, Batch},
        error::DqnError,
    };
    use tch::{Kind, Tensor};

    pub fn compute_loss(
        policy: &QNetwork,
        target: &QNetwork,
        batch: &Batch,
        gamma: f64,
    ) -> Result<Tensor, DqnError> {
        let next_q = next_q_values(target, &batch.next_states, &batch.terminals)?;
        let td_target = td_targets(&batch.rewards, &next_q, gamma);
        let q = current_q_values(policy, &batch.states, &batch.actions)?;

        Ok((td_target.to_device(q.device()) - q).square().mean(Kind::Float))
    }
}

mod loss_visualizer {
    pub struct LossVisualizer {
        losses: Vec<f64>,
    }

    impl LossVisualizer {
        pub fn new() -> Self {
            Self { losses: vec![] }
        }

        pub fn add(&mut self, loss: f64) {
            if 100 <= self.losses.len() {
                self.losses.remove(0);
            }

            self.losses.push(loss);
        }

        pub fn mean(&self) -> f64 {
            if self.losses.is_empty() {
                return 0.0;
            }

            self.losses.iter().sum::<f64>() / self.losses.len() as f64
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_mean_over_last_hundred() {
            let mut visualizer = LossVisualizer::new();
            assert_eq!(visualizer.mean(), 0.0);

            for loss in 0..150 {
                visualizer.add(loss as f64);
            }

            assert_eq!(visualizer.mean(), (50..150).sum::<i32>() as f64 / 100.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{agents::kalah_dqn::ModelConfig, replay::BoardState};
    use rand::SeedableRng;
    use tch::{nn::Module, no_grad, Device, Tensor};

    fn transition(i: usize) -> Transition {
        let state = BoardState::new(2, 8, vec![(i % 7) as f32; 16]).unwrap();
        let next_state = BoardState::new(2, 8, vec![((i + 1) % 7) as f32; 16]).unwrap();

        Transition {
            state,
            action: i % 8,
            next_state: (i % 5 != 0).then_some(next_state),
            reward: (i % 3) as f32 - 1.0,
        }
    }

    fn options() -> TrainOptions {
        TrainOptions {
            replay_buffer_size: 64,
            batch_size: 8,
            train_interval: 4,
            learning_rate: 0.01,
            tau: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_observe_trains_on_interval() {
        tch::manual_seed(9);
        let vs = VarStore::new(Device::Cpu);
        let policy = QNetwork::new(vs.root().sub("policy"), ModelConfig::kalah(7));
        let mut trainer =
            DqnTrainer::new(&vs, &policy, options(), StdRng::seed_from_u64(9)).unwrap();

        let mut losses = vec![];

        for i in 0..32 {
            if let Some(loss) = trainer.observe(transition(i), &policy).unwrap() {
                assert!(loss.is_finite());
                losses.push(loss);
            }
        }

        // the first update waits for a full batch (8 transitions), then one every 4
        assert_eq!(losses.len(), 7);
        assert_eq!(trainer.updates(), 7);
        assert_eq!(trainer.replay_buffer().len(), 32);
        assert!(0.0 < trainer.mean_loss());
    }

    #[test]
    fn test_train_step_updates_policy_and_target() {
        tch::manual_seed(10);
        let vs = VarStore::new(Device::Cpu);
        let policy = QNetwork::new(vs.root().sub("policy"), ModelConfig::kalah(7));
        let mut trainer =
            DqnTrainer::new(&vs, &policy, options(), StdRng::seed_from_u64(10)).unwrap();

        let xs = Tensor::randn([4, 2, 8], tch::kind::FLOAT_CPU);
        let policy_before = no_grad(|| policy.forward(&xs));
        let target_before = no_grad(|| trainer.target().forward(&xs));

        let difference = (&policy_before - &target_before).abs().max().double_value(&[]);
        assert!(difference < 1e-6);

        for i in 0..16 {
            trainer.replay_buffer.push(transition(i));
        }

        for _ in 0..5 {
            trainer.train_step(&policy).unwrap();
        }

        let policy_after = no_grad(|| policy.forward(&xs));
        let target_after = no_grad(|| trainer.target().forward(&xs));

        assert!(0.0 < (&policy_after - &policy_before).abs().max().double_value(&[]));
        assert!(0.0 < (&target_after - &target_before).abs().max().double_value(&[]));
    }

    #[test]
    fn test_train_step_needs_full_batch() {
        let vs = VarStore::new(Device::Cpu);
        let policy = QNetwork::new(vs.root(), ModelConfig::kalah(7));
        let mut trainer =
            DqnTrainer::new(&vs, &policy, options(), StdRng::seed_from_u64(11)).unwrap();

        trainer.replay_buffer.push(transition(1));

        assert!(matches!(
            trainer.train_step(&policy),
            Err(DqnError::InsufficientData {
                requested: 8,
                available: 1
            })
        ));
    }

    #[test]
    fn test_new_rejects_unusable_batch_size() {
        let vs = VarStore::new(Device::Cpu);
        let policy = QNetwork::new(vs.root(), ModelConfig::kalah(7));

        let result = DqnTrainer::new(
            &vs,
            &policy,
            TrainOptions {
                batch_size: 0,
                train_interval: 1,
                ..options()
            },
            StdRng::seed_from_u64(12),
        );
        assert!(matches!(
            result,
            Err(DqnError::InvalidTrainOptions { reason }) if reason.contains("positive")
        ));

        let result = DqnTrainer::new(
            &vs,
            &policy,
            TrainOptions {
                replay_buffer_size: 16,
                batch_size: 32,
                ..options()
            },
            StdRng::seed_from_u64(12),
        );
        assert!(matches!(
            result,
            Err(DqnError::InvalidTrainOptions { reason })
                if reason == "batch_size 32 exceeds replay_buffer_size 16"
        ));

        assert!(TrainOptions::default().validate().is_ok());
    }
}
