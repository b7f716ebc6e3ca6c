use crate::{error::DqnError, nn_utils::copy_weights_linear};
use std::borrow::Borrow;
use tch::{
    nn::{linear, Linear, Module, Path},
    no_grad, Device, Kind, Tensor,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelConfig {
    pub rows: usize,
    pub cols: usize,
    pub fc0_channels: usize,
    pub fc1_channels: usize,
    pub num_actions: usize,
}

impl ModelConfig {
    /// Board of two rows (own side, opponent side) of `holes` holes plus a store.
    ///
    /// Action 0 is the swap, actions `1..=holes` sow the hole with that number.
    pub fn kalah(holes: usize) -> Self {
        Self {
            rows: 2,
            cols: holes + 1,
            fc0_channels: 24,
            fc1_channels: 32,
            num_actions: holes + 1,
        }
    }
}

/// Three fully connected layers over the flattened board.
///
/// The output goes through a softmax, so every row is a distribution over actions rather than
/// a set of action values. Callers still treat it as Q-values (argmax for acting, gather and
/// max for TD targets), which keeps the trained behavior of the original agent but bounds every
/// "value" to `[0, 1]`. It is likely a modeling bug and is kept on purpose until the network is
/// re-specified.
#[derive(Debug)]
pub struct QNetwork {
    device: Device,
    config: ModelConfig,
    fc0: Linear,
    fc1: Linear,
    fc2: Linear,
}

impl QNetwork {
    pub fn new<'a>(vs: impl Borrow<Path<'a>>, config: ModelConfig) -> Self {
        let vs = vs.borrow();
        let fc0 = linear(
            vs / "fc0",
            (config.rows * config.cols) as i64,
            config.fc0_channels as i64,
            Default::default(),
        );
        let fc1 = linear(
            vs / "fc1",
            config.fc0_channels as i64,
            config.fc1_channels as i64,
            Default::default(),
        );
        let fc2 = linear(
            vs / "fc2",
            config.fc1_channels as i64,
            config.num_actions as i64,
            Default::default(),
        );

        Self {
            device: vs.device(),
            config,
            fc0,
            fc1,
            fc2,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Copy weights from another network.
    ///
    /// With `Some(weight)` the result is `current_weights * (1 - weight) + from_weights * weight`,
    /// so `1.0` copies as is and `0.0` keeps the current weights. `None` copies as is.
    pub fn copy_weights_from(&mut self, from: &QNetwork, weight: Option<f64>) {
        let weight = weight.unwrap_or(1.0);

        no_grad(|| {
            copy_weights_linear(&mut self.fc0, &from.fc0, weight);
            copy_weights_linear(&mut self.fc1, &from.fc1, weight);
            copy_weights_linear(&mut self.fc2, &from.fc2, weight);
        });
    }

    /// Same as [`Module::forward`], but rejects inputs that are not `[batch, rows, cols]`.
    pub fn try_forward(&self, xs: &Tensor) -> Result<Tensor, DqnError> {
        let size = xs.size();
        let expected = [self.config.rows as i64, self.config.cols as i64];

        if size.len() != 3 || size[1..] != expected {
            return Err(DqnError::ShapeMismatch {
                context: "q-network input".to_owned(),
                expected: vec![-1, expected[0], expected[1]],
                actual: size,
            });
        }

        Ok(self.forward(xs))
    }
}

impl Module for QNetwork {
    fn forward(&self, xs: &Tensor) -> Tensor {
        xs.to_device(self.device)
            .to_kind(Kind::Float)
            .flatten(1, -1)
            .apply(&self.fc0)
            .relu()
            .apply(&self.fc1)
            .relu()
            .apply(&self.fc2)
            .softmax(-1, Kind::Float)
    }
}
