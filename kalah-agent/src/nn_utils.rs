use crate::error::DqnError;
use tch::{nn::Linear, Device, Tensor};

fn blend_weights(lhs: &Tensor, rhs: &Tensor, weight: f64) -> Tensor {
    lhs * (1.0 - weight) + rhs * weight
}

/// Moves `to` towards `from`: `to * (1 - weight) + from * weight`.
///
/// Must run under [`tch::no_grad`] when `to` holds trainable variables.
pub fn copy_weights_linear(to: &mut Linear, from: &Linear, weight: f64) {
    to.ws.copy_(&blend_weights(&to.ws, &from.ws, weight));

    if let (Some(bs), Some(from_bs)) = (&mut to.bs, &from.bs) {
        bs.copy_(&blend_weights(bs, from_bs, weight));
    }
}

/// Index of the largest value of a tensor, flattened. Ties resolve to the lowest index.
pub fn argmax_first(values: &Tensor) -> Result<usize, DqnError> {
    let values = Vec::<f32>::try_from(values.flatten(0, -1).to_device(Device::Cpu))?;

    let mut best = None;

    for (index, value) in values.into_iter().enumerate() {
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((index, value)),
        }
    }

    best.map(|(index, _)| index)
        .ok_or_else(|| DqnError::ShapeMismatch {
            context: "argmax input".to_owned(),
            expected: vec![-1],
            actual: vec![0],
        })
}
