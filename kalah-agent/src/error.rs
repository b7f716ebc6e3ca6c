use thiserror::Error;

#[derive(Error, Debug)]
pub enum DqnError {
    #[error("cannot sample {requested} transitions from a buffer holding {available}")]
    InsufficientData { requested: usize, available: usize },
    #[error("replay buffer capacity must be positive")]
    ZeroCapacity,
    #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<i64>,
        actual: Vec<i64>,
    },
    #[error("invalid training options: {reason}")]
    InvalidTrainOptions { reason: String },
    #[error("cannot build a batch from zero transitions")]
    EmptyBatch,
    #[error("torch error: {0}")]
    Torch(#[from] tch::TchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DqnError::InsufficientData {
            requested: 4,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "cannot sample 4 transitions from a buffer holding 3"
        );

        let err = DqnError::ShapeMismatch {
            context: "q-network input".to_owned(),
            expected: vec![-1, 2, 8],
            actual: vec![1, 2, 7],
        };
        assert_eq!(
            err.to_string(),
            "shape mismatch in q-network input: expected [-1, 2, 8], got [1, 2, 7]"
        );

        let err = DqnError::InvalidTrainOptions {
            reason: "batch_size must be positive".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "invalid training options: batch_size must be positive"
        );
    }
}
