use crate::error::DqnError;
use rand::{rngs::StdRng, seq::index, Rng};
use tch::Tensor;

/// A `rows x cols` board matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardState {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

impl BoardState {
    pub fn new(rows: usize, cols: usize, values: Vec<f32>) -> Result<Self, DqnError> {
        if values.len() != rows * cols {
            return Err(DqnError::ShapeMismatch {
                context: "board state".to_owned(),
                expected: vec![(rows * cols) as i64],
                actual: vec![values.len() as i64],
            });
        }

        Ok(Self { rows, cols, values })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![0f32; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Returns the state as a `[1, rows, cols]` CPU tensor.
    pub fn to_tensor(&self) -> Tensor {
        Tensor::from_slice(&self.values).view([1, self.rows as i64, self.cols as i64])
    }
}

/// One recorded step of interaction. `next_state` is `None` when the step ended the game.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: BoardState,
    pub action: usize,
    pub next_state: Option<BoardState>,
    pub reward: f32,
}

impl Transition {
    pub fn is_terminal(&self) -> bool {
        self.next_state.is_none()
    }
}

/// Fixed-capacity ring buffer of transitions with uniform sampling.
///
/// Until the buffer is full every push appends. After that, push number `n` overwrites slot
/// `n % capacity`, so the buffer always holds the last `capacity` transitions.
#[derive(Debug)]
pub struct ReplayBuffer<R = StdRng> {
    capacity: usize,
    storage: Vec<Transition>,
    write_count: usize,
    rng: R,
}

impl<R> ReplayBuffer<R>
where
    R: Rng,
{
    pub fn new(capacity: usize, rng: R) -> Result<Self, DqnError> {
        if capacity == 0 {
            return Err(DqnError::ZeroCapacity);
        }

        Ok(Self {
            capacity,
            storage: Vec::with_capacity(capacity),
            write_count: 0,
            rng,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Total number of transitions ever pushed.
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    /// Iterates over the stored transitions in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.storage.iter()
    }

    pub fn push(&mut self, transition: Transition) {
        if self.storage.len() < self.capacity {
            self.storage.push(transition);
        } else {
            self.storage[self.write_count % self.capacity] = transition;
        }

        self.write_count += 1;
    }

    /// Draws `batch_size` distinct transitions uniformly at random.
    pub fn sample(&mut self, batch_size: usize) -> Result<Vec<Transition>, DqnError> {
        if self.storage.len() < batch_size {
            return Err(DqnError::InsufficientData {
                requested: batch_size,
                available: self.storage.len(),
            });
        }

        Ok(index::sample(&mut self.rng, self.storage.len(), batch_size)
            .into_iter()
            .map(|i| self.storage[i].clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn transition(i: usize) -> Transition {
        Transition {
            state: BoardState::new(2, 2, vec![i as f32; 4]).unwrap(),
            action: i % 8,
            next_state: Some(BoardState::new(2, 2, vec![i as f32 + 1.0; 4]).unwrap()),
            reward: i as f32,
        }
    }

    fn buffer(capacity: usize) -> ReplayBuffer {
        ReplayBuffer::new(capacity, StdRng::seed_from_u64(7)).unwrap()
    }

    fn rewards(transitions: &[Transition]) -> Vec<usize> {
        let mut rewards = Vec::from_iter(transitions.iter().map(|t| t.reward as usize));
        rewards.sort_unstable();
        rewards
    }

    #[test]
    fn test_board_state_rejects_wrong_length() {
        assert!(matches!(
            BoardState::new(2, 8, vec![0.0; 15]),
            Err(DqnError::ShapeMismatch { .. })
        ));
        assert_eq!(BoardState::zeros(2, 3).values(), &[0.0; 6]);
        assert_eq!(BoardState::zeros(2, 3).to_tensor().size(), vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_capacity() {
        assert!(matches!(
            ReplayBuffer::new(0, StdRng::seed_from_u64(0)),
            Err(DqnError::ZeroCapacity)
        ));
    }

    #[test]
    fn test_push_below_capacity() {
        for capacity in [1, 3, 10] {
            for n in 0..=capacity {
                let mut buffer = buffer(capacity);

                for i in 0..n {
                    buffer.push(transition(i));
                }

                assert_eq!(buffer.len(), n);
                assert_eq!(buffer.write_count(), n);

                let sampled = buffer.sample(n).unwrap();
                assert_eq!(rewards(&sampled), Vec::from_iter(0..n));
            }
        }
    }

    #[test]
    fn test_push_past_capacity_keeps_last_pushed() {
        for capacity in [1, 2, 5] {
            for n in capacity + 1..capacity * 4 {
                let mut buffer = buffer(capacity);

                for i in 0..n {
                    buffer.push(transition(i));
                }

                assert_eq!(buffer.len(), capacity);
                assert_eq!(buffer.write_count(), n);

                let sampled = buffer.sample(capacity).unwrap();
                assert_eq!(rewards(&sampled), Vec::from_iter(n - capacity..n));
            }
        }
    }

    #[test]
    fn test_iter_follows_slots() {
        let mut buffer = buffer(3);

        for i in 0..5 {
            buffer.push(transition(i));
        }

        let slots = Vec::from_iter(buffer.iter().map(|t| t.reward as usize));
        assert_eq!(slots, vec![3, 4, 2]);
    }

    #[test]
    fn test_sample_has_no_duplicates() {
        let mut buffer = buffer(16);

        for i in 0..40 {
            buffer.push(transition(i));
        }

        for batch_size in [1, 5, 16] {
            for _ in 0..20 {
                let mut sampled = rewards(&buffer.sample(batch_size).unwrap());
                sampled.dedup();
                assert_eq!(sampled.len(), batch_size);
            }
        }
    }

    #[test]
    fn test_ring_buffer_end_to_end() {
        let mut buffer = buffer(3);
        let pushed = Vec::from_iter((1..=5).map(transition));

        for t in pushed.iter().cloned() {
            buffer.push(t);
        }

        for _ in 0..20 {
            let sampled = buffer.sample(3).unwrap();
            assert_eq!(sampled.len(), 3);
            assert!(sampled.iter().all(|t| pushed[2..].contains(t)));
        }

        assert!(matches!(
            buffer.sample(4),
            Err(DqnError::InsufficientData {
                requested: 4,
                available: 3
            })
        ));
    }
}
