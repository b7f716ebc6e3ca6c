pub mod kalah_dqn;
pub mod random;
