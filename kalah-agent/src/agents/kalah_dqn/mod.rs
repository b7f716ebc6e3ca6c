mod agent;
mod model;
mod options;
mod provider;
mod trainer;

pub use agent::KalahDqnAgent;
pub use model::{ModelConfig, QNetwork};
pub use options::{DeviceOption, KalahDqnOptions};
pub use provider::KalahDqnProvider;
pub use trainer::{DqnTrainer, TrainOptions};
