use super::trainer::TrainOptions;
use crate::{exploration::ExplorationSchedule, session::GameOptions};
use serde::Deserialize;
use tch::{
    utils::{has_cuda, has_mps, has_vulkan},
    Device,
};

/// Compute target for the networks, written as `auto`, `cpu`, `mps`, `cuda` or `cuda:<index>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum DeviceOption {
    #[default]
    Auto,
    Cpu,
    Mps,
    Cuda(usize),
}

impl DeviceOption {
    pub fn resolve(self) -> Device {
        match self {
            DeviceOption::Cpu => Device::Cpu,
            DeviceOption::Mps => Device::Mps,
            DeviceOption::Cuda(index) => Device::Cuda(index),
            DeviceOption::Auto => {
                if has_cuda() {
                    Device::Cuda(0)
                } else if has_mps() {
                    Device::Mps
                } else if has_vulkan() {
                    Device::Vulkan
                } else {
                    Device::Cpu
                }
            }
        }
    }
}

impl TryFrom<String> for DeviceOption {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Ok(DeviceOption::Auto),
            "cpu" => Ok(DeviceOption::Cpu),
            "mps" => Ok(DeviceOption::Mps),
            "cuda" => Ok(DeviceOption::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|index| index.parse().ok())
                .map(DeviceOption::Cuda)
                .ok_or_else(|| format!("unknown device {value:?}")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KalahDqnOptions {
    pub game: GameOptions,
    pub device: DeviceOption,
    /// Seeds every random source of the agent, including network initialization.
    pub seed: Option<u64>,
    pub exploration: ExplorationSchedule,
    pub train: TrainOptions,
}
