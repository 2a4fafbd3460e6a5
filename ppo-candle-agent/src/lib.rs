//! Proximal policy optimization implemented with [candle](https://crates.io/crates/candle-core).
//!
//! The entry point is [`ppo::Ppo`], a policy learner that preprocesses an
//! on-policy trajectory buffer with generalized advantage estimation and
//! then optimizes clipped surrogate objectives for the actor and a
//! state-value regression loss for the critic.
pub mod actor;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod ppo;
pub mod repr;
mod util;
pub mod value;
use anyhow::Result;
use serde::{Deserialize, Serialize};
pub use util::OutDim;

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The GPU device with the given ordinal.
    Cuda(usize),
}

impl Device {
    /// Opens the candle device.
    pub fn to_candle(self) -> Result<candle_core::Device> {
        match self {
            Self::Cpu => Ok(candle_core::Device::Cpu),
            Self::Cuda(n) => Ok(candle_core::Device::new_cuda(n)?),
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}
