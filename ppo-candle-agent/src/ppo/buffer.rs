//! Trajectory buffer of on-policy rollouts.
use super::{PpoError, PpoTransition, PpoTransitionBatch};
use crate::Device;
use anyhow::Result;
use log::trace;
use ppo_core::{ExperienceBufferBase, ReplayBufferBase};
use rand::{rngs::StdRng, seq::index, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`PpoReplayBuffer`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PpoReplayBufferConfig {
    /// Maximum number of transitions.
    pub capacity: usize,

    /// Seed of batch sampling.
    pub seed: u64,

    /// Device on which transitions are stored.
    pub storage_device: Device,

    /// Device on which batches are created.
    pub device_for_batches: Device,
}

impl Default for PpoReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            seed: 42,
            storage_device: Device::Cpu,
            device_for_batches: Device::Cpu,
        }
    }
}

impl PpoReplayBufferConfig {
    /// Sets the capacity of the buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the seed of batch sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the device on which transitions are stored.
    pub fn storage_device(mut self, device: Device) -> Self {
        self.storage_device = device;
        self
    }

    /// Sets the device on which batches are created.
    pub fn device_for_batches(mut self, device: Device) -> Self {
        self.device_for_batches = device;
        self
    }

    /// Loads [`PpoReplayBufferConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`PpoReplayBufferConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Ordered transitions of a single on-policy rollout.
///
/// Insertion order is temporal order. The buffer is not cleared by the
/// learner; call [`PpoReplayBuffer::clear`] before collecting the next rollout.
pub struct PpoReplayBuffer {
    capacity: usize,
    memory: Vec<PpoTransition>,
    rng: StdRng,
    storage_device: candle_core::Device,
    device_for_batches: candle_core::Device,
}

impl PpoReplayBuffer {
    /// Removes all transitions.
    pub fn clear(&mut self) {
        self.memory.clear();
    }

    /// Returns the capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the device on which transitions are stored.
    pub fn storage_device(&self) -> &candle_core::Device {
        &self.storage_device
    }

    /// Returns the device on which batches are created.
    pub fn device_for_batches(&self) -> &candle_core::Device {
        &self.device_for_batches
    }

    /// Returns the most recent transition.
    pub fn last(&self) -> Option<&PpoTransition> {
        self.memory.last()
    }

    /// Iterates over transitions in temporal order.
    ///
    /// Use `.rev()` for reverse temporal order.
    pub fn iter(&self) -> std::slice::Iter<'_, PpoTransition> {
        self.memory.iter()
    }

    /// Iterates mutably over transitions in temporal order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, PpoTransition> {
        self.memory.iter_mut()
    }
}

impl ExperienceBufferBase for PpoReplayBuffer {
    type Item = PpoTransition;

    /// Pushes a transition after moving it to the storage device.
    fn push(&mut self, mut tr: PpoTransition) -> Result<()> {
        if self.memory.len() >= self.capacity {
            return Err(PpoError::BufferFull(self.capacity).into());
        }
        tr.move_to(&self.storage_device)?;
        self.memory.push(tr);
        Ok(())
    }

    fn len(&self) -> usize {
        self.memory.len()
    }
}

impl ReplayBufferBase for PpoReplayBuffer {
    type Config = PpoReplayBufferConfig;
    type Batch = PpoTransitionBatch;

    fn build(config: &Self::Config) -> Result<Self> {
        Ok(Self {
            capacity: config.capacity,
            memory: Vec::with_capacity(config.capacity),
            rng: StdRng::seed_from_u64(config.seed),
            storage_device: config.storage_device.to_candle()?,
            device_for_batches: config.device_for_batches.to_candle()?,
        })
    }

    /// Samples `min(size, len)` distinct transitions uniformly at random.
    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        if self.memory.is_empty() {
            return Err(PpoError::EmptyBuffer.into());
        }
        let n = size.min(self.memory.len());
        trace!("Sample {} of {} transitions", n, self.memory.len());
        let transitions: Vec<&PpoTransition> = index::sample(&mut self.rng, self.memory.len(), n)
            .into_iter()
            .map(|i| &self.memory[i])
            .collect();
        PpoTransitionBatch::from_transitions(&transitions, &self.device_for_batches)
    }
}
