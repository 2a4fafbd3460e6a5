//! Configuration of [`Ppo`](super::Ppo).
use crate::{opt::OptimizerConfig, Device};
use anyhow::Result;
use ppo_core::OnPolicyOptimizerConfig;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Action space of the environment.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum ActionSpace {
    /// `n` discrete actions.
    Discrete {
        /// Number of actions.
        n: usize,
    },

    /// Real-valued action vectors.
    Continuous {
        /// Dimension of action vectors.
        dim: usize,
    },
}

/// Configuration of [`Ppo`](super::Ppo).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PpoConfig {
    /// Dimension of (summarized) states.
    pub state_dim: usize,

    /// Action space.
    pub action_space: ActionSpace,

    /// If `false`, no critic is trained and all state values are zero.
    pub use_critic: bool,

    /// Hidden layer sizes of the actor.
    pub actor_hidden_dims: Vec<usize>,

    /// Hidden layer sizes of the critic.
    pub critic_hidden_dims: Vec<usize>,

    /// Learning rate of the actor.
    pub actor_learning_rate: f64,

    /// Learning rate of the critic.
    pub critic_learning_rate: f64,

    /// Optimizer, with its learning rate overridden for actor and critic.
    pub opt_config: OptimizerConfig,

    /// Discount factor.
    pub discount_factor: f32,

    /// Number of gradient rounds per learning call.
    pub training_rounds: usize,

    /// Batch size.
    pub batch_size: usize,

    /// Clip range of the probability ratio.
    pub epsilon: f64,

    /// Trace-decay parameter of GAE.
    pub trace_decay: f32,

    /// Weight of the entropy bonus.
    pub entropy_bonus_scaling: f64,

    /// Standardize advantages within batches. Used only for continuous actions.
    pub normalize_gae: bool,

    /// Device of the networks.
    pub device: Option<Device>,

    /// Seed of action sampling.
    pub seed: u64,
}

impl PpoConfig {
    /// Creates a configuration with default hyperparameters.
    ///
    /// Discrete actions default to `epsilon = 0.0`; continuous actions to
    /// `epsilon = 0.2` with advantage normalization.
    pub fn new(state_dim: usize, action_space: ActionSpace) -> Self {
        let continuous = matches!(action_space, ActionSpace::Continuous { .. });
        Self {
            state_dim,
            action_space,
            use_critic: true,
            actor_hidden_dims: vec![64, 64],
            critic_hidden_dims: vec![64, 64],
            actor_learning_rate: 1e-4,
            critic_learning_rate: 1e-4,
            opt_config: OptimizerConfig::Adam { lr: 1e-4 },
            discount_factor: 0.99,
            training_rounds: 100,
            batch_size: 128,
            epsilon: if continuous { 0.2 } else { 0.0 },
            trace_decay: 0.95,
            entropy_bonus_scaling: 0.01,
            normalize_gae: continuous,
            device: None,
            seed: 42,
        }
    }

    /// Sets whether a critic is used.
    pub fn use_critic(mut self, v: bool) -> Self {
        self.use_critic = v;
        self
    }

    /// Sets hidden layer sizes of the actor.
    pub fn actor_hidden_dims(mut self, v: Vec<usize>) -> Self {
        self.actor_hidden_dims = v;
        self
    }

    /// Sets hidden layer sizes of the critic.
    pub fn critic_hidden_dims(mut self, v: Vec<usize>) -> Self {
        self.critic_hidden_dims = v;
        self
    }

    /// Sets the learning rate of the actor.
    pub fn actor_learning_rate(mut self, v: f64) -> Self {
        self.actor_learning_rate = v;
        self
    }

    /// Sets the learning rate of the critic.
    pub fn critic_learning_rate(mut self, v: f64) -> Self {
        self.critic_learning_rate = v;
        self
    }

    /// Sets the optimizer.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f32) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets the number of training rounds.
    pub fn training_rounds(mut self, v: usize) -> Self {
        self.training_rounds = v;
        self
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the clip range.
    pub fn epsilon(mut self, v: f64) -> Self {
        self.epsilon = v;
        self
    }

    /// Sets the trace-decay parameter.
    pub fn trace_decay(mut self, v: f32) -> Self {
        self.trace_decay = v;
        self
    }

    /// Sets the weight of the entropy bonus.
    pub fn entropy_bonus_scaling(mut self, v: f64) -> Self {
        self.entropy_bonus_scaling = v;
        self
    }

    /// Sets advantage normalization.
    pub fn normalize_gae(mut self, v: bool) -> Self {
        self.normalize_gae = v;
        self
    }

    /// Sets the device.
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Sets the seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Returns the configuration of the optimization loop.
    pub fn on_policy_config(&self) -> OnPolicyOptimizerConfig {
        OnPolicyOptimizerConfig::default()
            .training_rounds(self.training_rounds)
            .batch_size(self.batch_size)
    }

    /// Loads [`PpoConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`PpoConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_defaults_per_action_space() {
        let discrete = PpoConfig::new(4, ActionSpace::Discrete { n: 2 });
        assert_eq!(discrete.epsilon, 0.0);
        assert!(!discrete.normalize_gae);

        let continuous = PpoConfig::new(4, ActionSpace::Continuous { dim: 2 });
        assert_eq!(continuous.epsilon, 0.2);
        assert!(continuous.normalize_gae);
    }

    #[test]
    fn test_serde_ppo_config() -> Result<()> {
        let config = PpoConfig::new(3, ActionSpace::Continuous { dim: 1 })
            .actor_hidden_dims(vec![32])
            .device(Device::Cpu)
            .training_rounds(5);

        let dir = TempDir::new("ppo_config")?;
        let path = dir.path().join("ppo.yaml");
        config.save(&path)?;
        assert_eq!(PpoConfig::load(&path)?, config);

        Ok(())
    }
}
