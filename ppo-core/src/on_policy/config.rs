//! Configuration of [`OnPolicyOptimizer`](super::OnPolicyOptimizer).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`OnPolicyOptimizer`](super::OnPolicyOptimizer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct OnPolicyOptimizerConfig {
    /// The number of gradient-update rounds per learning call.
    pub training_rounds: usize,

    /// The number of experiences in a batch.
    pub batch_size: usize,
}

impl Default for OnPolicyOptimizerConfig {
    fn default() -> Self {
        Self {
            training_rounds: 100,
            batch_size: 128,
        }
    }
}

impl OnPolicyOptimizerConfig {
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

    /// Constructs [`OnPolicyOptimizerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`OnPolicyOptimizerConfig`] as YAML file.
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
    fn test_serde_yaml_round_trip() -> Result<()> {
        let config = OnPolicyOptimizerConfig::default()
            .training_rounds(10)
            .batch_size(32);
        let dir = TempDir::new("on_policy_config")?;
        let path = dir.path().join("opt.yaml");

        config.save(&path)?;
        let loaded = OnPolicyOptimizerConfig::load(&path)?;
        assert_eq!(config, loaded);

        Ok(())
    }
}
