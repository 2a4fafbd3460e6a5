//! State value function.
use crate::{
    model::{SubModel1, Trainable},
    opt::{Optimizer, OptimizerConfig},
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Estimates state values of summarized states.
pub trait StateValue: Trainable {
    /// Returns the values of a batch of states, `[batch_size]`.
    fn value(&self, states: &Tensor) -> Result<Tensor>;
}

/// Configuration of [`Value`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ValueConfig<P> {
    /// Configuration of value function network.
    pub value_config: Option<P>,

    /// Configuration of optimizer.
    pub opt_config: OptimizerConfig,
}

impl<P> Default for ValueConfig<P> {
    fn default() -> Self {
        Self {
            value_config: None,
            opt_config: OptimizerConfig::default(),
        }
    }
}

impl<P> ValueConfig<P>
where
    P: DeserializeOwned + Serialize,
{
    /// Sets configurations for value function network.
    pub fn value_config(mut self, v: P) -> Self {
        self.value_config = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Loads [`ValueConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ValueConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// State value function.
///
/// The network outputs a single unit per state.
pub struct Value<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
{
    varmap: VarMap,
    value: P,
    opt: Optimizer,
}

impl<P> Value<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
{
    /// Constructs [`Value`].
    pub fn build(config: ValueConfig<P::Config>, device: Device) -> Result<Value<P>> {
        let value_config = config.value_config.context("value_config is not set.")?;
        let varmap = VarMap::new();
        let value = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).set_prefix("value");
            P::build(vb, value_config)?
        };
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self { varmap, value, opt })
    }
}

impl<P> StateValue for Value<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
{
    fn value(&self, states: &Tensor) -> Result<Tensor> {
        Ok(self.value.forward(states)?.squeeze(D::Minus1)?)
    }
}

impl<P> Trainable for Value<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
{
    fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    fn save(&self, prefix: &Path) -> Result<PathBuf> {
        let mut path = PathBuf::from(prefix);
        path.set_extension("pt");
        self.varmap.save(&path)?;
        info!("Save value network parameters to {:?}", path);

        Ok(path)
    }

    fn load(&mut self, prefix: &Path) -> Result<()> {
        let mut path = PathBuf::from(prefix);
        path.set_extension("pt");
        self.varmap.load(&path)?;
        info!("Load value network parameters from {:?}", path);

        Ok(())
    }
}
