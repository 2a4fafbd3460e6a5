//! Actor with categorical policy.
use super::{DiscretePolicy, StochasticPolicy};
use crate::{
    model::{SubModel1, Trainable},
    opt::{Optimizer, OptimizerConfig},
    util::OutDim,
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    SeedableRng,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`CategoricalActor`].
pub struct CategoricalActorConfig<P> {
    /// Configuration of the network producing logits.
    pub policy_config: Option<P>,

    /// Configuration of the optimizer.
    pub opt_config: OptimizerConfig,

    /// Seed of the random number generator used for sampling actions.
    pub seed: u64,
}

impl<P> Default for CategoricalActorConfig<P> {
    fn default() -> Self {
        Self {
            policy_config: None,
            opt_config: OptimizerConfig::Adam { lr: 0.0001 },
            seed: 42,
        }
    }
}

impl<P> CategoricalActorConfig<P>
where
    P: DeserializeOwned + Serialize + OutDim,
{
    /// Sets configurations for the policy network.
    pub fn policy_config(mut self, v: P) -> Self {
        self.policy_config = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the seed of action sampling.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Loads [`CategoricalActorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`CategoricalActorConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Actor with categorical policy over a finite set of actions.
pub struct CategoricalActor<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
{
    device: Device,
    varmap: VarMap,

    // Number of discrete actions
    n_actions: usize,

    // Logits of the policy
    policy: P,

    opt: Optimizer,
    rng: StdRng,
}

impl<P> CategoricalActor<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
    P::Config: OutDim,
{
    /// Constructs [`CategoricalActor`].
    pub fn build(config: CategoricalActorConfig<P::Config>, device: Device) -> Result<Self> {
        let policy_config = config.policy_config.context("policy_config is not set.")?;
        let n_actions = policy_config.get_out_dim();
        let varmap = VarMap::new();
        let policy = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).set_prefix("actor");
            P::build(vb, policy_config)?
        };
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            n_actions,
            policy,
            opt,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Returns the number of actions.
    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// Returns the logits with unavailable actions set to `-inf`.
    ///
    /// `unavailable_actions_mask` takes precedence over `available_actions`.
    /// Both are `[batch_size, n_actions]` tensors with nonzero entries at
    /// unavailable and available actions, respectively.
    fn masked_logits(
        &self,
        states: &Tensor,
        available_actions: Option<&Tensor>,
        unavailable_actions_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let logits = self.policy.forward(states)?;
        let unavailable = match (unavailable_actions_mask, available_actions) {
            (Some(mask), _) => mask.to_device(&self.device)?.to_dtype(DType::F32)?.ne(0f32)?,
            (None, Some(available)) => available
                .to_device(&self.device)?
                .to_dtype(DType::F32)?
                .eq(0f32)?,
            (None, None) => return Ok(logits),
        };
        let neg_inf = Tensor::full(f32::NEG_INFINITY, logits.dims(), &self.device)?;
        Ok(unavailable.where_cond(&neg_inf, &logits)?)
    }
}

impl<P> DiscretePolicy for CategoricalActor<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
    P::Config: OutDim,
{
    fn action_distribution(
        &self,
        states: &Tensor,
        available_actions: Option<&Tensor>,
        unavailable_actions_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let logits = self.masked_logits(states, available_actions, unavailable_actions_mask)?;
        Ok(candle_nn::ops::softmax(&logits, D::Minus1)?)
    }
}

impl<P> StochasticPolicy for CategoricalActor<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
    P::Config: OutDim,
{
    /// Returns action indices of shape `[batch_size]` and dtype `u32`.
    ///
    /// In training mode actions are drawn from the policy (propensity
    /// sampling), otherwise the most probable action is taken.
    fn sample(
        &mut self,
        states: &Tensor,
        available_actions: Option<&Tensor>,
        unavailable_actions_mask: Option<&Tensor>,
        train: bool,
    ) -> Result<Tensor> {
        let probs = self.action_distribution(states, available_actions, unavailable_actions_mask)?;
        if !train {
            return Ok(probs.argmax(D::Minus1)?);
        }

        let actions = probs
            .to_vec2::<f32>()?
            .iter()
            .map(|row| Ok(WeightedIndex::new(row)?.sample(&mut self.rng) as u32))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tensor::new(actions.as_slice(), &self.device)?)
    }
}

impl<P> Trainable for CategoricalActor<P>
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
        info!("Save actor parameters to {:?}", path);

        Ok(path)
    }

    fn load(&mut self, prefix: &Path) -> Result<()> {
        let mut path = PathBuf::from(prefix);
        path.set_extension("pt");
        self.varmap.load(&path)?;
        info!("Load actor parameters from {:?}", path);

        Ok(())
    }
}
