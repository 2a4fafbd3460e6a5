//! Actor with Gaussian policy.
use super::{ContinuousPolicy, DiagGaussian, StochasticPolicy};
use crate::{
    model::{SubModel1, Trainable},
    opt::{Optimizer, OptimizerConfig},
    util::OutDim,
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`GaussianActor`].
pub struct GaussianActorConfig<P> {
    /// Configuration of the network producing the mean and the log std.
    pub policy_config: Option<P>,

    /// Configuration of the optimizer.
    pub opt_config: OptimizerConfig,

    /// Lower bound of log std.
    pub min_log_std: f64,

    /// Upper bound of log std.
    pub max_log_std: f64,
}

impl<P> Default for GaussianActorConfig<P> {
    fn default() -> Self {
        Self {
            policy_config: None,
            opt_config: OptimizerConfig::Adam { lr: 0.0003 },
            min_log_std: -20.0,
            max_log_std: 2.0,
        }
    }
}

impl<P> GaussianActorConfig<P>
where
    P: DeserializeOwned + Serialize + OutDim,
{
    /// Sets the minimum value of log std.
    pub fn min_log_std(mut self, v: f64) -> Self {
        self.min_log_std = v;
        self
    }

    /// Sets the maximum value of log std.
    pub fn max_log_std(mut self, v: f64) -> Self {
        self.max_log_std = v;
        self
    }

    /// Sets configurations for policy function.
    pub fn policy_config(mut self, v: P) -> Self {
        self.policy_config = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Loads [`GaussianActorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`GaussianActorConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Actor with diagonal Gaussian policy.
///
/// Actions are not squashed, the policy is the Gaussian itself.
pub struct GaussianActor<P>
where
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
{
    varmap: VarMap,

    // Dimension of the action vector.
    out_dim: usize,

    policy: P,
    opt: Optimizer,

    // Min/max log std
    min_log_std: f64,
    max_log_std: f64,
}

impl<P> GaussianActor<P>
where
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: OutDim,
{
    /// Constructs [`GaussianActor`].
    pub fn build(config: GaussianActorConfig<P::Config>, device: Device) -> Result<Self> {
        let policy_config = config.policy_config.context("policy_config is not set.")?;
        let out_dim = policy_config.get_out_dim();
        let varmap = VarMap::new();
        let policy = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).set_prefix("actor");
            P::build(vb, policy_config)?
        };
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self {
            varmap,
            out_dim,
            policy,
            opt,
            min_log_std: config.min_log_std,
            max_log_std: config.max_log_std,
        })
    }
}

impl<P> ContinuousPolicy for GaussianActor<P>
where
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: OutDim,
{
    fn distribution(&self, states: &Tensor) -> Result<DiagGaussian> {
        let (mean, log_std) = self.policy.forward(states)?;
        debug_assert_eq!(mean.dims().len(), 2);
        debug_assert_eq!(mean.dims()[1], self.out_dim);
        let log_std = log_std.clamp(self.min_log_std as f32, self.max_log_std as f32)?;
        Ok(DiagGaussian::new(mean, log_std))
    }
}

impl<P> StochasticPolicy for GaussianActor<P>
where
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: OutDim,
{
    /// Samples actions of shape `[batch_size, action_dim]`.
    ///
    /// If `train` is `true`, actions are sampled from the Gaussian distribution.
    /// Otherwise, the mean of the distribution is returned. Availability of
    /// actions is ignored.
    fn sample(
        &mut self,
        states: &Tensor,
        _available_actions: Option<&Tensor>,
        _unavailable_actions_mask: Option<&Tensor>,
        train: bool,
    ) -> Result<Tensor> {
        let dist = self.distribution(states)?;
        match train {
            true => dist.sample(),
            false => Ok(dist.mean().clone()),
        }
    }
}

impl<P> Trainable for GaussianActor<P>
where
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
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

#[cfg(test)]
mod test {
    use super::*;
    use crate::mlp::{Mlp2, MlpConfig};
    use candle_core::D;

    #[test]
    fn test_log_probability_with_distribution() -> Result<()> {
        let config = GaussianActorConfig::default()
            .policy_config(MlpConfig::new(3, vec![8], 2, false))
            .min_log_std(-1.0)
            .max_log_std(-1.0);
        let mut actor = GaussianActor::<Mlp2>::build(config, Device::Cpu)?;
        let states = Tensor::new(&[[0.1f32, 0.2, 0.3], [1.0, -1.0, 0.0]], &Device::Cpu)?;

        let mean = actor.sample(&states, None, None, false)?;
        let (logp, dist) = actor.log_probability(&states, &mean, true)?;
        let dist = dist.context("distribution was requested")?;

        // log density at the mean with log std fixed to -1 in both dims
        let expected = 2.0 * (1.0 - 0.5 * (2.0 * std::f32::consts::PI).ln());
        for v in logp.to_vec1::<f32>()? {
            assert!((v - expected).abs() < 1e-5);
        }
        assert_eq!(dist.entropy()?.dims(), &[2]);

        let (_, none) = actor.log_probability(&states, &mean, false)?;
        assert!(none.is_none());

        let sampled = actor.sample(&states, None, None, true)?;
        assert_eq!(sampled.dims(), &[2, 2]);
        assert!(sampled.sub(&mean)?.abs()?.sum(D::Minus1)?.to_vec1::<f32>()?[0] > 0.0);

        Ok(())
    }
}
