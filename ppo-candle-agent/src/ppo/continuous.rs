//! Clipped surrogate objective for continuous actions.
use super::{PolicyInput, PpoError, PpoTransitionBatch, PpoVariant};
use crate::actor::ContinuousPolicy;
use anyhow::{anyhow, Result};
use candle_core::Tensor;
use std::marker::PhantomData;

/// PPO for real-valued action vectors.
///
/// Probabilities are handled as log densities; the ratio is
/// `exp(logp - old_logp)`. The surrogate and the entropy bonus are averaged
/// over the batch.
pub struct ContinuousPpo<A> {
    epsilon: f64,
    entropy_bonus_scaling: f64,
    normalize_gae: bool,
    phantom: PhantomData<fn() -> A>,
}

impl<A> ContinuousPpo<A> {
    /// Creates the variant.
    ///
    /// If `normalize_gae` is `true`, advantages are standardized within each batch.
    pub fn new(epsilon: f64, entropy_bonus_scaling: f64, normalize_gae: bool) -> Self {
        Self {
            epsilon,
            entropy_bonus_scaling,
            normalize_gae,
            phantom: PhantomData,
        }
    }
}

/// Returns `(adv - mean) / (std + 1e-8)` with the unbiased standard deviation.
///
/// The standard deviation of a single advantage is taken as zero.
pub fn normalize_advantages(gae: &Tensor) -> Result<Tensor> {
    let n = gae.elem_count();
    let centered = gae.broadcast_sub(&gae.mean_all()?)?;
    let std = match n {
        0 | 1 => Tensor::zeros((), gae.dtype(), gae.device())?,
        _ => (centered.sqr()?.sum_all()? / (n - 1) as f64)?.sqrt()?,
    };
    Ok(centered.broadcast_div(&(std + 1e-8)?)?)
}

impl<A: ContinuousPolicy> PpoVariant for ContinuousPpo<A> {
    type Actor = A;

    fn current_policy_probability(&self, actor: &A, input: &PolicyInput<'_>) -> Result<Tensor> {
        let (logp, _) = actor.log_probability(input.states, input.actions, false)?;
        Ok(logp.detach())
    }

    fn actor_loss(&self, actor: &A, batch: &PpoTransitionBatch) -> Result<Tensor> {
        let old_logp = batch
            .action_probs
            .as_ref()
            .ok_or(PpoError::MissingField("action_probs"))?;
        let gae = batch.gae.as_ref().ok_or(PpoError::MissingField("gae"))?;

        let (logp, dist) = actor.log_probability(&batch.state, &batch.action, true)?;
        let dist = dist.ok_or_else(|| anyhow!("The policy did not return its distribution"))?;
        let device = logp.device().clone();

        let ratio = (logp - old_logp.to_device(&device)?)?.exp()?;
        let clipped = ratio.clamp(1.0 - self.epsilon as f32, 1.0 + self.epsilon as f32)?;
        let gae = gae.to_device(&device)?;
        let gae = match self.normalize_gae {
            true => normalize_advantages(&gae)?,
            false => gae,
        };
        let surrogate = (&ratio * &gae)?
            .minimum(&(clipped * &gae)?)?
            .mean_all()?
            .neg()?;

        let entropy = dist.entropy()?.mean_all()?;
        Ok((surrogate - (entropy * self.entropy_bonus_scaling)?)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        actor::{GaussianActor, GaussianActorConfig},
        mlp::{Mlp2, MlpConfig},
    };
    use candle_core::{DType, Device};

    type Variant = ContinuousPpo<GaussianActor<Mlp2>>;

    fn actor() -> Result<GaussianActor<Mlp2>> {
        let config =
            GaussianActorConfig::default().policy_config(MlpConfig::new(2, vec![8], 2, false));
        GaussianActor::build(config, Device::Cpu)
    }

    fn batch(actor: &GaussianActor<Mlp2>, gae: &[f32]) -> Result<PpoTransitionBatch> {
        let dev = Device::Cpu;
        let n = gae.len();
        let state = Tensor::randn(0f32, 1.0, (n, 2), &dev)?;
        let action = Tensor::randn(0f32, 1.0, (n, 2), &dev)?;
        let variant = Variant::new(0.2, 0.0, false);
        let old = variant.current_policy_probability(
            actor,
            &PolicyInput {
                states: &state,
                actions: &action,
                available_actions: None,
                unavailable_actions_mask: None,
            },
        )?;

        Ok(PpoTransitionBatch {
            reward: Tensor::zeros(n, DType::F32, &dev)?,
            terminated: Tensor::zeros(n, DType::F32, &dev)?,
            state,
            action,
            next_state: None,
            available_actions: None,
            unavailable_actions_mask: None,
            gae: Some(Tensor::new(gae, &dev)?),
            lam_return: None,
            action_probs: Some(old),
        })
    }

    #[test]
    fn test_identical_policy_has_unit_ratio() -> Result<()> {
        let actor = actor()?;
        let gae = [1.0f32, 2.0, -0.5, 0.5];
        let batch = batch(&actor, &gae)?;

        // ratio is exp(0) = 1, so the loss is -mean(adv)
        let loss = Variant::new(0.2, 0.0, false)
            .actor_loss(&actor, &batch)?
            .to_scalar::<f32>()?;
        assert!((loss + 0.75).abs() < 1e-5);

        // normalized advantages have zero mean
        let loss = Variant::new(0.2, 0.0, true)
            .actor_loss(&actor, &batch)?
            .to_scalar::<f32>()?;
        assert!(loss.abs() < 1e-5);

        Ok(())
    }

    #[test]
    fn test_entropy_is_averaged() -> Result<()> {
        let actor = actor()?;
        let batch = batch(&actor, &[0.0, 0.0, 0.0])?;
        let entropy = actor
            .distribution(&batch.state)?
            .entropy()?
            .mean_all()?
            .to_scalar::<f32>()?;

        let loss = Variant::new(0.2, 0.1, false)
            .actor_loss(&actor, &batch)?
            .to_scalar::<f32>()?;
        assert!((loss + 0.1 * entropy).abs() < 1e-5);

        Ok(())
    }

    #[test]
    fn test_normalize_advantages() -> Result<()> {
        let gae = Tensor::new(&[1f32, 2., 3.], &Device::Cpu)?;
        let normalized = normalize_advantages(&gae)?.to_vec1::<f32>()?;
        // unbiased std is 1
        for (v, e) in normalized.iter().zip([-1f32, 0., 1.]) {
            assert!((v - e).abs() < 1e-5);
        }

        let single = Tensor::new(&[4f32], &Device::Cpu)?;
        assert_eq!(normalize_advantages(&single)?.to_vec1::<f32>()?, vec![0.0]);

        Ok(())
    }
}
