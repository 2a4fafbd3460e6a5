//! Clipped surrogate objective for discrete actions.
use super::{PolicyInput, PpoError, PpoTransitionBatch, PpoVariant};
use crate::actor::{categorical_entropy, DiscretePolicy};
use anyhow::Result;
use candle_core::{Tensor, D};
use std::marker::PhantomData;

/// PPO for finite action sets.
///
/// The surrogate and the entropy bonus are summed over the batch.
pub struct DiscretePpo<A> {
    epsilon: f64,
    entropy_bonus_scaling: f64,
    phantom: PhantomData<fn() -> A>,
}

impl<A> DiscretePpo<A> {
    /// Creates the variant with clip range `epsilon` and entropy coefficient.
    pub fn new(epsilon: f64, entropy_bonus_scaling: f64) -> Self {
        Self {
            epsilon,
            entropy_bonus_scaling,
            phantom: PhantomData,
        }
    }
}

impl<A: DiscretePolicy> PpoVariant for DiscretePpo<A> {
    type Actor = A;

    fn current_policy_probability(&self, actor: &A, input: &PolicyInput<'_>) -> Result<Tensor> {
        let probs = actor.action_probability(
            input.states,
            input.actions,
            input.available_actions,
            input.unavailable_actions_mask,
        )?;
        Ok(probs.detach())
    }

    fn actor_loss(&self, actor: &A, batch: &PpoTransitionBatch) -> Result<Tensor> {
        let old_probs = batch
            .action_probs
            .as_ref()
            .ok_or(PpoError::MissingField("action_probs"))?;
        let gae = batch.gae.as_ref().ok_or(PpoError::MissingField("gae"))?;

        let probs = actor.action_distribution(
            &batch.state,
            batch.available_actions.as_ref(),
            batch.unavailable_actions_mask.as_ref(),
        )?;
        let device = probs.device().clone();
        let action_probs = (&probs * batch.action.to_device(&device)?)?.sum(D::Minus1)?;

        let ratio = (action_probs / old_probs.to_device(&device)?)?;
        let clipped = ratio.clamp(1.0 - self.epsilon as f32, 1.0 + self.epsilon as f32)?;
        let gae = gae.to_device(&device)?;
        let surrogate = (&ratio * &gae)?
            .minimum(&(clipped * &gae)?)?
            .sum_all()?
            .neg()?;

        // Per-row entropy of the full action distribution, summed over the batch.
        // Detached, so it moves the reported loss but not the gradient.
        let entropy = categorical_entropy(&probs.detach())?.sum_all()?;
        Ok((surrogate - (entropy * self.entropy_bonus_scaling)?)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        actor::{CategoricalActor, CategoricalActorConfig},
        mlp::{Mlp, MlpConfig},
    };
    use candle_core::Device;

    type Variant = DiscretePpo<CategoricalActor<Mlp>>;

    fn actor() -> Result<CategoricalActor<Mlp>> {
        let config =
            CategoricalActorConfig::default().policy_config(MlpConfig::new(2, vec![8], 3, false));
        CategoricalActor::build(config, Device::Cpu)
    }

    fn batch(actor: &CategoricalActor<Mlp>, gae: &[f32]) -> Result<PpoTransitionBatch> {
        let dev = Device::Cpu;
        let state = Tensor::new(&[[0.1f32, 0.2], [0.3, -0.1], [-1.0, 1.0]], &dev)?;
        let action = Tensor::new(&[[1f32, 0., 0.], [0., 1., 0.], [0., 0., 1.]], &dev)?;
        let variant = Variant::new(0.2, 0.0);
        let input = PolicyInput {
            states: &state,
            actions: &action,
            available_actions: None,
            unavailable_actions_mask: None,
        };
        let old = variant.current_policy_probability(actor, &input)?;

        Ok(PpoTransitionBatch {
            reward: Tensor::zeros(3, candle_core::DType::F32, &dev)?,
            terminated: Tensor::zeros(3, candle_core::DType::F32, &dev)?,
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
    fn test_unchanged_policy_gives_negative_advantage_sum() -> Result<()> {
        let actor = actor()?;
        let gae = [0.5f32, -1.0, 2.0];
        let batch = batch(&actor, &gae)?;

        // ratio is 1, so the clipped surrogate reduces to -sum(adv)
        let variant = Variant::new(0.2, 0.0);
        let loss = variant.actor_loss(&actor, &batch)?.to_scalar::<f32>()?;
        assert!((loss + 1.5).abs() < 1e-5);

        Ok(())
    }

    #[test]
    fn test_entropy_bonus() -> Result<()> {
        let actor = actor()?;
        let batch = batch(&actor, &[0.0, 0.0, 0.0])?;
        let probs = actor.action_distribution(&batch.state, None, None)?;
        let entropy = categorical_entropy(&probs)?.sum_all()?.to_scalar::<f32>()?;

        let loss = Variant::new(0.2, 0.5)
            .actor_loss(&actor, &batch)?
            .to_scalar::<f32>()?;
        assert!((loss + 0.5 * entropy).abs() < 1e-5);

        Ok(())
    }

    #[test]
    fn test_zero_epsilon_collapses_to_ratio() -> Result<()> {
        let actor = actor()?;
        let mut batch = batch(&actor, &[1.0, -2.0, 0.5])?;
        // pretend the recorded probabilities were half of the current ones
        let old = batch.action_probs.take().map(|t| t * 0.5).transpose()?;
        batch.action_probs = old;

        // with epsilon 0 the clipped ratio is 1: -sum(min(2 * adv, adv))
        let loss = Variant::new(0.0, 0.0)
            .actor_loss(&actor, &batch)?
            .to_scalar::<f32>()?;
        let expected = -(1.0 + -4.0 + 0.5);
        assert!((loss - expected).abs() < 1e-4);

        Ok(())
    }

    #[test]
    fn test_missing_annotation() -> Result<()> {
        let actor = actor()?;
        let mut batch = batch(&actor, &[0.0, 0.0, 0.0])?;
        batch.gae = None;

        let err = Variant::new(0.2, 0.0).actor_loss(&actor, &batch).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PpoError>(),
            Some(&PpoError::MissingField("gae"))
        );

        Ok(())
    }
}
