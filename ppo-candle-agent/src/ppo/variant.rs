//! Variant-specific parts of the actor objective.
use super::PpoTransitionBatch;
use crate::actor::StochasticPolicy;
use anyhow::Result;
use candle_core::Tensor;

/// Inputs of the policy for a batch of summarized states.
pub struct PolicyInput<'a> {
    /// Summarized states.
    pub states: &'a Tensor,

    /// Represented actions.
    pub actions: &'a Tensor,

    /// Available actions, if known.
    pub available_actions: Option<&'a Tensor>,

    /// Unavailable actions, if known.
    pub unavailable_actions_mask: Option<&'a Tensor>,
}

/// The action-space specific part of PPO.
///
/// Discrete and continuous action spaces differ in how the probability of
/// the taken action is measured and how the clipped surrogate objective is
/// reduced over a batch.
pub trait PpoVariant {
    /// The actor trained by this variant.
    type Actor: StochasticPolicy;

    /// Returns the detached probability (or log density) of the taken actions
    /// under the current policy, `[batch_size]`.
    fn current_policy_probability(
        &self,
        actor: &Self::Actor,
        input: &PolicyInput<'_>,
    ) -> Result<Tensor>;

    /// Returns the scalar actor loss on a batch with summarized states and
    /// represented actions.
    fn actor_loss(&self, actor: &Self::Actor, batch: &PpoTransitionBatch) -> Result<Tensor>;
}
