//! Generalized advantage estimation over a trajectory buffer.
use super::{
    transition::{stack_all_or_none, stack_tensors},
    DevicePlacement, PolicyInput, PpoError, PpoReplayBuffer, PpoVariant,
};
use crate::{
    repr::{ActionRepresentation, HistorySummarizer},
    value::StateValue,
};
use anyhow::Result;
use candle_core::{DType, Tensor};
use log::debug;
use ppo_core::ExperienceBufferBase;

/// Runs the GAE recursion backwards over a trajectory.
///
/// `values[i]` is the value of the i-th state and `bootstrap` the value of
/// the state following the last one. Returns `(advantages, lambda_returns)`,
/// or [`PpoError::InconsistentSchema`] if the slices differ in length.
///
/// ```text
/// td_i  = r_i + discount * v_{i+1} * (1 - done_i) - v_i
/// gae_i = td_i + discount * trace_decay * (1 - done_i) * gae_{i+1}
/// ret_i = gae_i + v_i
/// ```
pub fn gae_backward(
    rewards: &[f32],
    terminated: &[bool],
    values: &[f32],
    bootstrap: f32,
    discount_factor: f32,
    trace_decay: f32,
) -> Result<(Vec<f32>, Vec<f32>)> {
    if rewards.len() != terminated.len() || rewards.len() != values.len() {
        return Err(PpoError::InconsistentSchema(format!(
            "{} rewards, {} termination flags and {} values",
            rewards.len(),
            terminated.len(),
            values.len()
        ))
        .into());
    }

    let n = rewards.len();
    let mut advantages = vec![0f32; n];
    let mut lambda_returns = vec![0f32; n];
    let mut next_value = bootstrap;
    let mut gae = 0f32;

    for i in (0..n).rev() {
        let not_done = if terminated[i] { 0f32 } else { 1f32 };
        let td_error = rewards[i] + discount_factor * next_value * not_done - values[i];
        gae = td_error + discount_factor * trace_decay * not_done * gae;
        advantages[i] = gae;
        lambda_returns[i] = gae + values[i];
        next_value = values[i];
    }

    Ok((advantages, lambda_returns))
}

/// Annotates a trajectory buffer before optimization.
///
/// All collaborators are borrowed from the learner for a single pass.
pub struct Preprocessor<'a, V: PpoVariant> {
    /// Variant measuring the probability of taken actions.
    pub variant: &'a V,

    /// The current policy.
    pub actor: &'a V::Actor,

    /// State-value estimator. Values are zero without a critic.
    pub critic: Option<&'a dyn StateValue>,

    /// History summarizer applied to states.
    pub summarizer: &'a dyn HistorySummarizer,

    /// Representation of actions fed to the actor.
    pub action_representation: &'a dyn ActionRepresentation,

    /// Discount factor.
    pub discount_factor: f32,

    /// Trace-decay parameter of GAE.
    pub trace_decay: f32,
}

impl<V: PpoVariant> Preprocessor<'_, V> {
    /// Sets `gae`, `lam_return` and `action_probs` on every transition of the buffer.
    ///
    /// Nothing is modified if an error is returned before the first annotation.
    pub fn preprocess(&self, buffer: &mut PpoReplayBuffer) -> Result<()> {
        let n = buffer.len();
        let last = buffer.last().ok_or(PpoError::EmptyBuffer)?;
        let next_state = last
            .next_state
            .as_ref()
            .ok_or(PpoError::MissingNextState)?;
        let device = buffer.device_for_batches().clone();

        // Summarize states together with the trailing next state in one pass
        let states = stack_tensors(buffer.iter().map(|t| &t.state), "state")?;
        if states.dims()[1..] != next_state.dims()[..] {
            return Err(PpoError::InconsistentSchema(format!(
                "next_state has shape {:?}, states have {:?}",
                next_state.dims(),
                &states.dims()[1..]
            ))
            .into());
        }
        let all_states =
            Tensor::cat(&[&states, &next_state.unsqueeze(0)?], 0)?.to_device(&device)?;
        let summarized = self.summarizer.summarize(&all_states)?.detach();
        let history = summarized.narrow(0, 0, n)?;

        let values: Vec<f32> = match self.critic {
            Some(critic) => critic
                .value(&summarized)?
                .detach()
                .to_dtype(DType::F32)?
                .to_vec1()?,
            None => vec![0f32; n + 1],
        };

        let actions =
            stack_tensors(buffer.iter().map(|t| &t.action), "action")?.to_device(&device)?;
        let actions = self.action_representation.represent(&actions)?;
        let available_actions = stack_all_or_none(
            "available_actions",
            buffer.iter().map(|t| t.available_actions.as_ref()),
            &device,
        )?;
        let unavailable_actions_mask = stack_all_or_none(
            "unavailable_actions_mask",
            buffer.iter().map(|t| t.unavailable_actions_mask.as_ref()),
            &device,
        )?;
        let action_probs = self.variant.current_policy_probability(
            self.actor,
            &PolicyInput {
                states: &history,
                actions: &actions,
                available_actions: available_actions.as_ref(),
                unavailable_actions_mask: unavailable_actions_mask.as_ref(),
            },
        )?;

        let rewards: Vec<f32> = buffer.iter().map(|t| t.reward).collect();
        let terminated: Vec<bool> = buffer.iter().map(|t| t.terminated).collect();
        let (advantages, lambda_returns) = gae_backward(
            &rewards,
            &terminated,
            &values[..n],
            values[n],
            self.discount_factor,
            self.trace_decay,
        )?;

        for (i, transition) in buffer.iter_mut().enumerate().rev() {
            let mut placed = DevicePlacement::acquire(transition, &device)?;
            placed.gae = Some(Tensor::new(&[advantages[i]], &device)?);
            placed.lam_return = Some(Tensor::new(&[lambda_returns[i]], &device)?);
            placed.action_probs = Some(action_probs.narrow(0, i, 1)?);
            placed.release()?;
        }
        debug!("Computed advantages of {} transitions", n);

        Ok(())
    }
}
