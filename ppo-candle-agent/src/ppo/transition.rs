//! Transition records and batches.
use super::PpoError;
use anyhow::Result;
use candle_core::{Device, Tensor};

/// One environment step with the annotations computed before optimization.
///
/// `state` has shape `[state_dim]` and `action` has shape `[action_dim]`;
/// a discrete action is stored as its index, `[1]`. Availability tensors
/// have shape `[n_actions]`. The annotations `gae`, `lam_return` and
/// `action_probs` have shape `[1]`; for continuous actions `action_probs`
/// holds the log density of the action.
#[derive(Debug, Clone)]
pub struct PpoTransition {
    /// Observed state.
    pub state: Tensor,

    /// Taken action.
    pub action: Tensor,

    /// Received reward.
    pub reward: f32,

    /// State after the action, if known.
    pub next_state: Option<Tensor>,

    /// Whether the episode terminated by this step.
    pub terminated: bool,

    /// Nonzero entries mark actions available in `state`.
    pub available_actions: Option<Tensor>,

    /// Nonzero entries mark actions unavailable in `state`.
    pub unavailable_actions_mask: Option<Tensor>,

    /// Generalized advantage estimate.
    pub gae: Option<Tensor>,

    /// Truncated lambda-return.
    pub lam_return: Option<Tensor>,

    /// Probability (or log density) of the action under the policy at preprocessing time.
    pub action_probs: Option<Tensor>,
}

fn move_opt(t: &mut Option<Tensor>, device: &Device) -> Result<()> {
    if let Some(x) = t.as_mut() {
        *x = x.to_device(device)?;
    }
    Ok(())
}

impl PpoTransition {
    /// Creates a transition without availability information and annotations.
    pub fn new(
        state: Tensor,
        action: Tensor,
        reward: f32,
        next_state: Option<Tensor>,
        terminated: bool,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            terminated,
            available_actions: None,
            unavailable_actions_mask: None,
            gae: None,
            lam_return: None,
            action_probs: None,
        }
    }

    /// Sets the available actions.
    pub fn available_actions(mut self, v: Tensor) -> Self {
        self.available_actions = Some(v);
        self
    }

    /// Sets the mask of unavailable actions.
    pub fn unavailable_actions_mask(mut self, v: Tensor) -> Self {
        self.unavailable_actions_mask = Some(v);
        self
    }

    /// Returns the device on which the transition lives.
    pub fn device(&self) -> &Device {
        self.state.device()
    }

    /// Moves every tensor of the transition to `device`.
    pub fn move_to(&mut self, device: &Device) -> Result<()> {
        self.state = self.state.to_device(device)?;
        self.action = self.action.to_device(device)?;
        move_opt(&mut self.next_state, device)?;
        move_opt(&mut self.available_actions, device)?;
        move_opt(&mut self.unavailable_actions_mask, device)?;
        move_opt(&mut self.gae, device)?;
        move_opt(&mut self.lam_return, device)?;
        move_opt(&mut self.action_probs, device)?;
        Ok(())
    }
}

/// Transitions stacked along a leading batch axis.
///
/// `reward`, `terminated` (1.0 for terminated steps) and the annotations
/// have shape `[batch_size]`.
#[derive(Debug, Clone)]
pub struct PpoTransitionBatch {
    /// States, `[batch_size, ..]`.
    pub state: Tensor,

    /// Actions, `[batch_size, ..]`.
    pub action: Tensor,

    /// Rewards.
    pub reward: Tensor,

    /// Next states, present if every transition has one.
    pub next_state: Option<Tensor>,

    /// Termination flags.
    pub terminated: Tensor,

    /// Available actions, `[batch_size, n_actions]`.
    pub available_actions: Option<Tensor>,

    /// Unavailable actions, `[batch_size, n_actions]`.
    pub unavailable_actions_mask: Option<Tensor>,

    /// Advantages.
    pub gae: Option<Tensor>,

    /// Lambda-returns.
    pub lam_return: Option<Tensor>,

    /// Recorded action probabilities or log densities.
    pub action_probs: Option<Tensor>,
}

/// Stacks a field that every transition must either have or lack.
pub(super) fn stack_all_or_none<'a>(
    name: &str,
    items: impl Iterator<Item = Option<&'a Tensor>>,
    device: &Device,
) -> Result<Option<Tensor>> {
    let items: Vec<_> = items.collect();
    match items.iter().filter(|t| t.is_some()).count() {
        0 => Ok(None),
        n if n == items.len() => {
            let t = stack_tensors(items.into_iter().flatten(), name)?;
            Ok(Some(t.to_device(device)?))
        }
        _ => Err(PpoError::InconsistentSchema(format!(
            "{} is set on some transitions only",
            name
        ))
        .into()),
    }
}

/// Concatenates a `[1]`-shaped annotation if every transition carries it.
fn cat_if_all<'a>(
    items: impl Iterator<Item = Option<&'a Tensor>>,
    device: &Device,
) -> Result<Option<Tensor>> {
    match items.collect::<Option<Vec<&Tensor>>>() {
        Some(ts) => Ok(Some(Tensor::cat(&ts, 0)?.to_device(device)?)),
        None => Ok(None),
    }
}

impl PpoTransitionBatch {
    /// Stacks the given transitions on `device`.
    ///
    /// Availability tensors must be present on all transitions or on none.
    /// An annotation is kept only if every transition carries it.
    pub fn from_transitions(transitions: &[&PpoTransition], device: &Device) -> Result<Self> {
        if transitions.is_empty() {
            return Err(PpoError::EmptyBuffer.into());
        }
        let state = stack_tensors(transitions.iter().map(|t| &t.state), "state")?;
        let action = stack_tensors(transitions.iter().map(|t| &t.action), "action")?;
        let reward: Vec<f32> = transitions.iter().map(|t| t.reward).collect();
        let terminated: Vec<f32> = transitions
            .iter()
            .map(|t| if t.terminated { 1.0 } else { 0.0 })
            .collect();
        let next_state = match transitions.iter().all(|t| t.next_state.is_some()) {
            true => stack_all_or_none(
                "next_state",
                transitions.iter().map(|t| t.next_state.as_ref()),
                device,
            )?,
            false => None,
        };

        Ok(Self {
            state: state.to_device(device)?,
            action: action.to_device(device)?,
            reward: Tensor::new(reward.as_slice(), device)?,
            next_state,
            terminated: Tensor::new(terminated.as_slice(), device)?,
            available_actions: stack_all_or_none(
                "available_actions",
                transitions.iter().map(|t| t.available_actions.as_ref()),
                device,
            )?,
            unavailable_actions_mask: stack_all_or_none(
                "unavailable_actions_mask",
                transitions.iter().map(|t| t.unavailable_actions_mask.as_ref()),
                device,
            )?,
            gae: cat_if_all(transitions.iter().map(|t| t.gae.as_ref()), device)?,
            lam_return: cat_if_all(transitions.iter().map(|t| t.lam_return.as_ref()), device)?,
            action_probs: cat_if_all(transitions.iter().map(|t| t.action_probs.as_ref()), device)?,
        })
    }

    /// Returns the number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.reward.dims()[0]
    }

    /// Returns `true` if the batch has no transition.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stacks tensors after checking that they have the same shape.
pub(super) fn stack_tensors<'a>(
    ts: impl Iterator<Item = &'a Tensor>,
    name: &str,
) -> Result<Tensor> {
    let ts: Vec<&Tensor> = ts.collect();
    if let Some(first) = ts.first() {
        if let Some(t) = ts.iter().find(|t| t.dims() != first.dims()) {
            return Err(PpoError::InconsistentSchema(format!(
                "{} has shapes {:?} and {:?}",
                name,
                first.dims(),
                t.dims()
            ))
            .into());
        }
    }
    Ok(Tensor::stack(&ts, 0)?)
}

#[cfg(test)]
mod test {
    use super::*;

    fn transition(v: f32, terminated: bool) -> Result<PpoTransition> {
        let dev = Device::Cpu;
        Ok(PpoTransition::new(
            Tensor::new(&[v, v], &dev)?,
            Tensor::new(&[1f32], &dev)?,
            v,
            Some(Tensor::new(&[v + 1.0, v + 1.0], &dev)?),
            terminated,
        ))
    }

    #[test]
    fn test_batch_layout() -> Result<()> {
        let mut t1 = transition(1.0, false)?;
        let mut t2 = transition(2.0, true)?;
        t1.gae = Some(Tensor::new(&[0.5f32], &Device::Cpu)?);
        t2.gae = Some(Tensor::new(&[-0.5f32], &Device::Cpu)?);
        t1.lam_return = Some(Tensor::new(&[1f32], &Device::Cpu)?);

        let batch = PpoTransitionBatch::from_transitions(&[&t1, &t2], &Device::Cpu)?;

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.state.dims(), &[2, 2]);
        assert_eq!(batch.action.dims(), &[2, 1]);
        assert_eq!(batch.terminated.to_vec1::<f32>()?, vec![0.0, 1.0]);
        let gae = batch.gae.as_ref().map(|t| t.to_vec1::<f32>()).transpose()?;
        assert_eq!(gae, Some(vec![0.5, -0.5]));
        // only one of the transitions has a lambda-return
        assert!(batch.lam_return.is_none());
        assert!(batch.action_probs.is_none());
        assert!(batch.available_actions.is_none());

        Ok(())
    }

    #[test]
    fn test_partial_availability_is_inconsistent() -> Result<()> {
        let t1 = transition(1.0, false)?
            .available_actions(Tensor::new(&[1f32, 0.], &Device::Cpu)?);
        let t2 = transition(2.0, false)?;

        let err = PpoTransitionBatch::from_transitions(&[&t1, &t2], &Device::Cpu).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PpoError>(),
            Some(PpoError::InconsistentSchema(_))
        ));

        Ok(())
    }

    #[test]
    fn test_mixed_state_widths_are_inconsistent() -> Result<()> {
        let t1 = transition(1.0, false)?;
        let mut t2 = transition(2.0, false)?;
        t2.state = Tensor::new(&[1f32, 2., 3.], &Device::Cpu)?;

        let err = PpoTransitionBatch::from_transitions(&[&t1, &t2], &Device::Cpu).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PpoError>(),
            Some(PpoError::InconsistentSchema(_))
        ));

        Ok(())
    }
}
