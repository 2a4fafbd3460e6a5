//! History summarization and action representation.
//!
//! The learner never looks at raw states or raw actions directly. States are
//! passed through a [`HistorySummarizer`] and actions through an
//! [`ActionRepresentation`] before they reach the actor and the critic.
use anyhow::Result;
use candle_core::{DType, Tensor};

/// Maps a batch of raw states to summarized state representations.
///
/// Implementations must be usable in a detached pass, i.e., the learner may
/// call [`Tensor::detach`] on the output.
pub trait HistorySummarizer {
    /// Summarizes a batch of states, `[batch_size, ..]`.
    fn summarize(&self, states: &Tensor) -> Result<Tensor>;
}

/// Passes states through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHistory;

impl HistorySummarizer for IdentityHistory {
    fn summarize(&self, states: &Tensor) -> Result<Tensor> {
        Ok(states.clone())
    }
}

/// Maps raw actions to the representation consumed by the actor.
pub trait ActionRepresentation {
    /// Encodes a batch of actions.
    fn represent(&self, actions: &Tensor) -> Result<Tensor>;
}

/// Passes actions through unchanged, e.g., continuous actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityActionRepresentation;

impl ActionRepresentation for IdentityActionRepresentation {
    fn represent(&self, actions: &Tensor) -> Result<Tensor> {
        Ok(actions.clone())
    }
}

/// Encodes discrete action indices as one-hot vectors.
///
/// Input actions hold indices of shape `[batch_size]` or `[batch_size, 1]`,
/// of any dtype. The output has shape `[batch_size, n_actions]` and dtype `f32`.
#[derive(Debug, Clone, Copy)]
pub struct OneHotActionRepresentation {
    n_actions: usize,
}

impl OneHotActionRepresentation {
    /// Creates the encoder for `n_actions` discrete actions.
    pub fn new(n_actions: usize) -> Self {
        Self { n_actions }
    }
}

impl ActionRepresentation for OneHotActionRepresentation {
    fn represent(&self, actions: &Tensor) -> Result<Tensor> {
        let device = actions.device();
        let indices = actions.flatten_all()?.to_dtype(DType::U32)?.unsqueeze(1)?;
        let classes = Tensor::arange(0u32, self.n_actions as u32, device)?.unsqueeze(0)?;
        Ok(indices.broadcast_eq(&classes)?.to_dtype(DType::F32)?)
    }
}
