//! Actors.
//!
//! The learner consumes actors through [`DiscretePolicy`] and
//! [`ContinuousPolicy`]. [`CategoricalActor`] and [`GaussianActor`] are the
//! default implementations built on [`SubModel1`](crate::model::SubModel1) networks.
mod categorical;
mod distribution;
mod gaussian;
use crate::model::Trainable;
use anyhow::Result;
pub use categorical::{CategoricalActor, CategoricalActorConfig};
use candle_core::{Tensor, D};
pub use distribution::{categorical_entropy, DiagGaussian};
pub use gaussian::{GaussianActor, GaussianActorConfig};

/// A trainable policy from which actions can be drawn.
pub trait StochasticPolicy: Trainable {
    /// Samples actions for a batch of summarized states.
    ///
    /// If `train` is `false`, the action is chosen deterministically.
    fn sample(
        &mut self,
        states: &Tensor,
        available_actions: Option<&Tensor>,
        unavailable_actions_mask: Option<&Tensor>,
        train: bool,
    ) -> Result<Tensor>;
}

/// Policy over a finite set of actions.
pub trait DiscretePolicy: StochasticPolicy {
    /// Returns the action distribution, `[batch_size, n_actions]`.
    fn action_distribution(
        &self,
        states: &Tensor,
        available_actions: Option<&Tensor>,
        unavailable_actions_mask: Option<&Tensor>,
    ) -> Result<Tensor>;

    /// Returns the probability of the taken actions, `[batch_size]`.
    ///
    /// `actions` are one-hot encoded, `[batch_size, n_actions]`.
    fn action_probability(
        &self,
        states: &Tensor,
        actions: &Tensor,
        available_actions: Option<&Tensor>,
        unavailable_actions_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let probs = self.action_distribution(states, available_actions, unavailable_actions_mask)?;
        let actions = actions.to_device(probs.device())?;
        Ok((probs * actions)?.sum(D::Minus1)?)
    }
}

/// Policy over real-valued action vectors.
pub trait ContinuousPolicy: StochasticPolicy {
    /// Returns the action distribution for the given states.
    fn distribution(&self, states: &Tensor) -> Result<DiagGaussian>;

    /// Returns the log density of the taken actions, `[batch_size]`, and
    /// the distribution itself if `want_distribution` is `true`.
    fn log_probability(
        &self,
        states: &Tensor,
        actions: &Tensor,
        want_distribution: bool,
    ) -> Result<(Tensor, Option<DiagGaussian>)> {
        let dist = self.distribution(states)?;
        let logp = dist.log_prob(actions)?;
        Ok((logp, want_distribution.then_some(dist)))
    }
}
