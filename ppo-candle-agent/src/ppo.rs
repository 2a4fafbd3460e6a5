//! Proximal policy optimization.
//!
//! A rollout is collected into a [`PpoReplayBuffer`]. [`Ppo::learn`] then
//!
//! 1. runs the [`Preprocessor`], which stores the advantage, the
//!    lambda-return and the action probability of the current policy on
//!    every transition, and
//! 2. optimizes the actor with the clipped surrogate objective of the
//!    [`PpoVariant`] and the critic with [`critic_loss`] on sampled batches.
//!
//! [`Ppo::learn`]: ppo_core::PolicyLearner::learn
mod base;
mod buffer;
mod config;
mod continuous;
mod critic;
mod discrete;
mod error;
mod gae;
mod placement;
mod transition;
mod variant;
pub use base::{ContinuousPpoLearner, DiscretePpoLearner, Ppo};
pub use buffer::{PpoReplayBuffer, PpoReplayBufferConfig};
pub use config::{ActionSpace, PpoConfig};
pub use continuous::{normalize_advantages, ContinuousPpo};
pub use critic::critic_loss;
pub use discrete::DiscretePpo;
pub use error::PpoError;
pub use gae::{gae_backward, Preprocessor};
pub use placement::DevicePlacement;
pub use transition::{PpoTransition, PpoTransitionBatch};
pub use variant::{PolicyInput, PpoVariant};
