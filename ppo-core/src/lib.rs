#![warn(missing_docs)]
//! Core abstractions of on-policy reinforcement learning.
//!
//! This crate is independent of any tensor backend. It provides
//!
//! * [`record`] - named summaries returned by learning calls,
//! * buffer traits ([`ExperienceBufferBase`], [`ReplayBufferBase`]),
//! * the [`PolicyLearner`] trait implemented by learning agents,
//! * the generic optimization loop [`OnPolicyOptimizer`], which drives
//!   an [`ActorCriticStep`] implementation for a number of training rounds.
pub mod error;
pub mod record;

mod base;
pub use base::{Configurable, ExperienceBufferBase, PolicyLearner, ReplayBufferBase};

mod on_policy;
pub use on_policy::{ActorCriticStep, OnPolicyOptimizer, OnPolicyOptimizerConfig};
