//! Core functionalities.
mod config;
mod learner;
mod replay_buffer;
pub use config::Configurable;
pub use learner::PolicyLearner;
pub use replay_buffer::{ExperienceBufferBase, ReplayBufferBase};
