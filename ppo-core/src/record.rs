//! Summaries of learning steps.
//!
//! A [`Record`] is a set of named values returned by
//! [`PolicyLearner::learn`](crate::PolicyLearner::learn), typically the
//! losses averaged over the training rounds of one learning call.
//!
//! ```rust
//! use ppo_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("loss_actor", 0.25);
//! record.insert("loss_critic", RecordValue::Scalar(1.5));
//! assert_eq!(record.get_scalar("loss_critic").unwrap(), 1.5);
//! ```
mod base;
pub use base::{Record, RecordValue};
