//! Policy learner.
use crate::record::Record;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// A trainable policy that learns from the experiences in a buffer `R`.
pub trait PolicyLearner<R> {
    /// Set the learner to training mode.
    fn train(&mut self);

    /// Set the learner to evaluation mode.
    fn eval(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Performs a learning call on the experiences in `buffer`.
    ///
    /// On-policy learners may annotate the experiences in place before
    /// updating their parameters, hence the mutable borrow.
    fn learn(&mut self, buffer: &mut R) -> Result<Record>;

    /// Saves the parameters of the learner in the given directory and
    /// returns the paths of the written files.
    fn save_params(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Loads the parameters of the learner from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
