//! Interface of neural networks used in the learner.
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::VarBuilder;
use std::path::{Path, PathBuf};

/// Neural network model not owing its [`VarMap`] internally.
///
/// [`VarMap`]: https://docs.rs/candle-nn/0.8.4/candle_nn/var_map/struct.VarMap.html
pub trait SubModel1 {
    /// Configuration from which [`SubModel1`] is constructed.
    type Config;

    /// Input of the [`SubModel1`].
    type Input;

    /// Output of the [`SubModel1`].
    type Output;

    /// Builds [`SubModel1`] with [`VarBuilder`] and [`SubModel1::Config`].
    ///
    /// [`VarBuilder`]: https://docs.rs/candle-nn/0.8.4/candle_nn/var_builder/type.VarBuilder.html
    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// A generalized forward function.
    fn forward(&self, input: &Self::Input) -> Result<Self::Output>;
}

/// A network owning its parameters and optimizer.
pub trait Trainable {
    /// Applies a gradient step minimizing `loss`.
    fn backward_step(&mut self, loss: &Tensor) -> Result<()>;

    /// Saves the parameters to `prefix` + ".pt" and returns the path.
    fn save(&self, prefix: &Path) -> Result<PathBuf>;

    /// Loads the parameters from `prefix` + ".pt".
    fn load(&mut self, prefix: &Path) -> Result<()>;
}
