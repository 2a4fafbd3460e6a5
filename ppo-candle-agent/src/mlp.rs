//! Multilayer perceptron.
mod base;
mod config;
mod mlp2;
use anyhow::Result;
pub use base::Mlp;
use candle_core::Tensor;
use candle_nn::{linear, Linear, Module, VarBuilder};
pub use config::MlpConfig;
pub use mlp2::Mlp2;

/// Returns linear layers mapping `in_dim` through the hidden `units`.
///
/// If `out_dim` is given, an output layer is appended.
fn create_linear_layers(
    vb: &VarBuilder,
    in_dim: usize,
    units: &[usize],
    out_dim: Option<usize>,
) -> Result<Vec<Linear>> {
    let dims: Vec<usize> = std::iter::once(in_dim)
        .chain(units.iter().copied())
        .chain(out_dim)
        .collect();
    let vb = vb.pp("mlp");

    dims.windows(2)
        .enumerate()
        .map(|(i, w)| Ok(linear(w[0], w[1], vb.pp(format!("ln{}", i)))?))
        .collect()
}

/// Applies the layers with ReLU between them.
fn mlp_forward(xs: Tensor, layers: &[Linear], relu_last: bool) -> Result<Tensor> {
    let n_layers = layers.len();
    let mut xs = xs;

    for (i, layer) in layers.iter().enumerate() {
        xs = layer.forward(&xs)?;
        if i + 1 < n_layers || relu_last {
            xs = xs.relu()?;
        }
    }

    Ok(xs)
}
