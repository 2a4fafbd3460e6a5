//! Probability distributions over actions.
use anyhow::Result;
use candle_core::{Tensor, D};

const LN_2PI: f64 = 1.8378770664093453;

/// Diagonal Gaussian distribution, batched over the first axis.
#[derive(Debug, Clone)]
pub struct DiagGaussian {
    mean: Tensor,
    log_std: Tensor,
}

impl DiagGaussian {
    /// Creates the distribution from `[batch_size, action_dim]` parameters.
    pub fn new(mean: Tensor, log_std: Tensor) -> Self {
        Self { mean, log_std }
    }

    /// Returns the mean.
    pub fn mean(&self) -> &Tensor {
        &self.mean
    }

    /// Returns the log standard deviation.
    pub fn log_std(&self) -> &Tensor {
        &self.log_std
    }

    /// Returns the log density of `actions`, summed over action dimensions.
    ///
    /// The shape of the output is `[batch_size]`.
    pub fn log_prob(&self, actions: &Tensor) -> Result<Tensor> {
        let actions = actions.to_device(self.mean.device())?;
        let z = ((actions - &self.mean)? / self.log_std.exp()?)?;
        let logp = ((z.sqr()? * -0.5)? - &self.log_std)?.affine(1.0, -0.5 * LN_2PI)?;
        Ok(logp.sum(D::Minus1)?)
    }

    /// Returns the entropy summed over action dimensions, `[batch_size]`.
    pub fn entropy(&self) -> Result<Tensor> {
        let h = self.log_std.affine(1.0, 0.5 + 0.5 * LN_2PI)?;
        Ok(h.sum(D::Minus1)?)
    }

    /// Draws a sample with the reparameterization `mean + std * eps`.
    pub fn sample(&self) -> Result<Tensor> {
        let eps = self.mean.randn_like(0.0, 1.0)?;
        Ok((&self.mean + (self.log_std.exp()? * eps)?)?)
    }
}

/// Entropy of categorical distributions given as rows of probabilities.
///
/// The shape of the output is `[batch_size]`.
pub fn categorical_entropy(probs: &Tensor) -> Result<Tensor> {
    let log_probs = probs.clamp(1e-12f32, 1f32)?.log()?;
    Ok((probs * log_probs)?.sum(D::Minus1)?.neg()?)
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::Device;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{} != {}", a, b);
    }

    #[test]
    fn test_standard_normal() -> Result<()> {
        let dev = Device::Cpu;
        let dist = DiagGaussian::new(
            Tensor::zeros((1, 2), candle_core::DType::F32, &dev)?,
            Tensor::zeros((1, 2), candle_core::DType::F32, &dev)?,
        );

        let logp = dist.log_prob(&Tensor::new(&[[0f32, 1.0]], &dev)?)?;
        let expected = -(LN_2PI as f32) - 0.5;
        assert_close(logp.to_vec1::<f32>()?[0], expected);

        let entropy = dist.entropy()?.to_vec1::<f32>()?[0];
        assert_close(entropy, 1.0 + LN_2PI as f32);

        Ok(())
    }

    #[test]
    fn test_shifted_scaled() -> Result<()> {
        let dev = Device::Cpu;
        let log_std = 0.5f32.ln();
        let dist = DiagGaussian::new(
            Tensor::new(&[[1f32]], &dev)?,
            Tensor::new(&[[log_std]], &dev)?,
        );

        // z = (2 - 1) / 0.5 = 2
        let logp = dist.log_prob(&Tensor::new(&[[2f32]], &dev)?)?.to_vec1::<f32>()?[0];
        assert_close(logp, -2.0 - log_std - 0.5 * LN_2PI as f32);

        Ok(())
    }

    #[test]
    fn test_categorical_entropy() -> Result<()> {
        let probs = Tensor::new(&[[0.5f32, 0.5, 0.0], [1.0, 0.0, 0.0]], &Device::Cpu)?;
        let h = categorical_entropy(&probs)?.to_vec1::<f32>()?;
        assert_close(h[0], 2f32.ln());
        assert_close(h[1], 0.0);
        Ok(())
    }
}
