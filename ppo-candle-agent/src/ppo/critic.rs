use super::{PpoError, PpoTransitionBatch};
use crate::value::StateValue;
use anyhow::Result;
use candle_core::Tensor;

/// Mean squared error between critic values and lambda-returns.
///
/// `batch.state` must hold summarized states.
pub fn critic_loss<C: StateValue + ?Sized>(critic: &C, batch: &PpoTransitionBatch) -> Result<Tensor> {
    let target = batch
        .lam_return
        .as_ref()
        .ok_or(PpoError::MissingField("lam_return"))?;
    let values = critic.value(&batch.state)?;
    let target = target.to_device(values.device())?.detach();
    Ok(candle_nn::loss::mse(&values, &target)?)
}
