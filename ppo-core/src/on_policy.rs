//! Generic optimization loop of on-policy actor-critic learners.
mod config;
use crate::{
    error::CoreError,
    record::{Record, RecordValue},
    ReplayBufferBase,
};
use anyhow::Result;
pub use config::OnPolicyOptimizerConfig;
use log::trace;

/// Gradient updates of an actor-critic learner on a single batch.
///
/// The learner computes its own losses; [`OnPolicyOptimizer`] only decides
/// how many updates are applied and on which batches.
pub trait ActorCriticStep<B> {
    /// Computes the actor loss on `batch`, applies a gradient step to the
    /// actor and returns the value of the loss.
    fn actor_step(&mut self, batch: &B) -> Result<f32>;

    /// Computes the critic loss on `batch`, applies a gradient step to the
    /// critic and returns the value of the loss.
    ///
    /// Returns `None` when the learner does not train a critic.
    fn critic_step(&mut self, batch: &B) -> Result<Option<f32>>;
}

/// Runs a fixed number of training rounds over a buffer.
///
/// Each round samples a batch from the buffer, then applies an actor update
/// followed by a critic update on that batch. No target networks are
/// involved, so nothing is synchronized between rounds.
#[derive(Debug, Clone)]
pub struct OnPolicyOptimizer {
    training_rounds: usize,
    batch_size: usize,
}

impl OnPolicyOptimizer {
    /// Constructs the optimization loop.
    pub fn build(config: &OnPolicyOptimizerConfig) -> Self {
        Self {
            training_rounds: config.training_rounds,
            batch_size: config.batch_size,
        }
    }

    /// The number of training rounds per call of [`run`](Self::run).
    pub fn training_rounds(&self) -> usize {
        self.training_rounds
    }

    /// The size of the batches sampled from the buffer.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Applies `training_rounds` updates of `learner` with batches taken from `buffer`.
    ///
    /// The returned record contains `loss_actor`, `loss_critic` (only when
    /// the learner trains a critic), both averaged over the rounds, and
    /// `n_opts`.
    pub fn run<R, L>(&self, learner: &mut L, buffer: &mut R) -> Result<Record>
    where
        R: ReplayBufferBase,
        L: ActorCriticStep<R::Batch>,
    {
        if self.training_rounds == 0 {
            return Err(CoreError::InvalidOptSetting("training_rounds is 0".to_string()).into());
        }
        if self.batch_size == 0 {
            return Err(CoreError::InvalidOptSetting("batch_size is 0".to_string()).into());
        }

        let mut loss_actor = 0f32;
        let mut loss_critic: Option<f32> = None;

        for _ in 0..self.training_rounds {
            trace!("batch()");
            let batch = buffer.batch(self.batch_size)?;

            trace!("actor_step()");
            loss_actor += learner.actor_step(&batch)?;

            trace!("critic_step()");
            if let Some(loss) = learner.critic_step(&batch)? {
                *loss_critic.get_or_insert(0f32) += loss;
            }
        }

        let n = self.training_rounds as f32;
        let mut record = Record::from_slice(&[
            ("loss_actor", RecordValue::Scalar(loss_actor / n)),
            ("n_opts", RecordValue::Scalar(n)),
        ]);
        if let Some(loss_critic) = loss_critic {
            record.insert("loss_critic", RecordValue::Scalar(loss_critic / n));
        }

        Ok(record)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct CountingBuffer {
        batches: usize,
    }

    impl ReplayBufferBase for CountingBuffer {
        type Config = ();
        type Batch = usize;

        fn build(_config: &Self::Config) -> Result<Self> {
            Ok(Self { batches: 0 })
        }

        fn batch(&mut self, size: usize) -> Result<Self::Batch> {
            self.batches += 1;
            Ok(size)
        }
    }

    struct FixedLosses {
        with_critic: bool,
        actor_calls: usize,
    }

    impl ActorCriticStep<usize> for FixedLosses {
        fn actor_step(&mut self, batch: &usize) -> Result<f32> {
            self.actor_calls += 1;
            Ok(*batch as f32)
        }

        fn critic_step(&mut self, _batch: &usize) -> Result<Option<f32>> {
            Ok(self.with_critic.then(|| self.actor_calls as f32))
        }
    }

    #[test]
    fn test_run_averages_losses() -> Result<()> {
        let config = OnPolicyOptimizerConfig::default()
            .training_rounds(4)
            .batch_size(8);
        let opt = OnPolicyOptimizer::build(&config);
        let mut buffer = CountingBuffer::build(&())?;
        let mut learner = FixedLosses {
            with_critic: true,
            actor_calls: 0,
        };

        let record = opt.run(&mut learner, &mut buffer)?;

        assert_eq!(buffer.batches, 4);
        assert_eq!(learner.actor_calls, 4);
        assert_eq!(record.get_scalar("loss_actor")?, 8.0);
        // critic losses are 1, 2, 3, 4
        assert_eq!(record.get_scalar("loss_critic")?, 2.5);
        assert_eq!(record.get_scalar("n_opts")?, 4.0);

        Ok(())
    }

    #[test]
    fn test_run_without_critic() -> Result<()> {
        let opt = OnPolicyOptimizer::build(&OnPolicyOptimizerConfig::default().training_rounds(2));
        let mut buffer = CountingBuffer::build(&())?;
        let mut learner = FixedLosses {
            with_critic: false,
            actor_calls: 0,
        };

        let record = opt.run(&mut learner, &mut buffer)?;
        assert!(record.get("loss_critic").is_none());

        Ok(())
    }

    #[test]
    fn test_zero_rounds_is_rejected() {
        let opt = OnPolicyOptimizer::build(&OnPolicyOptimizerConfig::default().training_rounds(0));
        let mut buffer = CountingBuffer { batches: 0 };
        let mut learner = FixedLosses {
            with_critic: false,
            actor_calls: 0,
        };

        assert!(opt.run(&mut learner, &mut buffer).is_err());
        assert_eq!(buffer.batches, 0);
    }
}
