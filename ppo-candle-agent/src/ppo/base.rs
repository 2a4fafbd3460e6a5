//! PPO learner.
use super::{
    critic_loss, ActionSpace, ContinuousPpo, DiscretePpo, PpoConfig, PpoReplayBuffer,
    PpoTransitionBatch, PpoVariant, Preprocessor,
};
use crate::{
    actor::{
        CategoricalActor, CategoricalActorConfig, GaussianActor, GaussianActorConfig,
        StochasticPolicy,
    },
    mlp::{Mlp, Mlp2, MlpConfig},
    model::Trainable,
    repr::{
        ActionRepresentation, HistorySummarizer, IdentityActionRepresentation, IdentityHistory,
        OneHotActionRepresentation,
    },
    value::{StateValue, Value, ValueConfig},
};
use anyhow::{bail, Result};
use candle_core::{DType, Tensor};
use log::{debug, info, trace};
use ppo_core::{
    record::Record, ActorCriticStep, Configurable, OnPolicyOptimizer, PolicyLearner,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// PPO learner with MLP networks for discrete actions.
pub type DiscretePpoLearner = Ppo<DiscretePpo<CategoricalActor<Mlp>>>;

/// PPO learner with MLP networks for continuous actions.
pub type ContinuousPpoLearner = Ppo<ContinuousPpo<GaussianActor<Mlp2>>>;

/// Proximal policy optimization.
///
/// A learning call first annotates the whole trajectory buffer with
/// advantages, lambda-returns and the action probabilities of the current
/// policy, then runs [`OnPolicyOptimizer`] on batches sampled from it.
pub struct Ppo<V, C = Value<Mlp>>
where
    V: PpoVariant,
    C: StateValue,
{
    variant: V,
    actor: V::Actor,
    critic: Option<C>,
    summarizer: Box<dyn HistorySummarizer>,
    action_representation: Box<dyn ActionRepresentation>,
    opt: OnPolicyOptimizer,
    discount_factor: f32,
    trace_decay: f32,
    train: bool,
    n_learns: usize,
}

impl<V, C> Ppo<V, C>
where
    V: PpoVariant,
    C: StateValue,
{
    /// Assembles the learner from caller-provided networks.
    ///
    /// Discount factor, trace decay and the optimization loop are taken from
    /// `config`. States are summarized with [`IdentityHistory`]; actions are
    /// one-hot encoded for discrete action spaces and passed through otherwise.
    pub fn from_parts(
        variant: V,
        actor: V::Actor,
        critic: Option<C>,
        config: &PpoConfig,
    ) -> Self {
        let action_representation: Box<dyn ActionRepresentation> = match config.action_space {
            ActionSpace::Discrete { n } => Box::new(OneHotActionRepresentation::new(n)),
            ActionSpace::Continuous { .. } => Box::new(IdentityActionRepresentation),
        };

        Self {
            variant,
            actor,
            critic,
            summarizer: Box::new(IdentityHistory),
            action_representation,
            opt: OnPolicyOptimizer::build(&config.on_policy_config()),
            discount_factor: config.discount_factor,
            trace_decay: config.trace_decay,
            train: false,
            n_learns: 0,
        }
    }

    /// Replaces the history summarizer.
    pub fn summarizer(mut self, summarizer: Box<dyn HistorySummarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// Replaces the action representation.
    pub fn action_representation(mut self, repr: Box<dyn ActionRepresentation>) -> Self {
        self.action_representation = repr;
        self
    }

    /// Returns the actor.
    pub fn actor(&self) -> &V::Actor {
        &self.actor
    }

    /// Returns the critic, if any.
    pub fn critic(&self) -> Option<&C> {
        self.critic.as_ref()
    }

    /// Returns the number of completed learning calls.
    pub fn n_learns(&self) -> usize {
        self.n_learns
    }

    /// Samples actions for a batch of raw states, `[batch_size, ..]`.
    ///
    /// Actions are drawn from the policy in training mode and chosen
    /// deterministically in evaluation mode.
    pub fn sample_action(
        &mut self,
        states: &Tensor,
        available_actions: Option<&Tensor>,
        unavailable_actions_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let states = self.summarizer.summarize(states)?.detach();
        self.actor.sample(
            &states,
            available_actions,
            unavailable_actions_mask,
            self.train,
        )
    }

    /// Annotates the buffer with advantages, lambda-returns and action probabilities.
    pub fn preprocess_replay_buffer(&self, buffer: &mut PpoReplayBuffer) -> Result<()> {
        Preprocessor {
            variant: &self.variant,
            actor: &self.actor,
            critic: self.critic.as_ref().map(|c| c as &dyn StateValue),
            summarizer: self.summarizer.as_ref(),
            action_representation: self.action_representation.as_ref(),
            discount_factor: self.discount_factor,
            trace_decay: self.trace_decay,
        }
        .preprocess(buffer)
    }

    /// Summarizes states and represents actions of a sampled batch.
    fn represent(&self, batch: &PpoTransitionBatch) -> Result<PpoTransitionBatch> {
        let mut batch = batch.clone();
        batch.state = self.summarizer.summarize(&batch.state)?;
        batch.action = self.action_representation.represent(&batch.action)?;
        Ok(batch)
    }
}

fn to_f32(loss: &Tensor) -> Result<f32> {
    Ok(loss.to_dtype(DType::F32)?.to_scalar::<f32>()?)
}

impl<V, C> ActorCriticStep<PpoTransitionBatch> for Ppo<V, C>
where
    V: PpoVariant,
    C: StateValue,
{
    fn actor_step(&mut self, batch: &PpoTransitionBatch) -> Result<f32> {
        let batch = self.represent(batch)?;
        let loss = self.variant.actor_loss(&self.actor, &batch)?;
        self.actor.backward_step(&loss)?;
        to_f32(&loss)
    }

    fn critic_step(&mut self, batch: &PpoTransitionBatch) -> Result<Option<f32>> {
        if self.critic.is_none() {
            return Ok(None);
        }
        let batch = self.represent(batch)?;
        match self.critic.as_mut() {
            Some(critic) => {
                let loss = critic_loss(&*critic, &batch)?;
                critic.backward_step(&loss)?;
                Ok(Some(to_f32(&loss)?))
            }
            None => Ok(None),
        }
    }
}

impl<V, C> PolicyLearner<PpoReplayBuffer> for Ppo<V, C>
where
    V: PpoVariant,
    C: StateValue,
{
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn learn(&mut self, buffer: &mut PpoReplayBuffer) -> Result<Record> {
        trace!("preprocess_replay_buffer()");
        self.preprocess_replay_buffer(buffer)?;

        let opt = self.opt.clone();
        let record = opt.run(self, buffer)?;
        self.n_learns += 1;
        debug!("Learning call {}: {:?}", self.n_learns, record);

        Ok(record)
    }

    fn save_params(&self, path: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(path)?;
        let mut paths = vec![self.actor.save(&path.join("actor"))?];
        if let Some(critic) = &self.critic {
            paths.push(critic.save(&path.join("critic"))?);
        }
        info!("Save PPO parameters to {:?}", path);

        Ok(paths)
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.actor.load(&path.join("actor"))?;
        if let Some(critic) = &mut self.critic {
            critic.load(&path.join("critic"))?;
        }
        info!("Load PPO parameters from {:?}", path);

        Ok(())
    }
}

fn build_critic(config: &PpoConfig, device: &candle_core::Device) -> Result<Option<Value<Mlp>>> {
    if !config.use_critic {
        return Ok(None);
    }
    let value_config = ValueConfig::default()
        .value_config(MlpConfig::new(
            config.state_dim,
            config.critic_hidden_dims.clone(),
            1,
            false,
        ))
        .opt_config(
            config
                .opt_config
                .clone()
                .learning_rate(config.critic_learning_rate),
        );
    Ok(Some(Value::build(value_config, device.clone())?))
}

impl Configurable for DiscretePpoLearner {
    type Config = PpoConfig;

    /// Builds the learner with a categorical MLP actor.
    fn build(config: PpoConfig) -> Result<Self> {
        let n_actions = match config.action_space {
            ActionSpace::Discrete { n } => n,
            ActionSpace::Continuous { .. } => {
                bail!("Discrete PPO requires a discrete action space")
            }
        };
        let device = config.device.unwrap_or_default().to_candle()?;
        let actor_config = CategoricalActorConfig::default()
            .policy_config(MlpConfig::new(
                config.state_dim,
                config.actor_hidden_dims.clone(),
                n_actions,
                false,
            ))
            .opt_config(
                config
                    .opt_config
                    .clone()
                    .learning_rate(config.actor_learning_rate),
            )
            .seed(config.seed);
        let actor = CategoricalActor::build(actor_config, device.clone())?;
        let critic = build_critic(&config, &device)?;
        let variant = DiscretePpo::new(config.epsilon, config.entropy_bonus_scaling);
        info!("Build discrete PPO with {} actions", n_actions);

        Ok(Self::from_parts(variant, actor, critic, &config))
    }
}

impl Configurable for ContinuousPpoLearner {
    type Config = PpoConfig;

    /// Builds the learner with a Gaussian MLP actor.
    fn build(config: PpoConfig) -> Result<Self> {
        let action_dim = match config.action_space {
            ActionSpace::Continuous { dim } => dim,
            ActionSpace::Discrete { .. } => {
                bail!("Continuous PPO requires a continuous action space")
            }
        };
        let device = config.device.unwrap_or_default().to_candle()?;
        let actor_config = GaussianActorConfig::default()
            .policy_config(MlpConfig::new(
                config.state_dim,
                config.actor_hidden_dims.clone(),
                action_dim,
                false,
            ))
            .opt_config(
                config
                    .opt_config
                    .clone()
                    .learning_rate(config.actor_learning_rate),
            );
        let actor = GaussianActor::build(actor_config, device.clone())?;
        let critic = build_critic(&config, &device)?;
        let variant = ContinuousPpo::new(
            config.epsilon,
            config.entropy_bonus_scaling,
            config.normalize_gae,
        );
        info!("Build continuous PPO with action dimension {}", action_dim);

        Ok(Self::from_parts(variant, actor, critic, &config))
    }
}
