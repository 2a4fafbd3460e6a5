use anyhow::Result;
use candle_core::{Device, Tensor};
use ppo_candle_agent::{
    actor::DiscretePolicy,
    ppo::{
        ActionSpace, ContinuousPpoLearner, DiscretePpoLearner, PpoConfig, PpoReplayBuffer,
        PpoReplayBufferConfig, PpoTransition,
    },
};
use ppo_core::{Configurable, ExperienceBufferBase, PolicyLearner, ReplayBufferBase};
use tempdir::TempDir;

const DIM_OBS: usize = 2;
const N_ACTIONS: usize = 2;
const N_STEPS: usize = 32;
const N_LEARNS: usize = 5;
const TRAINING_ROUNDS: usize = 20;
const BATCH_SIZE: usize = 16;
const LR: f64 = 0.01;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn obs() -> Result<Tensor> {
    Ok(Tensor::new(&[[1f32, 0.5]], &Device::Cpu)?)
}

/// One-step episodes where action 1 is rewarded.
fn collect_bandit(learner: &mut DiscretePpoLearner, buffer: &mut PpoReplayBuffer) -> Result<()> {
    for _ in 0..N_STEPS {
        let state = obs()?;
        let action = learner.sample_action(&state, None, None)?.to_vec1::<u32>()?[0];
        let reward = if action == 1 { 1.0 } else { 0.0 };
        buffer.push(PpoTransition::new(
            state.squeeze(0)?,
            Tensor::new(&[action as f32], &Device::Cpu)?,
            reward,
            Some(state.squeeze(0)?),
            true,
        ))?;
    }
    Ok(())
}

fn prob_of_rewarded_action(learner: &DiscretePpoLearner) -> Result<f32> {
    let probs = learner.actor().action_distribution(&obs()?, None, None)?;
    Ok(probs.to_vec2::<f32>()?[0][1])
}

#[test]
fn test_discrete_ppo_prefers_rewarded_action() -> Result<()> {
    init_logger();
    let config = PpoConfig::new(DIM_OBS, ActionSpace::Discrete { n: N_ACTIONS })
        .actor_hidden_dims(vec![16])
        .critic_hidden_dims(vec![16])
        .actor_learning_rate(LR)
        .critic_learning_rate(LR)
        .epsilon(0.2)
        .training_rounds(TRAINING_ROUNDS)
        .batch_size(BATCH_SIZE);
    let mut learner = DiscretePpoLearner::build(config)?;
    let mut buffer = PpoReplayBuffer::build(&PpoReplayBufferConfig::default())?;
    learner.train();

    let p0 = prob_of_rewarded_action(&learner)?;
    for _ in 0..N_LEARNS {
        collect_bandit(&mut learner, &mut buffer)?;
        let record = learner.learn(&mut buffer)?;
        assert!(record.get_scalar("loss_actor")?.is_finite());
        assert!(record.get_scalar("loss_critic")?.is_finite());
        assert_eq!(record.get_scalar("n_opts")?, TRAINING_ROUNDS as f32);
        assert_eq!(buffer.len(), N_STEPS);
        buffer.clear();
    }
    let p1 = prob_of_rewarded_action(&learner)?;
    assert!(p1 > p0, "{} <= {}", p1, p0);
    assert_eq!(learner.n_learns(), N_LEARNS);

    // the greedy action in evaluation mode is the rewarded one once it dominates
    learner.eval();
    let action = learner.sample_action(&obs()?, None, None)?.to_vec1::<u32>()?[0];
    assert_eq!(action == 1, p1 > 0.5);

    Ok(())
}

#[test]
fn test_save_and_load_params() -> Result<()> {
    init_logger();
    let config = PpoConfig::new(DIM_OBS, ActionSpace::Discrete { n: N_ACTIONS })
        .actor_hidden_dims(vec![8])
        .critic_hidden_dims(vec![8]);
    let learner1 = DiscretePpoLearner::build(config.clone())?;
    let mut learner2 = DiscretePpoLearner::build(config)?;

    let dir = TempDir::new("ppo_params")?;
    let paths = learner1.save_params(dir.path())?;
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| p.exists()));

    learner2.load_params(dir.path())?;
    assert_eq!(
        prob_of_rewarded_action(&learner1)?,
        prob_of_rewarded_action(&learner2)?
    );

    Ok(())
}

#[test]
fn test_continuous_ppo_without_critic() -> Result<()> {
    init_logger();
    let config = PpoConfig::new(DIM_OBS, ActionSpace::Continuous { dim: 1 })
        .use_critic(false)
        .actor_hidden_dims(vec![8])
        .training_rounds(3)
        .batch_size(4);
    let mut learner = ContinuousPpoLearner::build(config)?;
    let mut buffer = PpoReplayBuffer::build(&PpoReplayBufferConfig::default().capacity(8))?;
    learner.train();

    for i in 0..8 {
        let state = obs()?;
        let action = learner.sample_action(&state, None, None)?;
        assert_eq!(action.dims(), &[1, 1]);
        buffer.push(PpoTransition::new(
            state.squeeze(0)?,
            action.squeeze(0)?,
            -action.sqr()?.sum_all()?.to_scalar::<f32>()?,
            Some(state.squeeze(0)?),
            i == 7,
        ))?;
    }

    let record = learner.learn(&mut buffer)?;
    assert!(record.get_scalar("loss_actor")?.is_finite());
    assert!(record.get("loss_critic").is_none());
    assert!(learner.critic().is_none());

    // every transition was annotated
    assert!(buffer
        .iter()
        .all(|t| t.gae.is_some() && t.lam_return.is_some() && t.action_probs.is_some()));

    Ok(())
}

#[test]
fn test_build_rejects_mismatched_action_space() {
    let config = PpoConfig::new(DIM_OBS, ActionSpace::Continuous { dim: 1 });
    assert!(DiscretePpoLearner::build(config).is_err());
}
