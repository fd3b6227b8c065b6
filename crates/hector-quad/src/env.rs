//! Quadrotor environment

use crate::config::QuadConfig;
use crate::engagement::{Engagement, EngagementPhase};
use crate::retry::retrying;
use crate::sensing::{self, SensingStrategy};
use crate::state::StateTracker;
use crate::task::QuadTask;
use crate::trajectory::Target;
use async_trait::async_trait;
use rl_env_core::{Action, ActionSpace, EnvError, Experience, Result, Sensation};
use rl_env_server::{EnvOptions, Environment};
use serde::Deserialize;
use sim_bridge::{BodySample, BridgeConfig, BridgeLink, SimulatorLink};
use tracing::{debug, info, warn};

/// One recorded transition in a seed file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordedTransition {
    pub from: BodySample,
    pub to: BodySample,
    /// Elapsed physics steps at `from`
    pub step: u64,
    pub action: Action,
}

/// Quadrotor environment driving a simulator link
pub struct QuadEnvironment {
    config: QuadConfig,
    link: Box<dyn SimulatorLink>,
    sensing: Box<dyn SensingStrategy>,
    engagement: Engagement,
    tracker: StateTracker,
    canonical: BodySample,
    /// Consecutive in-tolerance samples
    dwell: u64,
    /// Decisions applied since the last reset
    decisions: u64,
    options: EnvOptions,
}

impl QuadEnvironment {
    /// Connect to the simulator and build the environment
    pub async fn connect(config: QuadConfig, bridge: BridgeConfig, options: EnvOptions) -> Result<Self> {
        let link = BridgeLink::connect(bridge).await?;
        Self::new(config, Box::new(link), options).await
    }

    /// Build the environment over an existing link.
    ///
    /// Loads the actuation controller; the first `reset` engages it.
    pub async fn new(
        config: QuadConfig,
        mut link: Box<dyn SimulatorLink>,
        options: EnvOptions,
    ) -> Result<Self> {
        config.validate()?;
        let sensing = sensing::for_mode(config.sensing, link.as_ref(), config.decision_period())?;

        let mut engagement = Engagement::new(config.engagement.clone());
        engagement.load(link.as_mut()).await?;

        let canonical = BodySample::at_rest(config.start_position, config.start_yaw);
        info!(
            "{} ready: sensing={}, steps/decision={}, seed={:?}",
            config.task.title(),
            sensing.mode(),
            config.steps_per_decision,
            options.seed
        );

        Ok(Self {
            tracker: StateTracker::new(canonical),
            config,
            link,
            sensing,
            engagement,
            canonical,
            dwell: 0,
            decisions: 0,
            options,
        })
    }

    pub fn config(&self) -> &QuadConfig {
        &self.config
    }

    pub fn options(&self) -> EnvOptions {
        self.options
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    pub fn engagement_phase(&self) -> EngagementPhase {
        self.engagement.phase()
    }

    /// Target at the current elapsed step count
    pub fn target(&self) -> Target {
        self.config.trajectory.target_at(self.tracker.elapsed_steps())
    }

    fn take_sample(&mut self, sample: BodySample) {
        self.tracker.record(sample);
        let target = self.target();
        if self.config.task.converged(&self.config, &sample, &target) {
            self.dwell += 1;
        } else {
            self.dwell = 0;
        }
    }

    /// Convert a recorded transition with the live observation and reward functions
    fn seed_experience(&self, transition: &RecordedTransition) -> Result<Experience> {
        let task = self.config.task;
        task.action_space(&self.config).validate(&transition.action)?;

        let from_target = self.config.trajectory.target_at(transition.step);
        let to_target = self
            .config
            .trajectory
            .target_at(transition.step + u64::from(self.config.steps_per_decision));

        Ok(Experience {
            from_state: task.observe(&transition.from, &from_target),
            action: transition.action.clone(),
            reward: task.reward(&self.config, &transition.from, &transition.to, &to_target),
            to_state: task.observe(&transition.to, &to_target),
            terminal: task.out_of_bounds(&self.config, &transition.to, &to_target),
        })
    }
}

#[async_trait]
impl Environment for QuadEnvironment {
    async fn sensation(&mut self) -> Result<Sensation> {
        if let Some(sample) = self.sensing.poll() {
            self.take_sample(sample);
        }
        Ok(self.config.task.observe(self.tracker.current(), &self.target()))
    }

    async fn apply(&mut self, action: &Action) -> Result<f64> {
        self.action_space().validate(action)?;

        let retry = self.config.retry;
        self.engagement
            .ensure_running(self.link.as_mut(), &retry)
            .await?;

        // Samples already on the feed predate this decision's command
        if let Some(sample) = self.sensing.poll() {
            self.take_sample(sample);
        }
        let before = *self.tracker.current();

        let command = self.config.task.command(&self.config, action)?;
        retrying!(&retry, "Command", self.link.publish_command(&command));

        let advance = self
            .sensing
            .advance(
                self.link.as_mut(),
                &self.config.model,
                self.config.steps_per_decision,
                &retry,
            )
            .await?;
        self.tracker.advance(advance.steps);
        if let Some(sample) = advance.sample {
            self.take_sample(sample);
        }
        self.decisions += 1;

        // Without a new sample the decision shows no transition
        let reward = self.config.task.reward(
            &self.config,
            &before,
            self.tracker.current(),
            &self.target(),
        );
        debug!(
            "Decision {}: {:?} -> reward {:.3} (t={})",
            self.decisions,
            action,
            reward,
            self.tracker.elapsed_steps()
        );
        Ok(reward)
    }

    fn terminal(&mut self) -> bool {
        let target = self.target();
        let task = self.config.task;
        match task {
            QuadTask::Altitude => self.dwell >= self.config.dwell_samples,
            QuadTask::PoseTracking => {
                task.out_of_bounds(&self.config, self.tracker.current(), &target)
                    || (self.config.max_decisions > 0
                        && self.decisions >= self.config.max_decisions)
            }
        }
    }

    async fn reset(&mut self) -> Result<()> {
        let retry = self.config.retry;
        self.engagement.shutdown(self.link.as_mut(), &retry).await?;

        // Place the body while physics is paused
        retrying!(&retry, "PausePhysics", self.link.pause_physics());
        retrying!(&retry, "ResetWorld", self.link.reset_world());
        retrying!(
            &retry,
            "SetModelState",
            self.link.set_model_state(&self.config.model, &self.canonical)
        );

        self.tracker.reset(self.canonical);
        self.dwell = 0;
        self.decisions = 0;

        self.engagement.engage(self.link.as_mut(), &retry).await?;
        self.sensing.on_reset(self.link.as_mut(), &retry).await?;

        info!("Reset complete at {:?}", self.canonical.position);
        Ok(())
    }

    fn min_max_features(&self) -> (Vec<f64>, Vec<f64>) {
        self.config.task.feature_bounds(&self.config)
    }

    fn min_max_reward(&self) -> (f64, f64) {
        self.config.task.reward_bounds(&self.config)
    }

    fn action_space(&self) -> ActionSpace {
        self.config.task.action_space(&self.config)
    }

    fn is_episodic(&self) -> bool {
        true
    }

    fn title(&self) -> String {
        self.config.task.title().to_string()
    }

    async fn seedings(&mut self) -> Result<Vec<Experience>> {
        let Some(path) = self.config.seed_file.clone() else {
            return Ok(Vec::new());
        };

        let data = tokio::fs::read(&path).await.map_err(|e| {
            EnvError::Config(format!("Failed to read seed file {}: {}", path.display(), e))
        })?;
        let transitions: Vec<RecordedTransition> = serde_json::from_slice(&data)
            .map_err(|e| EnvError::Config(format!("Invalid seed file {}: {}", path.display(), e)))?;

        let seeds = transitions
            .iter()
            .map(|t| self.seed_experience(t))
            .collect::<Result<Vec<_>>>()?;
        info!("Loaded {} seed experiences from {}", seeds.len(), path.display());
        Ok(seeds)
    }

    async fn shutdown(&mut self) -> Result<()> {
        let retry = self.config.retry;
        if let Err(e) = self.engagement.shutdown(self.link.as_mut(), &retry).await {
            warn!("Controller shutdown failed: {}", e);
        }
        self.link.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryPolicy, SensingMode};
    use crate::mock::{MockHandle, MockSimulator};
    use glam::DVec3;

    fn fast(mut config: QuadConfig) -> QuadConfig {
        config.decision_period_ms = 20;
        config.engagement.poll_initial_ms = 1;
        config.engagement.poll_max_ms = 2;
        config.engagement.timeout_ms = 200;
        config.retry = RetryPolicy {
            initial_ms: 1,
            max_ms: 2,
            max_attempts: 4,
        };
        config
    }

    async fn build(config: QuadConfig) -> (QuadEnvironment, MockHandle) {
        let (sim, handle) = MockSimulator::new();
        let env = QuadEnvironment::new(fast(config), Box::new(sim), EnvOptions::default())
            .await
            .unwrap();
        (env, handle)
    }

    fn at_height(z: f64) -> BodySample {
        BodySample::at_rest(DVec3::new(0.0, 0.0, z), 0.0)
    }

    /// Have the simulator publish a sample once the next command arrives
    fn respond_with(handle: &MockHandle, z: f64) {
        handle.with(|s| s.after_command.push_back(at_height(z)));
    }

    #[tokio::test]
    async fn test_apply_before_reset_is_fatal() {
        let (mut env, handle) = build(QuadConfig::altitude()).await;
        assert_eq!(env.engagement_phase(), EngagementPhase::Loaded);

        let err = env.apply(&Action::Discrete(0)).await.unwrap_err();
        assert!(matches!(err, EnvError::Precondition(_)));
        assert!(err.is_fatal());
        assert!(!handle.calls().contains(&"Command".to_string()));
    }

    #[tokio::test]
    async fn test_wrong_arity_is_fatal() {
        let (mut env, _handle) = build(QuadConfig::pose_tracking()).await;
        env.reset().await.unwrap();

        let err = env.apply(&Action::Continuous(vec![0.0; 3])).await.unwrap_err();
        assert!(matches!(err, EnvError::ActionArity { .. }));
        let err = env.apply(&Action::Discrete(1)).await.unwrap_err();
        assert!(matches!(err, EnvError::ActionArity { .. }));
    }

    #[tokio::test]
    async fn test_refused_controller_load_fails_construction() {
        let (sim, handle) = MockSimulator::new();
        handle.with(|s| s.refuse_load = true);

        let result = QuadEnvironment::new(fast(QuadConfig::altitude()), Box::new(sim), EnvOptions::default()).await;
        assert!(matches!(result, Err(EnvError::ControllerLoad { .. })));
    }

    #[tokio::test]
    async fn test_reset_pauses_before_placing_body() {
        let (mut env, handle) = build(QuadConfig::altitude()).await;
        env.reset().await.unwrap();

        let calls = handle.calls();
        let position = |name: &str| calls.iter().position(|c| c == name).unwrap();
        assert!(position("PausePhysics") < position("ResetWorld"));
        assert!(position("ResetWorld") < position("SetModelState"));
        assert!(position("SetModelState") < position("ListControllers"));
        // Ground-truth sensing resumes physics only once the controller runs
        assert!(position("ListControllers") < position("UnpausePhysics"));
        assert_eq!(env.engagement_phase(), EngagementPhase::Running);
    }

    #[tokio::test]
    async fn test_reset_twice_gives_same_observation() {
        let (mut env, _handle) = build(QuadConfig::pose_tracking()).await;

        env.reset().await.unwrap();
        let first = env.sensation().await.unwrap();
        env.apply(&Action::Continuous(vec![1.0, 0.0, 1.0, 0.5])).await.unwrap();
        env.reset().await.unwrap();
        env.reset().await.unwrap();
        let second = env.sensation().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(env.tracker().elapsed_steps(), 0);
    }

    #[tokio::test]
    async fn test_observation_sizes() {
        for config in [QuadConfig::altitude(), QuadConfig::pose_tracking()] {
            let expected = config.task.observation_len();
            let (mut env, handle) = build(config).await;
            env.reset().await.unwrap();

            let action = match env.action_space() {
                ActionSpace::Discrete { .. } => Action::Discrete(2),
                ActionSpace::Continuous { .. } => Action::Continuous(vec![0.0; 4]),
            };
            for z in [0.5, 1.0, 1.5] {
                respond_with(&handle, z);
                env.apply(&action).await.unwrap();
                assert_eq!(env.sensation().await.unwrap().len(), expected);
            }
            let (low, high) = env.min_max_features();
            assert_eq!(low.len(), expected);
            assert_eq!(high.len(), expected);
        }
    }

    #[tokio::test]
    async fn test_repeated_sensation_is_stable() {
        let (mut env, handle) = build(QuadConfig::altitude()).await;
        env.reset().await.unwrap();

        handle.push_sample(at_height(7.0));
        let first = env.sensation().await.unwrap();
        let second = env.sensation().await.unwrap();
        assert_eq!(first, vec![1.0, 0.0]);
        assert_eq!(first, second);
        assert_eq!(env.tracker().samples(), 1);
    }

    #[tokio::test]
    async fn test_altitude_dwell_end_to_end() {
        let config = QuadConfig {
            dwell_samples: 2,
            ..QuadConfig::altitude()
        };
        let (mut env, handle) = build(config).await;
        env.reset().await.unwrap();
        assert_eq!(env.target().position.z, 5.0);

        respond_with(&handle, 0.0);
        let reward = env.apply(&Action::Discrete(0)).await.unwrap();
        assert_eq!(reward, 0.0);
        assert_eq!(env.sensation().await.unwrap(), vec![0.0, 1.0]);
        assert!(!env.terminal());

        respond_with(&handle, 4.9);
        let reward = env.apply(&Action::Discrete(0)).await.unwrap();
        assert_eq!(reward, 1.0);
        assert!(!env.terminal());
        // No new sample: the dwell count must not advance
        assert!(!env.terminal());
        env.sensation().await.unwrap();
        assert!(!env.terminal());

        respond_with(&handle, 5.1);
        env.apply(&Action::Discrete(2)).await.unwrap();
        assert_eq!(env.sensation().await.unwrap(), vec![1.0, 0.0]);
        assert!(env.terminal());

        // Leaving the tolerance band resets the count
        respond_with(&handle, 6.0);
        let reward = env.apply(&Action::Discrete(1)).await.unwrap();
        assert_eq!(reward, -1.0);
        assert!(!env.terminal());
        assert_eq!(env.tracker().elapsed_steps(), 40);
    }

    #[tokio::test]
    async fn test_decision_without_new_sample_shows_no_transition() {
        let (mut env, handle) = build(QuadConfig::altitude()).await;
        env.reset().await.unwrap();

        handle.push_sample(at_height(4.9));
        env.sensation().await.unwrap();

        let first = env.apply(&Action::Discrete(1)).await.unwrap();
        let second = env.apply(&Action::Discrete(1)).await.unwrap();
        assert_eq!((first, second), (0.0, 0.0));
        assert_eq!(env.tracker().elapsed_steps(), 0);
        assert_eq!(env.tracker().samples(), 1);
    }

    #[tokio::test]
    async fn test_reward_compares_against_sample_before_command() {
        let (mut env, handle) = build(QuadConfig::altitude()).await;
        env.reset().await.unwrap();

        // Published before the command but never sensed by the agent
        handle.push_sample(at_height(3.0));
        respond_with(&handle, 2.5);
        let reward = env.apply(&Action::Discrete(1)).await.unwrap();

        assert_eq!(reward, -1.0);
        assert_eq!(env.tracker().previous().position.z, 3.0);
        assert_eq!(env.tracker().current().position.z, 2.5);
        assert_eq!(env.tracker().elapsed_steps(), 10);
    }

    #[tokio::test]
    async fn test_stale_sample_discarded_on_reset() {
        let (mut env, handle) = build(QuadConfig::altitude()).await;
        handle.push_sample(at_height(9.0));

        env.reset().await.unwrap();
        assert_eq!(env.sensation().await.unwrap(), vec![0.0, 1.0]);
        assert_eq!(env.tracker().samples(), 0);
    }

    #[tokio::test]
    async fn test_stepping_counts_elapsed_steps() {
        let (mut env, handle) = build(QuadConfig::pose_tracking()).await;
        env.reset().await.unwrap();
        handle.with(|s| s.failing_steps = 2);

        let action = Action::Continuous(vec![0.0, 0.0, 2.0, 0.0]);
        for _ in 0..3 {
            env.apply(&action).await.unwrap();
        }

        assert_eq!(env.tracker().elapsed_steps(), 30);
        assert_eq!(env.tracker().samples(), 3);
        assert_eq!(handle.with(|s| s.steps), 30);
        let step_calls = handle.calls().iter().filter(|c| *c == "Step(10)").count();
        assert_eq!(step_calls, 5);

        // Climbing at 2 m/s for 30 ms
        let z = env.tracker().current().position.z;
        assert!((z - 0.06).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_step_that_ran_before_timing_out_is_not_repeated() {
        let (mut env, handle) = build(QuadConfig::pose_tracking()).await;
        env.reset().await.unwrap();
        handle.with(|s| s.lagging_steps = 1);

        env.apply(&Action::Continuous(vec![0.0, 0.0, 2.0, 0.0]))
            .await
            .unwrap();

        assert_eq!(handle.with(|s| s.steps), 10);
        assert_eq!(env.tracker().elapsed_steps(), 10);
        let calls = handle.calls();
        assert_eq!(calls.iter().filter(|c| *c == "Step(10)").count(), 1);
        assert!(calls.iter().any(|c| c == "GetIteration"));

        // The next decision continues from the simulator's counter
        env.apply(&Action::Continuous(vec![0.0; 4])).await.unwrap();
        assert_eq!(handle.with(|s| s.steps), 20);
        assert_eq!(env.tracker().elapsed_steps(), 20);
    }

    #[tokio::test]
    async fn test_exhausted_step_retries_are_fatal() {
        let (mut env, handle) = build(QuadConfig::pose_tracking()).await;
        env.reset().await.unwrap();
        handle.with(|s| s.failing_steps = 100);

        let err = env
            .apply(&Action::Continuous(vec![0.0; 4]))
            .await
            .unwrap_err();
        assert!(matches!(err, EnvError::RetriesExhausted { attempts: 4, .. }));
        assert!(err.is_fatal());
        assert_eq!(env.tracker().elapsed_steps(), 0);
    }

    #[tokio::test]
    async fn test_pose_reward_and_workspace_bound() {
        let config = QuadConfig {
            position_bound: 3.0,
            ..QuadConfig::pose_tracking()
        };
        let (mut env, handle) = build(config).await;
        env.reset().await.unwrap();

        handle.with(|s| s.scripted.push_back(at_height(4.0)));
        let reward = env.apply(&Action::Continuous(vec![0.0; 4])).await.unwrap();
        // 1 m below the hover point, yaw error equal to the trajectory offset
        let yaw_offset = env.config().trajectory.yaw_offset;
        assert!((reward - (-1.0 - 10.0 * yaw_offset)).abs() < 1e-9);
        assert!(!env.terminal());

        handle.with(|s| s.scripted.push_back(at_height(1.0)));
        env.apply(&Action::Continuous(vec![0.0; 4])).await.unwrap();
        assert!(env.terminal());
    }

    #[tokio::test]
    async fn test_decision_budget_ends_pose_episode() {
        let config = QuadConfig {
            max_decisions: 2,
            start_position: DVec3::new(0.0, 0.0, 5.0),
            ..QuadConfig::pose_tracking()
        };
        let (mut env, _handle) = build(config).await;
        env.reset().await.unwrap();

        env.apply(&Action::Continuous(vec![0.0; 4])).await.unwrap();
        assert!(!env.terminal());
        env.apply(&Action::Continuous(vec![0.0; 4])).await.unwrap();
        assert!(env.terminal());
    }

    #[tokio::test]
    async fn test_description_bounds() {
        let (env, _handle) = build(QuadConfig::altitude()).await;
        let description = env.describe(true);
        assert_eq!(description.num_actions, 3);
        assert_eq!(description.num_states, 2);
        assert_eq!(description.min_state_range, vec![0.0, 0.0]);
        assert_eq!(description.max_state_range, vec![1.0, 1.0]);
        assert_eq!(description.max_reward, 1.0);
        assert_eq!(description.reward_range, 2.0);
        assert!(description.episodic);
    }

    #[tokio::test]
    async fn test_seedings_from_file() {
        let path = std::env::temp_dir().join(format!("hector-quad-seeds-{}.json", std::process::id()));
        let seeds = serde_json::json!([{
            "From": at_height(3.0),
            "To": at_height(4.0),
            "Step": 0,
            "Action": 0
        }]);
        std::fs::write(&path, serde_json::to_vec(&seeds).unwrap()).unwrap();

        let config = QuadConfig {
            seed_file: Some(path.clone()),
            ..QuadConfig::altitude()
        };
        let (mut env, _handle) = build(config).await;
        let experiences = env.seedings().await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(experiences.len(), 1);
        assert_eq!(experiences[0].from_state, vec![0.0, 1.0]);
        assert_eq!(experiences[0].to_state, vec![0.0, 1.0]);
        assert_eq!(experiences[0].reward, 1.0);
        assert!(!experiences[0].terminal);
    }

    #[tokio::test]
    async fn test_no_seed_file_gives_no_seedings() {
        let (mut env, _handle) = build(QuadConfig::pose_tracking()).await;
        assert!(env.seedings().await.unwrap().is_empty());
        assert_eq!(env.config().sensing, SensingMode::Stepping);
    }

    #[tokio::test]
    async fn test_shutdown_stops_controller_and_link() {
        let (mut env, handle) = build(QuadConfig::altitude()).await;
        env.reset().await.unwrap();
        env.shutdown().await.unwrap();

        assert!(!handle.with(|s| s.controller_running));
        assert_eq!(handle.calls().last().map(String::as_str), Some("Shutdown"));
        assert_eq!(env.engagement_phase(), EngagementPhase::Shutdown);
    }
}
