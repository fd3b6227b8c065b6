//! Scripted in-memory simulator for tests

use async_trait::async_trait;
use glam::DQuat;
use sim_bridge::{BodySample, ControllerInfo, LinkError, LinkResult, SimulatorLink, TwistCommand};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Seconds of simulated time per physics step
const STEP_SECONDS: f64 = 0.001;

#[derive(Debug, Default)]
pub struct MockState {
    /// Every link call, by name
    pub calls: Vec<String>,
    pub sample: BodySample,
    pub paused: bool,
    pub steps: u64,
    pub last_command: Option<TwistCommand>,
    pub controller_loaded: bool,
    pub controller_running: bool,
    pub switch_requested: bool,
    /// Status polls answered "stopped" after a start request
    pub polls_until_running: u32,
    pending_polls: u32,
    pub never_run: bool,
    pub refuse_load: bool,
    /// Next `step` calls that time out before executing
    pub failing_steps: u32,
    /// Next `step` calls that execute, then time out
    pub lagging_steps: u32,
    /// Samples returned by `step` instead of integrating the command
    pub scripted: VecDeque<BodySample>,
    /// Ground-truth samples published in answer to successive commands
    pub after_command: VecDeque<BodySample>,
}

impl MockState {
    fn integrate(&mut self, steps: u32) {
        if let Some(next) = self.scripted.pop_front() {
            self.sample = next;
            return;
        }
        let command = match (self.controller_running, self.last_command) {
            (true, Some(command)) => command,
            _ => TwistCommand::ZERO,
        };
        let dt = STEP_SECONDS * f64::from(steps);
        self.sample.position += command.linear * dt;
        self.sample.linear_velocity = command.linear;
        self.sample.orientation =
            DQuat::from_rotation_z(command.angular.z * dt) * self.sample.orientation;
        self.sample.angular_velocity = command.angular;
    }
}

/// Test-side handle to the simulator state and ground-truth feed
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
    feed: watch::Sender<Option<BodySample>>,
}

impl MockHandle {
    pub fn with<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn calls(&self) -> Vec<String> {
        self.with(|s| s.calls.clone())
    }

    /// Publish a ground-truth sample
    pub fn push_sample(&self, sample: BodySample) {
        self.with(|s| s.sample = sample);
        self.feed.send_replace(Some(sample));
    }
}

pub struct MockSimulator {
    state: Arc<Mutex<MockState>>,
    feed: watch::Sender<Option<BodySample>>,
}

impl MockSimulator {
    pub fn new() -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let (feed, _) = watch::channel(None);
        let handle = MockHandle {
            state: state.clone(),
            feed: feed.clone(),
        };
        (Self { state, feed }, handle)
    }

    fn call<T>(&self, name: &str, f: impl FnOnce(&mut MockState) -> LinkResult<T>) -> LinkResult<T> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(name.to_string());
        f(&mut state)
    }
}

#[async_trait]
impl SimulatorLink for MockSimulator {
    async fn reset_world(&mut self) -> LinkResult<()> {
        self.call("ResetWorld", |s| {
            s.sample = BodySample::default();
            s.steps = 0;
            Ok(())
        })
    }

    async fn pause_physics(&mut self) -> LinkResult<()> {
        self.call("PausePhysics", |s| {
            s.paused = true;
            Ok(())
        })
    }

    async fn unpause_physics(&mut self) -> LinkResult<()> {
        self.call("UnpausePhysics", |s| {
            s.paused = false;
            Ok(())
        })
    }

    async fn step(&mut self, steps: u32) -> LinkResult<()> {
        self.call(&format!("Step({})", steps), |s| {
            if s.failing_steps > 0 {
                s.failing_steps -= 1;
                return Err(LinkError::Timeout {
                    request: "Step".into(),
                    timeout_ms: 1,
                });
            }
            s.steps += u64::from(steps);
            s.integrate(steps);
            if s.lagging_steps > 0 {
                s.lagging_steps -= 1;
                return Err(LinkError::Timeout {
                    request: "Step".into(),
                    timeout_ms: 1,
                });
            }
            Ok(())
        })
    }

    async fn iteration(&mut self) -> LinkResult<u64> {
        self.call("GetIteration", |s| Ok(s.steps))
    }

    async fn model_state(&mut self, _model: &str) -> LinkResult<BodySample> {
        self.call("GetModelState", |s| Ok(s.sample))
    }

    async fn set_model_state(&mut self, _model: &str, state: &BodySample) -> LinkResult<()> {
        let state = *state;
        self.call("SetModelState", move |s| {
            s.sample = state;
            Ok(())
        })
    }

    async fn load_controller(&mut self, _name: &str) -> LinkResult<bool> {
        self.call("LoadController", |s| {
            if s.refuse_load {
                return Ok(false);
            }
            s.controller_loaded = true;
            Ok(true)
        })
    }

    async fn list_controllers(&mut self) -> LinkResult<Vec<ControllerInfo>> {
        self.call("ListControllers", |s| {
            if !s.controller_loaded {
                return Ok(Vec::new());
            }
            if !s.controller_running && s.switch_requested && !s.never_run {
                if s.pending_polls == 0 {
                    s.controller_running = true;
                } else {
                    s.pending_polls -= 1;
                }
            }
            let state = if s.controller_running { "running" } else { "stopped" };
            Ok(vec![ControllerInfo {
                name: "controller/twist".into(),
                state: state.into(),
            }])
        })
    }

    async fn switch_controller(&mut self, start: &[String], stop: &[String]) -> LinkResult<bool> {
        let starting = !start.is_empty();
        let stopping = !stop.is_empty();
        self.call("SwitchController", |s| {
            if stopping {
                s.controller_running = false;
                s.switch_requested = false;
            }
            if starting && !s.switch_requested {
                s.switch_requested = true;
                s.pending_polls = s.polls_until_running;
            }
            Ok(true)
        })
    }

    async fn publish_command(&mut self, command: &TwistCommand) -> LinkResult<()> {
        let command = *command;
        let published = self.call("Command", move |s| {
            s.last_command = Some(command);
            let next = s.after_command.pop_front();
            if let Some(sample) = next {
                s.sample = sample;
            }
            Ok(next)
        })?;
        if let Some(sample) = published {
            self.feed.send_replace(Some(sample));
        }
        Ok(())
    }

    fn ground_truth(&self) -> Option<watch::Receiver<Option<BodySample>>> {
        Some(self.feed.subscribe())
    }

    async fn shutdown(&mut self) -> LinkResult<()> {
        self.call("Shutdown", |_| Ok(()))
    }
}
