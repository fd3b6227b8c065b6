//! Minimal environment used by the host and transport tests

use crate::environment::Environment;
use async_trait::async_trait;
use rl_env_core::{Action, ActionSpace, EnvError, Experience, Result, Sensation};

/// Counts down from `start`; action 0 decrements, action 1 waits
pub struct CountdownEnv {
    start: i64,
    value: i64,
    ready: bool,
    pub resets: u32,
    pub shutdowns: u32,
}

impl CountdownEnv {
    pub fn new(start: i64) -> Self {
        Self {
            start,
            value: start,
            ready: false,
            resets: 0,
            shutdowns: 0,
        }
    }
}

#[async_trait]
impl Environment for CountdownEnv {
    async fn sensation(&mut self) -> Result<Sensation> {
        Ok(vec![self.value as f64])
    }

    async fn apply(&mut self, action: &Action) -> Result<f64> {
        self.action_space().validate(action)?;
        if !self.ready {
            return Err(EnvError::Precondition("apply before reset".into()));
        }
        match action {
            Action::Discrete(0) => {
                self.value -= 1;
                Ok(1.0)
            }
            _ => Ok(-1.0),
        }
    }

    fn terminal(&mut self) -> bool {
        self.value <= 0
    }

    async fn reset(&mut self) -> Result<()> {
        self.value = self.start;
        self.ready = true;
        self.resets += 1;
        Ok(())
    }

    fn min_max_features(&self) -> (Vec<f64>, Vec<f64>) {
        (vec![0.0], vec![self.start as f64])
    }

    fn min_max_reward(&self) -> (f64, f64) {
        (-1.0, 1.0)
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete { n: 2, names: None }
    }

    fn is_episodic(&self) -> bool {
        true
    }

    fn title(&self) -> String {
        "Environment: Countdown".into()
    }

    async fn seedings(&mut self) -> Result<Vec<Experience>> {
        Ok(vec![Experience {
            from_state: vec![self.start as f64],
            action: Action::Discrete(0),
            reward: 1.0,
            to_state: vec![(self.start - 1) as f64],
            terminal: self.start == 1,
        }])
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.shutdowns += 1;
        Ok(())
    }
}
