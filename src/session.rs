use std::time::{Duration, SystemTime};

use crate::stats::{SessionResult, Stats};
use crate::time_series::Sample;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub duration_secs: u64,
}

impl SessionConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: crate::SESSION_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Finished,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub target: String,
    pub target_len: usize,
    pub input: String,
    pub phase: Phase,
    pub started_at: Option<SystemTime>,
    pub seconds_remaining: u64,
    pub samples: Vec<Sample>,
    // Latest sampled stats for the live display
    pub live: Stats,
    pub result: Option<SessionResult>,
}

impl SessionState {
    pub fn new(target: String, config: &SessionConfig) -> Self {
        let target_len = target.chars().count();
        Self {
            target,
            target_len,
            input: String::new(),
            phase: Phase::Idle,
            started_at: None,
            seconds_remaining: config.duration_secs,
            samples: Vec::new(),
            live: Stats::default(),
            result: None,
        }
    }

    pub fn input_len(&self) -> usize {
        self.input.chars().count()
    }
}
