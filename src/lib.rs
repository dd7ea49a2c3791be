// Library surface shared by the binary and the integration tests.
pub mod app_dirs;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod history;
pub mod input_policy;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod sink;
pub mod stats;
pub mod time_series;

pub use error::{AppError, Result};

/// Default session length
pub const SESSION_SECS: u64 = 60;
/// Period of the countdown driver
pub const COUNTDOWN_INTERVAL_MS: u64 = 1000;
/// Period of the live sampling driver
pub const SAMPLE_INTERVAL_MS: u64 = 500;
/// How long the runner waits for input when no session driver is armed
pub const IDLE_POLL_MS: u64 = 100;
