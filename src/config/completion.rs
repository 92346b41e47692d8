use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Blocking wait parameters shared by every synchronous operation
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CompletionConfig {
    /// How long a caller waits for the callback of one request
    #[serde(default = "default_callback_timeout_in_ms")]
    pub callback_timeout_in_ms: u64,

    /// Upper bound on how long a dead event loop goes unnoticed by a waiter
    #[serde(default = "default_poll_interval_in_ms")]
    pub poll_interval_in_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            callback_timeout_in_ms: default_callback_timeout_in_ms(),
            poll_interval_in_ms: default_poll_interval_in_ms(),
        }
    }
}

impl CompletionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.callback_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "completion.callback_timeout_in_ms must be > 0".into(),
            )));
        }

        if self.poll_interval_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "completion.poll_interval_in_ms must be > 0".into(),
            )));
        }

        Ok(())
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            timeout: Duration::from_millis(self.callback_timeout_in_ms),
            poll_interval: Duration::from_millis(self.poll_interval_in_ms),
        }
    }
}

/// Deadline and liveness-check cadence of one blocking wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitPolicy {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..CompletionConfig::default().wait_policy()
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        CompletionConfig::default().wait_policy()
    }
}

// 2 minutes
fn default_callback_timeout_in_ms() -> u64 {
    120_000
}
fn default_poll_interval_in_ms() -> u64 {
    100
}
