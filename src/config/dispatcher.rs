use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Background event loop parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DispatcherConfig {
    /// Name given to the event loop thread
    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    /// Upper bound on how long `start` waits for the loop to report running
    #[serde(default = "default_start_timeout_in_ms")]
    pub start_timeout_in_ms: u64,

    /// How often `start` re-checks whether it should keep waiting
    #[serde(default = "default_start_poll_interval_in_ms")]
    pub start_poll_interval_in_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            start_timeout_in_ms: default_start_timeout_in_ms(),
            start_poll_interval_in_ms: default_start_poll_interval_in_ms(),
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.thread_name.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "dispatcher.thread_name cannot be empty".into(),
            )));
        }

        if self.start_poll_interval_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "dispatcher.start_poll_interval_in_ms must be > 0".into(),
            )));
        }

        if self.start_timeout_in_ms < self.start_poll_interval_in_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "dispatcher.start_timeout_in_ms {}ms should be at least start_poll_interval_in_ms {}ms",
                self.start_timeout_in_ms, self.start_poll_interval_in_ms
            ))));
        }

        Ok(())
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_in_ms)
    }

    pub fn start_poll_interval(&self) -> Duration {
        Duration::from_millis(self.start_poll_interval_in_ms)
    }
}

fn default_thread_name() -> String {
    "gatt-event-loop".to_string()
}
// 60 polls of one second
fn default_start_timeout_in_ms() -> u64 {
    60_000
}
fn default_start_poll_interval_in_ms() -> u64 {
    1_000
}
