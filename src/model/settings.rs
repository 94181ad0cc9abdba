use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Most save attempts a configured retry schedule may ask for.
pub const MAX_RETRY_ATTEMPTS: usize = 10;
/// Longest single wait between save attempts, in milliseconds.
pub const MAX_RETRY_DELAY_MS: u64 = 900;

/// Optional application settings from keyguide.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub feedback: FeedbackSettings,
    #[serde(default)]
    pub defaults: DefaultSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Delay before each save attempt; one attempt per entry. Capped at
    /// [`MAX_RETRY_ATTEMPTS`] entries of at most [`MAX_RETRY_DELAY_MS`].
    #[serde(default = "default_retry_delays_ms")]
    pub retry_delays_ms: Vec<u64>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            retry_delays_ms: default_retry_delays_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSettings {
    /// How long the "copied" indicator stays up
    #[serde(default = "default_copy_feedback_ms")]
    pub copy_feedback_ms: u64,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        FeedbackSettings {
            copy_feedback_ms: default_copy_feedback_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSettings {
    /// Delimiter given to vendors that have none
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        DefaultSettings {
            delimiter: default_delimiter(),
        }
    }
}

fn default_retry_delays_ms() -> Vec<u64> {
    vec![0, 30, 60, 120, 250, 500, 900]
}

fn default_copy_feedback_ms() -> u64 {
    900
}

fn default_delimiter() -> String {
    super::config::DEFAULT_DELIMITER.to_string()
}

impl Settings {
    pub fn retry_delays(&self) -> Vec<Duration> {
        self.store
            .retry_delays_ms
            .iter()
            .take(MAX_RETRY_ATTEMPTS)
            .map(|ms| Duration::from_millis((*ms).min(MAX_RETRY_DELAY_MS)))
            .collect()
    }

    pub fn copy_feedback(&self) -> Duration {
        Duration::from_millis(self.feedback.copy_feedback_ms)
    }
}
