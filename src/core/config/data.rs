use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::request::ApiEndpoint;
use crate::core::retry::{finite_unit, RetryPolicy};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_APP_NAME: &str = "routechat";
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// Backoff knobs for non-streaming calls, stored in the `[retry]` table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first request
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Fraction (0..1) by which backoff delays are randomly widened or narrowed
    pub jitter_ratio: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            jitter_ratio: policy.jitter_ratio,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        let base_delay = Duration::from_millis(settings.base_delay_ms);
        RetryPolicy {
            max_attempts: settings.max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_millis(settings.max_delay_ms).max(base_delay),
            jitter_ratio: finite_unit(settings.jitter_ratio, 0.0),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// API base URL (e.g., "https://openrouter.ai/api/v1")
    pub base_url: Option<String>,
    /// Sent as the `X-Title` client identification header
    pub app_name: Option<String>,
    /// Sent as the `HTTP-Referer` header when present
    pub referer: Option<String>,
    pub default_model: Option<String>,
    /// Events buffered between the network task and the consumer
    pub stream_buffer: Option<usize>,
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Config {
    pub fn endpoint(&self) -> ApiEndpoint {
        ApiEndpoint {
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            app_name: self
                .app_name
                .clone()
                .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            referer: self.referer.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }

    pub fn stream_buffer(&self) -> usize {
        self.stream_buffer.unwrap_or(DEFAULT_STREAM_BUFFER).max(1)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}

/// Render a path for display, abbreviating the home directory as `~`.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
