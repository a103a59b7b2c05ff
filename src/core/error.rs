use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Failures surfaced by the chat client.
///
/// Transport and HTTP failures are classified once, at the boundary, from the
/// status code and body. The variants carry enough structure for a consumer to
/// render a useful message without re-parsing raw HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    ApiKeyMissing,
    ApiKeyInvalid,
    NetworkUnavailable(String),
    RateLimited { retry_after_seconds: Option<u64> },
    InsufficientCredits,
    ModelUnavailable { model_id: String },
    ServerError { status: u16, message: String },
    Decoding(String),
    Streaming(String),
    InvalidConfiguration(String),
    Cancelled,
}

impl ChatError {
    /// Classify a non-success HTTP response.
    pub fn from_status(
        status: u16,
        body: &str,
        retry_after_seconds: Option<u64>,
        model_id: &str,
    ) -> Self {
        match status {
            401 => ChatError::ApiKeyInvalid,
            402 => ChatError::InsufficientCredits,
            429 => ChatError::RateLimited {
                retry_after_seconds,
            },
            503 => ChatError::ModelUnavailable {
                model_id: model_id.to_string(),
            },
            _ => ChatError::ServerError {
                status,
                message: summarize_error_body(body),
            },
        }
    }

    /// Whether a non-streaming call may re-issue the request after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::RateLimited { .. } | ChatError::ModelUnavailable { .. } => true,
            ChatError::ServerError { status, .. } => matches!(status, 502 | 504),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChatError::Cancelled)
    }

    /// Server-provided delay hint, when the error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ChatError::RateLimited {
                retry_after_seconds: Some(seconds),
            } => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::ApiKeyMissing => write!(f, "No API key configured"),
            ChatError::ApiKeyInvalid => write!(f, "The API key was rejected"),
            ChatError::NetworkUnavailable(detail) => write!(f, "Network unavailable: {detail}"),
            ChatError::RateLimited {
                retry_after_seconds: Some(seconds),
            } => write!(f, "Rate limited (retry after {seconds}s)"),
            ChatError::RateLimited {
                retry_after_seconds: None,
            } => write!(f, "Rate limited"),
            ChatError::InsufficientCredits => write!(f, "Insufficient credits"),
            ChatError::ModelUnavailable { model_id } => {
                write!(f, "Model {model_id} is currently unavailable")
            }
            ChatError::ServerError { status, message } => {
                write!(f, "Server error {status}: {message}")
            }
            ChatError::Decoding(detail) => write!(f, "Failed to decode response: {detail}"),
            ChatError::Streaming(detail) => write!(f, "Stream error: {detail}"),
            ChatError::InvalidConfiguration(detail) => {
                write!(f, "Invalid configuration: {detail}")
            }
            ChatError::Cancelled => write!(f, "Request cancelled"),
        }
    }
}

impl Error for ChatError {}

/// Pull a one-line summary out of an error body, falling back to the raw text.
pub(crate) fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&value) {
            if !summary.is_empty() {
                return summary;
            }
        }
    }

    collapse_whitespace(trimmed)
}

pub(crate) fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| collapse_whitespace(&text))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
