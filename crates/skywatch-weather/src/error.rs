//! Weather-specific error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length for error response bodies kept in error messages
const MAX_ERROR_BODY_LENGTH: usize = 300;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

impl WeatherError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        };
        Self::Status {
            status: status.as_u16(),
            body,
        }
    }

    /// Network, status and parse failures all count as one "fetch failed" condition.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Status { .. } | Self::Malformed(_)
        )
    }

    /// User-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(e) if e.is_timeout() => {
                "The weather service timed out. Showing the last known data.".to_string()
            }
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::Status { status, .. } if *status == 400 => "City not found.".to_string(),
            Self::Status { status, .. } if *status == 401 || *status == 403 => {
                "Weather API key is invalid. Check settings.".to_string()
            }
            Self::Status { status, .. } => format!("Weather service returned {}.", status),
            Self::Malformed(_) => "Received unexpected weather data.".to_string(),
            Self::Storage(_) => "Failed to save your favorites.".to_string(),
            Self::InvalidSetting(msg) => format!("Invalid setting: {}", msg),
        }
    }
}

/// Category of a failed fetch, kept alongside cached data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    Network,
    Timeout,
    Status(u16),
    Malformed,
}

/// Cloneable snapshot of a fetch error, stored per city and sent with change events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&WeatherError> for FetchFailure {
    fn from(err: &WeatherError) -> Self {
        let kind = match err {
            WeatherError::Network(e) if e.is_timeout() => FailureKind::Timeout,
            WeatherError::Network(_) => FailureKind::Network,
            WeatherError::Status { status, .. } => FailureKind::Status(*status),
            WeatherError::Malformed(_)
            | WeatherError::Storage(_)
            | WeatherError::InvalidSetting(_) => FailureKind::Malformed,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}
