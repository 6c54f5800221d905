use serde::Serialize;
use thiserror::Error;

/// Failure of a single upstream call.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request timed out")]
    Timeout,

    #[error("request could not be sent: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request failed with status {status}")]
    Status {
        status: u16,
        /// `message` field of the provider's error payload, when present.
        message: Option<String>,
    },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response contained no data")]
    NoData,

    #[error("invalid timestamp {0} in response")]
    InvalidTimestamp(i64),
}

impl RequestError {
    /// Human-readable reason: the provider's own message if it sent one.
    pub fn message(&self) -> String {
        match self {
            RequestError::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestError::Timeout
        } else {
            RequestError::Transport(err)
        }
    }
}

/// Errors surfaced by a fetch cycle, ranked by how much they are allowed
/// to disturb what the user already sees.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FetchError {
    /// Blocks all fetching until fixed.
    #[error("{0}")]
    Configuration(String),

    /// Current conditions are missing; nothing can be shown.
    #[error("Failed to fetch weather data: {0}")]
    Mandatory(String),

    /// Forecast is missing; current conditions are still shown.
    #[error("Failed to fetch forecast: {0}")]
    Degraded(String),

    /// Historical data is missing. Never shown to the user.
    #[error("Historical data unavailable: {0}")]
    BestEffort(String),
}

impl FetchError {
    pub fn missing_api_key() -> Self {
        FetchError::Configuration(
            "Missing OpenWeather API key. Set OPENWEATHER_API_KEY or run `dashboard configure`."
                .to_string(),
        )
    }

    pub fn mandatory(err: &RequestError) -> Self {
        FetchError::Mandatory(err.message())
    }

    pub fn degraded(err: &RequestError) -> Self {
        FetchError::Degraded(err.message())
    }

    pub fn best_effort(err: &RequestError) -> Self {
        FetchError::BestEffort(err.message())
    }

    /// Whether this error replaces whatever the user is looking at.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Configuration(_) | FetchError::Mandatory(_))
    }
}

/// Device positioning failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    Unavailable,
    #[error("Location request timed out")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_message_wins_over_status_text() {
        let err = RequestError::Status {
            status: 401,
            message: Some("Invalid API key.".into()),
        };
        assert_eq!(err.message(), "Invalid API key.");
    }

    #[test]
    fn blank_provider_message_falls_back_to_generic() {
        let err = RequestError::Status {
            status: 502,
            message: Some("  ".into()),
        };
        assert_eq!(err.message(), "request failed with status 502");

        let err = RequestError::Status {
            status: 500,
            message: None,
        };
        assert_eq!(err.message(), "request failed with status 500");
    }

    #[test]
    fn mandatory_failures_are_prefixed() {
        let err = FetchError::mandatory(&RequestError::Status {
            status: 404,
            message: Some("city not found".into()),
        });
        assert_eq!(err.to_string(), "Failed to fetch weather data: city not found");
        assert!(err.is_fatal());
    }

    #[test]
    fn degraded_and_best_effort_are_not_fatal() {
        assert!(!FetchError::degraded(&RequestError::Timeout).is_fatal());
        assert!(!FetchError::best_effort(&RequestError::NoData).is_fatal());
        assert!(FetchError::missing_api_key().is_fatal());
    }
}
