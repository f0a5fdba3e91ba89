//! Error type shared by the client, the normalizer and the saved locations store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeteoError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("{endpoint} request failed with status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to parse {endpoint} response: {source}")]
    Validation {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Response is missing `{0}`")]
    MissingField(&'static str),

    #[error("Response has no value for `{field}` at index {index}")]
    MissingValue { field: &'static str, index: usize },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Current timestamp {0} not found in the 15-minute series")]
    TimestampNotFound(String),

    #[error("Forecast has {actual} hourly points, expected {expected}")]
    IncompleteForecast { expected: usize, actual: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode saved locations: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Stored saved locations are unreadable: {0}")]
    Decode(#[source] serde_json::Error),
}

impl MeteoError {
    /// Network unreachable, timeout or a non-success HTTP status.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }

    /// The provider answered, but not in the shape we expected.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::MissingField(_)
                | Self::MissingValue { .. }
                | Self::InvalidTimestamp(_)
                | Self::TimestampNotFound(_)
        )
    }

    /// Short message suitable for UI display.
    pub fn user_message(&self) -> String {
        if self.is_transport() {
            return "Could not reach the weather service. Check your connection.".to_string();
        }
        if self.is_validation() {
            return "The weather service returned unexpected data.".to_string();
        }
        match self {
            Self::IncompleteForecast { .. } => {
                "The forecast for this location is incomplete. Try again later.".to_string()
            }
            Self::Io(_) | Self::Encode(_) => "Could not save your locations.".to_string(),
            Self::Decode(_) => "Your saved locations could not be read.".to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("{not json").unwrap_err()
    }

    #[test]
    fn status_is_transport() {
        let err = MeteoError::Status { endpoint: "forecast", status: 503, body: "down".into() };
        assert!(err.is_transport());
        assert!(!err.is_validation());
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn shape_errors_are_validation() {
        assert!(MeteoError::MissingField("hourly").is_validation());
        assert!(MeteoError::MissingValue { field: "hourly.time", index: 3 }.is_validation());
        assert!(MeteoError::TimestampNotFound("2024-01-01T00:00Z".into()).is_validation());
        let invalid = MeteoError::Validation { endpoint: "search", source: json_error() };
        assert!(invalid.is_validation());
    }

    #[test]
    fn storage_errors_are_neither() {
        let err = MeteoError::Decode(json_error());
        assert!(!err.is_transport());
        assert!(!err.is_validation());
        assert!(err.user_message().contains("could not be read"));
    }

    #[test]
    fn incomplete_forecast_message() {
        let err = MeteoError::IncompleteForecast { expected: 24, actual: 7 };
        assert_eq!(err.to_string(), "Forecast has 7 hourly points, expected 24");
        assert!(err.user_message().contains("incomplete"));
    }
}
