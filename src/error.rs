use thiserror::Error;

/// Errors surfaced by the estimator library
#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request to {url} failed with status {status}: {body}")]
    Api {
        status: u16,
        url: String,
        body: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Pricing error: {0}")]
    Pricing(String),

    #[error("Inventory error: {0}")]
    Inventory(String),
}

impl EstimatorError {
    /// Transport failures, throttling and server-side errors are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            EstimatorError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            EstimatorError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EstimatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = EstimatorError::Api {
            status: 403,
            url: "https://management.azure.com/subscriptions".to_string(),
            body: "AuthorizationFailed".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("AuthorizationFailed"));
    }

    #[test]
    fn test_retryable_statuses() {
        let throttled = EstimatorError::Api {
            status: 429,
            url: String::new(),
            body: String::new(),
        };
        let unavailable = EstimatorError::Api {
            status: 503,
            url: String::new(),
            body: String::new(),
        };
        let forbidden = EstimatorError::Api {
            status: 403,
            url: String::new(),
            body: String::new(),
        };
        assert!(throttled.is_retryable());
        assert!(unavailable.is_retryable());
        assert!(!forbidden.is_retryable());
        assert!(!EstimatorError::Config("x".to_string()).is_retryable());
    }
}
