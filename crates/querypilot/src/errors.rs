use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request failed: {status}: {message}")]
    Transport { status: u16, message: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Remote error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Whether a forced credential refresh and one retry may fix this error.
    ///
    /// Matches HTTP 401, explicit authentication failures, and any message that
    /// mentions "unauthorized", "authentication" or "token".
    pub fn is_authentication(&self) -> bool {
        match self {
            AgentError::Authentication(_) => true,
            AgentError::Transport { status: 401, .. } => true,
            AgentError::Configuration(_) | AgentError::InvalidRequest(_) => false,
            other => {
                let message = other.to_string().to_lowercase();
                ["unauthorized", "authentication", "token"]
                    .iter()
                    .any(|needle| message.contains(needle))
            }
        }
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => AgentError::Transport {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None if err.is_decode() => AgentError::InvalidResponse(err.to_string()),
            None => AgentError::Connection(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::InvalidResponse(err.to_string())
    }
}

pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_401_is_authentication() {
        let err = AgentError::Transport {
            status: 401,
            message: "".to_string(),
        };
        assert!(err.is_authentication());
    }

    #[test]
    fn test_message_heuristic() {
        let err = AgentError::Protocol {
            code: -32001,
            message: "Access token expired".to_string(),
        };
        assert!(err.is_authentication());

        let err = AgentError::Transport {
            status: 403,
            message: "Unauthorized client".to_string(),
        };
        assert!(err.is_authentication());
    }

    #[test]
    fn test_unrelated_errors_are_not_authentication() {
        let err = AgentError::Transport {
            status: 500,
            message: "Internal Server Error".to_string(),
        };
        assert!(!err.is_authentication());
        assert!(!AgentError::Configuration("missing token".to_string()).is_authentication());
        assert!(!AgentError::Connection("connection refused".to_string()).is_authentication());
    }

    #[test]
    fn test_display() {
        let err = AgentError::Transport {
            status: 502,
            message: "Bad Gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed: 502: Bad Gateway");
    }
}
