use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use querypilot::errors::AgentError;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Turn a dotted settings key like `gateway.endpoint` into the environment
/// variable that sets it
pub fn to_env_var(field: &str) -> String {
    format!("QUERYPILOT_{}", field.replace('.', "__").to_uppercase())
}

/// Errors returned from route handlers, rendered as `{"error": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Agent(err) => match err {
                AgentError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
                AgentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                AgentError::Transport { .. }
                | AgentError::Connection(_)
                | AgentError::Protocol { .. }
                | AgentError::Authentication(_)
                | AgentError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Invalid(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
