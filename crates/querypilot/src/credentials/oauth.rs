use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::{Credential, TokenSource};
use crate::errors::{AgentError, AgentResult};

/// A fixed token, such as a personal access token, that never expires locally
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn acquire(&self) -> AgentResult<Credential> {
        if self.token.trim().is_empty() {
            return Err(AgentError::Configuration(
                "Gateway token is not configured".to_string(),
            ));
        }
        Ok(Credential::new(self.token.clone(), DateTime::<Utc>::MAX_UTC))
    }
}

/// Expiry `expires_in` seconds from now, saturating at the latest representable time
fn expiry_after(expires_in: u64) -> DateTime<Utc> {
    i64::try_from(expires_in)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// OAuth2 client credentials grant against a token endpoint
pub struct ClientCredentials {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
}

impl ClientCredentials {
    pub fn new(
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token_url,
            client_id,
            client_secret,
            scope,
        }
    }
}

#[async_trait]
impl TokenSource for ClientCredentials {
    async fn acquire(&self) -> AgentResult<Credential> {
        let mut params = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(scope) = &self.scope {
            params.push(("scope", scope.as_str()));
        }

        let resp = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                400 | 401 | 403 => AgentError::Authentication(format!(
                    "Failed to acquire access token: {}: {}",
                    status, err_text
                )),
                code => AgentError::Transport {
                    status: code,
                    message: err_text,
                },
            });
        }

        let token: TokenResponse = resp.json().await?;
        let expires_in = token.expires_in.unwrap_or(3600);
        Ok(Credential::new(token.access_token, expiry_after(expires_in)))
    }
}
