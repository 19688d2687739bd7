//! Short-lived bearer credentials for the tool gateway and the query service.
//!
//! A single [`CredentialManager`] is created at startup and shared through an
//! `Arc` with every client that needs a token. It caches the current credential
//! with its expiry, serializes acquisition so concurrent callers reuse one
//! request, and offers [`CredentialManager::with_refresh`] to retry a call once
//! after an authentication failure.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::errors::AgentResult;

pub mod oauth;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new<S: Into<String>>(token: S, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Whether the credential can still be used at `now`, keeping `margin` in reserve
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now < self.expires_at - margin
    }
}

/// Something that can issue a fresh credential
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn acquire(&self) -> AgentResult<Credential>;
}

pub struct CredentialManager {
    source: Box<dyn TokenSource>,
    cached: Mutex<Option<Credential>>,
    refresh_margin: Duration,
}

impl CredentialManager {
    pub fn new(source: Box<dyn TokenSource>) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
            refresh_margin: Duration::seconds(30),
        }
    }

    /// Refresh credentials this long before they actually expire
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Return the cached token while it is valid, otherwise acquire a new one.
    ///
    /// The cache lock is held across acquisition, so a caller that arrives while
    /// another acquisition is in flight waits for it and reuses its result.
    pub async fn get_valid_credential(&self) -> AgentResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(credential) = cached.as_ref() {
            if credential.is_valid_at(Utc::now(), self.refresh_margin) {
                return Ok(credential.token.clone());
            }
        }

        debug!("acquiring gateway credential");
        let fresh = self.source.acquire().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Force a new acquisition to replace `stale`.
    ///
    /// If another caller already replaced `stale` with a valid credential, that one
    /// is returned without a second acquisition.
    pub async fn refresh(&self, stale: &str) -> AgentResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(credential) = cached.as_ref() {
            if credential.token != stale && credential.is_valid_at(Utc::now(), self.refresh_margin)
            {
                return Ok(credential.token.clone());
            }
        }

        *cached = None;
        debug!("forcing gateway credential refresh");
        let fresh = self.source.acquire().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Run `op` with a valid token. On an authentication-class failure the
    /// credential is refreshed once and `op` retried once; a second failure
    /// propagates.
    pub async fn with_refresh<T, F, Fut>(&self, mut op: F) -> AgentResult<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = AgentResult<T>>,
    {
        let token = self.get_valid_credential().await?;
        match op(token.clone()).await {
            Err(err) if err.is_authentication() => {
                warn!("authentication failed, refreshing credential: {}", err);
                let fresh = self.refresh(&token).await?;
                op(fresh).await
            }
            result => result,
        }
    }
}
