use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::providers::base::Usage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Request,
    Response,
}

/// One recorded exchange with the reasoning engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugLogEntry {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Tokens used by the run so far, recorded on responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<Usage>,
}

/// Append-only trail of requests and responses for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebugLog {
    entries: Vec<DebugLogEntry>,
}

impl DebugLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&mut self, payload: Value) {
        self.entries.push(DebugLogEntry {
            timestamp: Utc::now(),
            direction: Direction::Request,
            payload,
            duration_ms: None,
            token_usage: None,
        });
    }

    pub fn record_response(&mut self, payload: Value, duration_ms: u64, token_usage: Usage) {
        self.entries.push(DebugLogEntry {
            timestamp: Utc::now(),
            direction: Direction::Response,
            payload,
            duration_ms: Some(duration_ms),
            token_usage: Some(token_usage),
        });
    }

    pub fn entries(&self) -> &[DebugLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, direction: Direction) -> usize {
        self.entries
            .iter()
            .filter(|e| e.direction == direction)
            .count()
    }
}
