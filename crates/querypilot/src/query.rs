use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::errors::{AgentError, AgentResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub column_name: String,
    #[serde(default)]
    pub data_type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub schema: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<ResultSet>,
}

/// Runs a SQL statement directly against the query endpoint, outside of any
/// agent run
pub struct QueryClient {
    client: Client,
    endpoint: String,
}

impl QueryClient {
    pub fn new<S: Into<String>>(endpoint: S) -> AgentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub async fn execute(&self, credential: &str, sql: &str) -> AgentResult<QueryResponse> {
        if sql.trim().is_empty() {
            return Err(AgentError::InvalidRequest(
                "Query must not be empty".to_string(),
            ));
        }
        debug!(length = sql.len(), "executing query");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential)
            .json(&json!({ "query": sql }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AgentError::Transport {
                status: status.as_u16(),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_execute() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!({"query": "SELECT 1 AS one"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "schema": [{"columnName": "one", "dataTypeName": "integer"}],
                    "rows": [[1]]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = QueryClient::new(format!("{}/query", server.uri()))?;
        let response = client.execute("secret", "SELECT 1 AS one").await?;

        assert_eq!(response.results.len(), 1);
        let result = &response.results[0];
        assert_eq!(result.schema[0].column_name, "one");
        assert_eq!(result.schema[0].data_type_name.as_deref(), Some("integer"));
        assert_eq!(result.rows, vec![vec![json!(1)]]);
        Ok(())
    }

    #[tokio::test]
    async fn test_execute_unauthorized() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .mount(&server)
            .await;

        let client = QueryClient::new(server.uri())?;
        let err = client.execute("stale", "SELECT 1").await.unwrap_err();

        assert_eq!(
            err,
            AgentError::Transport {
                status: 401,
                message: "expired".to_string()
            }
        );
        assert!(err.is_authentication());
        Ok(())
    }

    #[tokio::test]
    async fn test_execute_rejects_blank_query() -> anyhow::Result<()> {
        let client = QueryClient::new("http://localhost:1")?;
        let err = client.execute("token", "  ").await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidRequest(_)));
        Ok(())
    }
}
