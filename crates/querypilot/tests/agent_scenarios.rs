use std::sync::Arc;

use querypilot::agent::{Agent, RunStatus};
use querypilot::credentials::oauth::ClientCredentials;
use querypilot::credentials::CredentialManager;
use querypilot::debug_log::Direction;
use querypilot::gateway::client::ToolGatewayClient;
use querypilot::gateway::invoker::GatewayToolInvoker;
use querypilot::progress::{self, ProgressEvent};
use querypilot::providers::anthropic::AnthropicProvider;
use querypilot::providers::configs::AnthropicProviderConfig;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OPEN_TICKETS_SQL: &str =
    "SELECT AccountId, COUNT(*) AS count FROM [Zendesk1].[Zendesk].[Tickets] WHERE Status = 'open' GROUP BY AccountId";

fn anthropic_message(content: Value, stop_reason: &str, input: u64, output: u64) -> Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-sonnet-latest",
        "content": content,
        "stop_reason": stop_reason,
        "usage": {"input_tokens": input, "output_tokens": output}
    })
}

fn rpc_result(result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "result": result})
}

async fn mount_engine(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_message(
            json!([
                {"type": "text", "text": "I'll count open tickets per account."},
                {
                    "type": "tool_use",
                    "id": "toolu_01",
                    "name": "queryData",
                    "input": {"query": OPEN_TICKETS_SQL}
                }
            ]),
            "tool_use",
            120,
            40,
        )))
        .up_to_n_times(1)
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_string_contains("toolu_01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_message(
            json!([{"type": "text", "text": "Account 1 has 3 open tickets."}]),
            "end_turn",
            200,
            12,
        )))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_tool_list(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("tools/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!({
            "tools": [{
                "name": "queryData",
                "description": "Run a SQL query across connected sources",
                "inputSchema": {
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }
            }]
        }))))
        .mount(server)
        .await;
}

fn tickets_result() -> Value {
    json!([{"AccountId": "1", "count": 3}])
}

async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

fn build(
    engine: &MockServer,
    gateway: &MockServer,
    auth: &MockServer,
) -> anyhow::Result<(Agent, GatewayToolInvoker)> {
    let mut config = AnthropicProviderConfig::new(Some("test_api_key".to_string()));
    config.host = engine.uri();
    let agent = Agent::new(Box::new(AnthropicProvider::new(config)?));

    let credentials = Arc::new(CredentialManager::new(Box::new(ClientCredentials::new(
        format!("{}/oauth/token", auth.uri()),
        "client".to_string(),
        "secret".to_string(),
        None,
    ))));
    let client = Arc::new(ToolGatewayClient::new(format!("{}/mcp", gateway.uri()))?);
    Ok((agent, GatewayToolInvoker::new(client, credentials)))
}

#[tokio::test]
async fn open_tickets_per_account() -> anyhow::Result<()> {
    let engine = MockServer::start().await;
    let gateway = MockServer::start().await;
    let auth = MockServer::start().await;

    mount_engine(&engine).await;
    mount_tool_list(&gateway).await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("tools/call"))
        .and(header("authorization", "Bearer first-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(tickets_result())))
        .expect(1)
        .mount(&gateway)
        .await;
    mount_token(&auth, "first-token").await;

    let (agent, invoker) = build(&engine, &gateway, &auth)?;
    let tools = invoker.list_tools().await?;
    assert_eq!(tools.len(), 1);

    let (tx, mut rx) = progress::channel();
    let outcome = agent
        .run(
            "How many open tickets per account?",
            &[],
            &tools,
            &invoker,
            Some(&tx),
        )
        .await?;
    drop(tx);

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.final_text, "Account 1 has 3 open tickets.");
    assert_eq!(outcome.tool_calls.len(), 1);
    assert_eq!(outcome.tool_calls[0].result, tickets_result());
    assert_eq!(outcome.debug_log.len(), 4);
    assert_eq!(outcome.debug_log.count(Direction::Request), 2);
    assert_eq!(outcome.token_usage.input_tokens, 320);
    assert_eq!(outcome.token_usage.output_tokens, 52);
    assert_eq!(outcome.queries(), vec![OPEN_TICKETS_SQL.to_string()]);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], ProgressEvent::Thinking { .. }));
    assert!(matches!(events[2], ProgressEvent::ToolComplete { .. }));
    Ok(())
}

#[tokio::test]
async fn tool_call_retried_after_expired_credential() -> anyhow::Result<()> {
    let engine = MockServer::start().await;
    let gateway = MockServer::start().await;
    let auth = MockServer::start().await;

    mount_engine(&engine).await;
    mount_tool_list(&gateway).await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("tools/call"))
        .and(header("authorization", "Bearer first-token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .expect(1)
        .mount(&gateway)
        .await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("tools/call"))
        .and(header("authorization", "Bearer second-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(tickets_result())))
        .expect(1)
        .mount(&gateway)
        .await;
    mount_token(&auth, "first-token").await;
    mount_token(&auth, "second-token").await;

    let (agent, invoker) = build(&engine, &gateway, &auth)?;
    let tools = invoker.list_tools().await?;

    let (tx, mut rx) = progress::channel();
    let outcome = agent
        .run(
            "How many open tickets per account?",
            &[],
            &tools,
            &invoker,
            Some(&tx),
        )
        .await?;
    drop(tx);

    assert_eq!(outcome.final_text, "Account 1 has 3 open tickets.");
    assert_eq!(outcome.tool_calls.len(), 1);
    assert_eq!(outcome.tool_calls[0].result, tickets_result());

    while let Some(event) = rx.recv().await {
        assert!(!matches!(event, ProgressEvent::ToolError { .. }));
    }

    let token_requests = auth
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default();
    assert_eq!(token_requests, 2);
    Ok(())
}

#[tokio::test]
async fn missing_api_key_fails_before_any_request() -> anyhow::Result<()> {
    let engine = MockServer::start().await;
    let gateway = MockServer::start().await;
    let auth = MockServer::start().await;

    let mut config = AnthropicProviderConfig::new(None);
    config.host = engine.uri();
    let agent = Agent::new(Box::new(AnthropicProvider::new(config)?));
    let (_, invoker) = build(&engine, &gateway, &auth)?;

    let err = agent
        .run("How many open tickets per account?", &[], &[], &invoker, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        querypilot::errors::AgentError::Configuration(_)
    ));
    assert!(engine.received_requests().await.unwrap_or_default().is_empty());
    Ok(())
}
