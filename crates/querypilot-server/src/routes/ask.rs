use axum::{
    body::Body,
    extract::State,
    http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::Stream;
use querypilot::agent::RunOutcome;
use querypilot::errors::{AgentError, AgentResult};
use querypilot::models::message::Message;
use querypilot::progress::{self, ProgressSender};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct AskRequest {
    message: String,
    #[serde(default)]
    history: Vec<Message>,
}

#[derive(Serialize)]
struct CompleteFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    outcome: &'a RunOutcome,
    queries: Vec<String>,
}

/// Server-sent events body where every item is an already formatted frame
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> Response {
        let body = Body::from_stream(self);
        (
            [
                (CONTENT_TYPE, "text/event-stream"),
                (CACHE_CONTROL, "no-cache"),
                (CONNECTION, "keep-alive"),
            ],
            body,
        )
            .into_response()
    }
}

fn frame<T: Serialize>(payload: &T) -> String {
    format!(
        "data: {}\n\n",
        serde_json::to_string(payload).unwrap_or_default()
    )
}

fn terminal_frame(result: &AgentResult<RunOutcome>) -> String {
    match result {
        Ok(outcome) => frame(&CompleteFrame {
            kind: "complete",
            outcome,
            queries: outcome.queries(),
        }),
        Err(err) => frame(&json!({ "type": "error", "message": err.to_string() })),
    }
}

async fn run(
    state: &AppState,
    request: &AskRequest,
    progress: &ProgressSender,
) -> AgentResult<RunOutcome> {
    state.agent.ensure_configured()?;
    let tools = state.invoker.list_tools().await?;
    state
        .agent
        .run(
            &request.message,
            &request.history,
            &tools,
            &state.invoker,
            Some(progress),
        )
        .await
}

async fn handler(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<SseResponse, ApiError> {
    if request.message.trim().is_empty() {
        return Err(AgentError::InvalidRequest("Message must not be empty".to_string()).into());
    }

    let (tx, rx) = mpsc::channel(100);
    let stream = ReceiverStream::new(rx);

    tokio::spawn(async move {
        let (progress_tx, mut progress_rx) = progress::channel();

        // Stops forwarding once the client has gone away; the run itself carries on.
        let forward_tx = tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = progress_rx.recv().await {
                if forward_tx.send(frame(&event)).await.is_err() {
                    break;
                }
            }
        });

        let result = run(&state, &request, &progress_tx).await;
        drop(progress_tx);
        let _ = forwarder.await;

        match &result {
            Ok(outcome) => info!(
                rounds = outcome.rounds,
                tool_calls = outcome.tool_calls.len(),
                elapsed_ms = outcome.elapsed_ms,
                "ask completed"
            ),
            Err(e) => error!("ask failed: {}", e),
        }
        let _ = tx.send(terminal_frame(&result)).await;
    });

    Ok(SseResponse::new(stream))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/ask", post(handler))
        .with_state(state)
}
