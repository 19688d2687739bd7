use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

/// Live updates emitted by the orchestrator while a run is in flight
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Text the engine produced alongside tool requests
    Thinking { text: String },
    ToolStart {
        name: String,
        input: Map<String, Value>,
    },
    ToolComplete { name: String, result: Value },
    ToolError { name: String, error: String },
}

/// Unbounded so that emitting an update never suspends the run
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

pub fn channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Send an update if anyone is listening; a dropped receiver is not an error
pub(crate) fn emit(progress: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = progress {
        let _ = tx.send(event);
    }
}
