use axum::{extract::State, routing::post, Json, Router};
use querypilot::query::QueryResponse;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
}

/// Run a statement from the explorer directly, outside of any agent run
async fn execute(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let client = state.query_client()?;
    let response = state
        .credentials
        .with_refresh(|token| {
            let client = client.clone();
            let sql = request.query.clone();
            async move { client.execute(&token, &sql).await }
        })
        .await?;
    Ok(Json(response))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/query", post(execute))
        .with_state(state)
}
