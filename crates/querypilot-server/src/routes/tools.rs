use axum::{extract::State, routing::get, Json, Router};
use querypilot::models::tool::Tool;

use crate::error::ApiError;
use crate::state::AppState;

async fn list_tools(State(state): State<AppState>) -> Result<Json<Vec<Tool>>, ApiError> {
    Ok(Json(state.invoker.list_tools().await?))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/tools", get(list_tools))
        .with_state(state)
}
