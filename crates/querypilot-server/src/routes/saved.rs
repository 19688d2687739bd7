use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{ItemInput, SavedItem, SavedKind, SavedStore, StoreError};

/// Run a store operation on the blocking pool; the store does file I/O under a lock
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&SavedStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(StoreError::from)?;
    Ok(result?)
}

async fn list_items(
    State(state): State<AppState>,
    Path(kind): Path<SavedKind>,
) -> Result<Json<Vec<SavedItem>>, ApiError> {
    Ok(Json(with_store(&state, move |store| store.list(kind)).await?))
}

async fn create_item(
    State(state): State<AppState>,
    Path(kind): Path<SavedKind>,
    Json(input): Json<ItemInput>,
) -> Result<(StatusCode, Json<SavedItem>), ApiError> {
    let item = with_store(&state, move |store| store.create(kind, input)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<AppState>,
    Path((kind, id)): Path<(SavedKind, String)>,
    Json(input): Json<ItemInput>,
) -> Result<Json<SavedItem>, ApiError> {
    let item = with_store(&state, move |store| store.update(kind, &id, input)).await?;
    Ok(Json(item))
}

async fn delete_item(
    State(state): State<AppState>,
    Path((kind, id)): Path<(SavedKind, String)>,
) -> Result<StatusCode, ApiError> {
    with_store(&state, move |store| store.delete(kind, &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/saved/:kind", get(list_items).post(create_item))
        .route("/saved/:kind/:id", put(update_item).delete(delete_item))
        .with_state(state)
}
