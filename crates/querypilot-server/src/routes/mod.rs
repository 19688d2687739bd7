pub mod ask;
pub mod query;
pub mod saved;
pub mod tools;

use axum::Router;

use crate::state::AppState;

pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(ask::routes(state.clone()))
        .merge(tools::routes(state.clone()))
        .merge(query::routes(state.clone()))
        .merge(saved::routes(state))
}
