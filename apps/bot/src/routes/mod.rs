pub mod health;

use axum::{extract::State, routing::get, Router};

use crate::state::AppState;
use crate::viewer::handlers;

/// GET /
async fn index_handler(State(state): State<AppState>) -> String {
    format!(
        "Mention @{} on a post to save it. Your saved posts live at /view/<your handle>.",
        state.bot_handle
    )
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health::health_handler))
        .route("/view/:handle", get(handlers::handle_view))
        .with_state(state)
}
