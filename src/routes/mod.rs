//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the websocket endpoint, a health check and a read-only board
//! summary under one Axum router. When `STATIC_DIR` is configured the
//! browser client is served from it as the fallback.

pub mod ws;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::board::BoardSummary;
use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/api/board", get(board_summary))
        .route("/healthz", get(healthz));

    if let Some(dir) = state.config.static_dir.clone() {
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn board_summary(State(state): State<AppState>) -> Json<BoardSummary> {
    let board = state.board.read().await;
    Json(board.summary())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
