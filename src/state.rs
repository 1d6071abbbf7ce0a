//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the configuration and the single live board. Every inbound
//! event takes the board's write lock, applies to completion, and fans out
//! before releasing it, which makes the board behave as one sequential
//! event loop.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::services::board::Board;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub board: Arc<RwLock<Board>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let board = Board::new(config.max_stroke_points);
        Self { config: Arc::new(config), board: Arc::new(RwLock::new(board)) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
