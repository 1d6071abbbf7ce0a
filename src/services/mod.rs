//! Domain services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the board's synchronization logic so the websocket
//! handler can stay focused on protocol translation. Dependency order:
//! `session` → `stroke` → `oplog` → `history` → `fanout` → `board`.

pub mod board;
pub mod cursor;
pub mod fanout;
pub mod history;
pub mod oplog;
pub mod session;
pub mod stroke;
