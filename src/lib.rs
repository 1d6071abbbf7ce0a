//! Realtime collaborative drawing board server.
//!
//! ARCHITECTURE
//! ============
//! One shared board per process. Clients connect over a WebSocket, stream
//! strokes as segment packets, and receive committed operations, previews,
//! presence and history toggles. The server's operation log is the only
//! source of truth; clients replay its active operations to render.
//!
//! There is no persistence. A restart, or the first participant joining an
//! empty board, starts from a blank log.

pub mod config;
pub mod frame;
pub mod routes;
pub mod services;
pub mod state;
