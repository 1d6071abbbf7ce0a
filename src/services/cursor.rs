//! Cursor service — ephemeral cursor position broadcast.
//!
//! DESIGN
//! ======
//! Cursor positions are purely ephemeral: relayed to board peers and
//! immediately forgotten. No log entry, no state storage.

use uuid::Uuid;

use crate::frame::{CursorPos, ServerEvent};
use crate::services::fanout::Dispatch;

/// Relay a cursor position to all peers except the sender.
#[must_use]
pub fn relay(from: Uuid, cursor: CursorPos) -> Dispatch {
    Dispatch::others(ServerEvent::Cursor { id: from, cursor })
}
