//! Frame — the wire envelope for every WebSocket message.
//!
//! ARCHITECTURE
//! ============
//! Every message in either direction is a JSON text frame of the form
//! `{ "event": <tag>, "data": <payload> }`. The WS handler routes inbound
//! frames on `event` and only then decodes `data` into the payload type the
//! routed handler expects, so a bad payload for one tag never affects another.
//!
//! DESIGN
//! ======
//! - Inbound decoding is two-step: envelope, then payload.
//! - Outbound events are a closed enum. Fanout audiences are decided by the
//!   board service, never by the socket layer.
//! - `data` may be omitted for payload-less events (`undo`, `redo`, `clear`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::oplog::Operation;
use crate::services::session::Participant;
use crate::services::stroke::{Point, StrokeMeta};

// =============================================================================
// ERRORS
// =============================================================================

/// Decode failure for an inbound frame. Never surfaced to the client.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("invalid {event} payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

// =============================================================================
// INBOUND
// =============================================================================

/// Inbound envelope. `data` stays untyped until the handler table routes it.
#[derive(Debug, Clone, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Frame {
    /// Parse the envelope of one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::Envelope` if the text is not a JSON object with a
    /// string `event` field.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(FrameError::Envelope)
    }

    /// Decode `data` as the payload type for this frame's event.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::Payload` if `data` does not match `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, FrameError> {
        T::deserialize(&self.data).map_err(|source| FrameError::Payload { event: self.event.clone(), source })
    }
}

/// Payload of an inbound `stroke` event.
///
/// `points` is required; a packet without a point sequence is malformed.
/// `meta` and `isFinal` tolerate `null` the same as absence.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokePacket {
    #[serde(default)]
    pub stroke_id: Option<String>,
    #[serde(default)]
    pub is_final: Option<bool>,
    pub points: Vec<Point>,
    #[serde(default)]
    pub meta: Option<StrokeMeta>,
}

/// Normalized cursor position carried by `cursor` events in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorPos {
    pub x: f64,
    pub y: f64,
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Every event the server emits. Serializes to the `{event, data}` envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Bootstrap for a newly connected participant.
    #[serde(rename = "welcome")]
    Welcome {
        id: Uuid,
        color: String,
        name: String,
        /// Participants already connected when this one joined.
        participants: Vec<Participant>,
        /// Active operations in log order.
        operations: Vec<Operation>,
    },
    #[serde(rename = "user-join")]
    UserJoin(Participant),
    #[serde(rename = "user-left")]
    UserLeft { id: Uuid },
    /// Transient preview of an in-flight stroke. Never replayed.
    #[serde(rename = "op_seg")]
    OpSegment {
        from: Uuid,
        #[serde(rename = "strokeId")]
        stroke_id: String,
        points: Vec<Point>,
        meta: StrokeMeta,
    },
    #[serde(rename = "cursor")]
    Cursor { id: Uuid, cursor: CursorPos },
    #[serde(rename = "op_add")]
    OpAdd { op: Operation },
    #[serde(rename = "op_undo")]
    OpUndo {
        id: Uuid,
        #[serde(rename = "userId")]
        user_id: Uuid,
    },
    #[serde(rename = "op_redo")]
    OpRedo {
        id: Uuid,
        #[serde(rename = "userId")]
        user_id: Uuid,
        op: Operation,
    },
    #[serde(rename = "clear")]
    Clear {},
    #[serde(rename = "undo_none")]
    UndoNone {},
    #[serde(rename = "redo_none")]
    RedoNone {},
}

impl ServerEvent {
    /// Wire tag of this event, for logging.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::UserJoin(_) => "user-join",
            Self::UserLeft { .. } => "user-left",
            Self::OpSegment { .. } => "op_seg",
            Self::Cursor { .. } => "cursor",
            Self::OpAdd { .. } => "op_add",
            Self::OpUndo { .. } => "op_undo",
            Self::OpRedo { .. } => "op_redo",
            Self::Clear {} => "clear",
            Self::UndoNone {} => "undo_none",
            Self::RedoNone {} => "redo_none",
        }
    }

    /// Transient events a participant can miss without diverging from the log.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Cursor { .. } | Self::OpSegment { .. })
    }

    /// Serialize to the JSON text sent over the socket.
    ///
    /// # Errors
    ///
    /// Returns a serialization error (not expected for these types).
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
