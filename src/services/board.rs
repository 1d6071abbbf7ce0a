//! Board service — applies one inbound event to the shared board state.
//!
//! DESIGN
//! ======
//! `Board` is the process-scoped state object: session registry, stroke
//! assembler and operation log. Each method applies one event to completion
//! and returns the dispatches describing who must hear about it. Methods are
//! synchronous, so holding the board lock across a call leaves no
//! suspension point between reading state and committing it.
//!
//! LIFECYCLE
//! =========
//! - Created empty at process start.
//! - Reset when the first participant joins an empty registry, and on clear.
//! - A participant's departure purges its in-flight strokes.
//!
//! Bootstrap carries active operations only. Operations undone before a
//! participant joined are invisible to it; redo by their owner still
//! reaches it because `op_redo` carries the full operation.

use tracing::{debug, info};
use uuid::Uuid;

use crate::frame::{ServerEvent, StrokePacket};
use crate::services::fanout::Dispatch;
use crate::services::history;
use crate::services::oplog::OperationLog;
use crate::services::session::{Outbox, Registration, SessionRegistry};
use crate::services::stroke::{Ingest, StrokeAssembler};

#[derive(Debug)]
pub struct Board {
    pub registry: SessionRegistry,
    pub strokes: StrokeAssembler,
    pub log: OperationLog,
}

/// Counts reported by the board summary endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BoardSummary {
    pub participants: usize,
    pub operations: usize,
    pub active: usize,
    pub pending_strokes: usize,
}

impl Board {
    #[must_use]
    pub fn new(max_stroke_points: usize) -> Self {
        Self {
            registry: SessionRegistry::new(),
            strokes: StrokeAssembler::new(max_stroke_points),
            log: OperationLog::new(),
        }
    }

    /// Wipe history and in-flight strokes. Presence is kept.
    pub fn reset(&mut self) {
        self.log.reset();
        self.strokes.clear();
    }

    #[must_use]
    pub fn summary(&self) -> BoardSummary {
        BoardSummary {
            participants: self.registry.len(),
            operations: self.log.len(),
            active: self.log.active().count(),
            pending_strokes: self.strokes.len(),
        }
    }

    // =========================================================================
    // JOIN / LEAVE
    // =========================================================================

    /// Register a connection and bootstrap it.
    pub fn join(&mut self, id: Uuid, name: Option<&str>, outbox: Outbox) -> Vec<Dispatch> {
        let Registration { participant, fresh } = self.registry.register(id, name, outbox);
        if fresh {
            self.reset();
            info!(client_id = %id, "board reset: fresh session started");
        }

        let mut dispatches = Vec::with_capacity(2);
        if let Some(welcome) = self.bootstrap(id) {
            dispatches.push(Dispatch::sender(welcome));
        }
        dispatches.push(Dispatch::others(ServerEvent::UserJoin(participant)));
        dispatches
    }

    /// Welcome event for a registered participant.
    #[must_use]
    pub fn bootstrap(&self, id: Uuid) -> Option<ServerEvent> {
        let me = self.registry.resolve(id)?;
        Some(ServerEvent::Welcome {
            id,
            color: me.color.clone(),
            name: me.name.clone(),
            participants: self.registry.others(id).cloned().collect(),
            operations: self.log.active().cloned().collect(),
        })
    }

    /// Unregister a connection and drop its in-flight strokes.
    pub fn leave(&mut self, id: Uuid) -> Vec<Dispatch> {
        let purged = self.strokes.purge_owner(id);
        if purged > 0 {
            debug!(client_id = %id, purged, "purged orphaned pending strokes");
        }
        if self.registry.unregister(id).is_none() {
            return Vec::new();
        }
        info!(client_id = %id, remaining = self.registry.len(), "participant left board");
        vec![Dispatch::others(ServerEvent::UserLeft { id })]
    }

    // =========================================================================
    // STROKES
    // =========================================================================

    /// Ingest one stroke packet from `origin`.
    pub fn stroke(&mut self, origin: Uuid, packet: StrokePacket) -> Vec<Dispatch> {
        let StrokePacket { stroke_id, is_final, points, meta } = packet;
        let ingest = self.strokes.ingest(
            origin,
            stroke_id,
            meta.unwrap_or_default(),
            points,
            is_final.unwrap_or(false),
        );

        match ingest {
            Ingest::Preview { stroke_id, meta, points } => {
                if points.is_empty() {
                    return Vec::new();
                }
                vec![Dispatch::others(ServerEvent::OpSegment { from: origin, stroke_id, points, meta })]
            }
            Ingest::Commit(data) => {
                let op = self.log.commit(origin, data);
                debug!(client_id = %origin, op_id = %op.id, points = op.data.points.len(), "committed stroke");
                vec![Dispatch::all(ServerEvent::OpAdd { op: op.clone() })]
            }
        }
    }

    // =========================================================================
    // HISTORY
    // =========================================================================

    pub fn undo(&mut self, origin: Uuid) -> Vec<Dispatch> {
        match history::undo(&mut self.log, origin) {
            Some(op) => {
                debug!(client_id = %origin, op_id = %op.id, "undo");
                vec![Dispatch::all(ServerEvent::OpUndo { id: op.id, user_id: origin })]
            }
            None => vec![Dispatch::sender(ServerEvent::UndoNone {})],
        }
    }

    pub fn redo(&mut self, origin: Uuid) -> Vec<Dispatch> {
        match history::redo(&mut self.log, origin) {
            Some(op) => {
                debug!(client_id = %origin, op_id = %op.id, "redo");
                vec![Dispatch::all(ServerEvent::OpRedo { id: op.id, user_id: origin, op: op.clone() })]
            }
            None => vec![Dispatch::sender(ServerEvent::RedoNone {})],
        }
    }

    /// Global clear requested by `origin`.
    pub fn clear(&mut self, origin: Uuid) -> Vec<Dispatch> {
        let dropped = self.log.len();
        self.reset();
        info!(client_id = %origin, dropped, "board cleared");
        vec![Dispatch::all(ServerEvent::Clear {})]
    }
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
