//! Operation log — the append-only source of truth for board state.
//!
//! DESIGN
//! ======
//! Committed operations are appended in commit order and never reordered.
//! Entries are never removed individually; the only removal is a full
//! `reset`. Each operation carries a visibility state that only the history
//! resolver (`services::history`) toggles.
//!
//! Replaying, in log order, every operation whose state is `Active` yields
//! the canonical board. `active()` is that replay sequence and is what late
//! joiners receive as bootstrap.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::services::stroke::StrokeData;

// =============================================================================
// TYPES
// =============================================================================

/// Visibility of a committed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    /// Drawn on replay.
    Active,
    /// Hidden by its owner's undo; redo restores it.
    Undone,
}

impl OpState {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Stroke,
}

/// A committed drawing action. Immutable apart from its state.
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: Uuid,
    pub owner: Uuid,
    pub kind: OperationKind,
    pub data: StrokeData,
    /// Milliseconds since Unix epoch at commit.
    pub created_at: i64,
    state: OpState,
}

impl Operation {
    #[cfg(test)]
    pub(crate) fn state(&self) -> OpState {
        self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub(super) fn set_state(&mut self, state: OpState) {
        self.state = state;
    }
}

/// Wire shape: `{ id, userId, type, data, active, timestamp }`.
impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a> {
            id: Uuid,
            user_id: Uuid,
            #[serde(rename = "type")]
            kind: OperationKind,
            data: &'a StrokeData,
            active: bool,
            timestamp: i64,
        }

        Wire {
            id: self.id,
            user_id: self.owner,
            kind: self.kind,
            data: &self.data,
            active: self.is_active(),
            timestamp: self.created_at,
        }
        .serialize(serializer)
    }
}

// =============================================================================
// LOG
// =============================================================================

#[derive(Debug, Default)]
pub struct OperationLog {
    ops: Vec<Operation>,
    /// Every id minted since the last reset.
    ids: HashSet<Uuid>,
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl OperationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new active stroke operation owned by `owner`.
    ///
    /// The log mints the id, so ids are unique for the log's lifetime.
    pub fn commit(&mut self, owner: Uuid, data: StrokeData) -> &Operation {
        let mut id = Uuid::new_v4();
        while self.ids.contains(&id) {
            id = Uuid::new_v4();
        }

        let pos = self.ops.len();
        self.ops.push(Operation {
            id,
            owner,
            kind: OperationKind::Stroke,
            data,
            created_at: now_ms(),
            state: OpState::Active,
        });
        self.ids.insert(id);
        &self.ops[pos]
    }

    #[cfg(test)]
    pub(crate) fn get(&self, id: Uuid) -> Option<&Operation> {
        self.ops.iter().find(|op| op.id == id)
    }

    /// All operations in log order, regardless of state.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.ops.iter()
    }

    /// The replay sequence: active operations in log order.
    pub fn active(&self) -> impl Iterator<Item = &Operation> {
        self.ops.iter().filter(|op| op.is_active())
    }

    /// Newest operation owned by `owner` currently in `state`.
    pub(super) fn latest_mut(&mut self, owner: Uuid, state: OpState) -> Option<&mut Operation> {
        self.ops
            .iter_mut()
            .rev()
            .find(|op| op.owner == owner && op.state == state)
    }

    /// Drop every entry.
    pub fn reset(&mut self) {
        self.ops.clear();
        self.ids.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
#[path = "oplog_test.rs"]
mod tests;
