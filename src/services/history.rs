//! History resolver — per-owner undo and redo over the operation log.
//!
//! DESIGN
//! ======
//! Both directions scan the log newest to oldest and toggle the first
//! operation owned by the requester in the opposite state. The ordering is
//! per owner, interleaved with everyone else's operations, never global:
//! undo never touches another participant's work.
//!
//! Redo picks the newest undone operation, not the most recently undone
//! one. After undoing A1 then A2 (A2 newer), redo restores A2 first. New
//! commits do not discard redo candidates.

use uuid::Uuid;

use crate::services::oplog::{OpState, Operation, OperationLog};

/// Hide `owner`'s newest active operation. `None` means nothing to undo.
pub fn undo(log: &mut OperationLog, owner: Uuid) -> Option<&Operation> {
    let op = log.latest_mut(owner, OpState::Active)?;
    op.set_state(OpState::Undone);
    Some(&*op)
}

/// Restore `owner`'s newest undone operation. `None` means nothing to redo.
pub fn redo(log: &mut OperationLog, owner: Uuid) -> Option<&Operation> {
    let op = log.latest_mut(owner, OpState::Undone)?;
    op.set_state(OpState::Active);
    Some(&*op)
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
