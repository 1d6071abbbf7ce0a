//! Session registry — connected participants and their outbound channels.
//!
//! ARCHITECTURE
//! ============
//! Every WebSocket connection registers one participant with a fresh id. The
//! registry owns presence (id, color, name) and the sender half of the
//! connection's outbound channel, which the fanout writes into.
//!
//! TRADE-OFFS
//! ==========
//! Colors are a stable hash of the id into a small palette, so two
//! participants can share a color. The palette is fixed so every client can
//! resolve the same color for the same id without coordination.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::frame::ServerEvent;

/// Presence palette. Index is `sum(code points of id) % len`.
pub const PALETTE: [&str; 10] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6", "#bcf60c", "#fabebe",
];

const MAX_NAME_CHARS: usize = 32;

/// Sender half of a participant's outbound event channel.
pub type Outbox = mpsc::Sender<Arc<ServerEvent>>;

/// Presence info for one connected participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: Uuid,
    pub color: String,
    pub name: String,
}

/// Result of `register`.
#[derive(Debug, Clone)]
pub struct Registration {
    pub participant: Participant,
    /// True if the registry was empty before this registration.
    pub fresh: bool,
}

/// Deterministic presence color for an id.
#[must_use]
pub fn color_for(id: &str) -> &'static str {
    let sum = id.chars().map(u32::from).fold(0u32, u32::wrapping_add);
    #[allow(clippy::cast_possible_truncation)]
    let len = PALETTE.len() as u32;
    PALETTE[(sum % len) as usize]
}

/// Display name from the requested one, or the id's first six characters.
fn display_name(id: Uuid, requested: Option<&str>) -> String {
    match requested.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.chars().take(MAX_NAME_CHARS).collect(),
        None => id.to_string().chars().take(6).collect(),
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    participants: HashMap<Uuid, Participant>,
    clients: HashMap<Uuid, Outbox>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant. Re-registering an id replaces its entry.
    pub fn register(&mut self, id: Uuid, name: Option<&str>, outbox: Outbox) -> Registration {
        let fresh = self.participants.is_empty();
        let participant = Participant {
            id,
            color: color_for(&id.to_string()).to_owned(),
            name: display_name(id, name),
        };
        self.participants.insert(id, participant.clone());
        self.clients.insert(id, outbox);
        Registration { participant, fresh }
    }

    #[must_use]
    pub fn resolve(&self, id: Uuid) -> Option<&Participant> {
        self.participants.get(&id)
    }

    /// Remove a participant. Unknown ids are a no-op.
    pub fn unregister(&mut self, id: Uuid) -> Option<Participant> {
        self.clients.remove(&id);
        self.participants.remove(&id)
    }

    /// Drop a participant's outbound channel but keep its presence until
    /// the connection unregisters. Closing the channel ends the connection.
    pub fn detach(&mut self, id: Uuid) -> Option<Outbox> {
        self.clients.remove(&id)
    }

    /// Every participant except `id`.
    pub fn others(&self, id: Uuid) -> impl Iterator<Item = &Participant> {
        self.participants.values().filter(move |p| p.id != id)
    }

    /// Outbound channels keyed by participant id.
    pub fn clients(&self) -> impl Iterator<Item = (Uuid, &Outbox)> {
        self.clients.iter().map(|(id, tx)| (*id, tx))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
