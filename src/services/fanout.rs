//! Broadcast fanout — routes each event to its audience.
//!
//! DESIGN
//! ======
//! Board handlers never send. They return `Dispatch` values naming an event
//! and an audience relative to the participant that caused it, and `deliver`
//! resolves the audience against the session registry.
//!
//! Delivery is `try_send` into bounded per-connection channels, so a slow
//! participant never stalls the board. Ephemeral events (`cursor`, `op_seg`)
//! are simply dropped for a full channel. Any other event carries log or
//! presence state, and a participant that misses one can no longer converge,
//! so its outbox is detached instead. The connection's queue then drains and
//! closes, the socket loop exits, and a reconnect bootstraps from the log.
//!
//! Callers deliver while still holding the board lock, so every channel
//! receives events in the same order the log applied them.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::frame::ServerEvent;
use crate::services::session::SessionRegistry;

/// Who receives an event, relative to its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The originating participant only.
    Sender,
    /// Everyone except the originating participant.
    Others,
    /// Everyone, the originating participant included.
    All,
}

impl Audience {
    #[must_use]
    pub fn includes(self, origin: Uuid, recipient: Uuid) -> bool {
        match self {
            Self::Sender => recipient == origin,
            Self::Others => recipient != origin,
            Self::All => true,
        }
    }
}

/// One event bound for one audience.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub audience: Audience,
    pub event: Arc<ServerEvent>,
}

impl Dispatch {
    #[must_use]
    pub fn new(audience: Audience, event: ServerEvent) -> Self {
        Self { audience, event: Arc::new(event) }
    }

    #[must_use]
    pub fn sender(event: ServerEvent) -> Self {
        Self::new(Audience::Sender, event)
    }

    #[must_use]
    pub fn others(event: ServerEvent) -> Self {
        Self::new(Audience::Others, event)
    }

    #[must_use]
    pub fn all(event: ServerEvent) -> Self {
        Self::new(Audience::All, event)
    }
}

/// Deliver dispatches in order. Returns the number of channel writes.
///
/// Participants whose channel overflowed on a non-ephemeral event are
/// detached from the registry and receive nothing further.
pub fn deliver(registry: &mut SessionRegistry, origin: Uuid, dispatches: Vec<Dispatch>) -> usize {
    let mut sent = 0;
    let mut evicted = HashSet::new();
    for dispatch in dispatches {
        for (client_id, tx) in registry.clients() {
            if !dispatch.audience.includes(origin, client_id) || evicted.contains(&client_id) {
                continue;
            }
            match tx.try_send(Arc::clone(&dispatch.event)) {
                Ok(()) => sent += 1,
                Err(TrySendError::Full(_)) if dispatch.event.is_ephemeral() => {
                    debug!(%client_id, event = dispatch.event.tag(), "fanout: client channel full; ephemeral event dropped");
                }
                Err(TrySendError::Full(_)) => {
                    warn!(%client_id, event = dispatch.event.tag(), "fanout: client channel full; detaching client");
                    evicted.insert(client_id);
                }
                Err(TrySendError::Closed(_)) => {
                    warn!(%client_id, event = dispatch.event.tag(), "fanout: client channel closed; event dropped");
                }
            }
        }
    }
    for client_id in evicted {
        registry.detach(client_id);
    }
    sent
}

#[cfg(test)]
#[path = "fanout_test.rs"]
mod tests;
