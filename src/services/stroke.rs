//! Stroke assembler — reassembles segmented strokes into one committed unit.
//!
//! DESIGN
//! ======
//! Clients stream a stroke as a sequence of packets sharing a client-chosen
//! stroke id; the last packet carries `isFinal`. Each packet's points are
//! appended in arrival order to a `PendingStroke`. Non-final packets yield a
//! preview for peers; the final packet yields the full point sequence for
//! the operation log and destroys the pending entry.
//!
//! Pending strokes are keyed by (owner, stroke id). Stroke ids are only
//! chosen per connection, so two participants picking the same id assemble
//! two independent strokes.
//!
//! The first packet's meta is authoritative for the whole stroke. Later
//! packets cannot restyle a stroke mid-flight.
//!
//! LIMITS
//! ======
//! Accumulation is capped at `max_points` per stroke. Points past the cap
//! are discarded from both the pending sequence and the preview, so what
//! peers saw in preview is always a prefix of what is committed.
//!
//! Each owner may hold at most `MAX_PENDING_PER_OWNER` open strokes. Opening
//! one more discards that owner's oldest open stroke.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Open strokes one owner may hold before the oldest is discarded.
pub const MAX_PENDING_PER_OWNER: usize = 32;

// =============================================================================
// TYPES
// =============================================================================

/// A captured point normalized to the sender's logical canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    /// Capture time in ms since epoch.
    #[serde(default)]
    pub t: i64,
}

/// Stroke style, fixed by the first packet of a stroke.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrokeMeta {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub eraser: bool,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Payload of a committed stroke operation. Serializes flat:
/// `{ points, color, size, eraser }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrokeData {
    pub points: Vec<Point>,
    #[serde(flatten)]
    pub meta: StrokeMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StrokeKey {
    owner: Uuid,
    stroke_id: String,
}

/// An in-flight stroke between its first packet and finalize.
#[derive(Debug, Clone)]
pub struct PendingStroke {
    pub owner: Uuid,
    pub meta: StrokeMeta,
    pub points: Vec<Point>,
    /// Set once the point cap has discarded input.
    truncated: bool,
    /// Assembler-wide open order.
    opened: u64,
}

impl PendingStroke {
    fn new(owner: Uuid, meta: StrokeMeta, opened: u64) -> Self {
        Self { owner, meta, points: Vec::new(), truncated: false, opened }
    }

    /// Append up to the remaining capacity and return what was accepted.
    fn accept(&mut self, mut points: Vec<Point>, max_points: usize, stroke_id: &str) -> Vec<Point> {
        let room = max_points.saturating_sub(self.points.len());
        if points.len() > room {
            points.truncate(room);
            if !self.truncated {
                self.truncated = true;
                warn!(owner = %self.owner, %stroke_id, max_points, "stroke hit point cap; discarding further points");
            }
        }
        self.points.extend_from_slice(&points);
        points
    }
}

/// Result of ingesting one stroke packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingest {
    /// Non-final packet: nothing committed, forward `points` to peers.
    Preview { stroke_id: String, meta: StrokeMeta, points: Vec<Point> },
    /// Final packet, or a packet without a stroke id: commit this payload.
    Commit(StrokeData),
}

// =============================================================================
// ASSEMBLER
// =============================================================================

#[derive(Debug)]
pub struct StrokeAssembler {
    pending: HashMap<StrokeKey, PendingStroke>,
    max_points: usize,
    opened: u64,
}

impl StrokeAssembler {
    #[must_use]
    pub fn new(max_points: usize) -> Self {
        Self { pending: HashMap::new(), max_points, opened: 0 }
    }

    /// Ingest one packet from `owner`.
    ///
    /// An absent or empty `stroke_id` bypasses assembly and commits the
    /// packet on its own.
    pub fn ingest(
        &mut self,
        owner: Uuid,
        stroke_id: Option<String>,
        meta: StrokeMeta,
        mut points: Vec<Point>,
        is_final: bool,
    ) -> Ingest {
        let Some(stroke_id) = stroke_id.filter(|id| !id.is_empty()) else {
            if points.len() > self.max_points {
                warn!(%owner, count = points.len(), max_points = self.max_points, "unassembled stroke over point cap; truncating");
                points.truncate(self.max_points);
            }
            return Ingest::Commit(StrokeData { points, meta });
        };

        let key = StrokeKey { owner, stroke_id };
        let max_points = self.max_points;

        if is_final {
            let mut done = self
                .pending
                .remove(&key)
                .unwrap_or_else(|| PendingStroke::new(owner, meta, self.opened));
            done.accept(points, max_points, &key.stroke_id);
            return Ingest::Commit(StrokeData { points: done.points, meta: done.meta });
        }

        if !self.pending.contains_key(&key) {
            self.make_room(owner);
            self.opened += 1;
        }
        let opened = self.opened;
        let pending = self
            .pending
            .entry(key.clone())
            .or_insert_with(|| PendingStroke::new(owner, meta, opened));
        let accepted = pending.accept(points, max_points, &key.stroke_id);
        Ingest::Preview { meta: pending.meta.clone(), stroke_id: key.stroke_id, points: accepted }
    }

    /// Discard `owner`'s oldest open stroke if it is at the open-stroke cap.
    fn make_room(&mut self, owner: Uuid) {
        let open = self.pending.keys().filter(|key| key.owner == owner).count();
        if open < MAX_PENDING_PER_OWNER {
            return;
        }
        let oldest = self
            .pending
            .iter()
            .filter(|(key, _)| key.owner == owner)
            .min_by_key(|(_, pending)| pending.opened)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.pending.remove(&key);
            warn!(%owner, stroke_id = %key.stroke_id, max = MAX_PENDING_PER_OWNER, "too many open strokes; discarded oldest");
        }
    }

    /// Drop every pending stroke owned by `owner`. Returns how many were dropped.
    pub fn purge_owner(&mut self, owner: Uuid) -> usize {
        let before = self.pending.len();
        self.pending.retain(|key, _| key.owner != owner);
        before - self.pending.len()
    }

    /// Drop all pending strokes.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Look up an in-flight stroke.
    #[cfg(test)]
    pub(crate) fn get(&self, owner: Uuid, stroke_id: &str) -> Option<&PendingStroke> {
        self.pending.get(&StrokeKey { owner, stroke_id: stroke_id.to_owned() })
    }
}

#[cfg(test)]
#[path = "stroke_test.rs"]
mod tests;
