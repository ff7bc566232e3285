//! Transport boundary: broadcast and single-recipient emit.
//!
//! The socket layer lives outside this workspace. Entities carry an
//! `Arc<dyn Broadcaster>` in their `networking` component and systems call
//! through it once the entity's own mutation for the tick is done.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::EntityId;

/// Per-call broadcast options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOptions {
    /// Attach `meta.sent_at` with this timestamp.
    pub sent_at: Option<u64>,
}

impl BroadcastOptions {
    /// Options carrying `meta.sent_at = now`.
    pub fn stamped(now: u64) -> Self {
        Self { sent_at: Some(now) }
    }
}

/// Optional envelope metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    /// Sender clock time in milliseconds.
    pub sent_at: u64,
}

/// The wire envelope: `{event, data, meta?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name.
    pub event: String,
    /// Event payload.
    pub data: Value,
    /// Present only when the sender stamped it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<EnvelopeMeta>,
}

impl Envelope {
    /// Build an envelope, stamping it when the options ask for it.
    pub fn new(event: impl Into<String>, data: Value, options: &BroadcastOptions) -> Self {
        Self {
            event: event.into(),
            data,
            meta: options.sent_at.map(|sent_at| EnvelopeMeta { sent_at }),
        }
    }
}

/// Outbound network primitives consumed by the simulation.
pub trait Broadcaster: Send + Sync + fmt::Debug {
    /// Send to `recipients`, or to everyone interested when `None`.
    fn broadcast(
        &self,
        event: &str,
        payload: Value,
        recipients: Option<&[EntityId]>,
        options: &BroadcastOptions,
    );

    /// Send to a single recipient, e.g. a rejection message.
    fn emit(&self, recipient: EntityId, event: &str, data: Value);
}

/// Who a recorded delivery went to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Broadcast without a recipient list.
    Everyone,
    /// Broadcast to the listed recipients.
    Some(Vec<EntityId>),
    /// Single-recipient emit.
    Direct(EntityId),
}

/// A delivery captured by [`RecordingBroadcaster`].
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Who received it.
    pub audience: Audience,
    /// What was sent.
    pub envelope: Envelope,
}

/// In-memory broadcaster for tests and headless runs.
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingBroadcaster {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, delivery: Delivery) {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(delivery);
    }

    /// Snapshot of everything sent so far.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Deliveries whose event name matches `event`.
    pub fn events_named(&self, event: &str) -> Vec<Delivery> {
        self.deliveries()
            .into_iter()
            .filter(|d| d.envelope.event == event)
            .collect()
    }

    /// Number of deliveries named `event`.
    pub fn count(&self, event: &str) -> usize {
        self.events_named(event).len()
    }

    /// Forget everything recorded.
    pub fn clear(&self) {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast(
        &self,
        event: &str,
        payload: Value,
        recipients: Option<&[EntityId]>,
        options: &BroadcastOptions,
    ) {
        let audience = match recipients {
            Some(ids) => Audience::Some(ids.to_vec()),
            None => Audience::Everyone,
        };
        self.push(Delivery {
            audience,
            envelope: Envelope::new(event, payload, options),
        });
    }

    fn emit(&self, recipient: EntityId, event: &str, data: Value) {
        self.push(Delivery {
            audience: Audience::Direct(recipient),
            envelope: Envelope::new(event, data, &BroadcastOptions::default()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_omits_meta_unless_stamped() {
        let plain = Envelope::new("npc:movement", json!({"x": 1}), &BroadcastOptions::default());
        let text = serde_json::to_string(&plain).unwrap();
        assert!(!text.contains("meta"));

        let stamped = Envelope::new(
            "npc:movement",
            json!({"x": 1}),
            &BroadcastOptions::stamped(42),
        );
        insta::assert_json_snapshot!(stamped, @r#"
        {
          "event": "npc:movement",
          "data": {
            "x": 1
          },
          "meta": {
            "sent_at": 42
          }
        }
        "#);
    }

    #[test]
    fn recorder_tracks_audience() {
        let recorder = RecordingBroadcaster::new();
        let who = EntityId::new();
        recorder.broadcast("player:movement", json!({}), None, &BroadcastOptions::default());
        recorder.broadcast(
            "player:movement",
            json!({}),
            Some(&[who]),
            &BroadcastOptions::default(),
        );
        recorder.emit(who, "message", json!({"text": "you are already mining"}));

        let all = recorder.deliveries();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].audience, Audience::Everyone);
        assert_eq!(all[1].audience, Audience::Some(vec![who]));
        assert_eq!(all[2].audience, Audience::Direct(who));
        assert_eq!(recorder.count("player:movement"), 2);

        recorder.clear();
        assert!(recorder.deliveries().is_empty());
    }
}
