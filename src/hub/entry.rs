//! Per-sensor hub entry

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::protocol::SensorConfig;
use crate::stats::MetricsWindow;

use super::subscriber::{ListenerMessage, SubscriberId};

/// Result of one delivery cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// Subscribers that received the message
    pub delivered: usize,
    /// Subscribers evicted because their send failed
    pub evicted: usize,
}

/// Membership and last-known config for one sensor id
///
/// Entries are mutated only behind the hub's per-sensor lock; every
/// delivery cycle observes a stable membership.
pub struct SensorEntry {
    subscribers: HashMap<SubscriberId, mpsc::Sender<ListenerMessage>>,
    last_config: Option<SensorConfig>,
    pub(super) egress: MetricsWindow,
}

impl SensorEntry {
    pub(super) fn new(metrics_interval: Duration) -> Self {
        Self {
            subscribers: HashMap::new(),
            last_config: None,
            egress: MetricsWindow::with_interval(metrics_interval),
        }
    }

    /// Number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Last config published for this sensor, as received (pre-decode
    /// codec name).
    pub fn last_config(&self) -> Option<&SensorConfig> {
        self.last_config.as_ref()
    }

    /// Add a subscriber; replays the current config first if one is
    /// known. Returns whether a config was replayed.
    pub(super) fn join(&mut self, id: SubscriberId, tx: mpsc::Sender<ListenerMessage>) -> bool {
        let replayed = if let Some(ref config) = self.last_config {
            // A failed replay leaves the subscriber in place; the next
            // delivery cycle evicts it if the channel is really dead
            tx.try_send(ListenerMessage::Config(config.pcm_variant()))
                .is_ok()
        } else {
            false
        };

        self.subscribers.insert(id, tx);
        replayed
    }

    /// Remove a subscriber. Idempotent: unknown ids are a no-op.
    pub(super) fn remove(&mut self, id: SubscriberId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Store a (re)published config and replay it to every current
    /// subscriber.
    pub(super) fn set_config(&mut self, config: &SensorConfig) -> DeliveryOutcome {
        self.last_config = Some(config.clone());
        let message = ListenerMessage::Config(config.pcm_variant());
        self.deliver(message, None)
    }

    /// Fan one encoded PCM frame out to every current subscriber.
    pub(super) fn broadcast(&mut self, wire: &Bytes) -> DeliveryOutcome {
        self.deliver(ListenerMessage::Frame(wire.clone()), Some(wire.len()))
    }

    /// Snapshot-then-evict delivery: the membership is iterated in
    /// full before any failing subscriber is removed, so a failure
    /// never affects delivery to the others.
    fn deliver(
        &mut self,
        message: ListenerMessage,
        frame_bytes: Option<usize>,
    ) -> DeliveryOutcome {
        let mut delivered = 0;
        let mut dead = Vec::new();

        for (&id, tx) in &self.subscribers {
            match tx.try_send(message.clone()) {
                Ok(()) => {
                    delivered += 1;
                    if let Some(bytes) = frame_bytes {
                        self.egress.record(bytes);
                    }
                }
                Err(_) => dead.push(id),
            }
        }

        // Mutation strictly after the iteration completes
        let evicted = dead.len();
        for id in dead {
            self.subscribers.remove(&id);
        }

        DeliveryOutcome { delivered, evicted }
    }
}
