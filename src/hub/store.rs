//! Broadcast hub implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::protocol::{AudioFrame, SensorConfig};

use super::config::HubConfig;
use super::entry::SensorEntry;
use super::subscriber::{ListenerMessage, SubscriberId};

/// Central registry routing decoded audio to listeners
///
/// Thread-safe via `RwLock`; per-sensor access is serialized through
/// the entry lock, which is held across a whole delivery cycle so no
/// cycle ever observes a membership mutated mid-iteration.
pub struct BroadcastHub {
    /// Map of sensor id to its entry
    sensors: RwLock<HashMap<String, Arc<RwLock<SensorEntry>>>>,

    /// Next subscriber id to hand out
    next_subscriber_id: AtomicU64,

    /// Configuration
    config: HubConfig,
}

impl BroadcastHub {
    /// Create a hub with default configuration.
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a hub with custom configuration.
    pub fn with_config(config: HubConfig) -> Self {
        Self {
            sensors: RwLock::new(HashMap::new()),
            next_subscriber_id: AtomicU64::new(1),
            config,
        }
    }

    /// Hub configuration.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Get or create the entry for a sensor id.
    ///
    /// Listeners may join before the sensor has ever published.
    async fn entry(&self, sensor_id: &str) -> Arc<RwLock<SensorEntry>> {
        {
            let sensors = self.sensors.read().await;
            if let Some(entry) = sensors.get(sensor_id) {
                return Arc::clone(entry);
            }
        }

        let mut sensors = self.sensors.write().await;
        Arc::clone(
            sensors
                .entry(sensor_id.to_string())
                .or_insert_with(|| {
                    Arc::new(RwLock::new(SensorEntry::new(self.config.metrics_interval)))
                }),
        )
    }

    /// Subscribe to a sensor.
    ///
    /// Returns the subscriber id and the receiving end of the
    /// subscriber's channel. If a config is known for the sensor it is
    /// already queued on the channel, ahead of any audio frame.
    pub async fn join(&self, sensor_id: &str) -> (SubscriberId, mpsc::Receiver<ListenerMessage>) {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.config.subscriber_buffer);

        let entry_arc = self.entry(sensor_id).await;
        let mut entry = entry_arc.write().await;
        let replayed = entry.join(id, tx);

        tracing::info!(
            sensor = %sensor_id,
            subscriber = id,
            subscribers = entry.subscriber_count(),
            config_replayed = replayed,
            "Subscriber joined"
        );

        (id, rx)
    }

    /// Unsubscribe from a sensor. Idempotent.
    pub async fn leave(&self, sensor_id: &str, id: SubscriberId) {
        let sensors = self.sensors.read().await;

        if let Some(entry_arc) = sensors.get(sensor_id) {
            let mut entry = entry_arc.write().await;
            if entry.remove(id) {
                tracing::debug!(
                    sensor = %sensor_id,
                    subscriber = id,
                    subscribers = entry.subscriber_count(),
                    "Subscriber left"
                );
            }
        }
    }

    /// Record a sensor's handshake config and replay it (codec
    /// rewritten to the decoded format) to every current subscriber.
    pub async fn publish_config(&self, sensor_id: &str, config: &SensorConfig) {
        let entry_arc = self.entry(sensor_id).await;
        let mut entry = entry_arc.write().await;
        let outcome = entry.set_config(config);

        tracing::info!(
            sensor = %sensor_id,
            subscribers = entry.subscriber_count(),
            replayed_to = outcome.delivered,
            evicted = outcome.evicted,
            "Sensor config published"
        );
    }

    /// Fan one PCM frame out to a sensor's subscribers.
    ///
    /// Best-effort: subscribers whose send fails are evicted after the
    /// iteration; there are no retries. Returns how many subscribers
    /// received the frame.
    pub async fn broadcast(&self, sensor_id: &str, frame: &AudioFrame) -> usize {
        let entry_arc = {
            let sensors = self.sensors.read().await;
            match sensors.get(sensor_id) {
                Some(entry) => Arc::clone(entry),
                None => return 0,
            }
        };

        let mut entry = entry_arc.write().await;
        let wire = frame.encode();
        let outcome = entry.broadcast(&wire);

        if outcome.evicted > 0 {
            tracing::warn!(
                sensor = %sensor_id,
                evicted = outcome.evicted,
                subscribers = entry.subscriber_count(),
                "Evicted unreachable subscribers"
            );
        }

        if let Some(window) = entry.egress.take_if_elapsed() {
            tracing::info!(
                sensor = %sensor_id,
                frames = window.frames,
                kib_per_sec = window.kib_per_sec(),
                subscribers = entry.subscriber_count(),
                "Broadcast throughput"
            );
        }

        outcome.delivered
    }

    /// Subscribers currently registered for a sensor.
    pub async fn subscriber_count(&self, sensor_id: &str) -> usize {
        let sensors = self.sensors.read().await;
        match sensors.get(sensor_id) {
            Some(entry_arc) => entry_arc.read().await.subscriber_count(),
            None => 0,
        }
    }

    /// Last config published for a sensor, as received.
    pub async fn last_config(&self, sensor_id: &str) -> Option<SensorConfig> {
        let sensors = self.sensors.read().await;
        match sensors.get(sensor_id) {
            Some(entry_arc) => entry_arc.read().await.last_config().cloned(),
            None => None,
        }
    }

    /// Number of sensor entries.
    pub async fn sensor_count(&self) -> usize {
        self.sensors.read().await.len()
    }

    /// Drop a sensor's entry if nobody is subscribed.
    ///
    /// Called when an ingest session closes. With subscribers present
    /// the entry (and its config) stays, so they simply stop receiving
    /// frames and a re-publishing sensor finds them again.
    pub async fn remove_if_idle(&self, sensor_id: &str) -> bool {
        let mut sensors = self.sensors.write().await;

        let idle = match sensors.get(sensor_id) {
            Some(entry_arc) => entry_arc.read().await.subscriber_count() == 0,
            None => false,
        };

        if idle {
            sensors.remove(sensor_id);
            tracing::debug!(sensor = %sensor_id, "Idle sensor entry removed");
        }
        idle
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
