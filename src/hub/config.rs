//! Hub configuration

use std::time::Duration;

use crate::protocol::constants::METRICS_WINDOW;

/// Configuration for the broadcast hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Per-subscriber channel depth, in messages.
    ///
    /// A subscriber whose channel is full fails the send and is
    /// evicted; the bound keeps one slow listener from buffering
    /// unboundedly.
    pub subscriber_buffer: usize,

    /// Rolling egress metrics interval
    pub metrics_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 64,
            metrics_interval: METRICS_WINDOW,
        }
    }
}

impl HubConfig {
    /// Set the per-subscriber channel depth.
    pub fn subscriber_buffer(mut self, depth: usize) -> Self {
        self.subscriber_buffer = depth.max(1);
        self
    }

    /// Set the egress metrics interval.
    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = interval;
        self
    }
}
