//! Subscriber-side types

use bytes::Bytes;

use crate::protocol::SensorConfig;

/// Hub-assigned subscriber identity, unique per hub instance
pub type SubscriberId = u64;

/// What a listener connection receives from the hub
///
/// Cheap to clone: frames carry reference-counted wire bytes.
#[derive(Debug, Clone)]
pub enum ListenerMessage {
    /// Session config, already rewritten to the decoded codec.
    ///
    /// Sent once on join when a config is known, and again whenever
    /// the sensor (re)publishes. Always precedes that sensor's frames.
    Config(SensorConfig),
    /// One encoded PCM frame (header + payload wire bytes)
    Frame(Bytes),
}
