//! Sensor session lifecycle
//!
//! Tracks one sensor's stream from connection to teardown and the
//! per-session sequence bookkeeping shared by both network legs.

pub mod state;

pub use state::{SensorSession, SequenceGap, SequenceTracker, SessionPhase};
