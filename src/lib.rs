//! Sensor audio relay and fan-out
//!
//! Relays compressed audio captured at an edge sensor to a central
//! service and fans the decoded audio out to many simultaneous
//! listeners, over links that may stall or drop.
//!
//! ```text
//!  sensor ─► RelayListener ─► RelayQueue ─► UplinkConnector ─┐
//!                                                            │ TCP
//!  listener ◄── BroadcastHub ◄── DecodeSession ◄── ingest ◄──┘
//! ```
//!
//! The two halves can run in one process or on different machines:
//!
//! - [`relay`] is the edge leg: it accepts the capture engine's frame
//!   stream, absorbs uplink outages in a bounded drop-oldest queue,
//!   and forwards frames over a self-healing uplink.
//! - [`server`] is the central leg: it accepts sensor uplinks, decodes
//!   Opus to PCM per sensor, and broadcasts to listeners with
//!   per-subscriber failure isolation.
//!
//! Delivery is deliberately best-effort end to end: frames lost to a
//! full queue, a dead uplink, or a slow listener are gone, and nobody
//! is told. Gap detection, drop counters and throughput logs are the
//! only observability. The process is expected to run under external
//! supervision.

pub mod decode;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use hub::BroadcastHub;
pub use protocol::{AudioFrame, FrameHeader, FrameKind, SensorConfig};
pub use relay::{RelayConfig, RelayListener};
pub use server::{FanoutServer, ServerConfig};
