//! Edge relay leg
//!
//! The relay agent sits next to the capture engine: it accepts the
//! engine's frame stream, absorbs uplink outages in a bounded
//! drop-oldest queue, and forwards frames to the central ingest
//! endpoint over a self-healing uplink.
//!
//! ```text
//!  capture engine ──TCP──► RelayListener ──► RelayQueue ──► UplinkConnector ──TCP──► central
//! ```

pub mod config;
pub mod listener;
pub mod queue;
pub mod uplink;

pub use config::RelayConfig;
pub use listener::{RelayEvent, RelayListener};
pub use queue::RelayQueue;
pub use uplink::UplinkConnector;
