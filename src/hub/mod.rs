//! Broadcast hub for per-sensor fan-out
//!
//! The hub routes decoded PCM frames from each sensor's ingest session
//! to that sensor's listeners, and replays the last-known config to
//! late joiners so they can set up playback before the first frame.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<BroadcastHub>
//!                 ┌──────────────────────────────┐
//!                 │ sensors: HashMap<SensorId,   │
//!                 │   SensorEntry {              │
//!                 │     subscribers,             │
//!                 │     last_config,             │
//!                 │   }                          │
//!                 │ >                            │
//!                 └──────────────┬───────────────┘
//!                                │
//!           ┌────────────────────┼────────────────────┐
//!           ▼                    ▼                    ▼
//!     [DecodeSession]      [Subscriber]         [Subscriber]
//!     hub.broadcast()      rx.recv()            rx.recv()
//! ```
//!
//! # Failure isolation
//!
//! Delivery is best-effort per subscriber: each cycle snapshots the
//! membership, attempts a non-blocking send to everyone, and evicts
//! only the failures after the full iteration. A dead or hopelessly
//! slow listener never affects the others or the producer.
//!
//! # Zero-copy fan-out
//!
//! Frames are encoded once per broadcast; `bytes::Bytes` reference
//! counting shares the allocation across all subscriber channels.

pub mod config;
pub mod entry;
pub mod store;
pub mod subscriber;

pub use config::HubConfig;
pub use entry::SensorEntry;
pub use store::BroadcastHub;
pub use subscriber::{ListenerMessage, SubscriberId};
