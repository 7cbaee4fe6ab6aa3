//! Wire protocol: frame codec and session handshake
//!
//! Both network legs speak the same 16-byte big-endian frame header;
//! only the magic differs (compressed audio on the ingest leg, PCM on
//! the listener leg). See [`frame`] for the layout and [`handshake`]
//! for the JSON config line that opens a session.

pub mod constants;
pub mod frame;
pub mod handshake;

pub use frame::{read_frame, write_frame, AudioFrame, FrameHeader, FrameKind};
pub use handshake::{JoinRequest, SensorConfig};
