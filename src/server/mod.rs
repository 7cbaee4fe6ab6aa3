//! Central fan-out leg
//!
//! The server accepts sensor uplinks on one address and listeners on
//! another. Each sensor session decodes its compressed frames and
//! hands the PCM to the [`crate::hub::BroadcastHub`], which fans it
//! out to that sensor's listeners.
//!
//! ```text
//!  relay agent ──TCP──► ingest ──► DecodeSession ──► BroadcastHub ──TCP──► N listeners
//! ```

pub mod config;
mod ingest;
pub mod listener;

pub use config::ServerConfig;
pub use listener::FanoutServer;

use crate::decode::{decoder_for, AudioDecoder};
use crate::error::DecodeError;
use crate::protocol::SensorConfig;

/// Factory building a decoder from a sensor's handshake config
///
/// Injectable so tests can run sessions without a real codec.
pub type DecoderFactory =
    dyn Fn(&SensorConfig) -> Result<Box<dyn AudioDecoder>, DecodeError> + Send + Sync;

/// Default factory: builds the decoder named by the config.
pub fn opus_decoder_factory(
    config: &SensorConfig,
) -> Result<Box<dyn AudioDecoder>, DecodeError> {
    decoder_for(config)
}
