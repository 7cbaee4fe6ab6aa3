//! Wire protocol constants

use std::time::Duration;

/// Magic for compressed-audio frames ("OPU0")
pub const COMPRESSED_MAGIC: u32 = 0x4F50_5530;

/// Magic for decoded PCM frames ("AUD0")
pub const PCM_MAGIC: u32 = 0x4155_4430;

/// Fixed frame header size on the wire:
/// magic(4) + sequence(4) + sample_rate(4) + channels(2) + payload_len(2)
pub const FRAME_HEADER_SIZE: usize = 16;

/// Upper bound on a frame payload.
///
/// A corrupt length field would otherwise desynchronize the stream, so
/// anything above this closes the connection.
pub const MAX_FRAME_BYTES: u16 = 4096;

/// Default relay queue capacity (~4 s of audio at 20 ms per frame)
pub const DEFAULT_QUEUE_CAPACITY: usize = 200;

/// Fixed delay between uplink reconnect attempts
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Default rolling metrics window
pub const METRICS_WINDOW: Duration = Duration::from_secs(1);

/// Default Opus frame duration in milliseconds
pub const DEFAULT_FRAME_MS: u32 = 20;

/// Codec name carried by sensor handshakes
pub const CODEC_OPUS: &str = "opus";

/// Codec name listeners see after decode
pub const CODEC_PCM: &str = "pcm_s16le";
