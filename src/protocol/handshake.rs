//! Session handshake
//!
//! The first message of an uplink or listener session is a single JSON
//! text line, sent before any binary frame:
//!
//! ```text
//! {"sensor_id":"ANE1","codec":"opus","sample_rate":48000,"channels":1,"frame_ms":20}
//! ```
//!
//! Listeners joining a sensor receive the same object with the codec
//! rewritten to the decoded format. Listener connections open with a
//! one-line join request naming the sensor they want.
//!
//! The line is read byte-by-byte so no bytes of the binary frame stream
//! that follows are consumed into a buffer.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};

use super::constants::{CODEC_PCM, DEFAULT_FRAME_MS};

/// Upper bound on a handshake line; anything longer is a protocol error
const MAX_LINE_BYTES: usize = 4096;

/// Sensor session parameters, established once per session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Sensor identity
    pub sensor_id: String,
    /// Codec of the binary frames that follow ("opus" on the uplink)
    pub codec: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
    /// Frame duration in milliseconds
    pub frame_ms: u32,
}

impl SensorConfig {
    /// Config for an Opus sensor with the default 20 ms frames.
    pub fn opus(sensor_id: impl Into<String>, sample_rate: u32, channels: u16) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            codec: super::constants::CODEC_OPUS.to_string(),
            sample_rate,
            channels,
            frame_ms: DEFAULT_FRAME_MS,
        }
    }

    /// The config listeners see: identical, with the codec rewritten to
    /// the decoded format.
    pub fn pcm_variant(&self) -> Self {
        Self {
            codec: CODEC_PCM.to_string(),
            ..self.clone()
        }
    }

    /// Samples per channel in one frame at the negotiated rate and
    /// duration (960 for 48 kHz / 20 ms).
    pub fn frame_samples(&self) -> usize {
        (self.sample_rate as usize * self.frame_ms as usize) / 1000
    }

    /// Byte size of one decoded s16le PCM frame.
    pub fn pcm_frame_bytes(&self) -> usize {
        self.frame_samples() * self.channels as usize * 2
    }

    /// JSON wire form of the config, without a trailing newline.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// First line of a listener connection, naming the sensor to follow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Sensor identity to subscribe to
    pub sensor_id: String,
}

/// Read one newline-terminated JSON line and parse it.
///
/// Reads a byte at a time: the bytes after the newline belong to the
/// binary frame stream and must stay in the socket.
pub async fn read_json_line<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            return Err(ProtocolError::InvalidHandshake(
                "stream ended before handshake line".to_string(),
            )
            .into());
        }
        if byte[0] == b'\n' {
            break;
        }
        if line.len() >= MAX_LINE_BYTES {
            return Err(ProtocolError::InvalidHandshake(format!(
                "handshake line exceeds {} bytes",
                MAX_LINE_BYTES
            ))
            .into());
        }
        line.push(byte[0]);
    }

    serde_json::from_slice(&line)
        .map_err(|e| ProtocolError::InvalidHandshake(e.to_string()).into())
}

/// Serialize a value as one newline-terminated JSON line.
pub fn to_json_line<T: Serialize>(value: &T) -> String {
    let mut line = serde_json::to_string(value).unwrap_or_default();
    line.push('\n');
    line
}

/// Write a value as one newline-terminated JSON line.
pub async fn write_json_line<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    writer.write_all(to_json_line(value).as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_config_json_shape() {
        let config = SensorConfig::opus("ANE1", 48_000, 1);
        let json = serde_json::to_string(&config).unwrap();

        assert_eq!(
            json,
            r#"{"sensor_id":"ANE1","codec":"opus","sample_rate":48000,"channels":1,"frame_ms":20}"#
        );
    }

    #[test]
    fn test_pcm_variant_rewrites_codec_only() {
        let config = SensorConfig::opus("ANE1", 48_000, 1);
        let pcm = config.pcm_variant();

        assert_eq!(pcm.codec, "pcm_s16le");
        assert_eq!(pcm.sensor_id, config.sensor_id);
        assert_eq!(pcm.sample_rate, config.sample_rate);
        assert_eq!(pcm.channels, config.channels);
        assert_eq!(pcm.frame_ms, config.frame_ms);
    }

    #[test]
    fn test_frame_geometry() {
        let config = SensorConfig::opus("ANE1", 48_000, 1);

        // 20 ms at 48 kHz mono
        assert_eq!(config.frame_samples(), 960);
        assert_eq!(config.pcm_frame_bytes(), 1920);
    }

    #[tokio::test]
    async fn test_read_json_line_leaves_binary_bytes() {
        let config = SensorConfig::opus("ANE1", 48_000, 1);
        let mut wire = to_json_line(&config).into_bytes();
        wire.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let mut reader = wire.as_slice();
        let parsed: SensorConfig = read_json_line(&mut reader).await.unwrap();

        assert_eq!(parsed, config);
        // The bytes after the newline are untouched
        assert_eq!(reader, &[0xAA, 0xBB, 0xCC]);
    }

    #[tokio::test]
    async fn test_read_json_line_rejects_garbage() {
        let mut reader: &[u8] = b"not json\n";
        let err = read_json_line::<_, SensorConfig>(&mut reader)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::InvalidHandshake(_))
        ));
    }

    #[tokio::test]
    async fn test_read_json_line_rejects_missing_newline() {
        let mut reader: &[u8] = br#"{"sensor_id":"ANE1"}"#;
        let err = read_json_line::<_, JoinRequest>(&mut reader)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::InvalidHandshake(_))
        ));
    }
}
