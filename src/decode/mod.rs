//! Audio decoding
//!
//! One [`DecodeSession`] exists per sensor id, created when the sensor's
//! handshake arrives and owned exclusively by that session. It turns
//! compressed frames into fixed-size s16le PCM frames sized by the
//! negotiated sample rate and frame duration (960 samples for
//! 48 kHz / 20 ms).
//!
//! Decoders are expected to tolerate occasional corrupt input: a frame
//! that fails to decode is dropped by the caller and the session
//! continues.

use audiopus::coder::Decoder as OpusInner;
use audiopus::{Channels, SampleRate};
use bytes::{BufMut, BytesMut};

use crate::error::DecodeError;
use crate::protocol::constants::CODEC_OPUS;
use crate::protocol::{AudioFrame, FrameHeader, FrameKind, SensorConfig};

/// Codec seam for the decode session
///
/// `decode` writes interleaved samples into `out` and returns the
/// number of samples written per channel.
pub trait AudioDecoder: Send {
    /// Decode one compressed packet.
    fn decode(&mut self, packet: &[u8], out: &mut [i16]) -> Result<usize, DecodeError>;
}

/// Opus decoder backed by libopus
pub struct OpusDecoder {
    inner: OpusInner,
}

impl OpusDecoder {
    /// Build a decoder for the given rate and channel count.
    ///
    /// Opus supports 8/12/16/24/48 kHz and mono/stereo; anything else
    /// is rejected at session setup.
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self, DecodeError> {
        let rate = match sample_rate {
            8_000 => SampleRate::Hz8000,
            12_000 => SampleRate::Hz12000,
            16_000 => SampleRate::Hz16000,
            24_000 => SampleRate::Hz24000,
            48_000 => SampleRate::Hz48000,
            other => return Err(DecodeError::UnsupportedSampleRate(other)),
        };
        let channels = match channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            other => return Err(DecodeError::UnsupportedChannels(other)),
        };

        Ok(Self {
            inner: OpusInner::new(rate, channels)?,
        })
    }
}

impl AudioDecoder for OpusDecoder {
    fn decode(&mut self, packet: &[u8], out: &mut [i16]) -> Result<usize, DecodeError> {
        Ok(self.inner.decode(Some(packet), out, false)?)
    }
}

/// Build the decoder named by a handshake config.
pub fn decoder_for(config: &SensorConfig) -> Result<Box<dyn AudioDecoder>, DecodeError> {
    match config.codec.as_str() {
        CODEC_OPUS => Ok(Box::new(OpusDecoder::new(
            config.sample_rate,
            config.channels,
        )?)),
        other => Err(DecodeError::UnsupportedCodec(other.to_string())),
    }
}

/// Per-sensor decoder state
///
/// Configuration is fixed for the session's lifetime; sample-rate or
/// channel changes mid-stream are not supported.
pub struct DecodeSession {
    config: SensorConfig,
    decoder: Box<dyn AudioDecoder>,
    pcm: Vec<i16>,
    failures: u64,
}

impl DecodeSession {
    /// Session around an explicit decoder implementation.
    pub fn new(config: SensorConfig, decoder: Box<dyn AudioDecoder>) -> Self {
        let pcm = vec![0i16; config.frame_samples() * config.channels as usize];
        Self {
            config,
            decoder,
            pcm,
            failures: 0,
        }
    }

    /// Session with the decoder named by the config itself.
    pub fn open(config: &SensorConfig) -> Result<Self, DecodeError> {
        let decoder = decoder_for(config)?;
        Ok(Self::new(config.clone(), decoder))
    }

    /// Handshake config this session was built from.
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Frames that failed to decode so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Decode one compressed frame into a PCM frame.
    ///
    /// The PCM frame keeps the input sequence number and carries the
    /// decoded payload as little-endian s16 samples. A failure is
    /// counted and returned; the session stays usable for the next
    /// frame.
    pub fn decode_frame(&mut self, frame: &AudioFrame) -> Result<AudioFrame, DecodeError> {
        let per_channel = match self.decoder.decode(&frame.payload, &mut self.pcm) {
            Ok(n) => n,
            Err(e) => {
                self.failures += 1;
                return Err(e);
            }
        };

        let samples = per_channel * self.config.channels as usize;
        let mut payload = BytesMut::with_capacity(samples * 2);
        for &sample in &self.pcm[..samples] {
            payload.put_i16_le(sample);
        }

        let header = FrameHeader {
            kind: FrameKind::Pcm,
            sequence: frame.header.sequence,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            payload_len: (samples * 2) as u16,
        };

        Ok(AudioFrame::new(header, payload.freeze()))
    }
}

impl std::fmt::Debug for DecodeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeSession")
            .field("config", &self.config)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}
