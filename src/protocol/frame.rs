//! Audio frame codec
//!
//! One frame on the wire is a fixed 16-byte big-endian header followed by
//! `payload_len` bytes of payload:
//!
//! ```text
//! u32 magic          'OPU0' = compressed audio, 'AUD0' = decoded PCM
//! u32 sequence
//! u32 sample_rate    Hz
//! u16 channels
//! u16 payload_len
//! [payload_len bytes]
//! ```
//!
//! The layout is identical on the ingest and listener legs; only the
//! magic differs. This layer never inspects payload contents.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};

use super::constants::{COMPRESSED_MAGIC, FRAME_HEADER_SIZE, MAX_FRAME_BYTES, PCM_MAGIC};

/// Which of the two frame formats a header belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Compressed audio from the sensor (magic 'OPU0')
    Compressed,
    /// Decoded PCM for listeners (magic 'AUD0')
    Pcm,
}

impl FrameKind {
    /// Wire magic for this frame kind
    pub const fn magic(self) -> u32 {
        match self {
            FrameKind::Compressed => COMPRESSED_MAGIC,
            FrameKind::Pcm => PCM_MAGIC,
        }
    }
}

/// Fixed-size frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame kind (determines the magic on the wire)
    pub kind: FrameKind,
    /// Per-session sequence number, expected to increase by one
    pub sequence: u32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
    /// Payload length in bytes, `1..=MAX_FRAME_BYTES`
    pub payload_len: u16,
}

impl FrameHeader {
    /// Decode a header, checking the magic against the expected kind.
    ///
    /// Fails before any payload is read: a wrong magic or an
    /// out-of-bounds length means the stream cannot be resynchronized.
    pub fn decode(
        buf: &[u8; FRAME_HEADER_SIZE],
        expected: FrameKind,
    ) -> std::result::Result<Self, ProtocolError> {
        let mut b = &buf[..];

        let magic = b.get_u32();
        if magic != expected.magic() {
            return Err(ProtocolError::InvalidMagic {
                expected: expected.magic(),
                found: magic,
            });
        }

        let sequence = b.get_u32();
        let sample_rate = b.get_u32();
        let channels = b.get_u16();
        let payload_len = b.get_u16();

        if payload_len == 0 || payload_len > MAX_FRAME_BYTES {
            return Err(ProtocolError::InvalidLength(payload_len));
        }

        Ok(Self {
            kind: expected,
            sequence,
            sample_rate,
            channels,
            payload_len,
        })
    }

    /// Encode the header into its big-endian wire form.
    ///
    /// Inverse of [`FrameHeader::decode`].
    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        {
            let mut b = &mut buf[..];
            b.put_u32(self.kind.magic());
            b.put_u32(self.sequence);
            b.put_u32(self.sample_rate);
            b.put_u16(self.channels);
            b.put_u16(self.payload_len);
        }
        buf
    }
}

/// One header+payload unit
///
/// Cheap to clone: the payload is reference-counted `Bytes`.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Frame header
    pub header: FrameHeader,
    /// Payload, `payload.len() == header.payload_len as usize`
    pub payload: Bytes,
}

impl AudioFrame {
    /// Create a frame from a header and payload.
    pub fn new(header: FrameHeader, payload: Bytes) -> Self {
        debug_assert_eq!(payload.len(), header.payload_len as usize);
        Self { header, payload }
    }

    /// Total size on the wire (header + payload).
    pub fn wire_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload.len()
    }

    /// Encode header and payload into one contiguous buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        buf.put_slice(&self.header.encode());
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

/// Read one complete frame.
///
/// Reads exactly 16 header bytes, validates them, then reads exactly
/// `payload_len` payload bytes; a partial frame never surfaces upward.
/// Returns `Ok(None)` on a clean end of stream at a frame boundary.
/// EOF inside a frame is [`ProtocolError::TruncatedFrame`].
pub async fn read_frame<R>(reader: &mut R, expected: FrameKind) -> Result<Option<AudioFrame>>
where
    R: AsyncRead + Unpin,
{
    let mut hdr = [0u8; FRAME_HEADER_SIZE];

    let n = reader.read(&mut hdr).await?;
    if n == 0 {
        return Ok(None);
    }
    if n < FRAME_HEADER_SIZE {
        reader
            .read_exact(&mut hdr[n..])
            .await
            .map_err(truncated)?;
    }

    // Header is validated before any payload byte is read
    let header = FrameHeader::decode(&hdr, expected)?;

    let mut payload = vec![0u8; header.payload_len as usize];
    reader.read_exact(&mut payload).await.map_err(truncated)?;

    Ok(Some(AudioFrame::new(header, Bytes::from(payload))))
}

/// Write one complete frame.
pub async fn write_frame<W>(writer: &mut W, frame: &AudioFrame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame.encode()).await?;
    Ok(())
}

fn truncated(e: std::io::Error) -> crate::error::Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::TruncatedFrame.into()
    } else {
        e.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn header(seq: u32) -> FrameHeader {
        FrameHeader {
            kind: FrameKind::Compressed,
            sequence: seq,
            sample_rate: 48_000,
            channels: 1,
            payload_len: 4,
        }
    }

    #[test]
    fn test_header_roundtrip() {
        let h = FrameHeader {
            kind: FrameKind::Pcm,
            sequence: 0xDEAD_BEEF,
            sample_rate: 48_000,
            channels: 2,
            payload_len: 1920,
        };

        let encoded = h.encode();
        let decoded = FrameHeader::decode(&encoded, FrameKind::Pcm).unwrap();

        assert_eq!(decoded, h);
    }

    #[test]
    fn test_header_wire_layout() {
        let h = header(1);
        let encoded = h.encode();

        // Big-endian: 'OPU0' magic first
        assert_eq!(&encoded[0..4], &[0x4F, 0x50, 0x55, 0x30]);
        assert_eq!(&encoded[4..8], &[0, 0, 0, 1]);
        // 48000 = 0x0000BB80
        assert_eq!(&encoded[8..12], &[0x00, 0x00, 0xBB, 0x80]);
        assert_eq!(&encoded[12..14], &[0, 1]);
        assert_eq!(&encoded[14..16], &[0, 4]);
    }

    #[test]
    fn test_decode_rejects_wrong_magic() {
        let pcm = FrameHeader {
            kind: FrameKind::Pcm,
            ..header(7)
        };
        let encoded = pcm.encode();

        let err = FrameHeader::decode(&encoded, FrameKind::Compressed).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidMagic {
                expected: COMPRESSED_MAGIC,
                found: PCM_MAGIC,
            }
        );
    }

    #[test]
    fn test_decode_rejects_zero_length() {
        let mut h = header(0);
        h.payload_len = 0;
        let encoded = h.encode();

        let err = FrameHeader::decode(&encoded, FrameKind::Compressed).unwrap_err();
        assert_eq!(err, ProtocolError::InvalidLength(0));
    }

    #[test]
    fn test_decode_rejects_oversize_length() {
        let mut h = header(0);
        h.payload_len = MAX_FRAME_BYTES + 1;
        let encoded = h.encode();

        let err = FrameHeader::decode(&encoded, FrameKind::Compressed).unwrap_err();
        assert_eq!(err, ProtocolError::InvalidLength(MAX_FRAME_BYTES + 1));
    }

    #[tokio::test]
    async fn test_write_read_frame_roundtrip() {
        let frame = AudioFrame::new(header(42), Bytes::from_static(b"opus"));

        let mut wire = Vec::new();
        write_frame(&mut wire, &frame).await.unwrap();
        assert_eq!(wire.len(), frame.wire_len());

        let mut reader = wire.as_slice();
        let read = read_frame(&mut reader, FrameKind::Compressed)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(read.header, frame.header);
        assert_eq!(read.payload, frame.payload);
    }

    #[tokio::test]
    async fn test_read_frame_clean_eof() {
        let mut reader: &[u8] = &[];
        let read = read_frame(&mut reader, FrameKind::Compressed).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_read_frame_truncated_payload() {
        let frame = AudioFrame::new(header(1), Bytes::from_static(b"opus"));
        let wire = frame.encode();

        // Header plus only half the payload
        let mut reader = &wire[..FRAME_HEADER_SIZE + 2];
        let err = read_frame(&mut reader, FrameKind::Compressed)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::TruncatedFrame)
        ));
    }

    #[tokio::test]
    async fn test_read_frame_bad_magic_before_payload() {
        // Only the 16 header bytes are available; validation must fail
        // on the magic without ever attempting a payload read.
        let pcm = FrameHeader {
            kind: FrameKind::Pcm,
            ..header(3)
        };
        let wire = pcm.encode();

        let mut reader = &wire[..];
        let err = read_frame(&mut reader, FrameKind::Compressed)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::InvalidMagic { .. })
        ));
    }
}
