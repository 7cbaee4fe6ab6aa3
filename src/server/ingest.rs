//! Ingest session driver
//!
//! Drives one sensor uplink connection on the central leg: handshake,
//! decoder setup, then the frame loop. Protocol errors are fatal for
//! the connection (no resync); a frame that fails to decode is dropped
//! and the stream continues.

use std::time::Duration;

use tokio::io::AsyncRead;

use crate::decode::DecodeSession;
use crate::error::Result;
use crate::hub::BroadcastHub;
use crate::protocol::{handshake, read_frame, FrameKind, SensorConfig};
use crate::session::SensorSession;
use crate::stats::MetricsWindow;

use super::DecoderFactory;

/// Drive one ingest connection to completion.
///
/// Reads the handshake line, builds the decoder, publishes the config
/// to the hub, then decodes and broadcasts frames until the stream
/// ends or a protocol error closes it. Teardown always releases the
/// decoder and drops the hub entry if no subscribers remain.
pub(super) async fn run_ingest_session<S>(
    mut stream: S,
    session_id: u64,
    hub: &BroadcastHub,
    make_decoder: &DecoderFactory,
    metrics_interval: Duration,
) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    // Connecting -> HandshakeReceived: the handshake creates the
    // decoder and registers the session
    let config: SensorConfig = handshake::read_json_line(&mut stream).await?;
    let decoder = make_decoder(&config)?;
    let mut session = SensorSession::new(
        config.clone(),
        DecodeSession::new(config.clone(), decoder),
    );

    hub.publish_config(&config.sensor_id, &config).await;
    tracing::info!(
        session_id,
        sensor = %config.sensor_id,
        codec = %config.codec,
        sample_rate = config.sample_rate,
        channels = config.channels,
        "Sensor session established"
    );

    let mut metrics = MetricsWindow::with_interval(metrics_interval);

    let result = loop {
        match read_frame(&mut stream, FrameKind::Compressed).await {
            Ok(Some(frame)) => {
                if let Some(gap) = session.sequences.observe(frame.header.sequence) {
                    tracing::warn!(
                        session_id,
                        sensor = %config.sensor_id,
                        from = gap.from,
                        to = gap.to,
                        "Sequence gap"
                    );
                }

                metrics.record(frame.wire_len());
                session.on_valid_frame();

                let decoded = match session.decoder_mut() {
                    Some(decoder) => decoder.decode_frame(&frame),
                    None => break Ok(()),
                };

                match decoded {
                    Ok(pcm) => {
                        hub.broadcast(&config.sensor_id, &pcm).await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            session_id,
                            sensor = %config.sensor_id,
                            seq = frame.header.sequence,
                            error = %e,
                            "Dropped undecodable frame"
                        );
                    }
                }

                if let Some(window) = metrics.take_if_elapsed() {
                    let subscribers = hub.subscriber_count(&config.sensor_id).await;
                    tracing::info!(
                        session_id,
                        sensor = %config.sensor_id,
                        frames = window.frames,
                        kib_per_sec = window.kib_per_sec(),
                        subscribers,
                        "Ingest throughput"
                    );
                }
            }
            Ok(None) => {
                tracing::info!(
                    session_id,
                    sensor = %config.sensor_id,
                    "Sensor disconnected"
                );
                break Ok(());
            }
            Err(e) => break Err(e),
        }
    };

    // Draining -> Closed: release the decoder, then drop the hub
    // entry unless subscribers are still attached
    session.begin_drain();
    hub.remove_if_idle(&config.sensor_id).await;
    session.close();

    result
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::decode::AudioDecoder;
    use crate::error::{DecodeError, Error, ProtocolError};
    use crate::hub::ListenerMessage;
    use crate::protocol::{AudioFrame, FrameHeader};

    /// Fails on a marker byte, otherwise emits constant samples.
    struct StubDecoder;

    const CORRUPT: u8 = 0xEE;

    impl AudioDecoder for StubDecoder {
        fn decode(
            &mut self,
            packet: &[u8],
            out: &mut [i16],
        ) -> std::result::Result<usize, DecodeError> {
            if packet.first() == Some(&CORRUPT) {
                return Err(DecodeError::Failed("corrupt packet".to_string()));
            }
            for sample in out.iter_mut() {
                *sample = 7;
            }
            Ok(out.len())
        }
    }

    fn stub_factory(
        _config: &SensorConfig,
    ) -> std::result::Result<Box<dyn AudioDecoder>, DecodeError> {
        Ok(Box::new(StubDecoder))
    }

    fn compressed(seq: u32, payload: &'static [u8]) -> AudioFrame {
        AudioFrame::new(
            FrameHeader {
                kind: FrameKind::Compressed,
                sequence: seq,
                sample_rate: 48_000,
                channels: 1,
                payload_len: payload.len() as u16,
            },
            Bytes::from_static(payload),
        )
    }

    fn session_wire(frames: &[AudioFrame]) -> Vec<u8> {
        let config = SensorConfig::opus("ANE1", 48_000, 1);
        let mut wire = handshake::to_json_line(&config).into_bytes();
        for frame in frames {
            wire.extend_from_slice(&frame.encode());
        }
        wire
    }

    #[tokio::test]
    async fn test_decodes_and_broadcasts() {
        let hub = BroadcastHub::new();
        let (_id, mut rx) = hub.join("ANE1").await;

        let wire = session_wire(&[compressed(1, b"aa"), compressed(2, b"bb")]);
        run_ingest_session(wire.as_slice(), 1, &hub, &stub_factory, Duration::from_secs(1))
            .await
            .unwrap();

        // Config first (replayed on publish), then both PCM frames
        assert!(matches!(
            rx.try_recv(),
            Ok(ListenerMessage::Config(c)) if c.codec == "pcm_s16le"
        ));

        for expected_seq in [1u32, 2] {
            match rx.try_recv() {
                Ok(ListenerMessage::Frame(wire)) => {
                    let mut reader: &[u8] = wire.as_ref();
                    let frame = read_frame(&mut reader, FrameKind::Pcm)
                        .await
                        .unwrap()
                        .unwrap();
                    assert_eq!(frame.header.sequence, expected_seq);
                    assert_eq!(frame.header.payload_len, 1920);
                }
                other => panic!("expected frame, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_corrupt_frame_does_not_end_session() {
        let hub = BroadcastHub::new();
        let (_id, mut rx) = hub.join("ANE1").await;

        let wire = session_wire(&[
            compressed(1, b"aa"),
            compressed(2, &[CORRUPT, 0]),
            compressed(3, b"cc"),
        ]);
        run_ingest_session(wire.as_slice(), 1, &hub, &stub_factory, Duration::from_secs(1))
            .await
            .unwrap();

        // Config, then frames 1 and 3; frame 2 was dropped silently
        assert!(matches!(rx.try_recv(), Ok(ListenerMessage::Config(_))));

        let mut sequences = Vec::new();
        while let Ok(ListenerMessage::Frame(wire)) = rx.try_recv() {
            let mut reader: &[u8] = wire.as_ref();
            let frame = read_frame(&mut reader, FrameKind::Pcm)
                .await
                .unwrap()
                .unwrap();
            sequences.push(frame.header.sequence);
        }
        assert_eq!(sequences, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_protocol_error_is_fatal() {
        let hub = BroadcastHub::new();

        // A PCM-magic frame on the ingest leg
        let bad = AudioFrame::new(
            FrameHeader {
                kind: FrameKind::Pcm,
                ..compressed(1, b"aa").header
            },
            Bytes::from_static(b"aa"),
        );
        let wire = session_wire(&[bad]);

        let err =
            run_ingest_session(wire.as_slice(), 1, &hub, &stub_factory, Duration::from_secs(1))
                .await
                .unwrap_err();

        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::InvalidMagic { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsupported_codec_rejects_session() {
        let hub = BroadcastHub::new();

        let mut config = SensorConfig::opus("ANE1", 48_000, 1);
        config.codec = "flac".to_string();
        let wire = handshake::to_json_line(&config).into_bytes();

        let err = run_ingest_session(
            wire.as_slice(),
            1,
            &hub,
            &crate::server::opus_decoder_factory,
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            Error::Decode(DecodeError::UnsupportedCodec(_))
        ));
    }

    #[tokio::test]
    async fn test_idle_entry_removed_on_teardown() {
        let hub = BroadcastHub::new();

        let wire = session_wire(&[compressed(1, b"aa")]);
        run_ingest_session(wire.as_slice(), 1, &hub, &stub_factory, Duration::from_secs(1))
            .await
            .unwrap();

        // No subscribers were attached, so the entry is gone
        assert_eq!(hub.sensor_count().await, 0);
    }
}
