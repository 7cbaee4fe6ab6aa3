//! Session state machine
//!
//! One sensor session runs `Connecting → HandshakeReceived → Streaming
//! → Draining → Closed`. The handshake creates the decoder and the
//! session object; the first valid binary frame enters `Streaming`;
//! any protocol error or read termination enters `Draining`, which
//! releases the decoder before the session is removed from all
//! registries at `Closed`.

use crate::decode::DecodeSession;
use crate::protocol::SensorConfig;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Connection accepted, handshake not yet received
    Connecting,
    /// Handshake received, decoder created, no frames yet
    HandshakeReceived,
    /// At least one valid frame decoded
    Streaming,
    /// Tearing down: decoder released, paired tasks being cancelled
    Draining,
    /// Removed from all registries
    Closed,
}

/// Per-session sequence bookkeeping
///
/// Sequence numbers are expected to increase by one per frame. A gap
/// is informational: it is reported for logging and processing
/// continues.
#[derive(Debug, Default)]
pub struct SequenceTracker {
    last: Option<u32>,
    gaps: u64,
}

/// One detected discontinuity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceGap {
    /// Last sequence seen before the gap
    pub from: u32,
    /// Sequence that arrived instead of `from + 1`
    pub to: u32,
}

impl SequenceTracker {
    /// Fresh tracker with no observed sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `seq`, returning the gap if it is not the successor of
    /// the previous sequence.
    pub fn observe(&mut self, seq: u32) -> Option<SequenceGap> {
        let gap = match self.last {
            Some(last) if seq != last.wrapping_add(1) => {
                self.gaps += 1;
                Some(SequenceGap { from: last, to: seq })
            }
            _ => None,
        };
        self.last = Some(seq);
        gap
    }

    /// Last observed sequence, if any.
    pub fn last(&self) -> Option<u32> {
        self.last
    }

    /// Gaps observed so far.
    pub fn gaps(&self) -> u64 {
        self.gaps
    }
}

/// State for one sensor's ingest session on the server leg
///
/// Owns the decoder exclusively: it is created here at handshake time
/// and dropped when the session drains. Never shared.
#[derive(Debug)]
pub struct SensorSession {
    sensor_id: String,
    phase: SessionPhase,
    config: SensorConfig,
    /// Sequence bookkeeping for gap logging
    pub sequences: SequenceTracker,
    decoder: Option<DecodeSession>,
}

impl SensorSession {
    /// Create the session at handshake time.
    ///
    /// The session starts in `HandshakeReceived`: it exists only once
    /// the handshake has arrived and the decoder could be built.
    pub fn new(config: SensorConfig, decoder: DecodeSession) -> Self {
        Self {
            sensor_id: config.sensor_id.clone(),
            phase: SessionPhase::HandshakeReceived,
            config,
            sequences: SequenceTracker::new(),
            decoder: Some(decoder),
        }
    }

    /// Sensor identity.
    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Handshake config (fixed for the session's lifetime).
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Exclusive access to the decoder while the session is live.
    pub fn decoder_mut(&mut self) -> Option<&mut DecodeSession> {
        self.decoder.as_mut()
    }

    /// Mark a valid frame: the first one moves the session to
    /// `Streaming`, later ones keep it there.
    pub fn on_valid_frame(&mut self) {
        if self.phase == SessionPhase::HandshakeReceived {
            self.phase = SessionPhase::Streaming;
        }
    }

    /// Enter `Draining`: the decoder is released here, before paired
    /// tasks are cancelled by the caller.
    pub fn begin_drain(&mut self) {
        if matches!(
            self.phase,
            SessionPhase::HandshakeReceived | SessionPhase::Streaming
        ) {
            self.phase = SessionPhase::Draining;
        }
        self.decoder = None;
    }

    /// Enter `Closed` once the session is out of every registry.
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }
}
