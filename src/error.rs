//! Error types for the relay and fan-out pipeline
//!
//! Protocol errors are fatal for the connection that produced them.
//! Decode errors are contained to a single frame. I/O errors terminate
//! only the owning session.

/// Convenience result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error from the underlying socket
    Io(std::io::Error),
    /// Wire protocol violation (bad magic, bad length, bad handshake)
    Protocol(ProtocolError),
    /// Audio decode failure
    Decode(DecodeError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Decode(e) => write!(f, "Decode error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Decode(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Decode(e)
    }
}

/// Wire protocol violation
///
/// Length-prefixed framing cannot resynchronize after corruption, so
/// every variant is fatal for the connection it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame magic did not match the expected frame kind
    InvalidMagic { expected: u32, found: u32 },
    /// Payload length of zero or above the frame size bound
    InvalidLength(u16),
    /// Stream ended in the middle of a frame
    TruncatedFrame,
    /// Handshake line was missing or not valid JSON
    InvalidHandshake(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::InvalidMagic { expected, found } => {
                write!(
                    f,
                    "Invalid frame magic: expected {:#010x}, found {:#010x}",
                    expected, found
                )
            }
            ProtocolError::InvalidLength(len) => {
                write!(f, "Invalid payload length: {}", len)
            }
            ProtocolError::TruncatedFrame => write!(f, "Stream ended mid-frame"),
            ProtocolError::InvalidHandshake(msg) => {
                write!(f, "Invalid handshake: {}", msg)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Audio decode failure
///
/// Unsupported-configuration variants occur at session setup; `Failed`
/// occurs per frame and the session is expected to continue past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Codec named in the handshake is not supported
    UnsupportedCodec(String),
    /// Sample rate the decoder cannot be built for
    UnsupportedSampleRate(u32),
    /// Channel count the decoder cannot be built for
    UnsupportedChannels(u16),
    /// Malformed or corrupt compressed payload
    Failed(String),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::UnsupportedCodec(codec) => {
                write!(f, "Unsupported codec: {}", codec)
            }
            DecodeError::UnsupportedSampleRate(rate) => {
                write!(f, "Unsupported sample rate: {} Hz", rate)
            }
            DecodeError::UnsupportedChannels(ch) => {
                write!(f, "Unsupported channel count: {}", ch)
            }
            DecodeError::Failed(msg) => write!(f, "Decode failed: {}", msg),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<audiopus::Error> for DecodeError {
    fn from(e: audiopus::Error) -> Self {
        DecodeError::Failed(e.to_string())
    }
}
