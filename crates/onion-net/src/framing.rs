//! Message framing for network transport
//!
//! Provides length-prefixed framing. Onion layers travel as raw frame
//! payloads; control bodies are postcard-encoded.

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Maximum frame size (16 MB)
const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Framing errors
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame too large: {0} bytes (max {MAX_FRAME_SIZE})")]
    TooLarge(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Body encoding error: {0}")]
    Body(#[from] postcard::Error),
    #[error("Unexpected frame: expected {expected:?}, got {actual:?}")]
    Unexpected {
        expected: FrameType,
        actual: FrameType,
    },
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Timed out")]
    TimedOut,
}

/// A framed message
#[derive(Clone, Debug)]
pub struct Frame {
    /// Frame type
    pub frame_type: FrameType,
    /// Payload bytes
    pub payload: Vec<u8>,
}

/// Frame types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum FrameType {
    /// Liveness probe
    Ping = 0,
    /// Liveness response
    Pong = 1,
    /// Onion layer for a relay, or the final message for a user
    Onion = 10,
    /// Positive response
    Ack = 11,
    /// Negative response
    Nack = 12,
    /// Relay registration
    Register = 20,
    /// Relay list request
    ListRelays = 21,
    /// Relay list response
    RelayList = 22,
    /// Relay statistics request
    Status = 30,
    /// Relay statistics response
    StatusReport = 31,
}

impl TryFrom<u8> for FrameType {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Ping),
            1 => Ok(Self::Pong),
            10 => Ok(Self::Onion),
            11 => Ok(Self::Ack),
            12 => Ok(Self::Nack),
            20 => Ok(Self::Register),
            21 => Ok(Self::ListRelays),
            22 => Ok(Self::RelayList),
            30 => Ok(Self::Status),
            31 => Ok(Self::StatusReport),
            _ => Err(FrameError::Serialization(format!("Unknown frame type: {}", value))),
        }
    }
}

/// Codec for length-prefixed frames
///
/// Wire format:
/// - 4 bytes: length (big-endian, includes type byte)
/// - 1 byte: frame type
/// - N bytes: payload
#[derive(Debug, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Need at least 5 bytes (4 length + 1 type)
        if src.len() < 5 {
            return Ok(None);
        }

        // Peek at length
        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if length > MAX_FRAME_SIZE {
            return Err(FrameError::TooLarge(length));
        }
        if length == 0 {
            return Err(FrameError::Serialization("Zero-length frame".into()));
        }

        // Need full frame
        if src.len() < 4 + length {
            src.reserve(4 + length - src.len());
            return Ok(None);
        }

        src.advance(4);

        let frame_type = FrameType::try_from(src[0])?;
        src.advance(1);

        let payload = src.split_to(length - 1).to_vec();

        Ok(Some(Frame { frame_type, payload }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let length = 1 + item.payload.len();
        if length > MAX_FRAME_SIZE {
            return Err(FrameError::TooLarge(length));
        }

        dst.reserve(4 + length);
        dst.put_u32(length as u32);
        dst.put_u8(item.frame_type as u8);
        dst.put_slice(&item.payload);

        Ok(())
    }
}

impl Frame {
    /// Create a new frame
    pub fn new(frame_type: FrameType, payload: Vec<u8>) -> Self {
        Self { frame_type, payload }
    }

    /// Create a frame with a postcard-encoded body
    pub fn with_body<T: Serialize>(frame_type: FrameType, body: &T) -> Result<Self, FrameError> {
        Ok(Self::new(frame_type, postcard::to_allocvec(body)?))
    }

    /// Decode the postcard body
    pub fn body<T: DeserializeOwned>(&self) -> Result<T, FrameError> {
        Ok(postcard::from_bytes(&self.payload)?)
    }

    /// Fail unless this frame has the given type
    pub fn expect(self, expected: FrameType) -> Result<Self, FrameError> {
        if self.frame_type != expected {
            return Err(FrameError::Unexpected {
                expected,
                actual: self.frame_type,
            });
        }
        Ok(self)
    }

    pub fn ping() -> Self {
        Self::new(FrameType::Ping, vec![])
    }

    pub fn pong() -> Self {
        Self::new(FrameType::Pong, vec![])
    }

    pub fn ack() -> Self {
        Self::new(FrameType::Ack, vec![])
    }

    /// Wrap an onion layer (or final message)
    pub fn onion(payload: Vec<u8>) -> Self {
        Self::new(FrameType::Onion, payload)
    }
}
