//! Wire codec for the two protocol generations.
//!
//! Generation 1 frames messages as self-describing JSON text; generation 2
//! frames them as bincode binary. The generation is negotiated once at
//! connect time (the client advertises it in the connection URL) and the
//! resulting [`WireCodec`] is the only place framing is decided — call
//! sites never branch on the protocol version.
//!
//! Decoding is tolerant of frame kind: a text frame always parses as JSON
//! and a binary frame as bincode, so a client survives a server that is
//! one generation ahead or behind on its outbound path.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

use crate::messages::{ClientCommand, ServerMessage};

/// Protocol generations a client can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// Self-describing JSON in text frames.
    V1,
    /// Schema-typed bincode in binary frames.
    V2,
}

impl ProtocolVersion {
    pub fn from_flag(v: u8) -> Self {
        match v {
            1 => ProtocolVersion::V1,
            _ => ProtocolVersion::V2,
        }
    }

    pub fn as_query(&self) -> u8 {
        match self {
            ProtocolVersion::V1 => 1,
            ProtocolVersion::V2 => 2,
        }
    }
}

/// A frame ready for (or received from) the duplex connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug)]
pub enum CodecError {
    Json(serde_json::Error),
    Binary(bincode::Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Json(e) => write!(f, "json codec: {}", e),
            CodecError::Binary(e) => write!(f, "binary codec: {}", e),
        }
    }
}

impl std::error::Error for CodecError {}

/// Encoder/decoder bound to one negotiated protocol generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireCodec {
    version: ProtocolVersion,
}

impl WireCodec {
    pub fn new(version: ProtocolVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Encodes an outbound command with the negotiated framing.
    pub fn encode_command(&self, cmd: &ClientCommand) -> Result<WireFrame, CodecError> {
        encode(self.version, cmd)
    }

    /// Encodes a server message; used by tests and recorded-session tooling.
    pub fn encode_server(&self, msg: &ServerMessage) -> Result<WireFrame, CodecError> {
        encode(self.version, msg)
    }

    /// Decodes an inbound frame into a server message. The frame kind,
    /// not the negotiated generation, selects the parser.
    pub fn decode_server(frame: &WireFrame) -> Result<ServerMessage, CodecError> {
        decode(frame)
    }
}

fn encode<T: Serialize>(version: ProtocolVersion, value: &T) -> Result<WireFrame, CodecError> {
    match version {
        ProtocolVersion::V1 => serde_json::to_string(value)
            .map(WireFrame::Text)
            .map_err(CodecError::Json),
        ProtocolVersion::V2 => bincode::serialize(value)
            .map(WireFrame::Binary)
            .map_err(CodecError::Binary),
    }
}

fn decode<T: DeserializeOwned>(frame: &WireFrame) -> Result<T, CodecError> {
    match frame {
        WireFrame::Text(text) => serde_json::from_str(text).map_err(CodecError::Json),
        WireFrame::Binary(bytes) => bincode::deserialize(bytes).map_err(CodecError::Binary),
    }
}
