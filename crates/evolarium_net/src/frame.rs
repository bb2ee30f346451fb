use crate::error::NetError;
use crate::protocol::NetMessage;
use evolarium_data::WorldSnapshot;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use std::sync::OnceLock;

/// One broadcast, encoded once and shared by every observer.
///
/// The JSON text is produced up front. The gzip form is produced the first
/// time a lagging observer asks for it and cached for the rest.
#[derive(Debug)]
pub struct SnapshotFrame {
    tick: u64,
    text: String,
    compressed: OnceLock<Vec<u8>>,
}

impl SnapshotFrame {
    pub fn encode(snapshot: &WorldSnapshot) -> Result<Self, NetError> {
        let text = serde_json::to_string(&SnapshotRef::new(snapshot))?;
        Ok(Self {
            tick: snapshot.tick,
            text,
            compressed: OnceLock::new(),
        })
    }

    /// Frame for an arbitrary message, e.g. the handshake.
    pub fn from_message(message: &NetMessage) -> Result<Self, NetError> {
        let tick = match message {
            NetMessage::Snapshot(s) => s.tick,
            NetMessage::TickError { tick, .. } => *tick,
            _ => 0,
        };
        Ok(Self {
            tick,
            text: serde_json::to_string(message)?,
            compressed: OnceLock::new(),
        })
    }

    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn compressed(&self) -> Result<&[u8], NetError> {
        if let Some(bytes) = self.compressed.get() {
            return Ok(bytes);
        }
        let bytes = gzip(self.text.as_bytes())?;
        Ok(self.compressed.get_or_init(|| bytes))
    }
}

/// Borrowing twin of `NetMessage::Snapshot` so encoding does not clone the world view.
#[derive(serde::Serialize)]
#[serde(tag = "type", content = "payload")]
enum SnapshotRef<'a> {
    Snapshot(&'a WorldSnapshot),
}

impl<'a> SnapshotRef<'a> {
    fn new(snapshot: &'a WorldSnapshot) -> Self {
        SnapshotRef::Snapshot(snapshot)
    }
}

pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>, NetError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 4), Compression::fast());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

pub fn gunzip(bytes: &[u8]) -> Result<String, NetError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut text = String::new();
    decoder.read_to_string(&mut text)?;
    Ok(text)
}

/// Parses and validates a text frame.
pub fn decode_text(text: &str) -> Result<NetMessage, NetError> {
    let message: NetMessage = serde_json::from_str(text)?;
    message.validate()?;
    Ok(message)
}

/// Parses and validates a gzip-compressed binary frame.
pub fn decode_binary(bytes: &[u8]) -> Result<NetMessage, NetError> {
    decode_text(&gunzip(bytes)?)
}
