//! Wire protocol codec (§4.F). One byte-exact contract per direction,
//! encoded as self-describing JSON so field names survive into demo
//! files and later builds can add optional fields without breaking
//! replay of older captures.

use command::{Command, Input};
use sim::Snapshot;
use thiserror::Error;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum ClientMessage {
    Hello { name: String },
    Input { clock: u64, input: Input },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum ServerMessage {
    Hello { client_id: u64 },
    Ping { rtt_ms: f64 },
    Snapshot { snapshot: Snapshot, commands: Vec<Command>, health: Option<i64> },
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn encode_client(msg: &ClientMessage) -> Vec<u8> {
    serde_json::to_vec(msg).expect("ClientMessage always serializes")
}

pub fn decode_client(bytes: &[u8]) -> Result<ClientMessage, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn encode_server(msg: &ServerMessage) -> Vec<u8> {
    serde_json::to_vec(msg).expect("ServerMessage always serializes")
}

pub fn decode_server(bytes: &[u8]) -> Result<ServerMessage, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}
