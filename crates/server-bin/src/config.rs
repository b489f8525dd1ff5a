use serde::{Deserialize, Serialize};

/// The server's configuration surface (§1 ambient stack): small enough
/// that a plain serde struct with `#[serde(default)]` covers it without
/// a reflected config system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigServer {
    pub port: u16,
    pub period_ms: u64,
    pub max_players: usize,
}

impl Default for ConfigServer {
    fn default() -> Self {
        Self { port: 11210, period_ms: 32, max_players: 64 }
    }
}
