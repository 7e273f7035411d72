//! Wire shapes of the push-channel frames, before normalization.

use serde::Deserialize;
use serde_json::Value;

/// Raw frame received from the transport: `{"event": "...", "data": {...}}`.
#[derive(Debug, Deserialize)]
pub struct TransportFrame {
    #[serde(alias = "type")]
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Round identifier as sent by the server, either a string or a bare integer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireRoundId {
    Text(String),
    Integer(u64),
}

impl WireRoundId {
    /// Decimal or verbatim string form.
    pub fn into_string(self) -> String {
        match self {
            WireRoundId::Text(text) => text,
            WireRoundId::Integer(value) => value.to_string(),
        }
    }
}

/// `round_started` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStartedPayload {
    #[serde(default, alias = "round_id")]
    pub round_id: Option<WireRoundId>,
    #[serde(default, alias = "time_left", alias = "countdown")]
    pub time_left: Option<i64>,
}

/// `betting_closed` payload; the round id is optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BettingClosedPayload {
    #[serde(default, alias = "round_id")]
    pub round_id: Option<WireRoundId>,
}

/// `result_confirmed` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultConfirmedPayload {
    #[serde(default, alias = "round_id")]
    pub round_id: Option<WireRoundId>,
    #[serde(default, alias = "positions")]
    pub result: Option<Vec<i64>>,
}
