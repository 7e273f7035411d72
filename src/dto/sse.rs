use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the transport connects or drops.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the bet slip was emptied by a round transition.
pub struct BetsClearedEvent {
    pub round_id: Option<String>,
    pub removed: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Tells the hot-bet statistics view to reset its aggregate.
pub struct HotBetsClearedEvent {
    pub round_id: Option<String>,
}
