use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" or "degraded".
    pub status: String,
    /// Whether the push channel to the game server is up.
    pub transport_connected: bool,
}

impl HealthResponse {
    /// Push channel up; round state follows the server in real time.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            transport_connected: true,
        }
    }

    /// Push channel down; the last known round state is still served.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
            transport_connected: false,
        }
    }
}
