use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the push transport is up; the last known round state is served either way.
pub fn health_status(state: &SharedState) -> HealthResponse {
    if state.is_degraded() {
        warn!("transport disconnected (degraded mode)");
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
