use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};

use crate::{
    dto::round::{ResultsResponse, RoundViewResponse, SuspensionRequest},
    error::AppError,
    services::round_service,
    state::SharedState,
};

/// Round view, result history and reconciliation endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rounds/current", get(get_current_round))
        .route("/rounds/current/sync", post(sync_current_round))
        .route("/rounds/results", get(get_results))
        .route("/rounds/results/sync", post(sync_results))
        .route("/rounds/suspension", put(set_suspension))
}

#[utoipa::path(
    get,
    path = "/rounds/current",
    tag = "rounds",
    responses((status = 200, description = "Current round view", body = RoundViewResponse))
)]
/// Return the current round as the presentation layer should render it.
pub async fn get_current_round(State(state): State<SharedState>) -> Json<RoundViewResponse> {
    Json(round_service::current_view(&state))
}

#[utoipa::path(
    post,
    path = "/rounds/current/sync",
    tag = "rounds",
    responses(
        (status = 200, description = "Snapshot merged", body = RoundViewResponse),
        (status = 502, description = "Upstream snapshot was malformed"),
        (status = 503, description = "Upstream query failed; state unchanged")
    )
)]
/// Fetch the current-round snapshot from the game server and merge it.
pub async fn sync_current_round(
    State(state): State<SharedState>,
) -> Result<Json<RoundViewResponse>, AppError> {
    let view = round_service::sync_current_round(&state).await?;
    Ok(Json(view))
}

#[utoipa::path(
    get,
    path = "/rounds/results",
    tag = "rounds",
    responses((status = 200, description = "Recent results, most recent first", body = ResultsResponse))
)]
/// Return the bounded result history.
pub async fn get_results(State(state): State<SharedState>) -> Json<ResultsResponse> {
    Json(round_service::recent_results(&state))
}

#[utoipa::path(
    post,
    path = "/rounds/results/sync",
    tag = "rounds",
    responses(
        (status = 200, description = "Results merged", body = ResultsResponse),
        (status = 503, description = "Upstream query failed; history unchanged")
    )
)]
/// Fetch a page of recent results and merge the ones not seen yet.
pub async fn sync_results(
    State(state): State<SharedState>,
) -> Result<Json<ResultsResponse>, AppError> {
    let results = round_service::sync_recent_results(&state).await?;
    Ok(Json(results))
}

#[utoipa::path(
    put,
    path = "/rounds/suspension",
    tag = "rounds",
    request_body = SuspensionRequest,
    responses((status = 200, description = "Suspension recorded", body = RoundViewResponse))
)]
/// Suspend or resume betting without touching the round status.
pub async fn set_suspension(
    State(state): State<SharedState>,
    Json(payload): Json<SuspensionRequest>,
) -> Json<RoundViewResponse> {
    Json(round_service::set_suspension(&state, payload.suspended).await)
}
