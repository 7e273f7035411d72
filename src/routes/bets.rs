use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::bets::{AddBetRequest, BetSlipResponse, SubmitBetsResponse},
    error::AppError,
    services::betting,
    state::SharedState,
};

/// Bet slip endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/bets/slip",
            get(get_slip).post(add_draft).delete(clear_slip),
        )
        .route("/bets/slip/{id}", delete(remove_draft))
        .route("/bets/submit", post(submit_bets))
}

#[utoipa::path(
    get,
    path = "/bets/slip",
    tag = "bets",
    responses((status = 200, description = "Current bet slip", body = BetSlipResponse))
)]
/// Return the drafts composed for the current round.
pub async fn get_slip(State(state): State<SharedState>) -> Json<BetSlipResponse> {
    Json(betting::slip(&state).await)
}

#[utoipa::path(
    post,
    path = "/bets/slip",
    tag = "bets",
    request_body = AddBetRequest,
    responses(
        (status = 200, description = "Draft added", body = BetSlipResponse),
        (status = 400, description = "Invalid draft"),
        (status = 409, description = "Betting is not open")
    )
)]
/// Add a draft while betting is open.
pub async fn add_draft(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AddBetRequest>>,
) -> Result<Json<BetSlipResponse>, AppError> {
    let slip = betting::add_draft(&state, payload).await?;
    Ok(Json(slip))
}

#[utoipa::path(
    delete,
    path = "/bets/slip",
    tag = "bets",
    responses((status = 200, description = "Slip emptied", body = BetSlipResponse))
)]
/// Drop every draft.
pub async fn clear_slip(State(state): State<SharedState>) -> Json<BetSlipResponse> {
    Json(betting::clear_slip(&state).await)
}

#[utoipa::path(
    delete,
    path = "/bets/slip/{id}",
    tag = "bets",
    params(("id" = Uuid, Path, description = "Identifier of the draft to remove")),
    responses(
        (status = 200, description = "Draft removed", body = BetSlipResponse),
        (status = 404, description = "Unknown draft")
    )
)]
/// Remove a single draft.
pub async fn remove_draft(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BetSlipResponse>, AppError> {
    let slip = betting::remove_draft(&state, id).await?;
    Ok(Json(slip))
}

#[utoipa::path(
    post,
    path = "/bets/submit",
    tag = "bets",
    responses(
        (status = 200, description = "Bets accepted by the ledger", body = SubmitBetsResponse),
        (status = 400, description = "Ledger refused the bets"),
        (status = 409, description = "Betting is not open or the slip is empty"),
        (status = 502, description = "Ledger unavailable")
    )
)]
/// Submit the slip to the betting ledger.
pub async fn submit_bets(
    State(state): State<SharedState>,
) -> Result<Json<SubmitBetsResponse>, AppError> {
    let response = betting::submit(&state).await?;
    Ok(Json(response))
}
