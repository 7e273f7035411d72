//! Bet slip operations gated on the coordinator's `can_bet` flag.

use serde_json::json;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::bets::{AddBetRequest, BetLine, BetSlipResponse, BetSubmission, SubmitBetsResponse},
    error::ServiceError,
    services::sse_events,
    state::{
        RoundSignal, SharedState,
        bet_slip::BetDraft,
        lifecycle::RoundView,
        round::RoundId,
    },
};

/// Current bet slip.
pub async fn slip(state: &SharedState) -> BetSlipResponse {
    (&*state.bet_slip().read().await).into()
}

/// Add a draft to the slip of the round currently open for bets.
pub async fn add_draft(
    state: &SharedState,
    request: AddBetRequest,
) -> Result<BetSlipResponse, ServiceError> {
    // Read the view under the slip lock so a concurrent clear cannot be overtaken.
    let mut slip = state.bet_slip().write().await;
    let round_id = open_round(&state.coordinator().view())?;
    let draft = BetDraft::new(request.category, request.option, request.amount, request.odds);
    slip.add(round_id, draft);
    Ok((&*slip).into())
}

/// Remove a single draft.
pub async fn remove_draft(state: &SharedState, id: Uuid) -> Result<BetSlipResponse, ServiceError> {
    let mut slip = state.bet_slip().write().await;
    if !slip.remove(id) {
        return Err(ServiceError::NotFound(format!("bet draft {id} not found")));
    }
    Ok((&*slip).into())
}

/// Drop every draft.
pub async fn clear_slip(state: &SharedState) -> BetSlipResponse {
    let mut slip = state.bet_slip().write().await;
    slip.clear();
    (&*slip).into()
}

/// Submit the slip to the ledger while betting is open, then empty it.
pub async fn submit(state: &SharedState) -> Result<SubmitBetsResponse, ServiceError> {
    let round_id = open_round(&state.coordinator().view())?;

    let submission = {
        let slip = state.bet_slip().read().await;
        if slip.is_empty() {
            return Err(ServiceError::InvalidState("bet slip is empty".into()));
        }
        if slip.round_id() != Some(&round_id) {
            return Err(ServiceError::InvalidState(
                "bet slip belongs to a previous round".into(),
            ));
        }
        BetSubmission {
            round_id: round_id.to_string(),
            bets: slip.drafts().iter().map(BetLine::from).collect(),
        }
    };
    let submitted = submission.bets.len();

    let receipt = state.ledger().submit(submission).await.inspect_err(|err| {
        warn!(round_id = %round_id, error = %err, "bet submission failed");
    })?;

    {
        let mut slip = state.bet_slip().write().await;
        if slip.round_id() == Some(&round_id) {
            slip.clear();
        }
    }

    let accepted = receipt.accepted.unwrap_or(submitted);
    info!(round_id = %round_id, accepted, balance = receipt.balance, "bets submitted");
    sse_events::broadcast_balance_updated(state, &json!({ "balance": receipt.balance }));

    Ok(SubmitBetsResponse {
        round_id: round_id.to_string(),
        accepted,
        balance: receipt.balance,
    })
}

/// Empty the slip whenever the coordinator clears bet drafts.
pub fn spawn_slip_listener(state: SharedState) -> JoinHandle<()> {
    let mut signals = state.coordinator().subscribe();
    tokio::spawn(async move {
        loop {
            match signals.recv().await {
                Ok(RoundSignal::BetDraftsCleared { round_id }) => {
                    let removed = state.bet_slip().write().await.clear();
                    if removed > 0 {
                        debug!(removed, "bet slip cleared by round transition");
                    }
                    sse_events::broadcast_bets_cleared(&state, round_id.as_ref(), removed);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    // A clear may have been among the skipped signals.
                    warn!(skipped, "bet slip listener lagged; clearing slip");
                    let removed = state.bet_slip().write().await.clear();
                    sse_events::broadcast_bets_cleared(&state, None, removed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn open_round(view: &RoundView) -> Result<RoundId, ServiceError> {
    match &view.round_id {
        Some(round_id) if view.can_bet => Ok(round_id.clone()),
        _ if view.suspended => Err(ServiceError::InvalidState("betting is suspended".into())),
        _ => Err(ServiceError::InvalidState("betting is closed".into())),
    }
}
