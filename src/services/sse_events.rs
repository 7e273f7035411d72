use serde::Serialize;
use serde_json::Value;
use tokio::{
    sync::broadcast::error::RecvError,
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    dto::{
        round::{RoundResultSummary, RoundViewResponse},
        sse::{BetsClearedEvent, HotBetsClearedEvent, ServerEvent, SystemStatus},
    },
    state::{
        RoundSignal, SharedState,
        lifecycle::RoundView,
        round::{RoundId, RoundResult},
    },
};

pub(crate) const EVENT_ROUND_VIEW: &str = "round.view";
const EVENT_ROUND_RESULT: &str = "round.result";
const EVENT_BETS_CLEARED: &str = "bets.cleared";
const EVENT_HOT_BETS_CLEARED: &str = "hot_bets.cleared";
const EVENT_BALANCE_UPDATED: &str = "balance_updated";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast the current round view.
pub fn broadcast_round_view(state: &SharedState, view: &RoundView) {
    send_event(state, EVENT_ROUND_VIEW, &RoundViewResponse::from(view));
}

/// Broadcast a newly recorded result.
pub fn broadcast_round_result(state: &SharedState, result: &RoundResult) {
    send_event(state, EVENT_ROUND_RESULT, &RoundResultSummary::from(result));
}

/// Broadcast that the bet slip was emptied by a round transition.
pub fn broadcast_bets_cleared(state: &SharedState, round_id: Option<&RoundId>, removed: usize) {
    let payload = BetsClearedEvent {
        round_id: round_id.map(ToString::to_string),
        removed,
    };
    send_event(state, EVENT_BETS_CLEARED, &payload);
}

/// Tell the hot-bet statistics view to reset.
pub fn broadcast_hot_bets_cleared(state: &SharedState, round_id: Option<&RoundId>) {
    let payload = HotBetsClearedEvent {
        round_id: round_id.map(ToString::to_string),
    };
    send_event(state, EVENT_HOT_BETS_CLEARED, &payload);
}

/// Forward an account balance payload as received.
pub fn broadcast_balance_updated(state: &SharedState, payload: &Value) {
    send_event(state, EVENT_BALANCE_UPDATED, payload);
}

/// Broadcast the transport connectivity flag.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

/// Relay coordinator signals onto the SSE hub.
///
/// Bet draft clearing is left to the bet slip listener, which knows how many drafts went away.
pub fn spawn_round_forwarder(state: SharedState) -> JoinHandle<()> {
    let mut signals = state.coordinator().subscribe();
    tokio::spawn(async move {
        loop {
            match signals.recv().await {
                Ok(RoundSignal::ViewChanged(view)) => broadcast_round_view(&state, &view),
                Ok(RoundSignal::ResultRecorded(result)) => broadcast_round_result(&state, &result),
                Ok(RoundSignal::HotBetsCleared { round_id }) => {
                    broadcast_hot_bets_cleared(&state, round_id.as_ref())
                }
                Ok(RoundSignal::BetDraftsCleared { .. }) => {}
                Err(RecvError::Lagged(skipped)) => {
                    // Resend the latest view so clients converge.
                    warn!(skipped, "round forwarder lagged; resending current view");
                    broadcast_round_view(&state, &state.coordinator().view());
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("round forwarder stopped");
    })
}

/// Relay degraded flag changes onto the SSE hub.
pub fn spawn_status_forwarder(state: SharedState) -> JoinHandle<()> {
    let mut watcher = state.degraded_watcher();
    tokio::spawn(async move {
        while watcher.changed().await.is_ok() {
            let degraded = *watcher.borrow_and_update();
            broadcast_system_status(&state, degraded);
        }
    })
}

fn send_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
