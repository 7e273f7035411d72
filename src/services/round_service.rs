//! Round operations: transport ingestion, REST reconciliation and read-only projections.

use tracing::{debug, warn};

use crate::{
    dto::round::{ResultsResponse, RoundViewResponse},
    error::ServiceError,
    services::{event_normalizer::InboundEvent, sse_events},
    state::SharedState,
};

/// Feed one transport text frame through the normalization boundary.
///
/// Malformed frames are logged and dropped; nothing propagates to the caller.
pub async fn ingest_frame(state: &SharedState, text: &str) {
    match state.normalizer().parse_frame(text) {
        Ok(Some(event)) => dispatch(state, event).await,
        Ok(None) => debug!(payload = %text, "ignoring unhandled transport event"),
        Err(err) => warn!(error = %err, payload = %text, "dropping malformed transport event"),
    }
}

/// Route a normalized event to the coordinator or the account stream.
pub async fn dispatch(state: &SharedState, event: InboundEvent) {
    let coordinator = state.coordinator();
    match event {
        InboundEvent::RoundStarted {
            round_id,
            countdown,
        } => coordinator.apply_round_started(round_id, countdown).await,
        InboundEvent::BettingClosed { round_id } => {
            coordinator.apply_betting_closed(round_id).await
        }
        InboundEvent::ResultConfirmed {
            round_id,
            positions,
        } => coordinator.apply_result_confirmed(round_id, positions).await,
        InboundEvent::BalanceUpdated(payload) => {
            sse_events::broadcast_balance_updated(state, &payload)
        }
    }
}

/// Current view of the round.
pub fn current_view(state: &SharedState) -> RoundViewResponse {
    (&state.coordinator().view()).into()
}

/// Recent results, most recent first.
pub fn recent_results(state: &SharedState) -> ResultsResponse {
    ResultsResponse::from(state.coordinator().view().results.as_slice())
}

/// Fetch the current-round snapshot and merge it without regressing pushed state.
///
/// Query failures are returned to the caller; the round state is left as is.
pub async fn sync_current_round(state: &SharedState) -> Result<RoundViewResponse, ServiceError> {
    let dto = state.query().current_round().await?;
    let snapshot = state.normalizer().snapshot(dto).inspect_err(|err| {
        warn!(error = %err, "rejecting malformed round snapshot");
    })?;
    let view = state.coordinator().merge_snapshot(snapshot).await;
    Ok((&view).into())
}

/// Fetch a page of recent results and merge the unknown ones behind the live history.
pub async fn sync_recent_results(state: &SharedState) -> Result<ResultsResponse, ServiceError> {
    let limit = state.config().results_page_size;
    let entries = state.query().recent_results(limit).await?;
    let results = state.normalizer().results_page(entries);
    let history = state.coordinator().merge_results(results).await;
    Ok(ResultsResponse::from(history.as_slice()))
}

/// Record the betting suspension reported by an external collaborator.
pub async fn set_suspension(state: &SharedState, suspended: bool) -> RoundViewResponse {
    state.coordinator().set_suspended(suspended).await;
    current_view(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dto::{
            events::WireRoundId,
            round::VisibleRoundStatus,
            snapshot::{CurrentRoundDto, ResultEntryDto},
        },
        state::test_support::{StubLedger, StubQuery, state_with},
    };

    fn setup() -> (SharedState, Arc<StubQuery>) {
        let query = Arc::new(StubQuery::default());
        let state = state_with(query.clone(), Arc::new(StubLedger::default()));
        (state, query)
    }

    #[tokio::test]
    async fn frames_drive_the_round_lifecycle() {
        let (state, _) = setup();

        ingest_frame(&state, r#"{"event":"round_started","data":{"roundId":"R1","timeLeft":30}}"#).await;
        let view = current_view(&state);
        assert_eq!(view.status, VisibleRoundStatus::Betting);
        assert_eq!(view.round_id.as_deref(), Some("R1"));
        assert!(view.can_bet);

        ingest_frame(&state, r#"{"event":"betting_closed","data":{"roundId":"R1"}}"#).await;
        assert_eq!(current_view(&state).status, VisibleRoundStatus::Closed);

        ingest_frame(
            &state,
            r#"{"event":"result_confirmed","data":{"roundId":"R1","result":[7,4,2,9,1,6,3,10,5,8]}}"#,
        )
        .await;
        let view = current_view(&state);
        assert_eq!(view.status, VisibleRoundStatus::Finished);
        assert_eq!(view.results.len(), 1);
        assert_eq!(view.results[0].sum, 11);
    }

    #[tokio::test]
    async fn malformed_frames_are_absorbed() {
        let (state, _) = setup();
        ingest_frame(&state, r#"{"event":"round_started","data":{"roundId":"R1","timeLeft":30}}"#).await;

        ingest_frame(&state, "garbage").await;
        ingest_frame(&state, r#"{"event":"round_started","data":{"timeLeft":30}}"#).await;
        ingest_frame(
            &state,
            r#"{"event":"result_confirmed","data":{"roundId":"R1","result":[1,2,3]}}"#,
        )
        .await;

        let view = current_view(&state);
        assert_eq!(view.status, VisibleRoundStatus::Betting);
        assert_eq!(view.round_id.as_deref(), Some("R1"));
        assert!(view.results.is_empty());
    }

    #[tokio::test]
    async fn snapshot_sync_adopts_round_while_waiting() {
        let (state, query) = setup();
        *query.current.lock().unwrap() = Some(CurrentRoundDto {
            round_id: Some(WireRoundId::Integer(501)),
            status: Some("betting".into()),
            countdown_seconds: Some(25),
        });

        let view = sync_current_round(&state).await.unwrap();
        assert_eq!(view.status, VisibleRoundStatus::Betting);
        assert_eq!(view.round_id.as_deref(), Some("501"));
        assert_eq!(view.countdown, 25);
    }

    #[tokio::test]
    async fn idle_snapshot_leaves_state_untouched() {
        let (state, query) = setup();
        ingest_frame(&state, r#"{"event":"round_started","data":{"roundId":"R1","timeLeft":30}}"#).await;
        *query.current.lock().unwrap() = Some(CurrentRoundDto {
            round_id: None,
            status: Some("waiting".into()),
            countdown_seconds: Some(0),
        });

        let view = sync_current_round(&state).await.unwrap();
        assert_eq!(view.status, VisibleRoundStatus::Betting);
        assert_eq!(view.round_id.as_deref(), Some("R1"));

        *query.current.lock().unwrap() = Some(CurrentRoundDto {
            round_id: Some(WireRoundId::Text("R0".into())),
            status: Some("finished".into()),
            countdown_seconds: None,
        });
        let view = sync_current_round(&state).await.unwrap();
        assert_eq!(view.round_id.as_deref(), Some("R1"));
        assert!(view.can_bet);
    }

    #[tokio::test]
    async fn query_failure_is_surfaced_and_state_retained() {
        let (state, query) = setup();
        ingest_frame(&state, r#"{"event":"round_started","data":{"roundId":"R1","timeLeft":30}}"#).await;
        *query.fail.lock().unwrap() = true;

        assert!(matches!(
            sync_current_round(&state).await,
            Err(ServiceError::Query(_))
        ));
        assert!(matches!(
            sync_recent_results(&state).await,
            Err(ServiceError::Query(_))
        ));

        let view = current_view(&state);
        assert_eq!(view.status, VisibleRoundStatus::Betting);
        assert_eq!(view.round_id.as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn late_snapshot_does_not_override_push() {
        let (state, query) = setup();
        ingest_frame(&state, r#"{"event":"round_started","data":{"roundId":"R2","timeLeft":30}}"#).await;
        *query.current.lock().unwrap() = Some(CurrentRoundDto {
            round_id: Some(WireRoundId::Text("R1".into())),
            status: Some("closed".into()),
            countdown_seconds: None,
        });

        let view = sync_current_round(&state).await.unwrap();
        assert_eq!(view.round_id.as_deref(), Some("R2"));
        assert_eq!(view.status, VisibleRoundStatus::Betting);
    }

    #[tokio::test]
    async fn results_sync_merges_page_behind_live_results() {
        let (state, query) = setup();
        ingest_frame(
            &state,
            r#"{"event":"result_confirmed","data":{"roundId":"R3","result":[1,2,3,4,5,6,7,8,9,10]}}"#,
        )
        .await;
        *query.results.lock().unwrap() = ["R3", "R2", "R1"]
            .into_iter()
            .map(|round| ResultEntryDto {
                round_id: Some(WireRoundId::Text(round.into())),
                positions: Some(vec![10, 9, 8, 7, 6, 5, 4, 3, 2, 1]),
                timestamp: None,
            })
            .collect();

        let response = sync_recent_results(&state).await.unwrap();
        let ids: Vec<_> = response.results.iter().map(|r| r.round_id.as_str()).collect();
        assert_eq!(ids, vec!["R3", "R2", "R1"]);
        assert_eq!(response.results[0].sum, 3);
        assert_eq!(response.results[1].sum, 19);
    }

    #[tokio::test]
    async fn suspension_disables_betting() {
        let (state, _) = setup();
        ingest_frame(&state, r#"{"event":"round_started","data":{"roundId":"R1","timeLeft":30}}"#).await;

        let view = set_suspension(&state, true).await;
        assert!(view.suspended);
        assert!(!view.can_bet);
        assert!(set_suspension(&state, false).await.can_bet);
    }
}
