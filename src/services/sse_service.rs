use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::{round::RoundViewResponse, sse::ServerEvent},
    services::sse_events::EVENT_ROUND_VIEW,
    state::SharedState,
};

/// Subscribe to the round stream, returning the receiver and the view to send first.
///
/// The receiver is registered before the view is read so no transition falls in between.
pub fn subscribe_rounds(
    state: &SharedState,
) -> (broadcast::Receiver<ServerEvent>, Option<ServerEvent>) {
    let receiver = state.sse().subscribe();
    let view = RoundViewResponse::from(&state.coordinator().view());
    let initial = match ServerEvent::json(Some(EVENT_ROUND_VIEW.to_string()), &view) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::warn!(error = %err, "failed to serialize initial round view");
            None
        }
    };
    (receiver, initial)
}

/// Convert a broadcast receiver into an SSE response, forwarding events until the
/// client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: Option<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(payload) = initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "round SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!("Round SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::state::test_support::{StubLedger, StubQuery, state_with};

    #[tokio::test]
    async fn subscription_starts_with_current_view() {
        let state = state_with(Arc::new(StubQuery::default()), Arc::new(StubLedger::default()));
        let (_receiver, initial) = subscribe_rounds(&state);

        let initial = initial.unwrap();
        assert_eq!(initial.event.as_deref(), Some(EVENT_ROUND_VIEW));
        assert!(initial.data.contains("\"status\":\"waiting\""));
    }
}
