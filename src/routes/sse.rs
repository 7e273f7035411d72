use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/rounds",
    tag = "sse",
    responses((status = 200, description = "Round SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream round views, results and slip notifications to the presentation layer.
pub async fn round_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let (receiver, initial) = sse_service::subscribe_rounds(&state);
    info!("New round SSE connection");
    sse_service::to_sse_stream(receiver, initial)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/rounds", get(round_stream))
}
