//! Push transport client: keeps a websocket to the game server open and feeds frames
//! to the round service.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    time::{sleep, timeout},
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::{services::round_service, state::SharedState};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect to `url` forever, staying in degraded mode while the socket is down.
///
/// Every successful connection triggers a REST resync so events missed while
/// disconnected are reconciled.
pub async fn run(state: SharedState, url: String) {
    let mut delay = INITIAL_DELAY;

    loop {
        match connect(&url).await {
            Ok(stream) => {
                info!(url = %url, "transport connected; leaving degraded mode");
                state.update_degraded(false);
                delay = INITIAL_DELAY;

                tokio::spawn(resync(state.clone()));
                pump(&state, stream).await;

                warn!("transport disconnected; entering degraded mode");
                state.update_degraded(true);
            }
            Err(err) => {
                warn!(url = %url, error = %err, "transport connection failed");
                state.update_degraded(true);
            }
        }

        debug!(delay_ms = delay.as_millis() as u64, "waiting before reconnect attempt");
        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

async fn connect(url: &str) -> Result<WsStream> {
    let (stream, _) = timeout(HANDSHAKE_TIMEOUT, connect_async(url))
        .await
        .context("transport handshake timed out")?
        .context("transport handshake failed")?;
    Ok(stream)
}

async fn pump(state: &SharedState, stream: WsStream) {
    let (mut sink, mut source) = stream.split();

    while let Some(message) = source.next().await {
        match message {
            Ok(Message::Text(text)) => round_service::ingest_frame(state, &text).await,
            Ok(Message::Close(frame)) => {
                debug!(?frame, "socket closed by server");
                break;
            }
            // Pings are answered by tungstenite itself.
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "transport error");
                break;
            }
        }
    }

    let _ = sink.close().await;
}

/// Reconcile the current round and the result history over REST.
pub async fn resync(state: SharedState) {
    if let Err(err) = round_service::sync_current_round(&state).await {
        warn!(error = %err, "current round resync failed; keeping pushed state");
    }
    if let Err(err) = round_service::sync_recent_results(&state).await {
        warn!(error = %err, "results resync failed");
    }
}
