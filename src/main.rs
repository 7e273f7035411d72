//! Marble League sync binary entrypoint wiring the push transport, REST queries and the SSE stream.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use marble_league_sync::{
    config::AppConfig,
    routes,
    services::{betting, ledger::HttpBettingLedger, query::HttpGameQueryService, sse_events, transport},
    state::{AppState, SharedState},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let client = reqwest::Client::builder()
        .build()
        .context("building HTTP client")?;
    let query = Arc::new(HttpGameQueryService::new(
        client.clone(),
        config.api_base_url.clone(),
    ));
    let ledger = Arc::new(HttpBettingLedger::new(
        client,
        config.api_base_url.clone(),
        config.access_token.clone(),
    ));
    let transport_url = config.transport_url.clone();

    let app_state = AppState::new(config, query, ledger);

    sse_events::spawn_round_forwarder(app_state.clone());
    sse_events::spawn_status_forwarder(app_state.clone());
    betting::spawn_slip_listener(app_state.clone());
    tokio::spawn(transport::run(app_state.clone(), transport_url));

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
