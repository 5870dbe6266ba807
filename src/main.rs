use std::future::IntoFuture;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use chess_session_hub::config::HubConfig;
use chess_session_hub::network::http;
use chess_session_hub::{
    logging, ChessEngine, ConnectionRegistry, RelayDispatcher, SessionStore, SnapshotFile,
    WebsocketServer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = HubConfig::parse();
    logging::init();
    tracing::info!(?config, "Starting chess session hub");

    // A snapshot that cannot be read stops the process before any client
    // sees a partial store.
    let sessions = Arc::new(
        SessionStore::load(
            Arc::new(ChessEngine::new()),
            SnapshotFile::new(&config.snapshot_path),
        )
        .await?,
    );

    let relay = Arc::new(RelayDispatcher::new(
        sessions.clone(),
        ConnectionRegistry::new(),
        config.broadcast,
    ));
    let hub = WebsocketServer::bind(&config.ws_addr, relay).await?;

    let api = http::routes().with_state(sessions);
    let http_listener = TcpListener::bind(&config.http_addr).await?;
    tracing::info!(address = %config.http_addr, "HTTP API listening");

    tokio::select! {
        result = hub.run() => result?,
        result = axum::serve(http_listener, api).into_future() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown requested"),
    }

    Ok(())
}
