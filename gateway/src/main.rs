use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_bot_gateway::{
    app,
    config::Config,
    services::session_store::spawn_session_sweeper,
    state::AppState,
    utils::security::mask_secret,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_bot_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        wallet_api_base_url = %config.wallet_api_base_url,
        session_timeout_minutes = config.session_timeout_minutes,
        session_sweep_interval_seconds = config.session_sweep_interval_seconds,
        max_sessions = config.max_sessions,
        api_timeout_seconds = config.api_timeout_seconds,
        auth_probe_timeout_seconds = config.auth_probe_timeout_seconds,
        pending_transfer_ttl_seconds = config.pending_transfer_ttl_seconds,
        chat_signing_secret = %config
            .chat_signing_secret
            .as_deref()
            .map(mask_secret)
            .unwrap_or_else(|| "<disabled>".into()),
        "Loaded configuration from environment/.env"
    );

    let state = AppState::from_config(config.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = spawn_session_sweeper(
        state.sessions.clone(),
        Some(state.pending.clone()),
        state.clock.clone(),
        config.session_sweep_interval(),
        shutdown_rx,
    );

    let app = app(state);

    // Start server
    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(err) = sweeper.await {
        tracing::warn!(error = %err, "Session sweeper task ended abnormally");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
