use anyhow::Context;
use clap::Parser;

use timewarp_api::clock::SystemClock;
use timewarp_api::config::Config;
use timewarp_api::logging::init_tracing;
use timewarp_api::store::ActivityStore;
use timewarp_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_json)?;

    let db_path = config.db_path();
    let store = ActivityStore::open(&db_path)
        .with_context(|| format!("failed to open activity store at {}", db_path.display()))?;
    store.migrate().context("failed to migrate activity store")?;

    let state = AppState::new(store, SystemClock, config.rule_set.table());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(
        addr = %config.bind,
        db = %db_path.display(),
        rule_set = ?config.rule_set,
        "server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
