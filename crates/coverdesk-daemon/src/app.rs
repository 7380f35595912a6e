//! Daemon wiring: storage, services, client and worker.

use anyhow::Context;
use backend_client::{ApiClient, FileTokenStore, TokenStore};
use coverdesk_config::{Config, Paths};
use offline_sync_worker::{RateStoreUpdater, SyncConfig, SyncWorker};
use quote_database::AsyncDatabase;
use quote_services::MaintenanceService;
use std::sync::Arc;
use std::time::Duration;
use storage_adapter::{DatabaseAdapter, SqliteAdapter};
use tracing::{info, warn};

struct Runtime {
    adapter: Arc<dyn DatabaseAdapter>,
    client: Arc<ApiClient>,
    sync_config: SyncConfig,
}

async fn build_runtime(config: &Config, paths: &Paths) -> anyhow::Result<Runtime> {
    paths.ensure_dirs()?;

    let db = AsyncDatabase::open(&paths.database_file())
        .await
        .context("opening local quote database")?;
    let adapter: Arc<dyn DatabaseAdapter> = Arc::new(SqliteAdapter::new(db));

    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(paths.tokens_file()));
    let client = Arc::new(
        ApiClient::new(config.api_base_url.clone(), tokens).context("building backend client")?,
    );

    let sync_config = SyncConfig {
        interval: Duration::from_secs(config.sync_interval_secs),
        max_send_retries: config.max_send_retries,
        ..SyncConfig::default()
    };

    Ok(Runtime {
        adapter,
        client,
        sync_config,
    })
}

/// Run the daemon until Ctrl-C.
pub async fn run_daemon(config: Config, paths: Paths) -> anyhow::Result<()> {
    let runtime = build_runtime(&config, &paths).await?;

    // A stale rates database only degrades quoting, so a failed check
    // must not keep the daemon from starting.
    let rates = RateStoreUpdater::new(
        runtime.adapter.clone(),
        runtime.client.clone(),
        paths.rates_file(),
    );
    if let Err(e) = rates.check_for_update().await {
        warn!(error = %e, "Rates database update check failed");
    }

    let worker = Arc::new(SyncWorker::new(
        runtime.adapter.clone(),
        runtime.client.clone(),
        runtime.sync_config,
    ));
    let handle = worker.start();

    info!(base_dir = %paths.base_dir().display(), "Coverdesk sync daemon running");
    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;

    handle.stop().await;
    info!("Coverdesk sync daemon stopped");
    Ok(())
}

/// Run one reconciliation pass and report what changed.
pub async fn sync_once(config: Config, paths: Paths) -> anyhow::Result<()> {
    let runtime = build_runtime(&config, &paths).await?;
    let worker = SyncWorker::new(
        runtime.adapter.clone(),
        runtime.client.clone(),
        runtime.sync_config,
    );

    let summary = worker.run_pass().await?;
    println!(
        "Pushed {} quick quotes and {} PDFs; applied {} remote deletions, {} local deletions",
        summary.pushed_quick_quotes,
        summary.pushed_pdfs,
        summary.remote_deletions_applied,
        summary.local_deletions_pushed,
    );
    Ok(())
}

/// Wipe local quotes, illustrations and both delivery queues.
pub async fn reset_local_data(paths: &Paths) -> anyhow::Result<()> {
    paths.ensure_dirs()?;
    let db = AsyncDatabase::open(&paths.database_file())
        .await
        .context("opening local quote database")?;
    let adapter: Arc<dyn DatabaseAdapter> = Arc::new(SqliteAdapter::new(db));

    let counts = MaintenanceService::new(adapter).reset_all().await?;
    println!(
        "Removed {} quotes, {} illustrations, {} queued PDFs, {} queued quick quotes",
        counts.quotes, counts.illustrations, counts.pdf_queue, counts.quick_quote_queue,
    );
    Ok(())
}
