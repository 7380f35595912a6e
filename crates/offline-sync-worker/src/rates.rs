//! Rates-database snapshot updates.
//!
//! The rates database is replaced wholesale: the backend publishes a
//! version number and a full binary snapshot, and the local file is
//! swapped atomically so a crashed download never leaves a torn database
//! behind.

use crate::SyncResult;
use backend_client::ApiClient;
use quote_services::SettingsService;
use std::path::PathBuf;
use std::sync::Arc;
use storage_adapter::DatabaseAdapter;
use tracing::{debug, info};

/// App-settings key recording the installed snapshot version.
pub const RATE_DB_VERSION_KEY: &str = "rate_db_version";

/// Downloads and installs rates-database snapshots.
pub struct RateStoreUpdater {
    client: Arc<ApiClient>,
    settings: SettingsService,
    rates_path: PathBuf,
}

impl RateStoreUpdater {
    pub fn new(
        adapter: Arc<dyn DatabaseAdapter>,
        client: Arc<ApiClient>,
        rates_path: PathBuf,
    ) -> Self {
        Self {
            client,
            settings: SettingsService::new(adapter),
            rates_path,
        }
    }

    /// Install the latest snapshot if it is newer than what we hold.
    /// Returns the installed version, or None when already current.
    pub async fn check_for_update(&self) -> SyncResult<Option<i64>> {
        let latest = self.client.latest_rate_version().await?;
        let installed = self
            .settings
            .get(RATE_DB_VERSION_KEY)
            .await?
            .and_then(|setting| setting.value.parse::<i64>().ok())
            .unwrap_or(0);

        if latest <= installed {
            debug!(installed, latest, "Rates database is current");
            return Ok(None);
        }

        info!(installed, latest, "Downloading rates database snapshot");
        let bytes = self.client.download_rate_file().await?;

        if let Some(parent) = self.rates_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write beside the target, then rename over it
        let staging = self.rates_path.with_extension("download");
        tokio::fs::write(&staging, &bytes).await?;
        tokio::fs::rename(&staging, &self.rates_path).await?;

        self.settings
            .set(RATE_DB_VERSION_KEY, &latest.to_string())
            .await?;
        info!(version = latest, path = %self.rates_path.display(), "Rates database installed");
        Ok(Some(latest))
    }
}
