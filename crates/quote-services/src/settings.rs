//! Key-value application settings.

use crate::ServiceResult;
use quote_database::{now_unix, AppSetting};
use std::sync::Arc;
use storage_adapter::DatabaseAdapter;

/// Small key/value state such as the installed rates-database version.
pub struct SettingsService {
    adapter: Arc<dyn DatabaseAdapter>,
}

impl SettingsService {
    pub fn new(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        Self { adapter }
    }

    pub async fn get(&self, key: &str) -> ServiceResult<Option<AppSetting>> {
        let rows = self
            .adapter
            .query(
                "SELECT key, value, updated_at FROM app_settings WHERE key = ?1",
                vec![key.into()],
            )
            .await?;
        rows.first()
            .map(|row| {
                Ok(AppSetting {
                    key: row.get_text("key")?,
                    value: row.get_text("value")?,
                    updated_at: row.get_i64("updated_at")?,
                })
            })
            .transpose()
    }

    pub async fn set(&self, key: &str, value: &str) -> ServiceResult<()> {
        self.adapter
            .execute(
                "INSERT INTO app_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                vec![key.into(), value.into(), now_unix().into()],
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> ServiceResult<bool> {
        let result = self
            .adapter
            .execute("DELETE FROM app_settings WHERE key = ?1", vec![key.into()])
            .await?;
        Ok(result.rows_affected > 0)
    }
}
