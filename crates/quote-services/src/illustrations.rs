//! Illustration records tied to quotes.

use crate::ServiceResult;
use quote_database::{now_unix, Illustration};
use std::sync::Arc;
use storage_adapter::{DatabaseAdapter, SqlRow};

/// Tracks rendered illustration documents per quote. Rendering itself
/// happens outside this subsystem; only the file reference is stored.
pub struct IllustrationService {
    adapter: Arc<dyn DatabaseAdapter>,
}

impl IllustrationService {
    pub fn new(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        Self { adapter }
    }

    pub async fn add(&self, quote_id: i64, pdf_path: &str) -> ServiceResult<i64> {
        let result = self
            .adapter
            .execute(
                "INSERT INTO illustrations (quote_id, pdf_path, created_at) VALUES (?1, ?2, ?3)",
                vec![quote_id.into(), pdf_path.into(), now_unix().into()],
            )
            .await?;
        Ok(result.last_insert_id)
    }

    pub async fn list_for_quote(&self, quote_id: i64) -> ServiceResult<Vec<Illustration>> {
        let rows = self
            .adapter
            .query(
                "SELECT id, quote_id, pdf_path, created_at FROM illustrations
                 WHERE quote_id = ?1 ORDER BY created_at ASC, id ASC",
                vec![quote_id.into()],
            )
            .await?;
        rows.iter().map(map_illustration).collect()
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<bool> {
        let result = self
            .adapter
            .execute("DELETE FROM illustrations WHERE id = ?1", vec![id.into()])
            .await?;
        Ok(result.rows_affected > 0)
    }
}

fn map_illustration(row: &SqlRow) -> ServiceResult<Illustration> {
    Ok(Illustration {
        id: row.get_i64("id")?,
        quote_id: row.get_i64("quote_id")?,
        pdf_path: row.get_text("pdf_path")?,
        created_at: row.get_i64("created_at")?,
    })
}
