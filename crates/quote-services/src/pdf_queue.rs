//! PDF delivery queue service.
//!
//! One row per deliverable illustration PDF. Rows are created `pending`
//! once a PDF has been rendered (by the external print pipeline) and are
//! walked by the sync worker until they reach a terminal status.

use crate::{ServiceError, ServiceResult};
use quote_database::{now_unix, DeliveryStatus, PdfQueueItem};
use std::sync::Arc;
use storage_adapter::{DatabaseAdapter, SqlRow};
use tracing::debug;

const PDF_COLUMNS: &str = "id, quote_id, agent_id, pdf_path, recipient_email, recipient_name, \
     status, retry_count, error_message, death_benefit, monthly_payment, \
     created_at, updated_at, sent_at";

/// Enqueue request for a rendered PDF.
#[derive(Debug, Clone, Default)]
pub struct EnqueuePdf {
    /// The persisted quote this PDF illustrates. Required.
    pub quote_id: Option<i64>,
    pub recipient_email: String,
    pub recipient_first_name: String,
    pub recipient_last_name: String,
    pub agent_id: Option<i64>,
}

/// Delivery queue operations over the `pdf_queue` table.
pub struct PdfQueueService {
    adapter: Arc<dyn DatabaseAdapter>,
}

impl PdfQueueService {
    pub fn new(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        Self { adapter }
    }

    /// Enqueue an already-rendered PDF for delivery.
    ///
    /// No rendering happens here; the caller hands in the finished file
    /// path. Death benefit and monthly payment are snapshotted from the
    /// quote at call time and never recomputed afterwards.
    pub async fn add_to_queue_with_path(
        &self,
        request: &EnqueuePdf,
        pdf_path: &str,
    ) -> ServiceResult<i64> {
        let quote_id = request.quote_id.ok_or_else(|| {
            ServiceError::Validation("a persisted quote id is required to enqueue a PDF".into())
        })?;

        let quote_rows = self
            .adapter
            .query(
                "SELECT face_amount, premium FROM quotes WHERE id = ?1",
                vec![quote_id.into()],
            )
            .await?;
        let quote_row = quote_rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("quote {}", quote_id)))?;
        let death_benefit = quote_row.get_opt_f64("face_amount")?;
        let monthly_payment = quote_row.get_opt_f64("premium")?;

        let recipient_name =
            compose_recipient_name(&request.recipient_first_name, &request.recipient_last_name);

        let now = now_unix();
        let result = self
            .adapter
            .execute(
                "INSERT INTO pdf_queue (quote_id, agent_id, pdf_path, recipient_email, \
                 recipient_name, status, retry_count, error_message, death_benefit, \
                 monthly_payment, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, ?7, ?8, ?9, ?9)",
                vec![
                    quote_id.into(),
                    request.agent_id.into(),
                    pdf_path.into(),
                    request.recipient_email.as_str().into(),
                    recipient_name.as_deref().into(),
                    DeliveryStatus::Pending.as_str().into(),
                    death_benefit.into(),
                    monthly_payment.into(),
                    now.into(),
                ],
            )
            .await?;

        debug!(item_id = result.last_insert_id, quote_id, "PDF enqueued");
        Ok(result.last_insert_id)
    }

    /// Pending deliveries, oldest first.
    pub async fn get_pending_pdfs(&self) -> ServiceResult<Vec<PdfQueueItem>> {
        self.select_where("status = 'pending'", "created_at ASC, id ASC", vec![])
            .await
    }

    /// Failed deliveries, most recently attempted first.
    pub async fn get_failed_pdfs(&self) -> ServiceResult<Vec<PdfQueueItem>> {
        self.select_where("status = 'failed'", "updated_at DESC, id DESC", vec![])
            .await
    }

    /// Every non-deleted delivery, newest first.
    pub async fn get_all_pdfs(&self) -> ServiceResult<Vec<PdfQueueItem>> {
        self.select_where("status != 'deleted'", "created_at DESC, id DESC", vec![])
            .await
    }

    /// Soft-deleted tombstones, oldest first.
    pub async fn get_deleted_pdfs(&self) -> ServiceResult<Vec<PdfQueueItem>> {
        self.select_where("status = 'deleted'", "created_at ASC, id ASC", vec![])
            .await
    }

    /// All deliveries for one quote, oldest first.
    pub async fn get_by_quote_id(&self, quote_id: i64) -> ServiceResult<Vec<PdfQueueItem>> {
        self.select_where(
            "quote_id = ?1",
            "created_at ASC, id ASC",
            vec![quote_id.into()],
        )
        .await
    }

    /// Get a single queue item.
    pub async fn get(&self, id: i64) -> ServiceResult<Option<PdfQueueItem>> {
        let rows = self
            .adapter
            .query(
                &format!("SELECT {} FROM pdf_queue WHERE id = ?1", PDF_COLUMNS),
                vec![id.into()],
            )
            .await?;
        rows.first().map(map_pdf_item).transpose()
    }

    /// Move an item through the delivery state machine.
    ///
    /// The requested status is validated against the item's current
    /// status; illegal transitions are rejected without touching the row.
    /// `updated_at` is refreshed and `sent_at` stamped on entering `sent`.
    pub async fn update_status(
        &self,
        id: i64,
        status: DeliveryStatus,
        error_message: Option<&str>,
    ) -> ServiceResult<()> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("pdf_queue item {}", id)))?;
        let next = current.status.transition(status)?;

        let now = now_unix();
        let sql = if next == DeliveryStatus::Sent {
            "UPDATE pdf_queue SET status = ?1, error_message = ?2, updated_at = ?3, sent_at = ?3 \
             WHERE id = ?4"
        } else {
            "UPDATE pdf_queue SET status = ?1, error_message = ?2, updated_at = ?3 WHERE id = ?4"
        };
        self.adapter
            .execute(
                sql,
                vec![
                    next.as_str().into(),
                    error_message.into(),
                    now.into(),
                    id.into(),
                ],
            )
            .await?;
        debug!(item_id = id, status = next.as_str(), "PDF queue status updated");
        Ok(())
    }

    /// Atomically bump the retry counter.
    pub async fn increment_retry_count(&self, id: i64) -> ServiceResult<()> {
        self.adapter
            .execute(
                "UPDATE pdf_queue SET retry_count = retry_count + 1 WHERE id = ?1",
                vec![id.into()],
            )
            .await?;
        Ok(())
    }

    /// Soft-delete: the tombstone row survives so the deletion itself can
    /// be synced later.
    pub async fn mark_deleted(&self, id: i64) -> ServiceResult<()> {
        self.update_status(id, DeliveryStatus::Deleted, None).await
    }

    /// Hard-delete a single row.
    pub async fn delete_item(&self, id: i64) -> ServiceResult<bool> {
        let result = self
            .adapter
            .execute("DELETE FROM pdf_queue WHERE id = ?1", vec![id.into()])
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Hard-delete every row for a quote.
    pub async fn delete_by_quote_id(&self, quote_id: i64) -> ServiceResult<u64> {
        let result = self
            .adapter
            .execute(
                "DELETE FROM pdf_queue WHERE quote_id = ?1",
                vec![quote_id.into()],
            )
            .await?;
        Ok(result.rows_affected)
    }

    async fn select_where(
        &self,
        predicate: &str,
        order: &str,
        params: Vec<storage_adapter::SqlValue>,
    ) -> ServiceResult<Vec<PdfQueueItem>> {
        let rows = self
            .adapter
            .query(
                &format!(
                    "SELECT {} FROM pdf_queue WHERE {} ORDER BY {}",
                    PDF_COLUMNS, predicate, order
                ),
                params,
            )
            .await?;
        rows.iter().map(map_pdf_item).collect()
    }
}

/// Join the non-empty name parts with a single space; None if both are
/// empty.
fn compose_recipient_name(first: &str, last: &str) -> Option<String> {
    let parts: Vec<&str> = [first.trim(), last.trim()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

pub(crate) fn map_pdf_item(row: &SqlRow) -> ServiceResult<PdfQueueItem> {
    Ok(PdfQueueItem {
        id: row.get_i64("id")?,
        quote_id: row.get_i64("quote_id")?,
        agent_id: row.get_opt_i64("agent_id")?,
        pdf_path: row.get_text("pdf_path")?,
        recipient_email: row.get_text("recipient_email")?,
        recipient_name: row.get_opt_text("recipient_name")?,
        status: DeliveryStatus::from_str(&row.get_text("status")?),
        retry_count: row.get_i64("retry_count")?,
        error_message: row.get_opt_text("error_message")?,
        death_benefit: row.get_opt_f64("death_benefit")?,
        monthly_payment: row.get_opt_f64("monthly_payment")?,
        created_at: row.get_i64("created_at")?,
        updated_at: row.get_i64("updated_at")?,
        sent_at: row.get_opt_i64("sent_at")?,
    })
}
