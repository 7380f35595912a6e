//! Quick-quote delivery queue service.
//!
//! Quick quotes go straight to the backend API rather than living as full
//! local quotes. The entire request payload is serialized into the row so
//! a later sync pass can replay it without recomputation, and the
//! remote-assigned `backend_id` becomes the correlation key once the
//! backend accepts the quote.

use crate::{ServiceError, ServiceResult};
use quote_database::{now_unix, DeliveryStatus, QuickQuoteQueueItem};
use serde::Serialize;
use std::sync::Arc;
use storage_adapter::{DatabaseAdapter, SqlRow, SqlValue};
use tracing::debug;

const QQ_COLUMNS: &str = "id, quote_id, request_data, pdf_path, status, retry_count, \
     error_message, backend_id, created_at, updated_at, sent_at";

/// Delivery queue operations over the `quick_quote_queue` table.
pub struct QuickQuoteQueueService {
    adapter: Arc<dyn DatabaseAdapter>,
}

impl QuickQuoteQueueService {
    pub fn new(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        Self { adapter }
    }

    /// Enqueue a quick quote for delivery.
    ///
    /// The request object is serialized whole; `quote_id` is optional
    /// because quick quotes may exist without a locally tracked quote.
    pub async fn add_to_queue<T: Serialize>(
        &self,
        request: &T,
        pdf_path: Option<&str>,
        quote_id: Option<i64>,
    ) -> ServiceResult<i64> {
        let request_data = serde_json::to_string(request)?;
        let now = now_unix();
        let result = self
            .adapter
            .execute(
                "INSERT INTO quick_quote_queue (quote_id, request_data, pdf_path, status, \
                 retry_count, error_message, backend_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, NULL, NULL, ?5, ?5)",
                vec![
                    quote_id.into(),
                    request_data.into(),
                    pdf_path.into(),
                    DeliveryStatus::Pending.as_str().into(),
                    now.into(),
                ],
            )
            .await?;
        debug!(item_id = result.last_insert_id, "Quick quote enqueued");
        Ok(result.last_insert_id)
    }

    /// Record the remote-assigned id after the backend accepts the quote.
    ///
    /// One-way write: once assigned the value never changes. Re-asserting
    /// the same id is an idempotent no-op; a different id is refused.
    pub async fn update_backend_id(&self, id: i64, backend_id: i64) -> ServiceResult<()> {
        let item = self
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("quick_quote_queue item {}", id)))?;

        match item.backend_id {
            None => {
                self.adapter
                    .execute(
                        "UPDATE quick_quote_queue SET backend_id = ?1, updated_at = ?2 \
                         WHERE id = ?3 AND backend_id IS NULL",
                        vec![backend_id.into(), now_unix().into(), id.into()],
                    )
                    .await?;
                debug!(item_id = id, backend_id, "Backend id assigned");
                Ok(())
            }
            Some(existing) if existing == backend_id => Ok(()),
            Some(existing) => Err(ServiceError::BackendIdConflict {
                id,
                existing,
                requested: backend_id,
            }),
        }
    }

    /// Items already accepted by the backend (deletion-detection input).
    pub async fn get_quotes_with_backend_id(&self) -> ServiceResult<Vec<QuickQuoteQueueItem>> {
        self.select_where(
            "backend_id IS NOT NULL AND status != 'deleted'",
            "created_at ASC, id ASC",
            vec![],
        )
        .await
    }

    /// Items still awaiting their first successful push.
    pub async fn get_quotes_without_backend_id(&self) -> ServiceResult<Vec<QuickQuoteQueueItem>> {
        self.select_where(
            "backend_id IS NULL AND status != 'deleted'",
            "created_at ASC, id ASC",
            vec![],
        )
        .await
    }

    /// Pending deliveries, oldest first.
    pub async fn get_pending_quotes(&self) -> ServiceResult<Vec<QuickQuoteQueueItem>> {
        self.select_where("status = 'pending'", "created_at ASC, id ASC", vec![])
            .await
    }

    /// Failed deliveries, most recently attempted first.
    pub async fn get_failed_quotes(&self) -> ServiceResult<Vec<QuickQuoteQueueItem>> {
        self.select_where("status = 'failed'", "updated_at DESC, id DESC", vec![])
            .await
    }

    /// Every non-deleted item, newest first.
    pub async fn get_all_quotes(&self) -> ServiceResult<Vec<QuickQuoteQueueItem>> {
        self.select_where("status != 'deleted'", "created_at DESC, id DESC", vec![])
            .await
    }

    /// Soft-deleted tombstones, oldest first.
    pub async fn get_deleted_quotes(&self) -> ServiceResult<Vec<QuickQuoteQueueItem>> {
        self.select_where("status = 'deleted'", "created_at ASC, id ASC", vec![])
            .await
    }

    /// Get a single queue item.
    pub async fn get(&self, id: i64) -> ServiceResult<Option<QuickQuoteQueueItem>> {
        let rows = self
            .adapter
            .query(
                &format!("SELECT {} FROM quick_quote_queue WHERE id = ?1", QQ_COLUMNS),
                vec![id.into()],
            )
            .await?;
        rows.first().map(map_quick_quote_item).transpose()
    }

    /// Move an item through the delivery state machine (see
    /// [`DeliveryStatus::transition`]).
    pub async fn update_status(
        &self,
        id: i64,
        status: DeliveryStatus,
        error_message: Option<&str>,
    ) -> ServiceResult<()> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("quick_quote_queue item {}", id)))?;
        let next = current.status.transition(status)?;

        let now = now_unix();
        let sql = if next == DeliveryStatus::Sent {
            "UPDATE quick_quote_queue SET status = ?1, error_message = ?2, updated_at = ?3, \
             sent_at = ?3 WHERE id = ?4"
        } else {
            "UPDATE quick_quote_queue SET status = ?1, error_message = ?2, updated_at = ?3 \
             WHERE id = ?4"
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
        debug!(item_id = id, status = next.as_str(), "Quick quote status updated");
        Ok(())
    }

    /// Atomically bump the retry counter.
    pub async fn increment_retry_count(&self, id: i64) -> ServiceResult<()> {
        self.adapter
            .execute(
                "UPDATE quick_quote_queue SET retry_count = retry_count + 1 WHERE id = ?1",
                vec![id.into()],
            )
            .await?;
        Ok(())
    }

    /// Soft-delete so the deletion survives being offline and can be
    /// pushed to the backend by a later sync pass.
    pub async fn mark_deleted(&self, id: i64) -> ServiceResult<()> {
        self.update_status(id, DeliveryStatus::Deleted, None).await
    }

    /// Hard-delete a row (after the backend has confirmed the deletion,
    /// or when the item was never pushed).
    pub async fn delete_item(&self, id: i64) -> ServiceResult<bool> {
        let result = self
            .adapter
            .execute(
                "DELETE FROM quick_quote_queue WHERE id = ?1",
                vec![id.into()],
            )
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn select_where(
        &self,
        predicate: &str,
        order: &str,
        params: Vec<SqlValue>,
    ) -> ServiceResult<Vec<QuickQuoteQueueItem>> {
        let rows = self
            .adapter
            .query(
                &format!(
                    "SELECT {} FROM quick_quote_queue WHERE {} ORDER BY {}",
                    QQ_COLUMNS, predicate, order
                ),
                params,
            )
            .await?;
        rows.iter().map(map_quick_quote_item).collect()
    }
}

pub(crate) fn map_quick_quote_item(row: &SqlRow) -> ServiceResult<QuickQuoteQueueItem> {
    Ok(QuickQuoteQueueItem {
        id: row.get_i64("id")?,
        quote_id: row.get_opt_i64("quote_id")?,
        request_data: row.get_text("request_data")?,
        pdf_path: row.get_opt_text("pdf_path")?,
        status: DeliveryStatus::from_str(&row.get_text("status")?),
        retry_count: row.get_i64("retry_count")?,
        error_message: row.get_opt_text("error_message")?,
        backend_id: row.get_opt_i64("backend_id")?,
        created_at: row.get_i64("created_at")?,
        updated_at: row.get_i64("updated_at")?,
        sent_at: row.get_opt_i64("sent_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_adapter;
    use serde::Serialize;

    #[derive(Serialize)]
    struct SampleRequest {
        company: &'static str,
        insured_age: i64,
        face_amount: f64,
    }

    fn sample_request() -> SampleRequest {
        SampleRequest {
            company: "nfl",
            insured_age: 40,
            face_amount: 25_000.0,
        }
    }

    async fn service() -> QuickQuoteQueueService {
        QuickQuoteQueueService::new(memory_adapter().await)
    }

    #[tokio::test]
    async fn test_enqueue_serializes_request() {
        let queue = service().await;
        let id = queue
            .add_to_queue(&sample_request(), Some("/tmp/qq.pdf"), None)
            .await
            .unwrap();

        let item = queue.get(id).await.unwrap().unwrap();
        assert_eq!(item.status, DeliveryStatus::Pending);
        assert_eq!(item.retry_count, 0);
        assert!(item.backend_id.is_none());
        assert!(item.quote_id.is_none());
        assert_eq!(item.pdf_path.as_deref(), Some("/tmp/qq.pdf"));

        // The payload is replayable
        let parsed: serde_json::Value = serde_json::from_str(&item.request_data).unwrap();
        assert_eq!(parsed["company"], "nfl");
        assert_eq!(parsed["insured_age"], 40);
    }

    #[tokio::test]
    async fn test_backend_id_is_write_once() {
        let queue = service().await;
        let id = queue
            .add_to_queue(&sample_request(), None, None)
            .await
            .unwrap();

        queue.update_backend_id(id, 7).await.unwrap();
        assert_eq!(queue.get(id).await.unwrap().unwrap().backend_id, Some(7));

        // Same value is a no-op
        queue.update_backend_id(id, 7).await.unwrap();

        // A different value is refused and leaves the row alone
        let err = queue.update_backend_id(id, 8).await.unwrap_err();
        assert!(matches!(err, ServiceError::BackendIdConflict { .. }));
        assert_eq!(queue.get(id).await.unwrap().unwrap().backend_id, Some(7));
    }

    #[tokio::test]
    async fn test_backend_id_partitions() {
        let queue = service().await;
        let a = queue
            .add_to_queue(&sample_request(), None, None)
            .await
            .unwrap();
        let b = queue
            .add_to_queue(&sample_request(), None, None)
            .await
            .unwrap();

        queue.update_backend_id(a, 100).await.unwrap();

        let with = queue.get_quotes_with_backend_id().await.unwrap();
        assert_eq!(with.len(), 1);
        assert_eq!(with[0].id, a);

        let without = queue.get_quotes_without_backend_id().await.unwrap();
        assert_eq!(without.len(), 1);
        assert_eq!(without[0].id, b);

        // Soft-deleted items leave both partitions
        queue.mark_deleted(b).await.unwrap();
        assert!(queue
            .get_quotes_without_backend_id()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_tombstone() {
        let queue = service().await;
        let id = queue
            .add_to_queue(&sample_request(), None, None)
            .await
            .unwrap();

        queue.mark_deleted(id).await.unwrap();

        assert!(queue.get_all_quotes().await.unwrap().is_empty());
        let deleted = queue.get_deleted_quotes().await.unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].id, id);

        // The tombstone can still be hard-deleted once synced
        assert!(queue.delete_item(id).await.unwrap());
        assert!(queue.get_deleted_quotes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_retry_cycle() {
        let queue = service().await;
        let id = queue
            .add_to_queue(&sample_request(), None, None)
            .await
            .unwrap();

        queue
            .update_status(id, DeliveryStatus::Sending, None)
            .await
            .unwrap();
        queue
            .update_status(id, DeliveryStatus::Failed, Some("503 from backend"))
            .await
            .unwrap();
        queue.increment_retry_count(id).await.unwrap();

        let failed = queue.get_failed_quotes().await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].retry_count, 1);
        assert_eq!(failed[0].error_message.as_deref(), Some("503 from backend"));

        // failed -> sending is the retry path
        queue
            .update_status(id, DeliveryStatus::Sending, None)
            .await
            .unwrap();
        queue
            .update_status(id, DeliveryStatus::Sent, None)
            .await
            .unwrap();
        let item = queue.get(id).await.unwrap().unwrap();
        assert_eq!(item.status, DeliveryStatus::Sent);
        assert!(item.sent_at.is_some());
    }

    #[tokio::test]
    async fn test_status_domain_is_closed() {
        let queue = service().await;
        let id = queue
            .add_to_queue(&sample_request(), None, None)
            .await
            .unwrap();
        queue
            .update_status(id, DeliveryStatus::Sending, None)
            .await
            .unwrap();
        queue
            .update_status(id, DeliveryStatus::Sent, None)
            .await
            .unwrap();

        // No delivery attempt leaves sent; only a tombstone does
        assert!(queue
            .update_status(id, DeliveryStatus::Pending, None)
            .await
            .is_err());
        assert!(queue
            .update_status(id, DeliveryStatus::Sending, None)
            .await
            .is_err());
        queue.mark_deleted(id).await.unwrap();
        assert!(queue
            .update_status(id, DeliveryStatus::Pending, None)
            .await
            .is_err());

        for item in queue.get_all_quotes().await.unwrap() {
            assert!(matches!(
                item.status,
                DeliveryStatus::Pending
                    | DeliveryStatus::Sending
                    | DeliveryStatus::Sent
                    | DeliveryStatus::Failed
                    | DeliveryStatus::Deleted
            ));
        }
    }

    #[tokio::test]
    async fn test_update_status_missing_row() {
        let queue = service().await;
        let err = queue
            .update_status(41, DeliveryStatus::Sending, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
