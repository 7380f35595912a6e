//! The interval-driven sync worker and its reconciliation pass.

use crate::{is_item_due, SyncConfig, SyncError, SyncResult};
use backend_client::{ApiClient, ApiError, QuickQuoteResource};
use quote_database::{now_unix, DeliveryStatus, PdfQueueItem, QuickQuoteQueueItem};
use quote_services::{PdfQueueService, QuickQuoteQueueService};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use storage_adapter::DatabaseAdapter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What one sync pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub pushed_quick_quotes: usize,
    pub pushed_pdfs: usize,
    pub remote_deletions_applied: usize,
    pub local_deletions_pushed: usize,
}

impl PassSummary {
    /// True when the pass performed no mutation anywhere.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// How a delivery failure affects the rest of the pass.
enum FailureAction {
    /// Payload-specific rejection; other items may still succeed.
    Continue,
    /// Transport-level failure; pushing more items now is pointless.
    StopPushing,
    /// Credentials are gone; abort the whole pass.
    Abort,
}

/// Handle to a started worker. The loop exits when the handle is dropped
/// or [`SyncHandle::stop`] is called; stop additionally waits for the
/// in-flight pass to finish.
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Signal the worker to stop and wait for the loop to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Reconciles local queue state against the backend. See the crate docs
/// for the pass protocol.
pub struct SyncWorker {
    pdf_queue: PdfQueueService,
    quick_quotes: QuickQuoteQueueService,
    client: Arc<ApiClient>,
    config: SyncConfig,
}

impl SyncWorker {
    pub fn new(
        adapter: Arc<dyn DatabaseAdapter>,
        client: Arc<ApiClient>,
        config: SyncConfig,
    ) -> Self {
        Self {
            pdf_queue: PdfQueueService::new(adapter.clone()),
            quick_quotes: QuickQuoteQueueService::new(adapter),
            client,
            config,
        }
    }

    /// Spawn the interval loop. The first pass runs immediately.
    pub fn start(self: Arc<Self>) -> SyncHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let worker = self;

        let task = tokio::spawn(async move {
            let mut ticker = interval(worker.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = worker.config.interval.as_secs(), "Sync worker started");

            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!("Sync worker stopping");
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        match worker.run_pass().await {
                            Ok(summary) if summary.is_noop() => {}
                            Ok(summary) => {
                                info!(
                                    quick_quotes = summary.pushed_quick_quotes,
                                    pdfs = summary.pushed_pdfs,
                                    remote_deletions = summary.remote_deletions_applied,
                                    local_deletions = summary.local_deletions_pushed,
                                    "Sync pass applied changes"
                                );
                            }
                            Err(SyncError::AuthRequired) => {
                                warn!("Sync pass aborted: authentication required");
                            }
                            Err(e) => {
                                warn!(error = %e, "Sync pass failed");
                            }
                        }
                    }
                }
            }
        });

        SyncHandle { shutdown, task }
    }

    /// Run one reconciliation pass.
    pub async fn run_pass(&self) -> SyncResult<PassSummary> {
        let pass_id = Uuid::new_v4();
        let mut summary = PassSummary::default();
        debug!(%pass_id, "Sync pass started");

        self.push_quick_quotes(&mut summary).await?;
        self.push_pdfs(&mut summary).await?;
        self.reconcile_remote_deletions(&mut summary).await?;
        self.push_local_deletions(&mut summary).await?;

        debug!(%pass_id, ?summary, "Sync pass finished");
        Ok(summary)
    }

    /// Phase 1: push quick quotes awaiting their first successful
    /// delivery.
    async fn push_quick_quotes(&self, summary: &mut PassSummary) -> SyncResult<()> {
        for item in self.quick_quote_candidates().await? {
            self.quick_quotes
                .update_status(item.id, DeliveryStatus::Sending, None)
                .await?;

            match self.deliver_quick_quote(&item).await {
                Ok(resource) => {
                    self.quick_quotes
                        .update_backend_id(item.id, resource.id)
                        .await?;
                    self.quick_quotes
                        .update_status(item.id, DeliveryStatus::Sent, None)
                        .await?;
                    summary.pushed_quick_quotes += 1;
                    debug!(item_id = item.id, backend_id = resource.id, "Quick quote pushed");
                }
                Err(e) => match self.record_quick_quote_failure(item.id, &e).await? {
                    FailureAction::Continue => continue,
                    FailureAction::StopPushing => break,
                    FailureAction::Abort => return Err(SyncError::AuthRequired),
                },
            }
        }
        Ok(())
    }

    /// Pending items plus failed items whose backoff has elapsed and that
    /// are still under the attempt bound. Items the backend has already
    /// accepted are never pushed again.
    async fn quick_quote_candidates(&self) -> SyncResult<Vec<QuickQuoteQueueItem>> {
        let now = now_unix();
        let mut candidates = self.quick_quotes.get_pending_quotes().await?;
        for item in self.quick_quotes.get_failed_quotes().await? {
            if item.retry_count >= self.config.max_send_retries {
                continue;
            }
            if !is_item_due(item.updated_at, item.retry_count, now, &self.config) {
                continue;
            }
            candidates.push(item);
        }
        candidates.retain(|item| item.backend_id.is_none());
        candidates.sort_by_key(|item| (item.created_at, item.id));
        Ok(candidates)
    }

    /// Replay the stored request, with the PDF attached when one exists.
    async fn deliver_quick_quote(
        &self,
        item: &QuickQuoteQueueItem,
    ) -> Result<QuickQuoteResource, ApiError> {
        let payload: serde_json::Value = serde_json::from_str(&item.request_data)?;
        match item.pdf_path.as_deref() {
            Some(path) if !path.is_empty() => {
                let bytes = tokio::fs::read(path).await?;
                self.client
                    .create_quick_quote_with_pdf(&payload, bytes, &file_name_of(path))
                    .await
            }
            _ => self.client.create_quick_quote(&payload).await,
        }
    }

    async fn record_quick_quote_failure(
        &self,
        item_id: i64,
        error: &ApiError,
    ) -> SyncResult<FailureAction> {
        if matches!(error, ApiError::AuthRequired) {
            // Recorded without a retry increment so the item goes out
            // immediately once the user signs back in.
            self.quick_quotes
                .update_status(item_id, DeliveryStatus::Failed, Some("authentication required"))
                .await?;
            return Ok(FailureAction::Abort);
        }

        let message = error.to_string();
        self.quick_quotes
            .update_status(item_id, DeliveryStatus::Failed, Some(&message))
            .await?;
        self.quick_quotes.increment_retry_count(item_id).await?;
        warn!(item_id, error = %message, "Quick quote delivery failed");

        if error.is_transient() {
            Ok(FailureAction::StopPushing)
        } else {
            Ok(FailureAction::Continue)
        }
    }

    /// Phase 2: push PDF deliveries. Only the newest actionable item per
    /// quote is the active delivery target; older rows are historical.
    async fn push_pdfs(&self, summary: &mut PassSummary) -> SyncResult<()> {
        for item in self.pdf_candidates().await? {
            self.pdf_queue
                .update_status(item.id, DeliveryStatus::Sending, None)
                .await?;

            match self.deliver_pdf(&item).await {
                Ok(_) => {
                    self.pdf_queue
                        .update_status(item.id, DeliveryStatus::Sent, None)
                        .await?;
                    summary.pushed_pdfs += 1;
                    debug!(item_id = item.id, quote_id = item.quote_id, "PDF delivered");
                }
                Err(e) => match self.record_pdf_failure(item.id, &e).await? {
                    FailureAction::Continue => continue,
                    FailureAction::StopPushing => break,
                    FailureAction::Abort => return Err(SyncError::AuthRequired),
                },
            }
        }
        Ok(())
    }

    async fn pdf_candidates(&self) -> SyncResult<Vec<PdfQueueItem>> {
        let now = now_unix();
        let mut eligible = self.pdf_queue.get_pending_pdfs().await?;
        for item in self.pdf_queue.get_failed_pdfs().await? {
            if item.retry_count >= self.config.max_send_retries {
                continue;
            }
            if !is_item_due(item.updated_at, item.retry_count, now, &self.config) {
                continue;
            }
            eligible.push(item);
        }

        // Newest per quote wins; iteration in (created_at, id) order makes
        // the last insert the newest.
        eligible.sort_by_key(|item| (item.created_at, item.id));
        let mut newest: HashMap<i64, PdfQueueItem> = HashMap::new();
        for item in eligible {
            newest.insert(item.quote_id, item);
        }
        let mut candidates: Vec<PdfQueueItem> = newest.into_values().collect();
        candidates.sort_by_key(|item| (item.created_at, item.id));
        Ok(candidates)
    }

    async fn deliver_pdf(&self, item: &PdfQueueItem) -> Result<QuickQuoteResource, ApiError> {
        let payload = serde_json::json!({
            "quoteId": item.quote_id,
            "recipientEmail": item.recipient_email,
            "recipientName": item.recipient_name,
            "deathBenefit": item.death_benefit,
            "monthlyPayment": item.monthly_payment,
        });
        let bytes = tokio::fs::read(&item.pdf_path).await?;
        self.client
            .create_quick_quote_with_pdf(&payload, bytes, &file_name_of(&item.pdf_path))
            .await
    }

    async fn record_pdf_failure(
        &self,
        item_id: i64,
        error: &ApiError,
    ) -> SyncResult<FailureAction> {
        if matches!(error, ApiError::AuthRequired) {
            self.pdf_queue
                .update_status(item_id, DeliveryStatus::Failed, Some("authentication required"))
                .await?;
            return Ok(FailureAction::Abort);
        }

        let message = error.to_string();
        self.pdf_queue
            .update_status(item_id, DeliveryStatus::Failed, Some(&message))
            .await?;
        self.pdf_queue.increment_retry_count(item_id).await?;
        warn!(item_id, error = %message, "PDF delivery failed");

        if error.is_transient() {
            Ok(FailureAction::StopPushing)
        } else {
            Ok(FailureAction::Continue)
        }
    }

    /// Phase 3: drop local rows for quotes the backend no longer holds.
    async fn reconcile_remote_deletions(&self, summary: &mut PassSummary) -> SyncResult<()> {
        let remote = match self.client.fetch_sync_list().await {
            Ok(list) => list,
            Err(ApiError::AuthRequired) => return Err(SyncError::AuthRequired),
            Err(e) => return Err(e.into()),
        };
        let remote_ids: HashSet<i64> = remote.iter().map(|r| r.id).collect();

        for item in self.quick_quotes.get_quotes_with_backend_id().await? {
            let Some(backend_id) = item.backend_id else {
                continue;
            };
            if !remote_ids.contains(&backend_id) {
                info!(item_id = item.id, backend_id, "Quote deleted remotely, dropping local row");
                self.quick_quotes.delete_item(item.id).await?;
                summary.remote_deletions_applied += 1;
            }
        }
        Ok(())
    }

    /// Phase 4: push local tombstones, then hard-delete them. Tombstones
    /// that were never pushed have nothing to delete remotely.
    async fn push_local_deletions(&self, summary: &mut PassSummary) -> SyncResult<()> {
        for item in self.quick_quotes.get_deleted_quotes().await? {
            match item.backend_id {
                None => {
                    self.quick_quotes.delete_item(item.id).await?;
                    summary.local_deletions_pushed += 1;
                }
                Some(backend_id) => match self.client.delete_quick_quote(backend_id).await {
                    Ok(()) => {
                        self.quick_quotes.delete_item(item.id).await?;
                        summary.local_deletions_pushed += 1;
                        debug!(item_id = item.id, backend_id, "Deletion pushed");
                    }
                    Err(ApiError::AuthRequired) => return Err(SyncError::AuthRequired),
                    Err(e) if e.is_transient() => {
                        // Tombstone stays for the next pass
                        warn!(item_id = item.id, error = %e, "Deletion push failed");
                        break;
                    }
                    Err(e) => {
                        warn!(item_id = item.id, error = %e, "Deletion push rejected");
                    }
                },
            }
        }

        // PDF tombstones have no remote counterpart; drop them locally.
        for item in self.pdf_queue.get_deleted_pdfs().await? {
            self.pdf_queue.delete_item(item.id).await?;
            summary.local_deletions_pushed += 1;
        }
        Ok(())
    }
}

fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "quote.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_client::{MemoryTokenStore, TokenPair};
    use quote_database::AsyncDatabase;
    use quote_services::EnqueuePdf;
    use serde_json::json;
    use std::io::Write;
    use std::time::Duration;
    use storage_adapter::SqliteAdapter;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        adapter: Arc<dyn DatabaseAdapter>,
        server: MockServer,
        worker: SyncWorker,
    }

    async fn harness_with_config(config: SyncConfig) -> Harness {
        let db = AsyncDatabase::open_in_memory().await.unwrap();
        let adapter: Arc<dyn DatabaseAdapter> = Arc::new(SqliteAdapter::new(db));

        let server = MockServer::start().await;
        let tokens = Arc::new(MemoryTokenStore::with_tokens(TokenPair {
            access: "access".to_string(),
            refresh: "refresh".to_string(),
        }));
        let client = Arc::new(ApiClient::new(server.uri(), tokens).unwrap());

        let worker = SyncWorker::new(adapter.clone(), client, config);
        Harness {
            adapter,
            server,
            worker,
        }
    }

    async fn harness() -> Harness {
        harness_with_config(SyncConfig::default()).await
    }

    fn quick_quotes(h: &Harness) -> QuickQuoteQueueService {
        QuickQuoteQueueService::new(h.adapter.clone())
    }

    fn pdf_queue(h: &Harness) -> PdfQueueService {
        PdfQueueService::new(h.adapter.clone())
    }

    async fn mount_empty_sync_list(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/quick-quote/sync/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(server)
            .await;
    }

    fn created_response(id: i64) -> ResponseTemplate {
        ResponseTemplate::new(201)
            .set_body_json(json!({"id": id, "createdAt": "2026-01-01T00:00:00Z"}))
    }

    #[tokio::test]
    async fn test_pass_pushes_quick_quote_and_assigns_backend_id() {
        let h = harness().await;
        // The backend holds the quote once it is pushed, so the existence
        // list fetched later in the same pass reports it.
        Mock::given(method("GET"))
            .and(path("/api/quick-quote/sync/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 500, "createdAt": "2026-01-01T00:00:00Z"}
            ])))
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/quick-quote/"))
            .respond_with(created_response(500))
            .expect(1)
            .mount(&h.server)
            .await;

        let queue = quick_quotes(&h);
        let id = queue
            .add_to_queue(&json!({"company": "nfl", "insured_age": 30}), None, None)
            .await
            .unwrap();

        let summary = h.worker.run_pass().await.unwrap();
        assert_eq!(summary.pushed_quick_quotes, 1);

        let item = queue.get(id).await.unwrap().unwrap();
        assert_eq!(item.status, DeliveryStatus::Sent);
        assert_eq!(item.backend_id, Some(500));
        assert!(item.sent_at.is_some());
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let h = harness().await;
        // The existence fetch is the only allowed repeat call
        Mock::given(method("GET"))
            .and(path("/api/quick-quote/sync/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 500, "createdAt": "2026-01-01T00:00:00Z"}
            ])))
            .expect(2)
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/quick-quote/"))
            .respond_with(created_response(500))
            .expect(1)
            .mount(&h.server)
            .await;

        let queue = quick_quotes(&h);
        queue
            .add_to_queue(&json!({"company": "nfl"}), None, None)
            .await
            .unwrap();

        let first = h.worker.run_pass().await.unwrap();
        assert_eq!(first.pushed_quick_quotes, 1);

        let second = h.worker.run_pass().await.unwrap();
        assert!(second.is_noop());
        // Mock expectations verify no second POST happened.
    }

    #[tokio::test]
    async fn test_transient_failure_marks_failed_and_increments() {
        let h = harness().await;
        mount_empty_sync_list(&h.server).await;
        Mock::given(method("POST"))
            .and(path("/api/quick-quote/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .expect(1)
            .mount(&h.server)
            .await;

        let queue = quick_quotes(&h);
        let id = queue
            .add_to_queue(&json!({"company": "nfl"}), None, None)
            .await
            .unwrap();

        let summary = h.worker.run_pass().await.unwrap();
        assert_eq!(summary.pushed_quick_quotes, 0);

        let item = queue.get(id).await.unwrap().unwrap();
        assert_eq!(item.status, DeliveryStatus::Failed);
        assert_eq!(item.retry_count, 1);
        assert!(item.error_message.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_transient_failure_stops_pushing_remaining_items() {
        let h = harness().await;
        mount_empty_sync_list(&h.server).await;
        // Everything fails with a transport-class error; only the first
        // item may be attempted.
        Mock::given(method("POST"))
            .and(path("/api/quick-quote/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&h.server)
            .await;

        let queue = quick_quotes(&h);
        let first = queue
            .add_to_queue(&json!({"n": 1}), None, None)
            .await
            .unwrap();
        let second = queue
            .add_to_queue(&json!({"n": 2}), None, None)
            .await
            .unwrap();

        h.worker.run_pass().await.unwrap();

        assert_eq!(
            queue.get(first).await.unwrap().unwrap().status,
            DeliveryStatus::Failed
        );
        assert_eq!(
            queue.get(second).await.unwrap().unwrap().status,
            DeliveryStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_retry_cap_leaves_item_failed() {
        let config = SyncConfig {
            backoff_base: Duration::ZERO,
            max_send_retries: 1,
            ..SyncConfig::default()
        };
        let h = harness_with_config(config).await;
        mount_empty_sync_list(&h.server).await;
        Mock::given(method("POST"))
            .and(path("/api/quick-quote/"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad payload"))
            .expect(1)
            .mount(&h.server)
            .await;

        let queue = quick_quotes(&h);
        let id = queue
            .add_to_queue(&json!({"company": "nfl"}), None, None)
            .await
            .unwrap();

        h.worker.run_pass().await.unwrap();
        // With the cap reached, further passes never re-attempt the item
        h.worker.run_pass().await.unwrap();
        h.worker.run_pass().await.unwrap();

        let item = queue.get(id).await.unwrap().unwrap();
        assert_eq!(item.status, DeliveryStatus::Failed);
        assert_eq!(item.retry_count, 1);
    }

    #[tokio::test]
    async fn test_failed_item_retries_after_backoff() {
        let config = SyncConfig {
            backoff_base: Duration::ZERO,
            ..SyncConfig::default()
        };
        let h = harness_with_config(config).await;
        Mock::given(method("GET"))
            .and(path("/api/quick-quote/sync/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 77, "createdAt": "2026-01-01T00:00:00Z"}
            ])))
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/quick-quote/"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/quick-quote/"))
            .respond_with(created_response(77))
            .expect(1)
            .mount(&h.server)
            .await;

        let queue = quick_quotes(&h);
        let id = queue
            .add_to_queue(&json!({"company": "nfl"}), None, None)
            .await
            .unwrap();

        h.worker.run_pass().await.unwrap();
        assert_eq!(
            queue.get(id).await.unwrap().unwrap().status,
            DeliveryStatus::Failed
        );

        let summary = h.worker.run_pass().await.unwrap();
        assert_eq!(summary.pushed_quick_quotes, 1);
        let item = queue.get(id).await.unwrap().unwrap();
        assert_eq!(item.status, DeliveryStatus::Sent);
        assert_eq!(item.backend_id, Some(77));
        assert_eq!(item.retry_count, 1);
    }

    #[tokio::test]
    async fn test_remote_deletion_detection() {
        let h = harness().await;
        // Backend reports only quote 1; quote 2 was deleted server-side
        Mock::given(method("GET"))
            .and(path("/api/quick-quote/sync/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "createdAt": "2026-01-01T00:00:00Z"}
            ])))
            .mount(&h.server)
            .await;

        let queue = quick_quotes(&h);
        let keep = queue
            .add_to_queue(&json!({"n": 1}), None, None)
            .await
            .unwrap();
        let drop = queue
            .add_to_queue(&json!({"n": 2}), None, None)
            .await
            .unwrap();
        for (id, backend_id) in [(keep, 1), (drop, 2)] {
            queue
                .update_status(id, DeliveryStatus::Sending, None)
                .await
                .unwrap();
            queue
                .update_status(id, DeliveryStatus::Sent, None)
                .await
                .unwrap();
            queue.update_backend_id(id, backend_id).await.unwrap();
        }

        let summary = h.worker.run_pass().await.unwrap();
        assert_eq!(summary.remote_deletions_applied, 1);
        assert!(queue.get(keep).await.unwrap().is_some());
        assert!(queue.get(drop).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_local_deletion_pushed_then_row_removed() {
        let h = harness().await;
        mount_empty_sync_list(&h.server).await;
        Mock::given(method("DELETE"))
            .and(path("/api/quick-quote/9/"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&h.server)
            .await;

        let queue = quick_quotes(&h);
        let id = queue
            .add_to_queue(&json!({"n": 1}), None, None)
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
        queue.update_backend_id(id, 9).await.unwrap();

        // User deletes while offline; the tombstone waits for sync
        queue.mark_deleted(id).await.unwrap();

        let summary = h.worker.run_pass().await.unwrap();
        assert_eq!(summary.local_deletions_pushed, 1);
        assert!(queue.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_never_pushed_deletion_stays_local() {
        let h = harness().await;
        mount_empty_sync_list(&h.server).await;
        // No DELETE may reach the backend for an item it never saw
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&h.server)
            .await;

        let queue = quick_quotes(&h);
        let id = queue
            .add_to_queue(&json!({"n": 1}), None, None)
            .await
            .unwrap();
        queue.mark_deleted(id).await.unwrap();

        let summary = h.worker.run_pass().await.unwrap();
        assert_eq!(summary.local_deletions_pushed, 1);
        assert!(queue.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pdf_pass_actions_only_newest_per_quote() {
        let h = harness().await;
        mount_empty_sync_list(&h.server).await;
        Mock::given(method("POST"))
            .and(path("/api/quick-quote/"))
            .respond_with(created_response(1))
            .expect(1)
            .mount(&h.server)
            .await;

        // Seed a quote the PDFs can reference
        h.adapter
            .execute(
                "INSERT INTO quotes (company, insured_age, insured_sex, insured_smoker, product, \
                 payment_mode, face_amount, premium, status, created_at, updated_at)
                 VALUES ('nfl', 40, 'male', 0, 'term-10', 'monthly', 10000.0, 12.0, 'completed', 5, 5)",
                vec![],
            )
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let pdf_path = dir.path().join("illustration.pdf");
        let mut file = std::fs::File::create(&pdf_path).unwrap();
        file.write_all(b"%PDF-1.4 test").unwrap();

        let queue = pdf_queue(&h);
        let request = EnqueuePdf {
            quote_id: Some(1),
            recipient_email: "a@b.com".to_string(),
            recipient_first_name: "Jane".to_string(),
            recipient_last_name: "Doe".to_string(),
            agent_id: None,
        };
        let older = queue
            .add_to_queue_with_path(&request, pdf_path.to_str().unwrap())
            .await
            .unwrap();
        let newer = queue
            .add_to_queue_with_path(&request, pdf_path.to_str().unwrap())
            .await
            .unwrap();

        let summary = h.worker.run_pass().await.unwrap();
        assert_eq!(summary.pushed_pdfs, 1);

        // Only the newest enqueue was actioned; the older row is history
        assert_eq!(
            queue.get(newer).await.unwrap().unwrap().status,
            DeliveryStatus::Sent
        );
        assert_eq!(
            queue.get(older).await.unwrap().unwrap().status,
            DeliveryStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_missing_pdf_file_records_failure() {
        let h = harness().await;
        mount_empty_sync_list(&h.server).await;

        h.adapter
            .execute(
                "INSERT INTO quotes (company, insured_age, insured_sex, insured_smoker, product, \
                 payment_mode, face_amount, status, created_at, updated_at)
                 VALUES ('nfl', 40, 'male', 0, 'term-10', 'monthly', 10000.0, 'completed', 5, 5)",
                vec![],
            )
            .await
            .unwrap();

        let queue = pdf_queue(&h);
        let id = queue
            .add_to_queue_with_path(
                &EnqueuePdf {
                    quote_id: Some(1),
                    recipient_email: "a@b.com".to_string(),
                    ..Default::default()
                },
                "/nonexistent/never-rendered.pdf",
            )
            .await
            .unwrap();

        h.worker.run_pass().await.unwrap();

        let item = queue.get(id).await.unwrap().unwrap();
        assert_eq!(item.status, DeliveryStatus::Failed);
        assert_eq!(item.retry_count, 1);
        assert!(item.error_message.is_some());
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_pass_without_retry_increment() {
        let h = harness().await;
        // Both the call and the refresh are rejected
        Mock::given(method("POST"))
            .and(path("/api/quick-quote/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/refresh-tokens/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&h.server)
            .await;

        let queue = quick_quotes(&h);
        let id = queue
            .add_to_queue(&json!({"n": 1}), None, None)
            .await
            .unwrap();

        let err = h.worker.run_pass().await.unwrap_err();
        assert!(matches!(err, SyncError::AuthRequired));

        // Recorded for visibility, but eligible the moment auth returns
        let item = queue.get(id).await.unwrap().unwrap();
        assert_eq!(item.status, DeliveryStatus::Failed);
        assert_eq!(item.retry_count, 0);
        assert_eq!(
            item.error_message.as_deref(),
            Some("authentication required")
        );
    }

    #[tokio::test]
    async fn test_worker_loop_start_and_stop() {
        let server = MockServer::start().await;
        mount_empty_sync_list(&server).await;

        let db = AsyncDatabase::open_in_memory().await.unwrap();
        let adapter: Arc<dyn DatabaseAdapter> = Arc::new(SqliteAdapter::new(db));
        let tokens = Arc::new(MemoryTokenStore::with_tokens(TokenPair {
            access: "access".to_string(),
            refresh: "refresh".to_string(),
        }));
        let client = Arc::new(ApiClient::new(server.uri(), tokens).unwrap());
        let worker = Arc::new(SyncWorker::new(
            adapter,
            client,
            SyncConfig {
                interval: Duration::from_millis(50),
                ..SyncConfig::default()
            },
        ));

        let handle = worker.start();
        tokio::time::sleep(Duration::from_millis(120)).await;
        // stop() resolves promptly; no orphaned timer keeps running
        tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .unwrap();
    }
}
