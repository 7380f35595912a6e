//! Quote CRUD service.

use crate::{ServiceError, ServiceResult};
use quote_database::{now_unix, Company, NewQuote, PaymentMode, Quote, QuoteStatus, Sex};
use std::sync::Arc;
use storage_adapter::{DatabaseAdapter, SqlRow};
use tracing::debug;

const QUOTE_COLUMNS: &str = "id, company, insured_age, insured_sex, insured_smoker, \
     payor_age, payor_sex, payor_smoker, product, payment_mode, face_amount, premium, \
     status, agent_id, created_at, updated_at";

/// CRUD operations over the `quotes` table. The local store is the single
/// writer of truth for quotes; remote state never overwrites them.
pub struct QuoteService {
    adapter: Arc<dyn DatabaseAdapter>,
}

impl QuoteService {
    pub fn new(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        Self { adapter }
    }

    /// Insert a new quote with status `draft` and return the stored row.
    pub async fn create(&self, quote: &NewQuote) -> ServiceResult<Quote> {
        let now = now_unix();
        let result = self
            .adapter
            .execute(
                "INSERT INTO quotes (company, insured_age, insured_sex, insured_smoker, \
                 payor_age, payor_sex, payor_smoker, product, payment_mode, face_amount, \
                 premium, status, agent_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
                vec![
                    quote.company.as_str().into(),
                    quote.insured_age.into(),
                    quote.insured_sex.as_str().into(),
                    quote.insured_smoker.into(),
                    quote.payor_age.into(),
                    quote.payor_sex.map(|s| s.as_str()).into(),
                    quote.payor_smoker.into(),
                    quote.product.as_str().into(),
                    quote.payment_mode.as_str().into(),
                    quote.face_amount.into(),
                    quote.premium.into(),
                    QuoteStatus::Draft.as_str().into(),
                    quote.agent_id.into(),
                    now.into(),
                ],
            )
            .await?;

        debug!(quote_id = result.last_insert_id, "Quote created");
        self.get(result.last_insert_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("quote not found after insert".to_string()))
    }

    /// Get a quote by id.
    pub async fn get(&self, id: i64) -> ServiceResult<Option<Quote>> {
        let rows = self
            .adapter
            .query(
                &format!("SELECT {} FROM quotes WHERE id = ?1", QUOTE_COLUMNS),
                vec![id.into()],
            )
            .await?;
        rows.first().map(map_quote).transpose()
    }

    /// List all quotes, newest first.
    pub async fn list(&self) -> ServiceResult<Vec<Quote>> {
        let rows = self
            .adapter
            .query(
                &format!(
                    "SELECT {} FROM quotes ORDER BY created_at DESC, id DESC",
                    QUOTE_COLUMNS
                ),
                vec![],
            )
            .await?;
        rows.iter().map(map_quote).collect()
    }

    /// Overwrite the mutable fields of a quote and refresh `updated_at`.
    pub async fn update(&self, quote: &Quote) -> ServiceResult<bool> {
        let result = self
            .adapter
            .execute(
                "UPDATE quotes SET company = ?1, insured_age = ?2, insured_sex = ?3, \
                 insured_smoker = ?4, payor_age = ?5, payor_sex = ?6, payor_smoker = ?7, \
                 product = ?8, payment_mode = ?9, face_amount = ?10, premium = ?11, \
                 agent_id = ?12, updated_at = ?13
                 WHERE id = ?14",
                vec![
                    quote.company.as_str().into(),
                    quote.insured_age.into(),
                    quote.insured_sex.as_str().into(),
                    quote.insured_smoker.into(),
                    quote.payor_age.into(),
                    quote.payor_sex.map(|s| s.as_str()).into(),
                    quote.payor_smoker.into(),
                    quote.product.as_str().into(),
                    quote.payment_mode.as_str().into(),
                    quote.face_amount.into(),
                    quote.premium.into(),
                    quote.agent_id.into(),
                    now_unix().into(),
                    quote.id.into(),
                ],
            )
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Store the computed premium for a quote.
    pub async fn set_premium(&self, id: i64, premium: f64) -> ServiceResult<bool> {
        let result = self
            .adapter
            .execute(
                "UPDATE quotes SET premium = ?1, updated_at = ?2 WHERE id = ?3",
                vec![premium.into(), now_unix().into(), id.into()],
            )
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Move a quote through its lifecycle (draft / completed / sent).
    pub async fn set_status(&self, id: i64, status: QuoteStatus) -> ServiceResult<bool> {
        let result = self
            .adapter
            .execute(
                "UPDATE quotes SET status = ?1, updated_at = ?2 WHERE id = ?3",
                vec![status.as_str().into(), now_unix().into(), id.into()],
            )
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Delete a quote. Associated pdf_queue rows and illustrations are
    /// removed by the FK cascade.
    pub async fn delete(&self, id: i64) -> ServiceResult<bool> {
        let result = self
            .adapter
            .execute("DELETE FROM quotes WHERE id = ?1", vec![id.into()])
            .await?;
        Ok(result.rows_affected > 0)
    }
}

pub(crate) fn map_quote(row: &SqlRow) -> ServiceResult<Quote> {
    Ok(Quote {
        id: row.get_i64("id")?,
        company: Company::from_str(&row.get_text("company")?),
        insured_age: row.get_i64("insured_age")?,
        insured_sex: Sex::from_str(&row.get_text("insured_sex")?),
        insured_smoker: row.get_bool("insured_smoker")?,
        payor_age: row.get_opt_i64("payor_age")?,
        payor_sex: row.get_opt_text("payor_sex")?.map(|s| Sex::from_str(&s)),
        payor_smoker: row.get_opt_bool("payor_smoker")?,
        product: row.get_text("product")?,
        payment_mode: PaymentMode::from_str(&row.get_text("payment_mode")?),
        face_amount: row.get_f64("face_amount")?,
        premium: row.get_opt_f64("premium")?,
        status: QuoteStatus::from_str(&row.get_text("status")?),
        agent_id: row.get_opt_i64("agent_id")?,
        created_at: row.get_i64("created_at")?,
        updated_at: row.get_i64("updated_at")?,
    })
}
