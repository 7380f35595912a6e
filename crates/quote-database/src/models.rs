//! Database model types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Issuing company for a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Company {
    Nfl,
    Vista,
}

impl Company {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nfl => "nfl",
            Self::Vista => "vista",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "vista" => Self::Vista,
            _ => Self::Nfl,
        }
    }
}

/// Sex of an insured or payor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "female" => Self::Female,
            _ => Self::Male,
        }
    }
}

/// Premium payment cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Annual,
    SemiAnnual,
    Quarterly,
    Monthly,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::SemiAnnual => "semi_annual",
            Self::Quarterly => "quarterly",
            Self::Monthly => "monthly",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "annual" => Self::Annual,
            "semi_annual" => Self::SemiAnnual,
            "quarterly" => Self::Quarterly,
            _ => Self::Monthly,
        }
    }
}

/// Quote lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Draft,
    Completed,
    Sent,
}

impl Default for QuoteStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Completed => "completed",
            Self::Sent => "sent",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "completed" => Self::Completed,
            "sent" => Self::Sent,
            _ => Self::Draft,
        }
    }
}

/// Delivery status shared by both queue tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sending,
    Sent,
    Failed,
    Deleted,
}

impl Default for DeliveryStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// A status transition that the delivery state machine rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid delivery status transition: {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: DeliveryStatus,
    pub to: DeliveryStatus,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sending" => Self::Sending,
            "sent" => Self::Sent,
            "failed" => Self::Failed,
            "deleted" => Self::Deleted,
            _ => Self::Pending,
        }
    }

    /// Validate a requested transition against the delivery state machine:
    ///
    /// ```text
    /// pending -> sending -> sent ----+
    ///    |          |                |
    ///    |          +----> failed -> +--> deleted
    ///    |              (-> sending) |
    ///    +---------------------------+
    /// ```
    ///
    /// No delivery attempt ever leaves `sent`, and `deleted` rows only
    /// leave the table by hard delete. Requesting the current status
    /// again is accepted as a no-op, so interrupted passes can safely
    /// re-assert `sending`.
    pub fn transition(self, requested: DeliveryStatus) -> Result<DeliveryStatus, TransitionError> {
        if self == requested {
            return Ok(requested);
        }
        let legal = match (self, requested) {
            (Self::Pending, Self::Sending) => true,
            (Self::Pending, Self::Deleted) => true,
            (Self::Sending, Self::Sent) => true,
            (Self::Sending, Self::Failed) => true,
            (Self::Failed, Self::Sending) => true,
            (Self::Failed, Self::Deleted) => true,
            (Self::Sent, Self::Deleted) => true,
            _ => false,
        };
        if legal {
            Ok(requested)
        } else {
            Err(TransitionError {
                from: self,
                to: requested,
            })
        }
    }
}

/// A persisted insurance-pricing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: i64,
    pub company: Company,
    pub insured_age: i64,
    pub insured_sex: Sex,
    pub insured_smoker: bool,
    pub payor_age: Option<i64>,
    pub payor_sex: Option<Sex>,
    pub payor_smoker: Option<bool>,
    pub product: String,
    pub payment_mode: PaymentMode,
    pub face_amount: f64,
    pub premium: Option<f64>,
    pub status: QuoteStatus,
    pub agent_id: Option<i64>,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub updated_at: i64,
}

/// New quote for insertion.
#[derive(Debug, Clone)]
pub struct NewQuote {
    pub company: Company,
    pub insured_age: i64,
    pub insured_sex: Sex,
    pub insured_smoker: bool,
    pub payor_age: Option<i64>,
    pub payor_sex: Option<Sex>,
    pub payor_smoker: Option<bool>,
    pub product: String,
    pub payment_mode: PaymentMode,
    pub face_amount: f64,
    pub premium: Option<f64>,
    pub agent_id: Option<i64>,
}

/// Agent profile record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub agency: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// New agent for insertion.
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub agency: Option<String>,
}

/// Rendered illustration tied to a quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Illustration {
    pub id: i64,
    pub quote_id: i64,
    pub pdf_path: String,
    pub created_at: i64,
}

/// One deliverable PDF in the delivery queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfQueueItem {
    pub id: i64,
    pub quote_id: i64,
    pub agent_id: Option<i64>,
    pub pdf_path: String,
    pub recipient_email: String,
    pub recipient_name: Option<String>,
    pub status: DeliveryStatus,
    pub retry_count: i64,
    pub error_message: Option<String>,
    /// Snapshot captured at enqueue time, never recomputed.
    pub death_benefit: Option<f64>,
    /// Snapshot captured at enqueue time, never recomputed.
    pub monthly_payment: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub sent_at: Option<i64>,
}

/// One queued quick quote awaiting delivery to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickQuoteQueueItem {
    pub id: i64,
    pub quote_id: Option<i64>,
    /// Full serialized request payload, replayed on sync.
    pub request_data: String,
    pub pdf_path: Option<String>,
    pub status: DeliveryStatus,
    pub retry_count: i64,
    pub error_message: Option<String>,
    /// Remote-assigned identifier; set at most once.
    pub backend_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub sent_at: Option<i64>,
}

/// Key-value application setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSetting {
    pub key: String,
    pub value: String,
    pub updated_at: i64,
}

/// Rows removed by a full reset, per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetCounts {
    pub quotes: u64,
    pub illustrations: u64,
    pub pdf_queue: u64,
    pub quick_quote_queue: u64,
}
