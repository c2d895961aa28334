//! Time slice records and request/response payloads

use chrono::{DateTime, Utc};
use contract_common::time;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Server-assigned time slice identifier
pub type TimeSliceId = i64;

/// A stored time slice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlice {
    pub id: TimeSliceId,
    pub contract_id: String,
    /// The article that was new for the contract when this slice was created
    pub top_article_id: i64,
    pub validity_tag: String,
    pub invoice_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /time-slices` as received.
///
/// Every field is optional at the decoding stage so that absent and `null`
/// values reach [`IncomingPayload::validate`] and are reported as missing
/// rather than as malformed JSON.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IncomingPayload {
    #[serde(default)]
    pub contract_id: Option<String>,
    /// Candidate article IDs; order and duplicates are irrelevant
    #[serde(default)]
    pub article_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub validity_tag: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<DateTime<Utc>>,
}

/// A required field was missing or empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub &'static str);

/// A payload that passed structural validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTimeSlice {
    pub contract_id: String,
    pub article_ids: Vec<i64>,
    pub validity_tag: String,
    pub invoice_date: DateTime<Utc>,
}

impl IncomingPayload {
    /// Check required fields, reporting the first one that fails
    pub fn validate(self) -> Result<NewTimeSlice, ValidationError> {
        let contract_id = self
            .contract_id
            .filter(|v| !v.is_empty())
            .ok_or(ValidationError("contract_id is required"))?;
        let article_ids = self
            .article_ids
            .filter(|v| !v.is_empty())
            .ok_or(ValidationError("article_ids must not be empty"))?;
        let validity_tag = self
            .validity_tag
            .filter(|v| !v.is_empty())
            .ok_or(ValidationError("validity_tag is required"))?;
        let invoice_date = self
            .invoice_date
            .filter(|d| !time::is_zero(d))
            .ok_or(ValidationError("invoice_date is required"))?;

        Ok(NewTimeSlice {
            contract_id,
            article_ids,
            validity_tag,
            invoice_date,
        })
    }
}

/// Response body for a created time slice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub message: String,
    pub time_slice_id: TimeSliceId,
}

impl CreatedResponse {
    pub fn new(time_slice_id: TimeSliceId) -> Self {
        Self {
            message: "time slice created".to_string(),
            time_slice_id,
        }
    }
}

/// Standard JSON error envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
