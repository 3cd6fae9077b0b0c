use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use loanledger_core::TxSignature;
use loanledger_events::RawLogBatch;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// A transaction's logs as pushed by the chain subscription transport.
#[derive(Debug, Deserialize)]
pub struct LogBatchRequest {
    pub signature: String,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl LogBatchRequest {
    pub fn into_batch(self) -> Result<RawLogBatch, axum::response::Response> {
        let signature = TxSignature::new(self.signature).map_err(|e| {
            errors::json_error(
                axum::http::StatusCode::BAD_REQUEST,
                "invalid_signature",
                e.to_string(),
            )
        })?;
        Ok(RawLogBatch::new(signature, self.logs))
    }
}

/// `?start=&end=` in RFC 3339.
#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl WindowQuery {
    pub fn parse(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), axum::response::Response> {
        Ok((parse_bound("start", self.start.as_deref())?, parse_bound("end", self.end.as_deref())?))
    }
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<DateTime<Utc>, axum::response::Response> {
    let bad = |msg: String| {
        errors::json_error(axum::http::StatusCode::BAD_REQUEST, "invalid_window", msg)
    };
    let raw = raw.ok_or_else(|| bad(format!("missing '{name}' query parameter")))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| bad(format!("'{name}' is not an RFC 3339 timestamp: {e}")))
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedResponse {
    pub delivery_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}
