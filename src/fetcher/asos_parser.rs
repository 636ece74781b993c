//! ASOS response envelope parser
//!
//! The service wraps every answer in `response.header` / `response.body`.
//! Parsing is tolerant: the body is optional, `items` is an
//! empty string when a range has no data, `item` may be a single object
//! instead of an array, and `totalCount` may arrive as a string.

use crate::fetcher::{FetcherError, FetcherResult};
use crate::ObservationRecord;
use serde_json::Value;
use tracing::{debug, warn};

/// Message used when the service omits `resultMsg`
pub const UNKNOWN_ERROR: &str = "Unknown Error";

/// Result code the service uses for a normal answer
pub const RESULT_CODE_OK: &str = "00";

/// Result code for a query range without observations (`NO_DATA`)
pub const RESULT_CODE_NO_DATA: &str = "03";

const SNIPPET_LEN: usize = 200;

/// Decoded `response` object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiEnvelope {
    /// `response.header.resultCode`
    pub result_code: Option<String>,
    /// `response.header.resultMsg`
    pub result_msg: Option<String>,
    /// `response.body`, `None` when absent or empty
    pub body: Option<PageBody>,
}

impl ApiEnvelope {
    /// Envelope carrying a body, used by test doubles and builders
    pub fn with_body(body: PageBody) -> Self {
        Self {
            result_code: Some(RESULT_CODE_OK.to_string()),
            result_msg: Some("NORMAL_SERVICE".to_string()),
            body: Some(body),
        }
    }

    /// Envelope without a body, as returned for service-level errors
    pub fn without_body(result_msg: impl Into<String>) -> Self {
        Self {
            result_code: None,
            result_msg: Some(result_msg.into()),
            body: None,
        }
    }

    /// Whether the header reports `NO_DATA` for the query
    pub fn is_no_data(&self) -> bool {
        self.result_code.as_deref() == Some(RESULT_CODE_NO_DATA)
    }

    /// Message to report when the body is missing
    pub fn failure_message(&self) -> &str {
        self.result_msg.as_deref().unwrap_or(UNKNOWN_ERROR)
    }
}

/// Decoded `response.body` object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageBody {
    /// Records on this page, in server order
    pub items: Vec<ObservationRecord>,
    /// Server-reported total for the whole query
    pub total_count: u64,
    /// Echoed `pageNo`, when present
    pub page_no: Option<u32>,
    /// Echoed `numOfRows`, when present
    pub num_of_rows: Option<u32>,
}

impl PageBody {
    /// Body with the given items and total
    pub fn new(items: Vec<ObservationRecord>, total_count: u64) -> Self {
        Self {
            items,
            total_count,
            page_no: None,
            num_of_rows: None,
        }
    }
}

/// Parse a raw response body into an [`ApiEnvelope`]
///
/// # Errors
/// Returns [`FetcherError::Parse`] when the text is not JSON. The service
/// answers some key errors with XML regardless of `dataType`.
pub fn parse_envelope(text: &str) -> FetcherResult<ApiEnvelope> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        FetcherError::Parse(format!(
            "failed to decode JSON response: {e} (body starts with: {})",
            snippet(text)
        ))
    })?;

    let response = value.get("response");
    let header = response.and_then(|r| r.get("header"));

    let envelope = ApiEnvelope {
        result_code: header.and_then(|h| h.get("resultCode")).and_then(value_as_string),
        result_msg: header.and_then(|h| h.get("resultMsg")).and_then(value_as_string),
        body: response.and_then(|r| r.get("body")).and_then(parse_body),
    };

    debug!(
        result_code = ?envelope.result_code,
        has_body = envelope.body.is_some(),
        "Parsed ASOS response envelope"
    );

    Ok(envelope)
}

fn parse_body(body: &Value) -> Option<PageBody> {
    let object = body.as_object()?;
    if object.is_empty() {
        return None;
    }

    Some(PageBody {
        items: object.get("items").map(parse_items).unwrap_or_default(),
        total_count: object.get("totalCount").and_then(value_as_u64).unwrap_or(0),
        page_no: object
            .get("pageNo")
            .and_then(value_as_u64)
            .and_then(|n| u32::try_from(n).ok()),
        num_of_rows: object
            .get("numOfRows")
            .and_then(value_as_u64)
            .and_then(|n| u32::try_from(n).ok()),
    })
}

fn parse_items(items: &Value) -> Vec<ObservationRecord> {
    let entries = match items {
        Value::Object(map) => match map.get("item") {
            Some(Value::Array(list)) => list.as_slice(),
            Some(single @ Value::Object(_)) => std::slice::from_ref(single),
            _ => &[],
        },
        Value::Array(list) => list.as_slice(),
        _ => &[],
    };

    let mut records = Vec::with_capacity(entries.len());
    let mut skipped = 0usize;
    for entry in entries {
        match entry {
            Value::Object(record) => records.push(record.clone()),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "Ignoring non-object entries in items.item");
    }
    records
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(SNIPPET_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
