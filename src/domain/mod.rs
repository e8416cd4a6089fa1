use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JSON object used for the opaque header/query mappings of a capture.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Path recorded when the caller hits the capture mount with no sub-path.
pub const DEFAULT_PATH: &str = "default";

/// Sentinel recorded when no client address can be resolved.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Payload of a captured request.
///
/// `Structured` never holds JSON `null` or a bare JSON string; those
/// normalize to `Absent` and `Text` so pattern matches stay exhaustive and
/// the stored column round-trips (`Absent` is SQL NULL).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Body {
    #[default]
    Absent,
    Text(String),
    Structured(serde_json::Value),
}

impl Body {
    pub fn from_stored(value: Option<serde_json::Value>) -> Self {
        match value {
            None | Some(serde_json::Value::Null) => Self::Absent,
            Some(serde_json::Value::String(text)) => Self::Text(text),
            Some(other) => Self::Structured(other),
        }
    }

    pub fn into_stored(self) -> Option<serde_json::Value> {
        match self {
            Self::Absent => None,
            Self::Text(text) => Some(serde_json::Value::String(text)),
            Self::Structured(value) => Some(value),
        }
    }
}

/// A recorded inbound request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capture {
    pub id: i64,
    pub path: String,
    pub method: String,
    pub headers: JsonMap,
    pub body: Body,
    pub query_params: JsonMap,
    pub source_ip: String,
    /// `None` only for rows that predate classification.
    pub webhook_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Capture as assembled by the ingestion handler, before the store assigns
/// `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewCapture {
    pub path: String,
    pub method: String,
    pub headers: JsonMap,
    pub body: Body,
    pub query_params: JsonMap,
    pub source_ip: String,
    pub webhook_type: String,
}

#[derive(Debug, Serialize)]
pub struct IngestAck {
    pub success: bool,
    pub message: String,
    pub id: i64,
    pub path: String,
    #[serde(rename = "type")]
    pub webhook_type: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct IngestError {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct CaptureList {
    pub webhooks: Vec<Capture>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct DeleteAck {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TypeList {
    pub types: Vec<String>,
}
