//! Best-effort event-type heuristic over heterogeneous webhook payloads.
//!
//! Providers encode the event type inconsistently (some in the body, some in
//! headers); a fixed priority list gives deterministic, provider-agnostic
//! labels without per-provider configuration.

use serde_json::Value;

use crate::domain::{Body, JsonMap};

/// Label returned when no known field or header carries an event type.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Body fields tested first, in priority order.
const BODY_TYPE_FIELDS: [&str; 5] = ["type", "event", "event_type", "action", "kind"];

/// Headers tested when no body field matches, compared case-insensitively.
const TYPE_HEADERS: [&str; 4] = [
    "x-github-event",
    "x-shopify-topic",
    "x-event-type",
    "x-event-name",
];

/// Derive the event-type label for a capture. Pure and total: any input
/// resolves to a label, falling back to [`UNKNOWN_TYPE`].
pub fn classify(body: &Body, headers: &JsonMap) -> String {
    // Text bodies may still be JSON under a non-JSON content type; an
    // unparseable body counts as absent for classification only.
    let parsed;
    let fields = match body {
        Body::Structured(value) => value.as_object(),
        Body::Text(text) => {
            parsed = serde_json::from_str::<Value>(text).ok();
            parsed.as_ref().and_then(Value::as_object)
        }
        Body::Absent => None,
    };

    if let Some(fields) = fields {
        for field in BODY_TYPE_FIELDS {
            if let Some(value) = fields.get(field) {
                // Present-but-falsy values ("", 0, false) still count; only
                // JSON null falls through to the next candidate.
                if !value.is_null() {
                    return stringify(value);
                }
            }
        }
    }

    for wanted in TYPE_HEADERS {
        let matched = headers
            .iter()
            .find(|(name, value)| name.eq_ignore_ascii_case(wanted) && !value.is_null());
        if let Some((_, value)) = matched {
            return stringify(value);
        }
    }

    UNKNOWN_TYPE.to_owned()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
