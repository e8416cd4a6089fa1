use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::{
    api::AppState,
    classify,
    domain::{Body, IngestAck, IngestError, JsonMap, NewCapture, DEFAULT_PATH, UNKNOWN_SOURCE},
};

/// `ANY /webhook/*sub_path`: capture whatever was sent, under whatever
/// sub-path the caller picked.
pub(crate) async fn capture(
    State(state): State<AppState>,
    Path(sub_path): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    payload: Bytes,
) -> Response {
    let path = if sub_path.is_empty() {
        DEFAULT_PATH.to_owned()
    } else {
        sub_path
    };
    store_capture(
        state,
        path,
        method,
        uri,
        headers,
        connect_info.map(|info| info.0),
        payload,
    )
    .await
}

/// `ANY /webhook`: no sub-path at all.
pub(crate) async fn capture_root(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    payload: Bytes,
) -> Response {
    store_capture(
        state,
        DEFAULT_PATH.to_owned(),
        method,
        uri,
        headers,
        connect_info.map(|info| info.0),
        payload,
    )
    .await
}

async fn store_capture(
    state: AppState,
    path: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    remote: Option<SocketAddr>,
    payload: Bytes,
) -> Response {
    let header_map = headers_to_map(&headers);
    let body = parse_body(&headers, &payload);
    let query_params = query_to_map(uri.query());
    let source_ip = resolve_source_ip(&headers, remote);
    let webhook_type = classify::classify(&body, &header_map);

    let capture = NewCapture {
        path,
        method: method.to_string(),
        headers: header_map,
        body,
        query_params,
        source_ip,
        webhook_type,
    };

    match state.store.insert(capture).await {
        Ok(stored) => {
            tracing::info!(method = %stored.method, path = %stored.path, "webhook received");
            let ack = IngestAck {
                success: true,
                message: "Webhook received".to_owned(),
                id: stored.id,
                path: stored.path,
                webhook_type: stored
                    .webhook_type
                    .unwrap_or_else(|| classify::UNKNOWN_TYPE.to_owned()),
                timestamp: stored.created_at,
            };
            (StatusCode::OK, Json(ack)).into_response()
        }
        Err(err) => {
            tracing::error!(error = ?err, "failed to store webhook");
            let failure = IngestError {
                success: false,
                message: "Failed to store webhook".to_owned(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(failure)).into_response()
        }
    }
}

fn headers_to_map(headers: &HeaderMap) -> JsonMap {
    let mut map = JsonMap::new();
    for (name, value) in headers {
        // Lossy decode: captures must never be rejected over an odd byte.
        let text = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.insert(name.as_str().to_owned(), Value::String(text));
    }
    map
}

fn query_to_map(query: Option<&str>) -> JsonMap {
    let mut map = JsonMap::new();
    for (name, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        map.insert(name.into_owned(), Value::String(value.into_owned()));
    }
    map
}

/// Normalize the raw payload by content type. Malformed bodies degrade to
/// text instead of failing the capture.
fn parse_body(headers: &HeaderMap, payload: &Bytes) -> Body {
    if payload.is_empty() {
        return Body::Absent;
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if content_type.contains("json") {
        if let Ok(value) = serde_json::from_slice::<Value>(payload) {
            return Body::from_stored(Some(value));
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let mut map = JsonMap::new();
        for (name, value) in url::form_urlencoded::parse(payload) {
            map.insert(name.into_owned(), Value::String(value.into_owned()));
        }
        return Body::Structured(Value::Object(map));
    }

    Body::Text(String::from_utf8_lossy(payload).into_owned())
}

/// Deployments behind a reverse proxy report the true client only in the
/// forwarded header, so it takes precedence over the socket address.
fn resolve_source_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|entry| entry.trim().to_owned())
        .filter(|entry| !entry.is_empty())
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_owned())
}
