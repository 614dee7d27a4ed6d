use axum::extract::{Query, Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info};

use crate::operation::{EntryQuery, Operation};
use crate::state::AppState;

/// Log every API request: operation, path, query, content length, and the
/// configured headers.
pub async fn log_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let operation = Query::<EntryQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| Operation::classify(request.method(), &query).ok())
        .map_or("Unsupported", Operation::name);
    let content_length = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    let headers = selected_headers(request.headers(), &state.config().logging.specific_headers);
    let path = request.uri().path().to_string();

    info!(
        operation,
        method = %request.method(),
        path = path.as_str(),
        query = request.uri().query().unwrap_or(""),
        content_length,
        headers = ?headers,
        "request received"
    );

    let response = next.run(request).await;
    debug!(
        operation,
        path = path.as_str(),
        status = response.status().as_u16(),
        "request completed"
    );
    response
}

/// Headers named in `wanted` (case-insensitive), or all of them when
/// `wanted` is empty.
fn selected_headers(headers: &HeaderMap, wanted: &[String]) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| {
            wanted.is_empty() || wanted.iter().any(|w| w.eq_ignore_ascii_case(name.as_str()))
        })
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}
