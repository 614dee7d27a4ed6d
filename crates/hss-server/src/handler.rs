use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use hss_store::{ContentDigest, ContentHasher, Metadata};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::headers;
use crate::operation::{EntryQuery, Operation};
use crate::state::AppState;

/// Requests on `/`.
pub async fn root_handler(
    State(state): State<AppState>,
    method: Method,
    Query(query): Query<EntryQuery>,
    request: Request,
) -> ServerResult<Response> {
    dispatch(state, String::new(), method, query, request).await
}

/// Requests on `/{path}`.
pub async fn entry_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    method: Method,
    Query(query): Query<EntryQuery>,
    request: Request,
) -> ServerResult<Response> {
    dispatch(state, path, method, query, request).await
}

async fn dispatch(
    state: AppState,
    path: String,
    method: Method,
    query: EntryQuery,
    request: Request,
) -> ServerResult<Response> {
    match Operation::classify(&method, &query)? {
        Operation::CreateDirectory => {
            let metadata = headers::metadata_from_headers(request.headers())?;
            create_directory(state, path, metadata).await
        }
        Operation::ListDirectory => list_directory(state, path).await,
        Operation::GetDirectory => get_directory(state, path).await,
        Operation::HeadDirectory => head_directory(state, path).await,
        Operation::DeleteDirectory => delete_directory(state, path).await,
        Operation::CreateFile => create_file(state, path, request).await,
        Operation::GetFile => get_file(state, path).await,
        Operation::HeadFile => head_file(state, path).await,
        Operation::DeleteFile => delete_file(state, path).await,
    }
}

// ---------------------------------------------------------------------------
// Directories
// ---------------------------------------------------------------------------

async fn create_directory(state: AppState, path: String, metadata: Metadata) -> ServerResult<Response> {
    let record = state
        .run(move |store| store.create_directory(&path, metadata))
        .await?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

async fn list_directory(state: AppState, path: String) -> ServerResult<Response> {
    let entries = state.run(move |store| store.list_directory(&path)).await?;
    Ok(Json(entries).into_response())
}

async fn get_directory(state: AppState, path: String) -> ServerResult<Response> {
    let record = state.run(move |store| store.get_directory_info(&path)).await?;
    Ok(Json(record).into_response())
}

async fn head_directory(state: AppState, path: String) -> ServerResult<Response> {
    let record = state.run(move |store| store.get_directory_info(&path)).await?;

    let mut response = StatusCode::OK.into_response();
    let out = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&record.path) {
        out.insert(headers::DIRECTORY_PATH, value);
    }
    out.insert(headers::DIRECTORY_SIZE, HeaderValue::from(record.size));
    out.insert(headers::DIRECTORY_FILES_COUNT, HeaderValue::from(record.files_count));
    headers::insert_metadata(out, &record.metadata);
    Ok(response)
}

async fn delete_directory(state: AppState, path: String) -> ServerResult<Response> {
    state.run(move |store| store.delete_directory(&path)).await?;
    Ok(StatusCode::OK.into_response())
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Upload a file. Each multipart field is written as one part; any other
/// body is written as a single part.
async fn create_file(state: AppState, path: String, request: Request) -> ServerResult<Response> {
    let metadata = headers::metadata_from_headers(request.headers())?;
    let multipart = headers::is_multipart(request.headers());

    let key = path.clone();
    let started = state
        .run(move |store| store.start_upload(&key, metadata))
        .await?;
    let upload_id = started.upload_id;

    let digest = match write_body(&state, &path, multipart, request).await {
        Ok(digest) => digest,
        Err(e) => {
            warn!(path = path.as_str(), error = %e, "upload aborted; file left partially written");
            return Err(e);
        }
    };

    let record = state
        .run(move |store| store.finish_upload(&path, upload_id, &digest))
        .await?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

async fn write_body(
    state: &AppState,
    path: &str,
    multipart: bool,
    request: Request,
) -> ServerResult<ContentDigest> {
    let mut hasher = ContentHasher::new();
    if multipart {
        let mut form = Multipart::from_request(request, state).await?;
        let mut part_number = 0u32;
        while let Some(field) = form.next_field().await? {
            let data = field.bytes().await?;
            hasher.update(&data);
            write_part(state, path, data, part_number).await?;
            part_number += 1;
        }
        debug!(path, parts = part_number, "multipart upload written");
    } else {
        let body = Bytes::from_request(request, state).await?;
        hasher.update(&body);
        write_part(state, path, body, 0).await?;
    }
    Ok(hasher.finalize())
}

async fn write_part(state: &AppState, path: &str, data: Bytes, part_number: u32) -> ServerResult<()> {
    let path = path.to_string();
    state
        .run(move |store| store.write_part(&path, &data, part_number))
        .await?;
    Ok(())
}

async fn get_file(state: AppState, path: String) -> ServerResult<Response> {
    let (record, data) = state
        .run(move |store| store.read_file_with_record(&path))
        .await?;

    // Uploads still in progress have no stored digest yet.
    let md5 = record
        .md5
        .unwrap_or_else(|| ContentDigest::of(&data).md5);

    let len = data.len() as u64;
    let mut response = Response::new(Body::from(data));
    let out = response.headers_mut();
    out.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    headers::insert_content_headers(out, len, Some(&md5));
    Ok(response)
}

async fn head_file(state: AppState, path: String) -> ServerResult<Response> {
    let record = state.run(move |store| store.file_record(&path)).await?;

    let mut response = StatusCode::OK.into_response();
    let out = response.headers_mut();
    headers::insert_content_headers(out, record.size, record.md5.as_deref());
    headers::insert_metadata(out, &record.metadata);
    Ok(response)
}

async fn delete_file(state: AppState, path: String) -> ServerResult<Response> {
    state.run(move |store| store.delete_file(&path)).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---------------------------------------------------------------------------
// Management console
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Running configuration.
pub async fn config_handler(State(state): State<AppState>) -> Json<ServerConfig> {
    Json(state.config().clone())
}
