//! Header conventions of the REST surface.
//!
//! User metadata travels as plain headers. `Metadata-Fields: owner,team`
//! names the keys, and each key is sent as its own header
//! (`owner: alice`). Responses carrying metadata use the same layout.

use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use hss_store::Metadata;
use tracing::warn;

use crate::error::{ServerError, ServerResult};

pub const METADATA_FIELDS: &str = "metadata-fields";
pub const CONTENT_MD5: &str = "content-md5";
pub const DIRECTORY_PATH: &str = "directory-path";
pub const DIRECTORY_SIZE: &str = "directory-size";
pub const DIRECTORY_FILES_COUNT: &str = "directory-files-count";

/// Headers the server sets itself; metadata may not shadow them.
const RESERVED: &[&str] = &[
    METADATA_FIELDS,
    CONTENT_MD5,
    DIRECTORY_PATH,
    DIRECTORY_SIZE,
    DIRECTORY_FILES_COUNT,
    "content-length",
    "content-type",
];

/// Collect user metadata from request headers.
///
/// A field listed in `Metadata-Fields` without its own header is stored with
/// an empty value.
pub fn metadata_from_headers(headers: &HeaderMap) -> ServerResult<Metadata> {
    let mut metadata = Metadata::new();
    let Some(fields) = headers.get(METADATA_FIELDS) else {
        return Ok(metadata);
    };
    let fields = fields
        .to_str()
        .map_err(|_| ServerError::InvalidHeader("Metadata-Fields is not valid text".into()))?;

    for field in fields.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        let value = match headers.get(field) {
            Some(value) => value.to_str().map_err(|_| {
                ServerError::InvalidHeader(format!("metadata field {field} is not valid text"))
            })?,
            None => "",
        };
        metadata.insert(field.to_string(), value.to_string());
    }
    Ok(metadata)
}

/// Emit `metadata` as one header per key plus `Metadata-Fields`.
pub fn insert_metadata(headers: &mut HeaderMap, metadata: &Metadata) {
    let mut fields = Vec::with_capacity(metadata.len());
    for (key, value) in metadata {
        if RESERVED.contains(&key.to_ascii_lowercase().as_str()) {
            warn!(key = key.as_str(), "metadata key shadows a reserved header; skipped");
            continue;
        }
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
                fields.push(key.as_str());
            }
            _ => warn!(key = key.as_str(), "metadata field is not a valid header; skipped"),
        }
    }
    if fields.is_empty() {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&fields.join(",")) {
        headers.insert(METADATA_FIELDS, value);
    }
}

pub fn insert_content_headers(headers: &mut HeaderMap, length: u64, md5: Option<&str>) {
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    if let Some(md5) = md5.and_then(|m| HeaderValue::from_str(m).ok()) {
        headers.insert(CONTENT_MD5, md5);
    }
}

/// Returns `true` when the request body is `multipart/form-data`.
pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn no_metadata_fields() {
        let headers = request_headers(&[("owner", "alice")]);
        assert!(metadata_from_headers(&headers).unwrap().is_empty());
    }

    #[test]
    fn reads_listed_fields() {
        let headers = request_headers(&[
            ("metadata-fields", "owner, team,,"),
            ("owner", "alice"),
            ("team", "storage"),
            ("unlisted", "ignored"),
        ]);
        let metadata = metadata_from_headers(&headers).unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata["owner"], "alice");
        assert_eq!(metadata["team"], "storage");
    }

    #[test]
    fn missing_field_value_is_empty() {
        let headers = request_headers(&[("metadata-fields", "owner")]);
        assert_eq!(metadata_from_headers(&headers).unwrap()["owner"], "");
    }

    #[test]
    fn emits_metadata_headers() {
        let mut metadata = Metadata::new();
        metadata.insert("owner".into(), "alice".into());
        metadata.insert("team".into(), "storage".into());

        let mut headers = HeaderMap::new();
        insert_metadata(&mut headers, &metadata);
        assert_eq!(headers["owner"], "alice");
        assert_eq!(headers["team"], "storage");
        assert_eq!(headers[METADATA_FIELDS], "owner,team");

        // The emitted headers parse back to the same map.
        assert_eq!(metadata_from_headers(&headers).unwrap(), metadata);
    }

    #[test]
    fn skips_unrepresentable_and_reserved_keys() {
        let mut metadata = Metadata::new();
        metadata.insert("bad key".into(), "x".into());
        metadata.insert("Content-Length".into(), "1".into());
        metadata.insert("ok".into(), "y".into());

        let mut headers = HeaderMap::new();
        insert_metadata(&mut headers, &metadata);
        assert_eq!(headers[METADATA_FIELDS], "ok");
        assert!(headers.get(CONTENT_LENGTH).is_none());
    }

    #[test]
    fn empty_metadata_emits_nothing() {
        let mut headers = HeaderMap::new();
        insert_metadata(&mut headers, &Metadata::new());
        assert!(headers.is_empty());
    }

    #[test]
    fn content_headers() {
        let mut headers = HeaderMap::new();
        insert_content_headers(&mut headers, 5, Some("5d41402abc4b2a76b9719d911017c592"));
        assert_eq!(headers[CONTENT_LENGTH], "5");
        assert_eq!(headers[CONTENT_MD5], "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn multipart_detection() {
        let headers = request_headers(&[("content-type", "multipart/form-data; boundary=xyz")]);
        assert!(is_multipart(&headers));
        let headers = request_headers(&[("content-type", "application/octet-stream")]);
        assert!(!is_multipart(&headers));
        assert!(!is_multipart(&HeaderMap::new()));
    }
}
