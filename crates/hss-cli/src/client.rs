//! Thin HTTP client for a running HSS server.

use anyhow::{bail, Context};
use bytes::Bytes;
use hss_server::headers::{insert_metadata, metadata_from_headers, CONTENT_MD5};
use hss_store::{DirectoryRecord, FileRecord, ListEntry, Metadata};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// What a file `HEAD` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHead {
    pub size: u64,
    pub md5: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    File,
    Directory,
    Listing,
}

pub struct HssClient {
    http: Client,
    base: Url,
}

impl HssClient {
    pub fn new(server: &str) -> anyhow::Result<Self> {
        let base = Url::parse(server).with_context(|| format!("invalid server URL `{server}`"))?;
        if base.cannot_be_a_base() {
            bail!("server URL `{server}` cannot carry a path");
        }
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    fn url(&self, path: &str, target: Target) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        {
            let mut query = url.query_pairs_mut();
            match target {
                Target::File => query.append_pair("type", "file"),
                Target::Directory => query.append_pair("type", "directory"),
                Target::Listing => query
                    .append_pair("type", "directory")
                    .append_pair("operation", "list"),
            };
        }
        url
    }

    fn request(&self, method: Method, path: &str, target: Target) -> RequestBuilder {
        let url = self.url(path, target);
        debug!(%method, %url, "request");
        self.http.request(method, url)
    }

    pub async fn list(&self, path: &str) -> anyhow::Result<Vec<ListEntry>> {
        let response = self.request(Method::GET, path, Target::Listing).send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn create_directory(
        &self,
        path: &str,
        metadata: &Metadata,
    ) -> anyhow::Result<DirectoryRecord> {
        let response = self
            .request(Method::POST, path, Target::Directory)
            .headers(metadata_headers(metadata))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn directory_info(&self, path: &str) -> anyhow::Result<DirectoryRecord> {
        let response = self.request(Method::GET, path, Target::Directory).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// `HEAD` the directory; `false` when the server answers 404.
    pub async fn directory_exists(&self, path: &str) -> anyhow::Result<bool> {
        let response = self.request(Method::HEAD, path, Target::Directory).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response).await?;
        Ok(true)
    }

    pub async fn delete_directory(&self, path: &str) -> anyhow::Result<()> {
        let response = self.request(Method::DELETE, path, Target::Directory).send().await?;
        check(response).await?;
        Ok(())
    }

    /// Upload `data` as a new file.
    ///
    /// With `part_size` the body is sent as `multipart/form-data`, one field
    /// per chunk; the server appends fields in order.
    pub async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        metadata: &Metadata,
        part_size: Option<usize>,
    ) -> anyhow::Result<FileRecord> {
        let request = self
            .request(Method::POST, path, Target::File)
            .headers(metadata_headers(metadata));
        let request = match part_size {
            Some(size) => request.multipart(multipart_form(&data, size)),
            None => request.body(data),
        };
        let response = request.send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// Download a file; returns its bytes and the advertised `Content-MD5`.
    pub async fn download(&self, path: &str) -> anyhow::Result<(Bytes, Option<String>)> {
        let response = self.request(Method::GET, path, Target::File).send().await?;
        let response = check(response).await?;
        let md5 = header_text(response.headers(), CONTENT_MD5);
        Ok((response.bytes().await?, md5))
    }

    pub async fn head_file(&self, path: &str) -> anyhow::Result<FileHead> {
        let response = self.request(Method::HEAD, path, Target::File).send().await?;
        let response = check(response).await?;
        let headers = response.headers();
        let size = header_text(headers, CONTENT_LENGTH.as_str())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let metadata = metadata_from_headers(headers)?;
        Ok(FileHead {
            size,
            md5: header_text(headers, CONTENT_MD5),
            metadata,
        })
    }

    pub async fn delete_file(&self, path: &str) -> anyhow::Result<()> {
        let response = self.request(Method::DELETE, path, Target::File).send().await?;
        check(response).await?;
        Ok(())
    }
}

/// Turn an error status into an error carrying the server's message.
async fn check(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
    };
    bail!("{status}: {message}")
}

fn metadata_headers(metadata: &Metadata) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert_metadata(&mut headers, metadata);
    headers
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn multipart_form(data: &[u8], part_size: usize) -> Form {
    let mut form = Form::new();
    for (index, chunk) in data.chunks(part_size.max(1)).enumerate() {
        form = form.part(format!("part{}", index + 1), Part::bytes(chunk.to_vec()));
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HssClient {
        HssClient::new("http://localhost:9000").unwrap()
    }

    #[test]
    fn rejects_bad_server_url() {
        assert!(HssClient::new("not a url").is_err());
        assert!(HssClient::new("mailto:ops@example.com").is_err());
    }

    #[test]
    fn file_url() {
        let url = client().url("docs/a.txt", Target::File);
        assert_eq!(url.as_str(), "http://localhost:9000/docs/a.txt?type=file");
    }

    #[test]
    fn root_listing_url() {
        let url = client().url("/", Target::Listing);
        assert_eq!(url.as_str(), "http://localhost:9000/?type=directory&operation=list");
    }

    #[test]
    fn url_segments_are_escaped() {
        let url = client().url("/my docs//q?x", Target::Directory);
        assert_eq!(url.as_str(), "http://localhost:9000/my%20docs/q%3Fx?type=directory");
    }

    #[test]
    fn url_keeps_base_prefix() {
        let client = HssClient::new("http://example.com/store/").unwrap();
        let url = client.url("a", Target::File);
        assert_eq!(url.as_str(), "http://example.com/store/a?type=file");
    }

    #[test]
    fn metadata_headers_layout() {
        let mut metadata = Metadata::new();
        metadata.insert("owner".into(), "alice".into());
        let headers = metadata_headers(&metadata);
        assert_eq!(headers["metadata-fields"], "owner");
        assert_eq!(headers["owner"], "alice");
    }
}
