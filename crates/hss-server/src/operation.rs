use axum::http::Method;
use serde::Deserialize;

use crate::error::{ServerError, ServerResult};

/// Query parameters selecting what a request operates on.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EntryQuery {
    /// `file` or `directory`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// `list` on a directory GET.
    pub operation: Option<String>,
}

/// Every request the REST surface understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    CreateDirectory,
    ListDirectory,
    GetDirectory,
    HeadDirectory,
    DeleteDirectory,
    CreateFile,
    GetFile,
    HeadFile,
    DeleteFile,
}

impl Operation {
    /// Pick the operation for a method and query.
    pub fn classify(method: &Method, query: &EntryQuery) -> ServerResult<Self> {
        let kind = query.kind.as_deref().ok_or_else(|| {
            ServerError::UnsupportedOperation("missing `type` query parameter".into())
        })?;
        let list = match query.operation.as_deref() {
            None => false,
            Some("list") => true,
            Some(other) => {
                return Err(ServerError::UnsupportedOperation(format!(
                    "unknown operation `{other}`"
                )))
            }
        };

        let operation = match kind {
            "directory" if *method == Method::POST => Self::CreateDirectory,
            "directory" if *method == Method::GET && list => Self::ListDirectory,
            "directory" if *method == Method::GET => Self::GetDirectory,
            "directory" if *method == Method::HEAD => Self::HeadDirectory,
            "directory" if *method == Method::DELETE => Self::DeleteDirectory,
            "file" if list => {
                return Err(ServerError::UnsupportedOperation(
                    "`operation=list` applies to directories".into(),
                ))
            }
            "file" if *method == Method::POST => Self::CreateFile,
            "file" if *method == Method::GET => Self::GetFile,
            "file" if *method == Method::HEAD => Self::HeadFile,
            "file" if *method == Method::DELETE => Self::DeleteFile,
            "file" | "directory" => {
                return Err(ServerError::UnsupportedOperation(format!(
                    "{method} on a {kind}"
                )))
            }
            other => {
                return Err(ServerError::UnsupportedOperation(format!(
                    "unknown type `{other}`"
                )))
            }
        };
        Ok(operation)
    }

    /// Name used in request logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::CreateDirectory => "CreateDirectory",
            Self::ListDirectory => "ListDirectory",
            Self::GetDirectory => "GetDirectory",
            Self::HeadDirectory => "HeadDirectory",
            Self::DeleteDirectory => "DeleteDirectory",
            Self::CreateFile => "CreateFile",
            Self::GetFile => "GetFile",
            Self::HeadFile => "HeadFile",
            Self::DeleteFile => "DeleteFile",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
