//! Dropbox HTTP API v2 implementation of [`RemoteStore`].

use crate::remote::{
    ByteSink, EntryKind, ListPage, ListedEntry, RejectionKind, RemoteError, RemoteStore,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_API_URL: &str = "https://api.dropboxapi.com";
const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com";

/// Client for the subset of the Dropbox API the mirror uses.
#[derive(Clone)]
pub struct DropboxClient {
    http: Client,
    api_base: Url,
    content_base: Url,
    token: String,
}

/// The account an access token belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub name: AccountName,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountName {
    pub display_name: String,
}

#[derive(Serialize)]
struct PathArg<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct CursorArg<'a> {
    cursor: &'a str,
}

#[derive(Deserialize)]
struct ListFolderResponse {
    entries: Vec<RawEntry>,
    cursor: String,
    has_more: bool,
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(rename = ".tag")]
    tag: String,
    #[serde(default)]
    name: String,
}

/// Error body of a 409; the summary starts with the error tag.
#[derive(Deserialize)]
struct ApiErrorBody {
    error_summary: String,
}

impl DropboxClient {
    pub fn new(token: impl Into<String>) -> Result<Self, RemoteError> {
        Self::with_base_urls(DEFAULT_API_URL, DEFAULT_CONTENT_URL, token)
    }

    pub fn with_base_urls(
        api_base: &str,
        content_base: &str,
        token: impl Into<String>,
    ) -> Result<Self, RemoteError> {
        Ok(Self {
            http: Client::new(),
            api_base: Url::parse(api_base)?,
            content_base: Url::parse(content_base)?,
            token: token.into(),
        })
    }

    /// Looks up the account behind the token; fails fast on a bad credential.
    pub async fn current_account(&self) -> Result<Account, RemoteError> {
        let response = self
            .rpc("/2/users/get_current_account")?
            .json(&serde_json::Value::Null)
            .send()
            .await
            .map_err(transport_error)?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    fn rpc(&self, endpoint: &str) -> Result<RequestBuilder, RemoteError> {
        let url = join(&self.api_base, endpoint)?;
        Ok(self.http.post(url).bearer_auth(&self.token))
    }

    fn content(&self, endpoint: &str, path: &str) -> Result<RequestBuilder, RemoteError> {
        let url = join(&self.content_base, endpoint)?;
        Ok(self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", api_arg_header(path)?))
    }

    async fn list_request(
        &self,
        endpoint: &str,
        body: &impl Serialize,
    ) -> Result<ListPage, RemoteError> {
        let response = self
            .rpc(endpoint)?
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        let payload: ListFolderResponse = Self::check_status(response).await?.json().await?;
        Ok(ListPage {
            entries: payload.entries.into_iter().map(classify_entry).collect(),
            cursor: payload.cursor,
            has_more: payload.has_more,
        })
    }

    async fn stream_to(
        &self,
        request: RequestBuilder,
        label: &str,
        sink: &mut ByteSink<'_>,
    ) -> Result<u64, RemoteError> {
        let response = request.send().await.map_err(transport_error)?;
        let response = Self::check_status(response).await?;
        let content_length = response.content_length();

        let mut written = 0u64;
        let mut byte_stream = response.bytes_stream();
        while let Some(piece) = byte_stream.next().await {
            let chunk = piece.map_err(|e| RemoteError::Interrupted(e.to_string()))?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        match content_length {
            Some(expected) if expected != written => {
                return Err(RemoteError::Interrupted(format!(
                    "expected {} bytes for '{}', got {}",
                    expected, label, written
                )));
            }
            Some(_) => {}
            None => debug!("No Content-Length for '{}', cannot verify size", label),
        }
        Ok(written)
    }

    async fn check_status(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let summary = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|parsed| parsed.error_summary)
            .unwrap_or(body);
        Err(RemoteError::Api {
            status: status.as_u16(),
            summary,
        })
    }
}

#[async_trait]
impl RemoteStore for DropboxClient {
    async fn list_folder(&self, folder: &str) -> Result<ListPage, RemoteError> {
        self.list_request("/2/files/list_folder", &PathArg { path: folder })
            .await
    }

    async fn list_folder_continue(&self, cursor: &str) -> Result<ListPage, RemoteError> {
        self.list_request("/2/files/list_folder/continue", &CursorArg { cursor })
            .await
    }

    async fn download_archive(
        &self,
        folder: &str,
        sink: &mut ByteSink<'_>,
    ) -> Result<u64, RemoteError> {
        let request = self.content("/2/files/download_zip", folder)?;
        self.stream_to(request, folder, sink)
            .await
            .map_err(archive_rejection)
    }

    async fn download_file(&self, path: &str, sink: &mut ByteSink<'_>) -> Result<u64, RemoteError> {
        let request = self.content("/2/files/download", path)?;
        self.stream_to(request, path, sink).await
    }
}

fn join(base: &Url, endpoint: &str) -> Result<Url, RemoteError> {
    Ok(base.join(endpoint)?)
}

fn classify_entry(raw: RawEntry) -> ListedEntry {
    let kind = match raw.tag.as_str() {
        "file" => EntryKind::File,
        "folder" => EntryKind::Folder,
        _ => EntryKind::Unknown(raw.tag),
    };
    ListedEntry {
        name: raw.name,
        kind,
    }
}

/// Turns a 409 from `download_zip` into a structural rejection.
fn archive_rejection(error: RemoteError) -> RemoteError {
    match error {
        RemoteError::Api {
            status: 409,
            summary,
        } => {
            let kind = if summary.starts_with("too_many_files") {
                RejectionKind::TooManyFiles
            } else if summary.starts_with("too_large") {
                RejectionKind::TooLarge
            } else {
                warn!("Unrecognised archive rejection: {}", summary);
                RejectionKind::Other(summary)
            };
            RemoteError::ArchiveRejected(kind)
        }
        other => other,
    }
}

fn transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_connect() || error.is_timeout() || error.is_request() || error.is_body() {
        RemoteError::Interrupted(error.to_string())
    } else {
        RemoteError::Request(error)
    }
}

/// JSON for the `Dropbox-API-Arg` header. HTTP headers must be ASCII, so
/// everything else is written as `\uXXXX` escapes.
fn api_arg_header(path: &str) -> Result<String, RemoteError> {
    let json = serde_json::to_string(&PathArg { path })?;
    let mut header = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() && c != '\u{7f}' {
            header.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                header.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    Ok(header)
}
