//! The remote store seam: what the mirror needs from a cloud provider.

use async_trait::async_trait;
use std::fmt;
use std::io;
use thiserror::Error;
use tokio::io::AsyncWrite;

/// Kind of a folder listing entry, decided by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
    /// Anything else; carries the provider's own tag for reporting.
    Unknown(String),
}

/// One child of a listed folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl ListedEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Folder,
        }
    }
}

/// One page of a folder listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub entries: Vec<ListedEntry>,
    /// Continues this listing when `has_more` is set.
    pub cursor: String,
    pub has_more: bool,
}

/// Why the provider refused to build an archive for a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionKind {
    TooManyFiles,
    TooLarge,
    Other(String),
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionKind::TooManyFiles => f.write_str("Too many files"),
            RejectionKind::TooLarge => f.write_str("ZIP file is too large"),
            RejectionKind::Other(reason) => f.write_str(reason),
        }
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    /// The connection dropped before a definitive answer arrived.
    #[error("connection interrupted: {0}")]
    Interrupted(String),

    /// The provider will not archive this folder as one unit.
    #[error("archive rejected: {0}")]
    ArchiveRejected(RejectionKind),

    #[error("api returned {status}: {summary}")]
    Api { status: u16, summary: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid api response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Writing the downloaded bytes locally failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl RemoteError {
    /// Whether repeating the same request is expected to succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Interrupted(_) => true,
            RemoteError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Destination for streamed downloads.
pub type ByteSink<'a> = dyn AsyncWrite + Send + Unpin + 'a;

/// Capabilities of a hierarchical remote file store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// First page of the listing of `folder` (`""` is the namespace root).
    async fn list_folder(&self, folder: &str) -> Result<ListPage, RemoteError>;

    /// Next page of a listing started by [`RemoteStore::list_folder`].
    async fn list_folder_continue(&self, cursor: &str) -> Result<ListPage, RemoteError>;

    /// Streams `folder` as a single ZIP archive into `sink`, returning the
    /// number of bytes written.
    async fn download_archive(&self, folder: &str, sink: &mut ByteSink<'_>)
        -> Result<u64, RemoteError>;

    /// Streams the content of one file into `sink`.
    async fn download_file(&self, path: &str, sink: &mut ByteSink<'_>) -> Result<u64, RemoteError>;
}
