//! Scripted in-memory remote store for driving the mirror in tests.

#![allow(dead_code)]

use async_trait::async_trait;
use dropzip::{ByteSink, ListPage, ListedEntry, RejectionKind, RemoteError, RemoteStore};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;

/// Network call seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(String),
    Continue(String),
    Archive(String),
    File(String),
}

impl Call {
    pub fn path(&self) -> &str {
        match self {
            Call::List(p) | Call::Continue(p) | Call::Archive(p) | Call::File(p) => p,
        }
    }
}

/// How the store answers one archive request.
#[derive(Debug, Clone)]
pub enum ArchiveReply {
    Succeed,
    Reject(RejectionKind),
    Interrupt,
}

#[derive(Default)]
pub struct FakeStore {
    folders: HashMap<String, Vec<ListedEntry>>,
    files: HashMap<String, Vec<u8>>,
    failing_files: Vec<String>,
    failing_listings: Vec<String>,
    archive_replies: Mutex<HashMap<String, VecDeque<ArchiveReply>>>,
    page_size: usize,
    archive_serial: AtomicU64,
    calls: Mutex<Vec<Call>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            page_size: 100,
            ..Self::default()
        }
    }

    /// Children of `path`, in listing order.
    pub fn folder(mut self, path: &str, entries: Vec<ListedEntry>) -> Self {
        self.folders.insert(path.to_string(), entries);
        self
    }

    pub fn file(mut self, path: &str, content: &[u8]) -> Self {
        self.files.insert(path.to_string(), content.to_vec());
        self
    }

    pub fn failing_file(mut self, path: &str) -> Self {
        self.failing_files.push(path.to_string());
        self
    }

    pub fn failing_listing(mut self, path: &str) -> Self {
        self.failing_listings.push(path.to_string());
        self
    }

    /// Replies to successive archive requests for `path`; the last reply
    /// repeats. Unscripted folders archive successfully.
    pub fn archive(self, path: &str, replies: Vec<ArchiveReply>) -> Self {
        self.archive_replies
            .lock()
            .unwrap()
            .insert(path.to_string(), replies.into());
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, path: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.path() == path)
            .collect()
    }

    pub fn archive_calls(&self, path: &str) -> usize {
        self.calls_for(path)
            .iter()
            .filter(|call| matches!(call, Call::Archive(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_reply(&self, path: &str) -> ArchiveReply {
        let mut replies = self.archive_replies.lock().unwrap();
        match replies.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(ArchiveReply::Succeed),
            None => ArchiveReply::Succeed,
        }
    }

    fn page(&self, folder: &str, offset: usize) -> ListPage {
        let entries = self.folders.get(folder).cloned().unwrap_or_default();
        let end = (offset + self.page_size).min(entries.len());
        ListPage {
            entries: entries[offset..end].to_vec(),
            cursor: format!("{}|{}", folder, end),
            has_more: end < entries.len(),
        }
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn list_folder(&self, folder: &str) -> Result<ListPage, RemoteError> {
        self.record(Call::List(folder.to_string()));
        if self.failing_listings.iter().any(|p| p == folder) {
            return Err(RemoteError::Api {
                status: 409,
                summary: "path/not_found/".to_string(),
            });
        }
        Ok(self.page(folder, 0))
    }

    async fn list_folder_continue(&self, cursor: &str) -> Result<ListPage, RemoteError> {
        let (folder, offset) = cursor.rsplit_once('|').expect("cursor issued by this store");
        self.record(Call::Continue(folder.to_string()));
        Ok(self.page(folder, offset.parse().expect("numeric offset")))
    }

    async fn download_archive(
        &self,
        folder: &str,
        sink: &mut ByteSink<'_>,
    ) -> Result<u64, RemoteError> {
        self.record(Call::Archive(folder.to_string()));
        match self.next_reply(folder) {
            ArchiveReply::Succeed => {
                let serial = self.archive_serial.fetch_add(1, Ordering::SeqCst);
                let content = format!("PK archive of {} #{}", folder, serial);
                sink.write_all(content.as_bytes()).await?;
                Ok(content.len() as u64)
            }
            ArchiveReply::Reject(kind) => Err(RemoteError::ArchiveRejected(kind)),
            ArchiveReply::Interrupt => {
                sink.write_all(b"PK truncated").await?;
                Err(RemoteError::Interrupted("connection reset by peer".to_string()))
            }
        }
    }

    async fn download_file(&self, path: &str, sink: &mut ByteSink<'_>) -> Result<u64, RemoteError> {
        self.record(Call::File(path.to_string()));
        if self.failing_files.iter().any(|p| p == path) {
            return Err(RemoteError::Api {
                status: 409,
                summary: "path/restricted_content/".to_string(),
            });
        }
        let content = self.files.get(path).cloned().unwrap_or_default();
        sink.write_all(&content).await?;
        Ok(content.len() as u64)
    }
}
