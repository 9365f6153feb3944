//! Recursive archive-or-split traversal of the remote tree.
//!
//! Every folder below the source root goes through the same state machine:
//!
//! ```text
//! Init ──skip gate──▶ Skipped
//!   │
//!   ▼
//! Attempting ──Success──▶ Done
//!   │    ▲
//!   │    └── Retrying (transient, budget left) ──budget spent──▶ Failed
//!   │
//!   └──StructuralRejection──▶ Splitting ──children processed──▶ Done
//! ```
//!
//! The traversal is depth-first and strictly sequential. `Failed` is the only
//! state that aborts the run.

use crate::archive::{self, ArchiveOutcome};
use crate::download::{download_to_path, DownloadRequest};
use crate::error::MirrorError;
use crate::listing;
use crate::paths::{
    join_remote, normalize_remote_root, PathError, PathRegistry, PathResolver, ARCHIVE_SUFFIX,
};
use crate::progress::Reporter;
use crate::remote::{EntryKind, RejectionKind, RemoteError, RemoteStore};
use crate::retry::{AttemptCounter, RetryDecision};
use crate::skip::SkipGate;
use crate::types::MirrorConfig;
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::TryStreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// An entry that could not be mirrored without aborting the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    pub path: String,
    pub reason: String,
}

/// Tally of what a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub archives_downloaded: u64,
    pub folders_skipped: u64,
    pub folders_split: u64,
    pub files_downloaded: u64,
    /// Backoff sleeps taken after dropped connections.
    pub transient_retries: u64,
    pub unknown_entries: u64,
    pub failures: Vec<EntryFailure>,
}

impl MirrorReport {
    fn record_failure(&mut self, path: &str, reason: impl Into<String>) {
        self.failures.push(EntryFailure {
            path: path.to_string(),
            reason: reason.into(),
        });
    }
}

/// How a single folder visit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderOutcome {
    /// The archive was already on disk; nothing below was visited.
    Skipped,
    /// The folder arrived as one archive.
    Archived,
    /// The folder was split and its children handled one by one.
    Split,
    /// No valid local path exists for the folder; recorded and skipped.
    Unmappable,
}

enum FolderState {
    Init,
    Attempting,
    Retrying(String),
    Splitting(RejectionKind),
    Done(FolderOutcome),
}

/// Mirrors a remote tree into a local directory.
pub struct Mirror {
    store: Arc<dyn RemoteStore>,
    source_root: String,
    resolver: PathResolver,
    registry: PathRegistry,
    skip_gate: SkipGate,
    max_attempts: u32,
    retry_backoff: Duration,
    reporter: Reporter,
    report: MirrorReport,
}

impl Mirror {
    pub fn new(config: &MirrorConfig, store: Arc<dyn RemoteStore>, reporter: Reporter) -> Self {
        Self {
            store,
            source_root: normalize_remote_root(&config.source_root),
            resolver: PathResolver::new(&config.target_root, config.platform),
            registry: PathRegistry::new(config.platform),
            skip_gate: SkipGate::new(config.skip_existing),
            max_attempts: config.max_attempts,
            retry_backoff: config.retry_backoff,
            reporter,
            report: MirrorReport::default(),
        }
    }

    /// Mirrors everything below the source root.
    ///
    /// The root itself is never archived: its children are listed and each
    /// child folder runs through the archive-or-split state machine.
    pub async fn run(mut self) -> Result<MirrorReport, MirrorError> {
        let root = self.source_root.clone();
        if let Err(e) = self.split(&root).await {
            self.reporter.abandon(format!("❌ {}", e));
            return Err(e);
        }
        self.reporter.finish(format!(
            "✅ {} archives, {} files, {} skipped",
            self.report.archives_downloaded, self.report.files_downloaded, self.report.folders_skipped
        ));
        Ok(self.report)
    }

    /// Runs the state machine for one folder and everything it splits into.
    pub fn mirror_folder<'a>(
        &'a mut self,
        folder: &'a str,
    ) -> BoxFuture<'a, Result<FolderOutcome, MirrorError>> {
        async move {
            let destination = match self.destination(folder, ARCHIVE_SUFFIX) {
                Ok(destination) => destination,
                Err(reason) => {
                    error!("Cannot store folder '{}': {}", folder, reason);
                    self.report.record_failure(folder, reason.to_string());
                    return Ok(FolderOutcome::Unmappable);
                }
            };

            let mut attempts = AttemptCounter::new(self.max_attempts, self.retry_backoff);
            let mut state = FolderState::Init;
            loop {
                state = match state {
                    FolderState::Init => {
                        if self.skip_gate.should_skip(&destination).await {
                            info!("Skipping '{}', {:?} already exists", folder, destination);
                            self.report.folders_skipped += 1;
                            FolderState::Done(FolderOutcome::Skipped)
                        } else {
                            FolderState::Attempting
                        }
                    }
                    FolderState::Attempting => {
                        info!("Downloading folder '{}'...", folder);
                        self.reporter.folder(folder, &self.report);
                        match archive::attempt(self.store.as_ref(), folder, &destination).await? {
                            ArchiveOutcome::Success { bytes } => {
                                debug!("Download of '{}' was successful ({} bytes)", folder, bytes);
                                self.report.archives_downloaded += 1;
                                FolderState::Done(FolderOutcome::Archived)
                            }
                            ArchiveOutcome::TransientFailure(reason) => FolderState::Retrying(reason),
                            ArchiveOutcome::StructuralRejection(kind) => FolderState::Splitting(kind),
                        }
                    }
                    FolderState::Retrying(reason) => match attempts.record_failure() {
                        RetryDecision::RetryAfter(delay) => {
                            warn!(
                                "Download of '{}' interrupted ({}), retrying in {:?} (attempt {}/{})",
                                folder,
                                reason,
                                delay,
                                attempts.failures() + 1,
                                self.max_attempts
                            );
                            self.report.transient_retries += 1;
                            tokio::time::sleep(delay).await;
                            FolderState::Attempting
                        }
                        RetryDecision::GiveUp => {
                            error!(
                                "Download of '{}' interrupted {} times, giving up",
                                folder,
                                attempts.failures()
                            );
                            return Err(MirrorError::RetriesExhausted {
                                folder: folder.to_string(),
                                attempts: attempts.failures(),
                                reason,
                            });
                        }
                    },
                    FolderState::Splitting(kind) => {
                        warn!("Download of '{}' failed ({}), trying to split...", folder, kind);
                        // Children land below the folder's own directory.
                        if let Err(reason) = self.destination(folder, "") {
                            error!("Cannot split folder '{}': {}", folder, reason);
                            self.report.record_failure(folder, reason.to_string());
                            return Ok(FolderOutcome::Unmappable);
                        }
                        self.report.folders_split += 1;
                        self.split(folder).await?;
                        FolderState::Done(FolderOutcome::Split)
                    }
                    FolderState::Done(outcome) => return Ok(outcome),
                };
            }
        }
        .boxed()
    }

    /// Handles the immediate children of `folder` in listing order.
    async fn split(&mut self, folder: &str) -> Result<(), MirrorError> {
        info!("Downloading contents below '{}'...", display_remote(folder));
        let store = Arc::clone(&self.store);
        let entries = listing::list(store.as_ref(), folder);
        futures_util::pin_mut!(entries);

        while let Some(entry) =
            entries
                .try_next()
                .await
                .map_err(|source| MirrorError::ListingFailed {
                    folder: display_remote(folder).to_string(),
                    source,
                })?
        {
            let child = join_remote(folder, &entry.name);
            match entry.kind {
                EntryKind::File => self.download_file(&child).await?,
                EntryKind::Folder => {
                    self.mirror_folder(&child).await?;
                }
                EntryKind::Unknown(tag) => {
                    warn!("Unrecognised item type '{}' at '{}', unable to download", tag, child);
                    self.report.unknown_entries += 1;
                }
            }
        }
        Ok(())
    }

    /// Fetches one file. Files are never skipped, retried or split; a remote
    /// failure is recorded and the traversal moves on.
    async fn download_file(&mut self, path: &str) -> Result<(), MirrorError> {
        let destination = match self.destination(path, "") {
            Ok(destination) => destination,
            Err(reason) => {
                error!("Cannot store file '{}': {}", path, reason);
                self.report.record_failure(path, reason.to_string());
                return Ok(());
            }
        };

        debug!("Downloading file '{}'...", path);
        self.reporter.file(path, &self.report);
        match download_to_path(self.store.as_ref(), DownloadRequest::File(path), &destination).await
        {
            Ok(_) => {
                self.report.files_downloaded += 1;
                Ok(())
            }
            Err(RemoteError::Io(e)) => Err(MirrorError::IoError(e)),
            Err(e) => {
                error!("Download of file '{}' failed: {}", path, e);
                self.report.record_failure(path, e.to_string());
                Ok(())
            }
        }
    }

    /// Resolves and claims the local path for `remote`.
    fn destination(&mut self, remote: &str, suffix: &str) -> Result<PathBuf, PathError> {
        let local = self.resolver.resolve_remote(remote, suffix)?;
        self.registry.claim(&local, remote)?;
        Ok(local)
    }
}

fn display_remote(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
