//! One bulk "download folder as ZIP" attempt.

use crate::download::{download_to_path, DownloadRequest};
use crate::error::MirrorError;
use crate::remote::{RejectionKind, RemoteError, RemoteStore};
use std::path::Path;
use tracing::debug;

/// Result of a single archive download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// The archive was written to the destination.
    Success { bytes: u64 },
    /// The connection failed; the same request may succeed if repeated.
    TransientFailure(String),
    /// The provider will not archive the folder in one piece.
    StructuralRejection(RejectionKind),
}

/// Tries once to download `folder` as an archive into `destination`.
///
/// Nothing is left at `destination` unless the outcome is `Success`. Only
/// local I/O failures are returned as errors.
pub async fn attempt(
    store: &dyn RemoteStore,
    folder: &str,
    destination: &Path,
) -> Result<ArchiveOutcome, MirrorError> {
    debug!("Requesting archive of '{}' into {:?}", folder, destination);
    match download_to_path(store, DownloadRequest::Archive(folder), destination).await {
        Ok(bytes) => Ok(ArchiveOutcome::Success { bytes }),
        Err(e) => classify(e),
    }
}

fn classify(error: RemoteError) -> Result<ArchiveOutcome, MirrorError> {
    match error {
        RemoteError::ArchiveRejected(kind) => Ok(ArchiveOutcome::StructuralRejection(kind)),
        RemoteError::Io(e) => Err(MirrorError::IoError(e)),
        e if e.is_transient() => Ok(ArchiveOutcome::TransientFailure(e.to_string())),
        // Anything else may still be fixed by descending a level.
        e => Ok(ArchiveOutcome::StructuralRejection(RejectionKind::Other(
            e.to_string(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{ByteSink, ListPage};
    use async_trait::async_trait;
    use tokio::io::AsyncWriteExt;

    /// Writes some bytes, then fails (or not) with the configured error.
    struct OneShotStore {
        fail_with: fn() -> Option<RemoteError>,
    }

    #[async_trait]
    impl RemoteStore for OneShotStore {
        async fn list_folder(&self, _folder: &str) -> Result<ListPage, RemoteError> {
            Ok(ListPage::default())
        }

        async fn list_folder_continue(&self, _cursor: &str) -> Result<ListPage, RemoteError> {
            Ok(ListPage::default())
        }

        async fn download_archive(
            &self,
            _folder: &str,
            sink: &mut ByteSink<'_>,
        ) -> Result<u64, RemoteError> {
            sink.write_all(b"PK\x03\x04partial").await?;
            match (self.fail_with)() {
                Some(e) => Err(e),
                None => Ok(11),
            }
        }

        async fn download_file(
            &self,
            _path: &str,
            _sink: &mut ByteSink<'_>,
        ) -> Result<u64, RemoteError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn success_writes_destination_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("media").join("a.dp.zip");
        let store = OneShotStore { fail_with: || None };

        let outcome = attempt(&store, "/media/a", &destination).await.unwrap();

        assert_eq!(outcome, ArchiveOutcome::Success { bytes: 11 });
        assert_eq!(std::fs::read(&destination).unwrap(), b"PK\x03\x04partial");
    }

    #[tokio::test]
    async fn interruption_is_transient_and_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("a.dp.zip");
        let store = OneShotStore {
            fail_with: || Some(RemoteError::Interrupted("connection reset".into())),
        };

        let outcome = attempt(&store, "/a", &destination).await.unwrap();

        assert!(matches!(outcome, ArchiveOutcome::TransientFailure(_)));
        assert!(!destination.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn rejection_kinds_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("a.dp.zip");
        let store = OneShotStore {
            fail_with: || Some(RemoteError::ArchiveRejected(RejectionKind::TooManyFiles)),
        };

        let outcome = attempt(&store, "/a", &destination).await.unwrap();

        assert_eq!(
            outcome,
            ArchiveOutcome::StructuralRejection(RejectionKind::TooManyFiles)
        );
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn unexpected_api_errors_become_other_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("a.dp.zip");
        let store = OneShotStore {
            fail_with: || {
                Some(RemoteError::Api {
                    status: 400,
                    summary: "bad request".into(),
                })
            },
        };

        let outcome = attempt(&store, "/a", &destination).await.unwrap();

        assert!(matches!(
            outcome,
            ArchiveOutcome::StructuralRejection(RejectionKind::Other(_))
        ));
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("a.dp.zip");
        let store = OneShotStore {
            fail_with: || {
                Some(RemoteError::Api {
                    status: 503,
                    summary: "unavailable".into(),
                })
            },
        };

        let outcome = attempt(&store, "/a", &destination).await.unwrap();

        assert!(matches!(outcome, ArchiveOutcome::TransientFailure(_)));
    }
}
