//! Streaming a remote download into a local file.

use crate::remote::{RemoteError, RemoteStore};
use std::path::Path;
use tempfile::TempPath;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// Prefix of in-progress downloads. Staging files are created exclusively
/// with a random name, so they never replace an entry already on disk.
const STAGING_PREFIX: &str = ".dropzip-";

/// What to fetch from the remote store.
#[derive(Debug, Clone, Copy)]
pub(crate) enum DownloadRequest<'a> {
    /// A whole folder as one ZIP archive.
    Archive(&'a str),
    /// A single file's content.
    File(&'a str),
}

/// Creates the parent directory of `destination` if needed.
pub(crate) async fn ensure_parent(destination: &Path) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Downloads into `destination`, returning the number of bytes written.
///
/// Bytes go to a staging file in the same directory and are moved into place
/// only once the store reports success, so a failed download never leaves a
/// file at `destination`. The staging file is removed when it is dropped.
/// Local write failures come back as [`RemoteError::Io`].
pub(crate) async fn download_to_path(
    store: &dyn RemoteStore,
    request: DownloadRequest<'_>,
    destination: &Path,
) -> Result<u64, RemoteError> {
    ensure_parent(destination).await?;
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".part")
        .tempfile_in(parent)?;
    let (file, staging_path) = staging.into_parts();

    let bytes = write_staged(store, request, tokio::fs::File::from_std(file)).await?;
    persist(staging_path, destination)?;
    debug!("Wrote {} bytes to {:?}", bytes, destination);
    Ok(bytes)
}

async fn write_staged(
    store: &dyn RemoteStore,
    request: DownloadRequest<'_>,
    file: tokio::fs::File,
) -> Result<u64, RemoteError> {
    let mut file = BufWriter::new(file);
    let bytes = match request {
        DownloadRequest::Archive(folder) => store.download_archive(folder, &mut file).await?,
        DownloadRequest::File(path) => store.download_file(path, &mut file).await?,
    };
    file.flush().await?;
    file.into_inner().sync_all().await?;
    Ok(bytes)
}

fn persist(staging: TempPath, destination: &Path) -> std::io::Result<()> {
    staging.persist(destination).map_err(std::io::Error::from)
}
