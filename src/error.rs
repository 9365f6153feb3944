//! Error types for mirror operations.

use crate::remote::RemoteError;
use std::io;
use thiserror::Error;

/// Errors that end a mirror run.
///
/// Structural rejections never show up here: they are absorbed by splitting.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// I/O error during local file operations.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// Enumerating a folder's children failed while splitting it.
    #[error("Failed to list folder '{folder}': {source}")]
    ListingFailed {
        folder: String,
        #[source]
        source: RemoteError,
    },

    /// The archive download kept getting interrupted.
    #[error("Download of '{folder}' interrupted {attempts} times, giving up: {reason}")]
    RetriesExhausted {
        folder: String,
        attempts: u32,
        reason: String,
    },

    /// Remote failure outside of the archive/split logic (e.g. account check).
    #[error(transparent)]
    RemoteError(#[from] RemoteError),

    /// Archive expansion could not walk the target tree.
    #[error("Unzip failed: {0}")]
    UnzipFailed(String),
}
