//! Skipping folders whose archive is already on disk.

use std::path::Path;
use tracing::debug;

/// Decides whether a folder archive has already been downloaded.
#[derive(Debug, Clone, Copy)]
pub struct SkipGate {
    enabled: bool,
}

impl SkipGate {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// True only when the gate is enabled and a non-empty file exists at
    /// `destination`. Any failure to inspect it means "download again".
    pub async fn should_skip(&self, destination: &Path) -> bool {
        if !self.enabled {
            return false;
        }
        match tokio::fs::metadata(destination).await {
            Ok(metadata) => metadata.is_file() && metadata.len() > 0,
            Err(e) => {
                debug!("Not skipping {:?}: {}", destination, e);
                false
            }
        }
    }
}
