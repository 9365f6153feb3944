//! Configuration for mirror runs.

use crate::paths::Platform;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of archive attempts per folder before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default pause between archive attempts after a dropped connection.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Configuration for mirroring a remote tree.
///
/// # Example
///
/// ```
/// use dropzip::MirrorConfig;
///
/// let config = MirrorConfig {
///     source_root: "/Photos".to_string(),
///     target_root: "backup".into(),
///     skip_existing: true,
///     ..MirrorConfig::default()
/// };
/// assert_eq!(config.max_attempts, 5);
/// ```
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Remote folder to start from; empty means the top of the namespace.
    pub source_root: String,
    /// Local directory that receives the mirror.
    pub target_root: PathBuf,
    /// Skip folders whose archive already exists and is non-empty (default: false).
    ///
    /// Files inside split folders are always fetched again.
    pub skip_existing: bool,
    /// Extract downloaded archives once the traversal completes (default: false).
    pub unzip: bool,
    /// Path rules local names are sanitized for.
    pub platform: Platform,
    /// Archive attempts per folder before a dropped connection is fatal (default: 5).
    pub max_attempts: u32,
    /// Fixed sleep between archive attempts (default: 2s).
    pub retry_backoff: Duration,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            source_root: String::new(),
            target_root: PathBuf::from("."),
            skip_existing: false,
            unzip: false,
            platform: Platform::current(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}
