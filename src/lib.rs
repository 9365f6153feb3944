//! dropzip - mirror a Dropbox folder tree using bulk ZIP downloads
//!
//! Each folder below the source root is requested as a single ZIP archive.
//! When the provider refuses (too many files, too large, or any other
//! rejection), the folder is split: its files are downloaded one by one and
//! each sub-folder goes through the same process.
//!
//! # Features
//!
//! - **Archive-or-split**: Fewest possible requests for large trees
//! - **Bounded Retry**: Dropped connections are retried with a fixed backoff
//! - **Resumable Runs**: Folders whose archive is already on disk are skipped
//! - **Safe Local Names**: Remote names are sanitized for the local platform
//! - **Extraction**: Downloaded archives can be expanded in place
//!
//! # Example
//!
//! ```no_run
//! use dropzip::{DropboxClient, Mirror, MirrorConfig, Reporter};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MirrorConfig {
//!     source_root: "/Photos".to_string(),
//!     target_root: "backup".into(),
//!     skip_existing: true,
//!     ..MirrorConfig::default()
//! };
//! let store = Arc::new(DropboxClient::new("access-token")?);
//! let report = Mirror::new(&config, store, Reporter::hidden()).run().await?;
//! println!("{} archives downloaded", report.archives_downloaded);
//! # Ok(())
//! # }
//! ```

mod download;

pub mod archive;
pub mod dropbox;
pub mod error;
pub mod extract;
pub mod listing;
pub mod logging;
pub mod mirror;
pub mod paths;
pub mod progress;
pub mod remote;
pub mod retry;
pub mod skip;
pub mod types;

pub use archive::ArchiveOutcome;
pub use dropbox::DropboxClient;
pub use error::MirrorError;
pub use extract::{extract_all, ExtractReport};
pub use logging::Verbosity;
pub use mirror::{EntryFailure, FolderOutcome, Mirror, MirrorReport};
pub use paths::{PathError, PathResolver, Platform, ARCHIVE_SUFFIX};
pub use progress::Reporter;
pub use remote::{ByteSink, EntryKind, ListPage, ListedEntry, RejectionKind, RemoteError, RemoteStore};
pub use types::MirrorConfig;
