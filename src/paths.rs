//! Mapping of remote paths onto the local target tree.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix given to folder archives downloaded from the provider. The unzip
/// pass only picks up files carrying it.
pub const ARCHIVE_SUFFIX: &str = ".dp.zip";

/// Longest file name component accepted by the common filesystems.
const MAX_SEGMENT_BYTES: usize = 255;

const WINDOWS_FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const WINDOWS_RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("remote path '{0}' does not name anything below the target root")]
    Empty(String),
    #[error("remote path '{0}' has a component that sanitizes to nothing")]
    EmptySegment(String),
    #[error("remote path '{0}' contains a parent directory component")]
    ParentComponent(String),
    #[error("'{remote}' and '{existing}' both map to local path {}", local.display())]
    Collision {
        local: PathBuf,
        remote: String,
        existing: String,
    },
}

/// Path rules to sanitize for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Posix,
    /// Names valid on every supported platform (the Windows rules).
    Universal,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    fn restrictive(self) -> bool {
        matches!(self, Platform::Windows | Platform::Universal)
    }
}

/// Normalizes a configured source root to `""` or `/a/b`.
pub fn normalize_remote_root(root: &str) -> String {
    let segments: Vec<&str> = root
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Appends a child name to a remote folder path.
pub fn join_remote(folder: &str, name: &str) -> String {
    format!("{}/{}", folder.trim_end_matches('/'), name)
}

/// Maps remote paths to local paths under a target root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    platform: Platform,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Resolves a `/`-delimited remote path. Leading and trailing slashes are
    /// ignored, the result always lives below the target root.
    pub fn resolve_remote(&self, remote: &str, suffix: &str) -> Result<PathBuf, PathError> {
        let segments: Vec<&str> = remote.split('/').collect();
        self.resolve_segments(remote, &segments, suffix)
    }

    /// Joins `segments` under the root and appends `suffix` to the last one.
    pub fn resolve(&self, segments: &[&str], suffix: &str) -> Result<PathBuf, PathError> {
        self.resolve_segments(&segments.join("/"), segments, suffix)
    }

    fn resolve_segments(
        &self,
        remote: &str,
        segments: &[&str],
        suffix: &str,
    ) -> Result<PathBuf, PathError> {
        let mut parts = Vec::with_capacity(segments.len());
        for segment in segments {
            match *segment {
                "" | "." => continue,
                ".." => return Err(PathError::ParentComponent(remote.to_string())),
                _ => parts.push(*segment),
            }
        }

        let Some((last, parents)) = parts.split_last() else {
            return Err(PathError::Empty(remote.to_string()));
        };

        let mut out = self.root.clone();
        for part in parents {
            out.push(self.sanitize_segment(remote, part, MAX_SEGMENT_BYTES)?);
        }
        let budget = MAX_SEGMENT_BYTES.saturating_sub(suffix.len());
        let mut name = self.sanitize_segment(remote, last, budget)?;
        name.push_str(suffix);
        out.push(name);
        Ok(out)
    }

    fn sanitize_segment(
        &self,
        remote: &str,
        segment: &str,
        budget: usize,
    ) -> Result<String, PathError> {
        let restrictive = self.platform.restrictive();
        let mut name: String = segment
            .chars()
            .map(|c| {
                if c == '\0' || c == '/' {
                    '_'
                } else if restrictive && (c.is_control() || WINDOWS_FORBIDDEN.contains(&c)) {
                    '_'
                } else {
                    c
                }
            })
            .collect();

        truncate_to_bytes(&mut name, budget);
        if restrictive {
            // Windows silently drops trailing dots and spaces.
            let trimmed = name.trim_end_matches(['.', ' ']).len();
            name.truncate(trimmed);
            let stem = name.split('.').next().unwrap_or_default();
            if WINDOWS_RESERVED
                .iter()
                .any(|reserved| stem.eq_ignore_ascii_case(reserved))
            {
                name.insert(0, '_');
                truncate_to_bytes(&mut name, budget);
            }
        }

        if name.is_empty() {
            return Err(PathError::EmptySegment(remote.to_string()));
        }
        Ok(name)
    }
}

fn truncate_to_bytes(name: &mut String, max: usize) {
    if name.len() <= max {
        return;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name.truncate(end);
}

/// Remembers which remote path claimed each local path during one run.
#[derive(Debug)]
pub struct PathRegistry {
    claims: HashMap<String, String>,
    case_insensitive: bool,
}

impl PathRegistry {
    pub fn new(platform: Platform) -> Self {
        Self {
            claims: HashMap::new(),
            case_insensitive: platform.restrictive(),
        }
    }

    /// Records that `remote` writes to `local`, failing if a different remote
    /// path already did.
    pub fn claim(&mut self, local: &Path, remote: &str) -> Result<(), PathError> {
        let mut key = local.to_string_lossy().into_owned();
        if self.case_insensitive {
            key = key.to_lowercase();
        }
        match self.claims.entry(key) {
            Entry::Occupied(existing) if existing.get() != remote => Err(PathError::Collision {
                local: local.to_path_buf(),
                remote: remote.to_string(),
                existing: existing.get().clone(),
            }),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(remote.to_string());
                Ok(())
            }
        }
    }
}
