//! Expansion of downloaded folder archives.

use crate::error::MirrorError;
use crate::paths::ARCHIVE_SUFFIX;
use crate::progress::Reporter;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Outcome of an extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub archives_extracted: u64,
    pub files_extracted: u64,
    /// Archives that could not be read; they are left untouched.
    pub invalid_archives: Vec<PathBuf>,
}

/// Finds every downloaded folder archive below `target_root`, in path order.
pub fn find_archives(target_root: &Path) -> Result<Vec<PathBuf>, MirrorError> {
    if !target_root.is_dir() {
        return Err(MirrorError::UnzipFailed(format!(
            "{:?} is not a directory",
            target_root
        )));
    }

    let mut archives = Vec::new();
    for entry in WalkDir::new(target_root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot inspect entry below {:?}: {}", target_root, e);
                continue;
            }
        };
        let is_archive = entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(ARCHIVE_SUFFIX));
        if is_archive {
            archives.push(entry.into_path());
        }
    }
    debug!("Found {} archive(s) below {:?}", archives.len(), target_root);
    Ok(archives)
}

/// Extracts every archive below `target_root` next to itself.
///
/// Archives are never deleted. One that fails to open or extract is
/// reported as a warning and the pass continues with the next.
pub fn extract_all(target_root: &Path, reporter: &Reporter) -> Result<ExtractReport, MirrorError> {
    let mut report = ExtractReport::default();

    for archive in find_archives(target_root)? {
        let dest_dir = archive.parent().unwrap_or(target_root);
        reporter.extracting(&archive.display().to_string());
        match extract_zip(&archive, dest_dir) {
            Ok(file_count) => {
                info!("Extracted {} files from {:?}", file_count, archive);
                report.archives_extracted += 1;
                report.files_extracted += file_count;
            }
            Err(e) => {
                warn!("File {:?} is not a valid ZIP file: {}", archive, e);
                report.invalid_archives.push(archive);
            }
        }
    }

    Ok(report)
}

/// Extracts one ZIP archive into `dest_dir`, returning the number of files.
fn extract_zip(archive_path: &Path, dest_dir: &Path) -> zip::result::ZipResult<u64> {
    let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;
    let mut file_count = 0u64;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let out_path = match entry.enclosed_name() {
            Some(name) => dest_dir.join(name),
            None => {
                warn!(
                    "Skipping entry '{}' of {:?} with unsafe path",
                    entry.name(),
                    archive_path
                );
                continue;
            }
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out)?;
        file_count += 1;
    }

    Ok(file_count)
}
