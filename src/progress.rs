//! Terminal progress reporting for a mirror run.

use crate::mirror::MirrorReport;
use std::time::Duration;

/// Progress sink handed to the mirror at construction.
///
/// Wraps an `indicatif` spinner; a hidden reporter draws nothing, which is
/// what tests and non-interactive runs use.
#[derive(Clone)]
pub struct Reporter {
    pb: indicatif::ProgressBar,
}

impl Reporter {
    /// A spinner on stderr, or a hidden one when stderr is not a terminal.
    pub fn spinner(enabled: bool) -> Self {
        if !enabled || !atty::is(atty::Stream::Stderr) {
            return Self::hidden();
        }
        let pb = indicatif::ProgressBar::new_spinner();
        if let Ok(style) = indicatif::ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} | {elapsed_precise} elapsed")
        {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn hidden() -> Self {
        Self {
            pb: indicatif::ProgressBar::hidden(),
        }
    }

    pub fn folder(&self, folder: &str, report: &MirrorReport) {
        self.pb.set_message(format!(
            "📦 {} archives, {} files, {} skipped | {}",
            report.archives_downloaded, report.files_downloaded, report.folders_skipped, folder
        ));
    }

    pub fn file(&self, path: &str, report: &MirrorReport) {
        self.pb.set_message(format!(
            "⬇️  {} archives, {} files, {} skipped | {}",
            report.archives_downloaded, report.files_downloaded, report.folders_skipped, path
        ));
    }

    pub fn extracting(&self, archive: &str) {
        self.pb.set_message(format!("📂 Extracting {}", archive));
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.pb.finish_with_message(message.into());
    }

    /// Stops the spinner, leaving `message` as the last line.
    pub fn abandon(&self, message: impl Into<String>) {
        self.pb.abandon_with_message(message.into());
    }

    pub fn is_finished(&self) -> bool {
        self.pb.is_finished()
    }
}
