//! Log verbosity and subscriber setup.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// How much the run narrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Warnings and errors only: splits, unknown entries, failures.
    Warning,
    /// Every folder and archive.
    Info,
    /// Every file, listing page and byte count.
    Debug,
}

impl Verbosity {
    /// `--debug` wins over `--verbose`.
    pub fn from_flags(verbose: bool, debug: bool) -> Self {
        if debug {
            Verbosity::Debug
        } else if verbose {
            Verbosity::Info
        } else {
            Verbosity::Warning
        }
    }

    /// Filter directive for this crate at this verbosity.
    pub fn directive(self) -> &'static str {
        match self {
            Verbosity::Warning => "dropzip=warn",
            Verbosity::Info => "dropzip=info",
            Verbosity::Debug => "dropzip=debug",
        }
    }
}

/// Installs the global subscriber: message-only lines on stdout, plus a
/// plain-text copy appended to `log_file` when given. `RUST_LOG` overrides
/// `verbosity`.
pub fn init(verbosity: Verbosity, log_file: Option<&Path>) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    let console = fmt::layer()
        .with_writer(io::stdout)
        .without_time()
        .with_level(false)
        .with_target(false);

    let file = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(())
}
