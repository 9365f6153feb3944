use anyhow::Context;
use clap::Parser;
use dropzip::{extract_all, DropboxClient, Mirror, MirrorConfig, Platform, Reporter, Verbosity};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "dropzip")]
#[command(about = "Download a Dropbox folder tree as ZIP archives", long_about = None)]
#[command(version)]
struct Args {
    /// Log every folder and archive
    #[arg(short, long)]
    verbose: bool,

    /// Log every file and listing page
    #[arg(short, long)]
    debug: bool,

    /// Dropbox access token
    #[arg(short, long, env = "DROPBOX_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    /// Remote folder to start from (empty for the whole Dropbox)
    #[arg(short, long, default_value = "")]
    source: String,

    /// Local directory to store files and archives in
    #[arg(short, long)]
    target: PathBuf,

    /// Extract downloaded archives when the download completes
    #[arg(short, long)]
    unzip: bool,

    /// Skip folders whose archive already exists locally
    #[arg(long)]
    skip_existing: bool,

    /// Append log output to this file as well
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Archive attempts per folder before a dropped connection aborts the run
    #[arg(long, default_value_t = 5)]
    max_attempts: u32,

    /// Pause between archive attempts (e.g. "2s", "500ms")
    #[arg(long, default_value = "2s", value_parser = humantime::parse_duration)]
    retry_backoff: Duration,

    /// Do not draw a progress spinner
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let verbosity = Verbosity::from_flags(args.verbose, args.debug);
    if let Err(e) = dropzip::logging::init(verbosity, args.log_file.as_deref()) {
        eprintln!("❌ Error: cannot open log file: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args).await {
        error!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    info!("Downloading files/folders starting from '{}'", args.source);
    info!("Storing files/folders below {:?}", args.target);

    std::fs::create_dir_all(&args.target)
        .with_context(|| format!("cannot create target directory {:?}", args.target))?;

    let config = MirrorConfig {
        source_root: args.source,
        target_root: args.target,
        skip_existing: args.skip_existing,
        unzip: args.unzip,
        platform: Platform::current(),
        max_attempts: args.max_attempts.max(1),
        retry_backoff: args.retry_backoff,
    };

    info!("Connecting to Dropbox...");
    let client = DropboxClient::new(args.access_token)?;
    let account = client
        .current_account()
        .await
        .context("cannot validate access token")?;
    info!("Connected as {}", account.name.display_name);

    let reporter = Reporter::spinner(!args.no_progress);
    let report = Mirror::new(&config, Arc::new(client), reporter.clone())
        .run()
        .await?;

    println!(
        "✅ {} archives, {} files downloaded; {} folders split, {} skipped, {} retries",
        report.archives_downloaded,
        report.files_downloaded,
        report.folders_split,
        report.folders_skipped,
        report.transient_retries
    );
    if report.unknown_entries > 0 {
        warn!("{} entries of unknown type were not downloaded", report.unknown_entries);
    }
    for failure in &report.failures {
        warn!("Not downloaded: '{}': {}", failure.path, failure.reason);
    }

    if config.unzip {
        let extracted = extract_all(&config.target_root, &reporter)?;
        reporter.finish(format!(
            "📂 Extracted {} archives ({} files)",
            extracted.archives_extracted, extracted.files_extracted
        ));
        for invalid in &extracted.invalid_archives {
            warn!("File {:?} is not a valid ZIP file", invalid);
        }
    }

    Ok(())
}
