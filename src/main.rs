//! Sumi-Scroll main entry point
//!
//! This is the command-line interface for the Sumi-Scroll docs-to-Markdown
//! crawler.

use anyhow::Context;
use clap::Parser;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use sumi_scroll::config::{load_config, Config, LoggingConfig};
use sumi_scroll::crawler::run_crawl;
use sumi_scroll::output::print_summary;
use sumi_scroll::{RecoveryManager, RecoveryState, Resume, ScrollError};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Sumi-Scroll: turn a documentation site into portable Markdown
///
/// Sumi-Scroll follows the navigation links of a single documentation site,
/// converts the main content of every page to Markdown, downloads its images,
/// and checkpoints its progress so an interrupted crawl can be resumed.
#[derive(Parser, Debug)]
#[command(name = "sumi-scroll")]
#[command(version)]
#[command(about = "Crawl a documentation site into Markdown", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume from a valid checkpoint without asking
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Discard any checkpoint and start a fresh crawl
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "recovery_info")]
    dry_run: bool,

    /// Show the checkpoint status and exit
    #[arg(long, conflicts_with = "dry_run")]
    recovery_info: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load and validate configuration
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    // Setup logging based on verbosity and the [logging] section
    setup_logging(cli.verbose, cli.quiet, &config.logging)?;
    tracing::info!("Configuration loaded from: {}", cli.config.display());

    // Handle different modes
    if cli.recovery_info {
        handle_recovery_info(&config);
    } else if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_crawl(config, cli.resume, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber
///
/// `-q` and `-v` flags win over `[logging] level`. With `[logging] file` set,
/// every event is also appended to that file without colors.
fn setup_logging(verbose: u8, quiet: bool, logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => {
                let level = logging.level.as_deref().unwrap_or("info");
                EnvFilter::try_new(format!("sumi_scroll={},warn", level))
                    .unwrap_or_else(|_| EnvFilter::new("sumi_scroll=info,warn"))
            }
            1 => EnvFilter::new("sumi_scroll=debug,info"),
            2 => EnvFilter::new("sumi_scroll=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let file_layer = match &logging.file {
        Some(path) => {
            let path = Path::new(path);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false),
        )
        .with(file_layer)
        .init();

    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Scroll Dry Run ===\n");

    println!("Target:");
    println!("  Start URL: {}", config.target.start_url);
    println!("  Allowed domain: {}", config.target.allowed_domain);

    println!("\nCrawl:");
    println!("  Navigation selector: {}", config.crawl.navigation_selector);
    println!("  Content selector: {}", config.extractor.content_selector);
    println!(
        "  Exclude patterns ({}):",
        config.crawl.exclude_patterns.len()
    );
    for pattern in &config.crawl.exclude_patterns {
        println!("    - {}", pattern);
    }

    println!("\nExecution:");
    println!("  Request delay: {}s", config.execution.request_delay);
    println!("  Request timeout: {}s", config.execution.request_timeout);
    println!("  User agent: {}", config.execution.user_agent);
    println!(
        "  Retries: {} (backoff {}s x{}, max {}s), skip after {} failures",
        config.retry.max_retries,
        config.retry.initial_delay,
        config.retry.backoff_factor,
        config.retry.max_delay,
        config.retry.skip_after_failures
    );

    println!("\nOutput:");
    println!("  Markdown: {}", config.output.base_dir);
    if config.output.download_images {
        println!(
            "  Images: {}",
            Path::new(&config.output.base_dir)
                .join(&config.output.image_dir_name)
                .display()
        );
    } else {
        println!("  Images: linked remotely");
    }

    let manager = RecoveryManager::new(config);
    println!("\nRecovery:");
    println!("  Checkpoint: {}", manager.path().display());
    println!("  Status: {}", manager.inspect().label());

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", config.target.start_url);
}

/// Handles the --recovery-info mode: shows the checkpoint verdict
fn handle_recovery_info(config: &Config) {
    let manager = RecoveryManager::new(config);
    let info = manager.resume_info();

    println!("=== Recovery Checkpoint ===\n");
    println!("Path: {}", info.path.display());
    println!("Status: {}", info.verdict.label());

    match &info.verdict {
        Resume::Valid(state) => print_checkpoint(state),
        Resume::ConfigMismatch { saved, current } => {
            println!("  Saved checksum:   {}", saved);
            println!("  Current checksum: {}", current);
        }
        Resume::Corrupt(reason) => println!("  Reason: {}", reason),
        Resume::NotFound | Resume::Disabled => {}
    }
}

fn print_checkpoint(state: &RecoveryState) {
    println!("  Saved at: {}", state.timestamp);
    println!("  Start URL: {}", state.start_url);
    println!("  Visited: {}", state.visited_urls.len());
    println!("  Processed: {}", state.processed_count);
    println!("  Succeeded: {}", state.success_count);
    println!("  Failed: {}", state.failed_count);
    println!("  Skipped: {}", state.skipped_count);
    println!("  Pending: {}", state.pending_urls.len());
    println!(
        "  Non-fatal errors: {} checkpoint, {} image",
        state.persistence_error_count, state.image_failure_count
    );
    println!("  URLs with failures: {}", state.failed_url_counts.len());
}

/// Decides whether to resume, asking the operator when configured to
fn choose_resume(
    manager: &RecoveryManager,
    config: &Config,
    resume: bool,
    fresh: bool,
) -> anyhow::Result<Option<RecoveryState>> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous checkpoint)");
        manager.cleanup()?;
        return Ok(None);
    }

    match manager.inspect() {
        Resume::Valid(state) => {
            if resume {
                return Ok(Some(state));
            }
            if !config.recovery.auto_resume {
                tracing::info!("Checkpoint found but auto-resume is off; starting clean (use --resume)");
                return Ok(None);
            }
            if prompt_resume(&state)? {
                Ok(Some(state))
            } else {
                manager.cleanup()?;
                tracing::info!("Checkpoint discarded");
                Ok(None)
            }
        }
        Resume::ConfigMismatch { .. } => {
            tracing::warn!("Checkpoint was written under a different configuration; starting clean");
            Ok(None)
        }
        Resume::Corrupt(reason) => {
            tracing::warn!("Checkpoint is unreadable ({}); starting clean", reason);
            Ok(None)
        }
        Resume::NotFound => {
            if resume {
                tracing::warn!("--resume given but no checkpoint exists; starting clean");
            }
            Ok(None)
        }
        Resume::Disabled => Ok(None),
    }
}

/// Asks "Resume? [Y/n]" on stdin; an empty answer means yes
fn prompt_resume(state: &RecoveryState) -> anyhow::Result<bool> {
    println!("Found a checkpoint from {}:", state.timestamp);
    print_checkpoint(state);
    print!("Resume? [Y/n] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;

    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "" | "y" | "yes"
    ))
}

/// Creates the output directories before crawling
fn prepare_output_dirs(config: &Config) -> anyhow::Result<()> {
    let base_dir = Path::new(&config.output.base_dir);
    fs::create_dir_all(base_dir)
        .with_context(|| format!("Failed to create output directory {}", base_dir.display()))?;

    if config.output.download_images {
        let image_dir = base_dir.join(&config.output.image_dir_name);
        fs::create_dir_all(&image_dir)
            .with_context(|| format!("Failed to create image directory {}", image_dir.display()))?;
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, resume: bool, fresh: bool) -> anyhow::Result<()> {
    let manager = RecoveryManager::new(&config);
    let snapshot = choose_resume(&manager, &config, resume, fresh)?;

    match &snapshot {
        Some(state) => tracing::info!(
            "Resuming crawl: {} pages already visited, {} pending",
            state.visited_urls.len(),
            state.pending_urls.len()
        ),
        None => tracing::info!("Starting crawl at {}", config.target.start_url),
    }

    prepare_output_dirs(&config)?;

    // First Ctrl-C stops at the next page boundary, a second one exits at once
    let cancel = Arc::new(AtomicBool::new(false));
    let signal_flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if signal_flag.swap(true, Ordering::SeqCst) {
                tracing::error!("Second interrupt received, exiting without a final checkpoint");
                std::process::exit(130);
            }
            tracing::warn!("Interrupt received, stopping after the current page (Ctrl-C again to exit now)");
        }
    });

    // Run the crawler
    match run_crawl(&config, snapshot, cancel).await {
        Ok(report) => {
            print_summary(&report);
            tracing::info!("Crawl completed successfully");
            Ok(())
        }
        Err(ScrollError::Interrupted { processed }) => {
            tracing::error!(
                "Crawl interrupted after {} pages; progress saved to {}",
                processed,
                manager.path().display()
            );
            Err(ScrollError::Interrupted { processed }.into())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
