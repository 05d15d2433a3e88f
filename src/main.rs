//! Sumi-Lens main entry point
//!
//! This is the command-line interface for the Sumi-Lens site auditor.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sumi_lens::browser::{BrowserSession, SessionSettings};
use sumi_lens::config::{default_config_hash, load_config_with_hash, validate, Config};
use sumi_lens::crawler::{CrawlEvent, MultiPageAuditResult, Orchestrator};
use sumi_lens::output::{print_history, print_summary, ReportGenerator};
use sumi_lens::screenshot::{CaptureSettings, ChromiumBackend, Screenshot, ScreenshotCapture};
use sumi_lens::storage::{open_storage, AuditStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Lens: A site audit engine
///
/// Sumi-Lens crawls a website from a seed URL, scores every page it reaches
/// against technical, on-page, performance and content rules, and exports
/// the results as PDF or CSV reports.
#[derive(Parser, Debug)]
#[command(name = "sumi-lens")]
#[command(version)]
#[command(about = "A site audit engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit a site, or a single page with --single
    Audit(AuditArgs),

    /// Serve the audit API over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },

    /// List recorded audits
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Args, Debug)]
struct AuditArgs {
    /// Seed URL
    url: String,

    #[arg(long)]
    max_pages: Option<usize>,

    #[arg(long)]
    max_depth: Option<u32>,

    /// Audit only the given URL without following links
    #[arg(long)]
    single: bool,

    /// Render pages in headless Chromium instead of plain HTTP
    #[arg(long)]
    browser: bool,

    /// Path to a Chrome/Chromium executable
    #[arg(long, env = "SUMI_LENS_CHROME", value_name = "PATH")]
    chrome: Option<PathBuf>,

    /// Capture screenshots of audited pages into the JSON output
    #[arg(long)]
    screenshots: bool,

    /// Write a PDF report
    #[arg(long, value_name = "FILE")]
    pdf: Option<PathBuf>,

    /// Write a CSV report
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Write the full result as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => (Config::default(), default_config_hash()),
    };

    match cli.command {
        Command::Audit(args) => handle_audit(config, &config_hash, args, cli.quiet).await,
        Command::Serve { host, port } => handle_serve(config, host, port).await,
        Command::History { limit } => handle_history(&config, limit),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_lens=info,warn"),
            1 => EnvFilter::new("sumi_lens=debug,info"),
            2 => EnvFilter::new("sumi_lens=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancels the token on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight pages");
            token.cancel();
        }
    });
}

/// Handles `audit`: crawl or single-page audit, then exports
async fn handle_audit(
    mut config: Config,
    config_hash: &str,
    args: AuditArgs,
    quiet: bool,
) -> anyhow::Result<()> {
    if args.browser {
        config.browser.enabled = true;
    }
    if let Some(chrome) = &args.chrome {
        config.browser.executable = Some(chrome.display().to_string());
    }
    validate(&config)?;

    let token = CancellationToken::new();
    cancel_on_ctrl_c(token.clone());
    let orchestrator = Orchestrator::from_config(config.clone())?
        .with_bounds(args.max_pages, args.max_depth)
        .with_cancellation(token);

    if args.single {
        let page = orchestrator.audit_page(&args.url).await;
        orchestrator.shutdown().await;
        let page = page?;

        println!("{} [{}] {}/100", page.url, page.status, page.score);
        if let Some(error) = &page.error {
            println!("  Error: {}", error);
        }
        for check in &page.checks {
            println!(
                "  #{:<2} {:<26} {:<11} {:<8} {}",
                check.id,
                check.name,
                check.category.as_str(),
                check.status.to_string(),
                check.issue.as_deref().unwrap_or("")
            );
        }
        if let Some(path) = &args.json {
            write_file(path, serde_json::to_vec_pretty(&page)?)?;
        }
        return Ok(());
    }

    let (tx, mut rx) = mpsc::channel(16);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let CrawlEvent::Progress { progress } = event {
                if !quiet {
                    println!(
                        "[{}/{}] {:>5.1}% {}",
                        progress.current, progress.total, progress.percentage, progress.current_url
                    );
                }
            }
        }
    });

    let outcome = orchestrator.run_with_progress(&args.url, tx).await;
    let _ = printer.await;
    orchestrator.shutdown().await;

    let (result, fatal) = match outcome {
        Ok(result) => (result, None),
        Err(e) => ((*e.result).clone(), Some(e)),
    };

    println!();
    print_summary(&result);
    record_history(&config, config_hash, &result);

    let screenshots = if args.screenshots {
        capture_screenshots(&config, &result).await
    } else {
        Vec::new()
    };
    export(&args, &result, &screenshots)?;

    match fatal {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Captures the audited pages; failures become placeholders
async fn capture_screenshots(config: &Config, result: &MultiPageAuditResult) -> Vec<Screenshot> {
    let urls: Vec<String> = result
        .pages
        .iter()
        .filter(|p| p.is_success())
        .map(|p| p.url.clone())
        .collect();
    if urls.is_empty() {
        return Vec::new();
    }

    let session = Arc::new(BrowserSession::new(SessionSettings::from_config(config)));
    let backend = ChromiumBackend::new(session, CaptureSettings::from_config(config));
    ScreenshotCapture::new(backend, config.screenshots.max_captures)
        .capture_multiple(&urls)
        .await
}

fn export(
    args: &AuditArgs,
    result: &MultiPageAuditResult,
    screenshots: &[Screenshot],
) -> anyhow::Result<()> {
    let reports = ReportGenerator::new();

    if let Some(path) = &args.pdf {
        match reports.generate_pdf_bytes(result) {
            Ok(bytes) => write_file(path, bytes)?,
            Err(e) => tracing::error!("PDF report could not be written: {}", e),
        }
    }
    if let Some(path) = &args.csv {
        write_file(path, reports.generate_csv_text(result).into_bytes())?;
    }
    if let Some(path) = &args.json {
        let document = serde_json::json!({
            "result": result,
            "screenshots": screenshots,
        });
        write_file(path, serde_json::to_vec_pretty(&document)?)?;
    }
    Ok(())
}

fn write_file(path: &Path, bytes: Vec<u8>) -> anyhow::Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✓ Wrote {}", path.display());
    Ok(())
}

/// Stores the audit when a database is configured
fn record_history(config: &Config, config_hash: &str, result: &MultiPageAuditResult) {
    let Some(path) = &config.output.database_path else {
        return;
    };
    let saved = open_storage(Path::new(path))
        .map_err(anyhow::Error::from)
        .and_then(|mut store| Ok(store.save_result(result, config_hash)?));
    match saved {
        Ok(run_id) => tracing::info!(
            "Recorded audit {} as run {} in {}",
            result.audit_id,
            run_id,
            path
        ),
        Err(e) => tracing::warn!("Could not record audit history: {}", e),
    }
}

/// Handles `serve`
async fn handle_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let host = config.server.host.clone();
    let port = config.server.port;

    let token = CancellationToken::new();
    cancel_on_ctrl_c(token.clone());
    let orchestrator = Orchestrator::from_config(config)?.with_cancellation(token);
    sumi_lens::server::serve(orchestrator, &host, port).await
}

/// Handles `history`
fn handle_history(config: &Config, limit: usize) -> anyhow::Result<()> {
    let Some(path) = &config.output.database_path else {
        bail!("No database-path configured; set [output] database-path to record audits");
    };

    println!("Database: {}\n", path);
    let store = open_storage(Path::new(path))?;
    print_history(&store.list_runs(limit)?);
    Ok(())
}
