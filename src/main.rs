//! docsweep main entry point
//!
//! This is the command-line interface for the docsweep harvester.

use anyhow::Context;
use clap::Parser;
use docsweep::config::{load_config_with_hash, Config, ResumeMode};
use docsweep::orchestrator::{run_all, HarvestJob, JobStatus, TraversalJob};
use docsweep::output::print_statistics;
use docsweep::storage;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// docsweep: a resumable documentation harvester
///
/// docsweep crawls documentation sites into normalized text files and
/// enriches package catalogs from a rate-limited API. Every job checkpoints
/// its progress so an interrupted run picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "docsweep")]
#[command(version)]
#[command(about = "A resumable documentation harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Require resuming; fail when a job has nothing to resume
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start every job over, ignoring persisted progress
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Rewrite pages even when their content is unchanged
    #[arg(long)]
    force: bool,

    /// Run only the named job (repeatable)
    #[arg(long = "job", value_name = "NAME")]
    jobs: Vec<String>,

    /// Validate config and show the jobs without running them
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show persisted progress of each job and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let resume = if cli.resume {
        Some(ResumeMode::Always)
    } else if cli.fresh {
        Some(ResumeMode::Never)
    } else {
        None
    };
    config.apply_overrides(cli.force, resume);
    config.retain_jobs(&cli.jobs)?;

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(ExitCode::SUCCESS)
    } else if cli.stats {
        handle_stats(&config).await?;
        Ok(ExitCode::SUCCESS)
    } else {
        handle_run(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("docsweep=info,warn"),
            1 => EnvFilter::new("docsweep=debug,info"),
            2 => EnvFilter::new("docsweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would run
fn handle_dry_run(config: &Config) {
    println!("=== docsweep Dry Run ===\n");

    println!("User Agent: {}", config.user_agent.header_value());

    println!("\nCrawl Jobs ({}):", config.crawl.len());
    for job in &config.crawl {
        println!("  - {} -> {}", job.name, job.output_dir.display());
        println!("    start: {}", job.start_url);
        match &job.allowed_prefixes {
            Some(prefixes) => println!("    scope: {}", prefixes.join(", ")),
            None => println!("    scope: derived from start URL"),
        }
        println!(
            "    max pages: {}, max depth: {}, resume: {:?}, force: {}",
            job.max_pages, job.max_depth, job.resume, job.force
        );
    }

    println!("\nEnrich Jobs ({}):", config.enrich.len());
    for job in &config.enrich {
        println!("  - {} -> {}", job.name, job.output_dir.display());
        println!("    source: {}", job.source.display());
        println!(
            "    delay: {}ms, checkpoint every: {}, resume: {:?}",
            job.request_delay_ms, job.checkpoint_every, job.resume
        );
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would run {} jobs", config.job_count());
}

/// Handles the --stats mode: shows persisted progress without running
async fn handle_stats(config: &Config) -> anyhow::Result<()> {
    for job in &config.crawl {
        println!("=== {} (crawl) ===", job.name);
        match storage::load_session(&job.output_dir).await? {
            Some(session) => {
                println!("  Start URL: {}", session.start_url);
                println!("  Active:    {}", session.is_active);
                println!("  Visited:   {} / {}", session.visited.len(), session.max_pages);
                println!("  Queued:    {}", session.queue.len());
                println!("  Failed:    {}", session.failed.len());
                println!("  Updated:   {}", session.updated_at.to_rfc3339());
            }
            None => println!("  No session in {}", job.output_dir.display()),
        }
    }

    for job in &config.enrich {
        println!("=== {} (enrich) ===", job.name);
        match storage::load_checkpoint(&job.output_dir).await? {
            Some(checkpoint) => {
                println!("  Ranked:    {}", checkpoint.rankings.len());
                println!("  Ranking:   {}", if checkpoint.ranking_complete { "complete" } else { "partial" });
                println!("  Processed: {}", checkpoint.processed_count);
                println!(
                    "  Errors:    {}",
                    checkpoint.accumulated_results.iter().filter(|i| i.is_error()).count()
                );
                println!("  Updated:   {}", checkpoint.timestamp.to_rfc3339());
            }
            None => println!("  No checkpoint in {}", job.output_dir.display()),
        }
    }

    Ok(())
}

/// Handles the main run: all selected jobs, concurrently
async fn handle_run(config: &Config) -> anyhow::Result<ExitCode> {
    let cancel = CancellationToken::new();
    let jobs = HarvestJob::from_config(config, &cancel).context("building jobs")?;

    for job in &jobs {
        tracing::info!(job = job.name(), "Starting {} job", job.kind());
    }

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; cancelling jobs");
            signal_cancel.cancel();
        }
    });

    let report = run_all(jobs).await;

    for (name, result) in &report.results {
        match result {
            Ok(summary) => {
                print_statistics(name, &summary.statistics);
                match summary.status {
                    JobStatus::Completed => {}
                    JobStatus::Interrupted => println!("  Interrupted; rerun to resume"),
                    JobStatus::RateLimited { reset_at: Some(at) } => {
                        println!("  Rate limited until {}; rerun to resume", at.to_rfc3339())
                    }
                    JobStatus::RateLimited { reset_at: None } => {
                        println!("  Rate limited; rerun to resume")
                    }
                }
            }
            Err(e) => println!("=== {} ===\n  Failed: {}", name, e),
        }
    }

    if report.results.len() > 1 {
        print_statistics("all jobs", &report.combined_statistics());
    }

    if report.is_success() {
        tracing::info!("All {} jobs completed", report.results.len());
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(
            "{} of {} jobs did not complete",
            report.failed_count(),
            report.results.len()
        );
        Ok(ExitCode::FAILURE)
    }
}
