//! Binary entry point for the wiki archivist.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use wiki_archivist::config::{ArchivistConfig, ConfigOverrides};
use wiki_archivist::orchestrator::{baseline, incremental, OrchestratorContext};
use wiki_archivist::repository::Repository;

#[derive(Parser, Debug)]
#[command(name = "wiki-archivist", version, about = "Archives a MediaWiki-backed wiki into a local store")]
struct Cli {
    #[arg(long, global = true, default_value = "wiki-archivist.toml")]
    config: PathBuf,

    #[arg(long, global = true)]
    database: Option<String>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    #[arg(long, global = true, action = clap::ArgAction::SetTrue)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs C12: discovers every page, revision, file and link from scratch.
    Full {
        #[arg(long)]
        namespace: Vec<i64>,

        #[arg(long)]
        rate_limit: Option<f64>,

        /// Ignore any existing checkpoint and start over.
        #[arg(long, action = clap::ArgAction::SetTrue)]
        force: bool,

        /// Discovery only: print a per-namespace page count and an ETA at
        /// the configured rate. Makes no writes.
        #[arg(long, action = clap::ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Runs C13: reconciles against the delta since the last successful run.
    Incremental {
        #[arg(long)]
        rate_limit: Option<f64>,

        /// Overrides the detector's window start instead of the last
        /// successful run's end time. RFC 3339 (e.g. 2024-01-01T00:00:00Z).
        #[arg(long)]
        since: Option<String>,

        #[arg(long)]
        namespace: Vec<i64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> ExitCode {
    let mut config = load_config(&cli.config);

    let overrides = ConfigOverrides {
        database_file: cli.database.clone(),
        rate_limit: match &cli.command {
            Command::Full { rate_limit, .. } => *rate_limit,
            Command::Incremental { rate_limit, .. } => *rate_limit,
        },
        log_level: cli.log_level.clone(),
    };
    overrides.apply(&mut config);

    if let Err(e) = config.validate() {
        eprintln!("invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    init_logging(&config.logging.level, cli.quiet);

    let repository = match Repository::open(std::path::Path::new(&config.storage.database_file)) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "failed to open repository");
            return ExitCode::FAILURE;
        }
    };

    let ctx = match OrchestratorContext::new(&config, repository) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = %e, "failed to build orchestrator context");
            return ExitCode::FAILURE;
        }
    };

    install_sigint_handler(ctx.cancel.clone());

    match cli.command {
        Command::Full { namespace, force, dry_run, .. } => {
            if dry_run {
                return run_dry_run(&ctx, &namespace, config.scraper.rate_limit).await;
            }
            match ctx.repository.has_any_successful_run() {
                Ok(true) if !force => {
                    eprintln!(
                        "database already has a completed run; `full` would re-discover everything. \
                         Pass --force to proceed anyway."
                    );
                    return ExitCode::FAILURE;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "failed to check for a prior successful run");
                    return ExitCode::FAILURE;
                }
            }
            if force {
                let _ = ctx.checkpoint_store.clear();
            }
            let namespaces = if namespace.is_empty() { None } else { Some(namespace) };
            match baseline::run(&ctx, namespaces).await {
                Ok(result) => {
                    info!(status = ?result.status, pages = result.pages, "full scrape complete");
                    exit_code_for(&result.status)
                }
                Err(e) => {
                    error!(error = %e, "full scrape failed");
                    if ctx.is_cancelled() {
                        ExitCode::from(130)
                    } else {
                        ExitCode::FAILURE
                    }
                }
            }
        }
        Command::Incremental { since, namespace, .. } => {
            let since = match since.as_deref().map(DateTime::parse_from_rfc3339) {
                Some(Ok(dt)) => Some(dt.with_timezone(&Utc)),
                Some(Err(e)) => {
                    eprintln!("invalid --since timestamp: {e}");
                    return ExitCode::FAILURE;
                }
                None => None,
            };
            match incremental::run(&ctx, since, &namespace).await {
                Ok(stats) => {
                    info!(status = ?stats.status, total_pages_affected = stats.total_pages_affected, "incremental scrape complete");
                    exit_code_for(&stats.status)
                }
                Err(e) => {
                    error!(error = %e, "incremental scrape failed");
                    if ctx.is_cancelled() {
                        ExitCode::from(130)
                    } else {
                        ExitCode::FAILURE
                    }
                }
            }
        }
    }
}

async fn run_dry_run(ctx: &OrchestratorContext, namespaces: &[i64], rate_limit: f64) -> ExitCode {
    let namespaces: Vec<i64> = if namespaces.is_empty() {
        wiki_archivist::scrapers::discovery::DEFAULT_NAMESPACES.to_vec()
    } else {
        namespaces.to_vec()
    };

    let mut total_pages = 0usize;
    for ns in &namespaces {
        match wiki_archivist::scrapers::discovery::discover(&ctx.client, *ns).await {
            Ok(pages) => {
                println!("namespace {ns}: {} pages", pages.len());
                total_pages += pages.len();
            }
            Err(e) => {
                eprintln!("namespace {ns}: discovery failed: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let eta_seconds = total_pages as f64 / rate_limit.max(0.001);
    println!("total: {total_pages} pages, estimated {eta_seconds:.0}s at {rate_limit} req/s (no writes performed)");
    ExitCode::SUCCESS
}

fn exit_code_for(status: &wiki_archivist::models::RunStatus) -> ExitCode {
    use wiki_archivist::models::RunStatus;
    match status {
        RunStatus::Completed | RunStatus::Partial => ExitCode::SUCCESS,
        RunStatus::Failed | RunStatus::Running => ExitCode::FAILURE,
    }
}

fn load_config(path: &PathBuf) -> ArchivistConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match ArchivistConfig::from_toml(&contents) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to parse {}: {e}, using defaults", path.display());
                ArchivistConfig::default()
            }
        },
        Err(_) => ArchivistConfig::default(),
    }
}

fn init_logging(level: &str, quiet: bool) {
    let filter = if quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_new(level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn install_sigint_handler(cancel: std::sync::Arc<std::sync::atomic::AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.store(true, std::sync::atomic::Ordering::Relaxed);
        }
    });
}
