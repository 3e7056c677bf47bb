//! Stagegate - CSV ingestion gatekeeper

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stagegate_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::signal;
use tracing::{info, Level};

use stagegate_server::{
    api::{self, AppState},
    config::Config,
    db,
    ledger::PgStatusStore,
    queue::PgWorkQueue,
    storage::{config::StorageConfig, S3ObjectStore},
    triage::{ObjectCreated, TriageOrchestrator},
    validation::{self, REQUIRED_COLUMNS},
};

#[derive(Parser, Debug)]
#[command(name = "stagegate")]
#[command(author, version, about = "Validate staged CSV uploads and admit or quarantine them")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP endpoint that receives bucket notifications
    Serve,

    /// Triage a single staged object
    Triage {
        #[arg(long, env = "STAGING_BUCKET")]
        bucket: String,

        #[arg(long)]
        key: String,
    },

    /// Run the structural checks on a local file, without side effects
    Validate {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::for_service("stagegate")
        .with_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    match cli.command {
        Command::Serve => serve().await,
        Command::Triage { bucket, key } => triage_one(bucket, key).await,
        Command::Validate { file } => validate_file(file),
    }
}

/// Build the orchestrator over S3 and Postgres.
async fn build_orchestrator(config: &Config) -> Result<(TriageOrchestrator, sqlx::PgPool)> {
    let pool = db::create_pool(&config.database).await?;

    let status = PgStatusStore::new(pool.clone(), config.triage.jobs_table.clone())?;
    status.ensure_schema().await?;

    let queue = PgWorkQueue::new(pool.clone(), config.triage.work_queue.clone())?;
    queue.ensure_schema().await?;

    let objects = S3ObjectStore::new(StorageConfig::from_env()?).await?;

    info!(
        jobs_table = %config.triage.jobs_table,
        work_queue = %config.triage.work_queue,
        "Triage adapters ready"
    );

    let orchestrator =
        TriageOrchestrator::new(Arc::new(objects), Arc::new(queue), Arc::new(status));
    Ok((orchestrator, pool))
}

async fn serve() -> Result<()> {
    let config = Config::load()?;
    let (orchestrator, pool) = build_orchestrator(&config).await?;

    let app = api::router(AppState {
        orchestrator,
        db: Some(pool),
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid GATE_HOST/GATE_PORT")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn triage_one(bucket: String, key: String) -> Result<()> {
    let config = Config::load()?;
    let (orchestrator, _pool) = build_orchestrator(&config).await?;

    let outcome = orchestrator.triage(&ObjectCreated::new(bucket, key)).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.is_ok() {
        std::process::exit(1);
    }
    Ok(())
}

fn validate_file(file: PathBuf) -> Result<()> {
    let outcome = validation::validate_file(&file, &REQUIRED_COLUMNS)
        .with_context(|| format!("Failed to validate {}", file.display()))?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.is_valid() {
        std::process::exit(1);
    }
    Ok(())
}

async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => info!("Received terminate signal, starting graceful shutdown"),
    }

    info!("Waiting up to {} seconds for in-flight triage", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
