use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use vigil_core::{NearestMatcher, PermissionEvaluator, Reconciler};
use vigild::acks::{AckStore, OperatorLog};
use vigild::config::Config;
use vigild::engine::Engine;
use vigild::local::{resolve_environment, HeuristicDetector, IdleCamera, LocalBackend};
use vigild::roster::RosterCache;

#[derive(Parser)]
#[command(name = "vigild", about = "Vigil security monitoring daemon")]
struct Cli {
    /// Environment to monitor (overrides VIGIL_ENVIRONMENT_ID).
    #[arg(long)]
    environment: Option<String>,
    /// Data directory for the file backend (overrides VIGIL_DATA_DIR).
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Acknowledged-warnings store path (overrides VIGIL_ACK_PATH).
    #[arg(long)]
    ack_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if cli.environment.is_some() {
        config.environment_id = cli.environment;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(path) = cli.ack_path {
        config.ack_path = path;
    }

    tracing::info!(
        environment = config.environment_id.as_deref().unwrap_or("<first available>"),
        data_dir = %config.data_dir.display(),
        frame_period_ms = config.frame_period_ms,
        roster_poll_secs = config.roster_poll_secs,
        ack_path = %config.ack_path.display(),
        "vigild starting"
    );

    let backend = LocalBackend::new(config.data_dir.clone());
    let env = resolve_environment(&backend, config.environment_id.as_deref())?;
    let acks = AckStore::load(config.ack_path.clone());

    let mut engine = Engine::new(
        NearestMatcher::new(config.match_threshold),
        Reconciler::new(config.reconciler_config()),
        env,
        PermissionEvaluator::default(),
        RosterCache::new(Duration::from_secs(config.roster_poll_secs)),
        Box::new(HeuristicDetector),
        Box::new(backend.clone()),
        Box::new(OperatorLog::new(acks)),
    );
    engine.refresh_assignments(&backend);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let mut camera = IdleCamera;
    engine
        .run(
            &mut camera,
            Duration::from_millis(config.frame_period_ms),
            shutdown_rx,
        )
        .await;
    tracing::info!("vigild stopped");

    Ok(())
}
