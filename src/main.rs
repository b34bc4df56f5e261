use anyhow::Context;
use rankwatch::config::Config;
use rankwatch::leaderboard::fetcher::HttpFetcher;
use rankwatch::monitor::{Monitor, MonitorSettings};
use rankwatch::notify::message::MessageBuilder;
use rankwatch::notify::WebhookNotifier;
use rankwatch::reconcile::Reconciler;
use rankwatch::shutdown::shutdown_signal;
use rankwatch::store::JsonSnapshotStore;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "rankwatch.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Load config
    let config_path = std::env::var("RANKWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config_from_file = config_path.exists();
    let config = if config_from_file {
        Config::load(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?
    } else {
        Config::from_env().context("loading config from environment")?
    };

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .init();
    }

    info!("rankwatch v{} starting", env!("CARGO_PKG_VERSION"));
    if !config_from_file {
        info!(path = %config_path.display(), "no config file found, using env-only config");
    }

    config.validate()?;

    let watch_set = config.monitor.watch_set();
    info!(
        app = %config.monitor.app_name,
        tasks = ?config.monitor.task_ids,
        wallets = watch_set.len(),
        snapshot = %config.monitor.snapshot_path.display(),
        proxy = config.proxy.enabled,
        "configuration loaded"
    );

    // --- Components ---
    let fetcher = HttpFetcher::new(&config.api).context("building API client")?;
    let notifier =
        WebhookNotifier::new(&config.webhook, &config.proxy).context("building webhook client")?;
    let store = JsonSnapshotStore::new(config.monitor.snapshot_path.clone());
    let reconciler = Reconciler::new(store, watch_set);
    let messages = MessageBuilder::new(
        config.monitor.app_name.clone(),
        config.monitor.rank_alert_threshold,
    );

    // --- Shutdown ---
    let shutdown = CancellationToken::new();
    match shutdown_signal() {
        Ok(signal) => {
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                signal.await;
                info!("shutdown signal received, finishing current check...");
                signal_token.cancel();
            });
        }
        Err(e) => error!(error = %e, "failed to install signal handlers, graceful shutdown disabled"),
    }

    let mut monitor = Monitor::new(
        MonitorSettings::from(&config.monitor),
        fetcher,
        notifier,
        reconciler,
        messages,
        shutdown,
    );
    let iterations = monitor.run().await;

    info!(iterations, "shutdown complete");
    Ok(())
}
