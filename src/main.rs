use std::process::exit;
use std::sync::Arc;

use blockflow::config::Config;
use blockflow::node::{build_node_api, manager::build_node_manager};
use blockflow::repository::BlockRepository;
use blockflow::shutdown;
use blockflow::store::Store;
use blockflow::workers::{backfill, subscription, BackfillConfig, WorkerHealth};

#[tokio::main]
pub async fn main() {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            exit(2);
        }
    };

    log::info!("🚀 Starting blockflow...");
    log::info!("📊 Configuration:");
    log::info!("   DB_PATH: {}", config.db_path);
    log::info!("   NODE_API: {:?}", config.node_api);
    log::info!("   NODE_MANAGER: {:?}", config.node_manager);
    log::info!("   POLL_INTERVAL: {:?}", config.poll_interval);

    if let Err(e) = run(config).await {
        log::error!("Fatal: {}", e);
        exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::open(&config.db_path)?;
    let repository = BlockRepository::new(store).with_poll_interval(config.poll_interval);

    let manager = build_node_manager(&config);
    log::info!("Starting node...");
    manager.start().await?;
    log::info!("Node started");

    let api = build_node_api(&config)?;
    let health = WorkerHealth::new();
    let (signal, token) = shutdown::channel();

    let subscription_handle = tokio::spawn(subscription::run(
        Arc::clone(&api),
        repository.clone(),
        Arc::clone(&health),
        token.clone(),
    ));
    let backfill_handle = tokio::spawn(backfill::run(
        Arc::clone(&api),
        repository.clone(),
        BackfillConfig {
            batch_size: config.backfill_batch_size,
            poll_interval: config.backfill_poll_interval,
        },
        Arc::clone(&health),
        token,
    ));

    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Received Ctrl+C, shutting down..."),
        Err(e) => log::error!("Failed to listen for Ctrl+C: {}", e),
    }
    signal.trigger();

    for (name, handle) in [
        ("subscription", subscription_handle),
        ("backfill", backfill_handle),
    ] {
        match handle.await {
            Ok(Ok(())) => log::info!("{} worker finished", name),
            Ok(Err(e)) => log::error!("{} worker failed: {}", name, e),
            Err(e) => log::error!("{} worker panicked: {}", name, e),
        }
    }

    log::info!("Stopping node...");
    if let Err(e) = manager.stop().await {
        log::error!("Failed to stop node: {}", e);
    }
    log::info!("Node stopped");
    Ok(())
}
