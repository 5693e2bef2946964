use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::time::MissedTickBehavior;

use super::Coordinator;
use crate::actor::producer::{CommandProducer, WatchProducer, supervise};
use crate::actor::session::SessionConfig;
use crate::config::ProjectConfig;
use crate::reload::server;

/// Delay before re-attaching a watcher whose directory is missing.
const WATCH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Run the heartbeat ticker, the producers and the WebSocket acceptor until
/// `shutdown_rx` fires.
pub async fn run_actors(
    coordinator: Arc<Coordinator>,
    config: Arc<ProjectConfig>,
    ws_listener: TcpListener,
    shutdown_rx: Receiver<()>,
) -> Result<()> {
    let mut tasks = Vec::new();

    let interval = config.reload.heartbeat_interval();
    let ticker = Arc::clone(&coordinator);
    tasks.push(tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            ticker.heartbeat();
        }
    }));

    if config.build.enable {
        let producer = CommandProducer::new(
            config.build.clone(),
            config.get_root().to_path_buf(),
            Arc::clone(&coordinator),
        );
        tasks.push(tokio::spawn(supervise(
            producer,
            Arc::clone(&coordinator),
            config.build.retry_delay(),
        )));
    }

    if config.watch.enable {
        let producer = WatchProducer::new(config.watch.clone(), Arc::clone(&coordinator));
        tasks.push(tokio::spawn(supervise(
            producer,
            Arc::clone(&coordinator),
            WATCH_RETRY_DELAY,
        )));
    }

    let acceptor = server::start(
        ws_listener,
        Arc::clone(&coordinator),
        SessionConfig::from(&config.reload),
    )?;

    loop {
        if shutdown_rx.try_recv().is_ok() || crate::core::is_shutdown() {
            crate::debug!("actor"; "shutdown signal received");
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    coordinator.shutdown();
    for task in &tasks {
        task.abort();
    }
    for task in tasks {
        let _ = task.await;
    }
    let _ = tokio::task::spawn_blocking(move || acceptor.join()).await;

    Ok(())
}
