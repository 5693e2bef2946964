//! Producers - Sources of Artifact Batches
//!
//! - `command` - watch-build command, one batch per build report
//! - `watcher` - directory watcher, one batch per debounced burst
//!
//! Producers run under [`supervise`]: whenever a run ends (error or clean
//! exit) it is logged and restarted after a delay. The store and the
//! sessions never see producer failures.

mod command;
mod debouncer;
mod watcher;

pub use command::CommandProducer;
pub use watcher::WatchProducer;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use super::coordinator::Coordinator;
use super::messages::ArtifactBatch;
use crate::logger::status_detach;
use crate::utils::plural::plural_count;
use crate::{debug, log};

/// A restartable source of artifact batches.
pub trait Producer: Send {
    /// Log prefix.
    const LABEL: &'static str;

    /// Publish batches until the source ends or fails.
    fn run(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Run `producer` forever, restarting it `retry_delay` after every exit.
///
/// Stops once the coordinator shuts down.
pub async fn supervise<P: Producer>(mut producer: P, coordinator: Arc<Coordinator>, retry_delay: Duration) {
    let label = P::LABEL;
    while !coordinator.is_shutdown() {
        let result = producer.run().await;
        if coordinator.is_shutdown() {
            break;
        }

        status_detach();
        match result {
            Ok(()) => log!(label; "exited"),
            Err(e) => log!("error"; "{} failed: {:#}", label, e),
        }
        log!(label; "restarting in {}ms", retry_delay.as_millis());
        tokio::time::sleep(retry_delay).await;
    }
    debug!(label; "stopped");
}

/// Hand a batch to the coordinator. Invalid batches are dropped loudly.
pub fn publish(coordinator: &Coordinator, source: &str, batch: ArtifactBatch) {
    if batch.is_empty() {
        return;
    }

    let count = batch.len();
    match coordinator.ingest(batch) {
        Ok(true) => debug!(source; "published {}", plural_count(count, "artifact")),
        Ok(false) => debug!(source; "{} unchanged", plural_count(count, "artifact")),
        Err(e) => log!("error"; "{} produced an invalid batch: {}", source, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Content;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_publish_drops_invalid_batch() {
        let coordinator = Coordinator::new(Duration::from_secs(10));
        let mut batch = ArtifactBatch::new();
        batch.put("/ok.js", Content::new("ok"));
        batch.put("relative.js", Content::new("bad"));

        publish(&coordinator, "test", batch);
        assert_eq!(coordinator.version(), 0);
        assert!(coordinator.lookup("/ok.js", None).is_none());

        let mut batch = ArtifactBatch::new();
        batch.put("/ok.js", Content::new("ok"));
        publish(&coordinator, "test", batch);
        assert_eq!(coordinator.version(), 1);
    }

    /// Fails twice, then shuts the coordinator down.
    struct Flaky {
        runs: Arc<AtomicUsize>,
        coordinator: Arc<Coordinator>,
    }

    impl Producer for Flaky {
        const LABEL: &'static str = "test";

        async fn run(&mut self) -> Result<()> {
            if self.runs.fetch_add(1, Ordering::SeqCst) == 2 {
                self.coordinator.shutdown();
                return Ok(());
            }
            anyhow::bail!("boom")
        }
    }

    #[tokio::test]
    async fn test_supervise_restarts_until_shutdown() {
        let coordinator = Coordinator::shared(Duration::from_secs(10));
        let runs = Arc::new(AtomicUsize::new(0));
        let producer = Flaky {
            runs: Arc::clone(&runs),
            coordinator: Arc::clone(&coordinator),
        };

        supervise(producer, Arc::clone(&coordinator), Duration::from_millis(1)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert!(coordinator.is_shutdown());
    }

    #[tokio::test]
    async fn test_supervise_skips_when_already_shut_down() {
        let coordinator = Coordinator::shared(Duration::from_secs(10));
        coordinator.shutdown();
        let runs = Arc::new(AtomicUsize::new(0));
        let producer = Flaky {
            runs: Arc::clone(&runs),
            coordinator: Arc::clone(&coordinator),
        };

        supervise(producer, coordinator, Duration::from_millis(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
