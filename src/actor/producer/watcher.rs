//! Directory Watcher Producer
//!
//! Publishes the files of one flat directory as artifacts.
//!
//! ```text
//! notify → (thread bridge) → Debouncer → stage → ArtifactBatch → Coordinator
//! ```
//!
//! The watcher is attached before the initial scan, so a file written while
//! scanning is reported by both and published once (the second sighting is
//! not outdated).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use notify::{RecursiveMode, Watcher};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use super::debouncer::{ChangeKind, Debouncer};
use super::{Producer, publish};
use crate::actor::coordinator::Coordinator;
use crate::actor::messages::ArtifactBatch;
use crate::config::WatchConfig;
use crate::freshness::Resource;
use crate::store::Content;
use crate::utils::path::artifact_name;
use crate::{debug, log};

/// How often the watched directory is checked while idle.
const MAINTAIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct WatchProducer {
    config: WatchConfig,
    coordinator: Arc<Coordinator>,
    /// Last published state per file; survives watcher restarts.
    resources: FxHashMap<PathBuf, Resource>,
}

impl WatchProducer {
    pub fn new(config: WatchConfig, coordinator: Arc<Coordinator>) -> Self {
        Self {
            config,
            coordinator,
            resources: FxHashMap::default(),
        }
    }

    /// Watch until the directory disappears or notify fails.
    ///
    /// A directory that does not exist yet is waited for.
    async fn watch(&mut self) -> Result<()> {
        let dir = self.config.dir.clone();
        if !dir.is_dir() {
            log!("watch"; "waiting for `{}`", dir.display());
            while !dir.is_dir() {
                tokio::time::sleep(MAINTAIN_INTERVAL).await;
            }
        }

        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch `{}`", dir.display()))?;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => log!("watch"; "notify error: {}", e),
                }
            }
        });

        let initial = self.scan()?;
        log!("watch"; "{} ({} published)", dir.display(), initial.len());
        publish(&self.coordinator, "watch", initial);

        let mut debouncer = Debouncer::new();
        loop {
            tokio::select! {
                biased;
                event = async_rx.recv() => match event {
                    Some(event) => debouncer.add_event(&event),
                    None => bail!("notify stopped"),
                },
                _ = tokio::time::sleep(debouncer.sleep_duration().min(MAINTAIN_INTERVAL)) => {
                    if let Some(changes) = debouncer.take_if_ready() {
                        let batch = self.apply(changes);
                        publish(&self.coordinator, "watch", batch);
                    }
                    if !dir.is_dir() {
                        bail!("`{}` disappeared", dir.display());
                    }
                }
            }
        }
    }

    /// Stage every file of the directory, plus tombstones for files that
    /// vanished since the last run.
    pub fn scan(&mut self) -> Result<ArtifactBatch> {
        let entries = fs::read_dir(&self.config.dir)
            .with_context(|| format!("failed to list `{}`", self.config.dir.display()))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut gone: Vec<PathBuf> = self
            .resources
            .keys()
            .filter(|path| !paths.contains(path))
            .cloned()
            .collect();
        gone.sort();

        let mut batch = ArtifactBatch::new();
        for path in paths.iter().chain(&gone) {
            if self.accepts(path) {
                self.stage(path, &mut batch);
            }
        }
        Ok(batch)
    }

    /// Stage a set of debounced changes.
    fn apply(&mut self, changes: FxHashMap<PathBuf, ChangeKind>) -> ArtifactBatch {
        let mut changes: Vec<_> = changes
            .into_iter()
            .filter(|(path, _)| self.accepts(path))
            .collect();
        changes.sort_by(|a, b| a.0.cmp(&b.0));

        let mut batch = ArtifactBatch::new();
        for (path, kind) in changes {
            debug!("watch"; "{}: {}", kind.label(), path.display());
            self.stage(&path, &mut batch);
        }
        batch
    }

    /// Whether `path` names a publishable file directly inside the directory.
    fn accepts(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        path.parent() == Some(self.config.dir.as_path())
            && !name.starts_with('.')
            && !name.starts_with('#')
            && self
                .config
                .accepts_extension(path.extension().and_then(|e| e.to_str()))
    }

    /// Add the current state of `path` to `batch` unless it was already
    /// published.
    ///
    /// A missing file becomes a tombstone if it was published before.
    fn stage(&mut self, path: &Path, batch: &mut ArtifactBatch) {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        let name = artifact_name(&self.config.prefix, file_name);

        if self
            .resources
            .get(path)
            .is_some_and(|resource| !resource.is_outdated())
        {
            return;
        }

        match fs::read(path) {
            Ok(data) => {
                let resource = Resource::observe(self.config.freshness, path, &data);
                if self.resources.get(path) == Some(&resource) {
                    return;
                }
                self.resources.insert(path.to_path_buf(), resource);
                batch.put(name, Content::new(data));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if self.resources.remove(path).is_some() {
                    batch.remove(name);
                }
            }
            Err(e) => debug!("watch"; "skip {}: {}", path.display(), e),
        }
    }
}

impl Producer for WatchProducer {
    const LABEL: &'static str = "watch";

    async fn run(&mut self) -> Result<()> {
        self.watch().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freshness::Strategy;
    use crate::store::ArtifactChange;
    use tempfile::TempDir;

    fn producer(dir: &TempDir, strategy: Strategy) -> WatchProducer {
        let config = WatchConfig {
            enable: true,
            dir: dir.path().to_path_buf(),
            prefix: "/shader".into(),
            extensions: vec!["glsl".into()],
            freshness: strategy,
        };
        WatchProducer::new(config, Coordinator::shared(Duration::from_secs(10)))
    }

    fn names(batch: &ArtifactBatch) -> Vec<(&str, bool)> {
        batch
            .entries()
            .iter()
            .map(|e| (e.name.as_str(), matches!(e.change, ArtifactChange::Put(_))))
            .collect()
    }

    #[test]
    fn test_scan_filters_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("sky.glsl"), "void main(){}").unwrap();
        fs::write(dir.path().join("SEA.GLSL"), "void main(){}").unwrap();
        fs::write(dir.path().join(".hidden.glsl"), "x").unwrap();
        fs::write(dir.path().join("#sky.glsl#"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("nested.glsl")).unwrap();

        let mut producer = producer(&dir, Strategy::Content);
        let batch = producer.scan().unwrap();
        assert_eq!(
            names(&batch),
            vec![("/shader/SEA.GLSL", true), ("/shader/sky.glsl", true)]
        );
    }

    #[test]
    fn test_rescan_skips_unchanged_and_removes_vanished() {
        let dir = TempDir::new().unwrap();
        let sky = dir.path().join("sky.glsl");
        let sea = dir.path().join("sea.glsl");
        fs::write(&sky, "sky").unwrap();
        fs::write(&sea, "sea").unwrap();

        let mut producer = producer(&dir, Strategy::Content);
        assert_eq!(producer.scan().unwrap().len(), 2);
        assert!(producer.scan().unwrap().is_empty());

        fs::write(&sky, "sky 2").unwrap();
        fs::remove_file(&sea).unwrap();
        assert_eq!(
            names(&producer.scan().unwrap()),
            vec![("/shader/sky.glsl", true), ("/shader/sea.glsl", false)]
        );
        assert!(producer.scan().unwrap().is_empty());
    }

    #[test]
    fn test_apply_changes() {
        let dir = TempDir::new().unwrap();
        let sky = dir.path().join("sky.glsl");
        fs::write(&sky, "sky").unwrap();

        let mut producer = producer(&dir, Strategy::Mtime);
        producer.scan().unwrap();

        let outside = PathBuf::from("/elsewhere/sky.glsl");
        let ghost = dir.path().join("ghost.glsl");
        let mut changes = FxHashMap::default();
        changes.insert(sky.clone(), ChangeKind::Modified);
        changes.insert(outside, ChangeKind::Modified);
        changes.insert(ghost, ChangeKind::Removed);

        // Unchanged on disk, unknown ghost, foreign path: nothing to publish
        assert!(producer.apply(changes.clone()).is_empty());

        fs::remove_file(&sky).unwrap();
        let batch = producer.apply(changes);
        assert_eq!(names(&batch), vec![("/shader/sky.glsl", false)]);
    }

    #[test]
    fn test_same_content_under_mtime_touch_is_skipped() {
        let dir = TempDir::new().unwrap();
        let sky = dir.path().join("sky.glsl");
        fs::write(&sky, "sky").unwrap();

        let mut producer = producer(&dir, Strategy::Content);
        producer.scan().unwrap();
        fs::write(&sky, "sky").unwrap();
        assert!(producer.scan().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_waits_for_directory() {
        let dir = TempDir::new().unwrap();
        let mut producer = producer(&dir, Strategy::Content);
        producer.config.dir = dir.path().join("missing");

        let waiting = tokio::time::timeout(Duration::from_millis(200), producer.run()).await;
        assert!(waiting.is_err());
    }

    #[tokio::test]
    async fn test_run_publishes_initial_scan() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("sky.glsl"), "sky").unwrap();
        let mut producer = producer(&dir, Strategy::Content);
        let coordinator = Arc::clone(&producer.coordinator);

        let _ = tokio::time::timeout(Duration::from_millis(200), producer.run()).await;
        assert_eq!(
            coordinator.lookup("/shader/sky.glsl", None).unwrap().data(),
            b"sky"
        );
    }
}
