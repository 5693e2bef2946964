//! Watch-Build Command Producer
//!
//! Runs the configured build command (which rebuilds on its own whenever
//! sources change) and turns every line it prints to stdout into a batch:
//!
//! ```text
//! {"success":true,"errorCount":0,"warningCount":1,"diagnostics":[...],"code":"...","map":{...}}
//!   → build.diagnostics = JSON diagnostics (always)
//!   → build.output      = code, with the source map as auxiliary payload (on success)
//! ```
//!
//! A line that is not a build report ends the run; the supervisor restarts
//! the command.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::{Producer, publish};
use crate::actor::coordinator::Coordinator;
use crate::actor::messages::ArtifactBatch;
use crate::config::BuildConfig;
use crate::logger::{status_error, status_success, status_warning};
use crate::store::Content;
use crate::utils::plural::plural_count;
use crate::{debug, log};

/// One line of build command output.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub success: bool,
    #[serde(default)]
    pub error_count: usize,
    #[serde(default)]
    pub warning_count: usize,
    #[serde(default)]
    pub diagnostics: Value,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub map: Option<Map<String, Value>>,
}

impl BuildReport {
    /// Convert into the artifacts it describes.
    ///
    /// The source map loses its `file` field and gets `sourceRoot` pointing
    /// at the project root, so devtools resolve sources on disk.
    pub fn into_batch(self, config: &BuildConfig, root: &Path) -> Result<ArtifactBatch> {
        let mut batch = ArtifactBatch::new();

        let diagnostics = match self.diagnostics {
            Value::Null => Value::Array(Vec::new()),
            other => other,
        };
        batch.put(
            config.diagnostics.as_str(),
            Content::new(serde_json::to_vec(&diagnostics)?),
        );

        if self.success {
            let mut content = Content::new(self.code.unwrap_or_default());
            if let Some(mut map) = self.map {
                map.remove("file");
                map.insert(
                    "sourceRoot".into(),
                    Value::String(root.to_string_lossy().into_owned()),
                );
                content = content.with_map(serde_json::to_vec(&map)?);
            }
            batch.put(config.output.as_str(), content);
        }

        Ok(batch)
    }

    /// Show the outcome on the status line.
    fn report_status(&self, config: &BuildConfig) {
        if self.success && self.warning_count > 0 {
            status_warning(&format!(
                "built {} ({})",
                config.output,
                plural_count(self.warning_count, "warning")
            ));
        } else if self.success {
            status_success(&format!("built {}", config.output));
        } else {
            status_error(
                "build failed",
                &format!(
                    "{}, {}",
                    plural_count(self.error_count, "error"),
                    plural_count(self.warning_count, "warning")
                ),
            );
        }
    }
}

pub struct CommandProducer {
    config: BuildConfig,
    root: PathBuf,
    coordinator: Arc<Coordinator>,
}

impl CommandProducer {
    pub fn new(config: BuildConfig, root: PathBuf, coordinator: Arc<Coordinator>) -> Self {
        Self {
            config,
            root,
            coordinator,
        }
    }
}

impl Producer for CommandProducer {
    const LABEL: &'static str = "build";

    /// Run the command once, publishing its reports until it exits.
    async fn run(&mut self) -> Result<()> {
        let Some((program, args)) = self.config.command.split_first() else {
            bail!("build command is empty");
        };

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start `{}`", self.config.command_line()))?;
        log!("build"; "{}", self.config.command_line());

        let stdout = child.stdout.take().context("build command has no stdout")?;
        let mut lines = BufReader::new(stdout).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let report: BuildReport = serde_json::from_str(line).with_context(|| {
                format!("unexpected build output: {}", truncate(line, 120))
            })?;
            debug!("build"; "report: success={} errors={} warnings={}",
                report.success, report.error_count, report.warning_count);

            report.report_status(&self.config);
            let batch = report.into_batch(&self.config, &self.root)?;
            publish(&self.coordinator, "build", batch);
        }

        let status = child.wait().await.context("failed to wait for build command")?;
        if !status.success() {
            bail!("build command exited with {}", status);
        }
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ArtifactChange;
    use std::time::Duration;

    fn report(json: &str) -> BuildReport {
        serde_json::from_str(json).unwrap()
    }

    fn put(batch: &ArtifactBatch, name: &str) -> Content {
        batch
            .entries()
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| match &e.change {
                ArtifactChange::Put(content) => Some(content.clone()),
                ArtifactChange::Tombstone => None,
            })
            .unwrap_or_else(|| panic!("{name} not in batch"))
    }

    #[test]
    fn test_successful_report() {
        let config = BuildConfig::default();
        let batch = report(
            r#"{"success":true,"errorCount":0,"warningCount":1,
                "diagnostics":[{"file":"main.ts","messages":[]}],
                "code":"main()","map":{"version":3,"file":"game.js","sources":["main.ts"],"mappings":"AAAA"}}"#,
        )
        .into_batch(&config, Path::new("/project"))
        .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(
            put(&batch, &config.diagnostics).data,
            br#"[{"file":"main.ts","messages":[]}]"#
        );

        let output = put(&batch, &config.output);
        assert_eq!(output.data, b"main()");
        let map: Value = serde_json::from_slice(output.map.as_deref().unwrap()).unwrap();
        assert!(map.get("file").is_none());
        assert_eq!(map["sourceRoot"], "/project");
        assert_eq!(map["mappings"], "AAAA");
    }

    #[test]
    fn test_failed_report_only_updates_diagnostics() {
        let config = BuildConfig::default();
        let batch = report(r#"{"success":false,"errorCount":2,"warningCount":0}"#)
            .into_batch(&config, Path::new("/project"))
            .unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(put(&batch, &config.diagnostics).data, b"[]");
    }

    #[test]
    fn test_success_without_map() {
        let config = BuildConfig::default();
        let batch = report(r#"{"success":true,"code":"x"}"#)
            .into_batch(&config, Path::new("/project"))
            .unwrap();
        assert!(put(&batch, &config.output).map.is_none());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_publishes_reports() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = BuildConfig {
            command: vec![
                "sh".into(),
                "-c".into(),
                r#"echo '{"success":true,"code":"one"}'; echo; echo '{"success":false,"errorCount":1}'"#
                    .into(),
            ],
            ..BuildConfig::default()
        };
        let coordinator = Coordinator::shared(Duration::from_secs(10));
        let mut producer =
            CommandProducer::new(config.clone(), dir.path().to_path_buf(), Arc::clone(&coordinator));

        producer.run().await.unwrap();
        assert_eq!(
            coordinator.lookup(&config.output, None).unwrap().data(),
            b"one"
        );
        assert!(coordinator.lookup(&config.diagnostics, None).is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_rejects_garbage_and_failures() {
        let dir = tempfile::TempDir::new().unwrap();
        let coordinator = Coordinator::shared(Duration::from_secs(10));

        let garbage = BuildConfig {
            command: vec!["sh".into(), "-c".into(), "echo hello".into()],
            ..BuildConfig::default()
        };
        let mut producer =
            CommandProducer::new(garbage, dir.path().to_path_buf(), Arc::clone(&coordinator));
        assert!(producer.run().await.is_err());

        let failing = BuildConfig {
            command: vec!["sh".into(), "-c".into(), "exit 3".into()],
            ..BuildConfig::default()
        };
        let mut producer = CommandProducer::new(failing, dir.path().to_path_buf(), coordinator);
        assert!(producer.run().await.is_err());
    }
}
