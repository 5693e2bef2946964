//! `[watch]` section configuration.
//!
//! Publishes the files of one directory as artifacts, e.g. shaders that the
//! client compiles itself.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! enable = true
//! dir = "game/cyber/shader"   # relative to the project root
//! prefix = "/shader"          # artifact names become /shader/<file name>
//! extensions = ["glsl"]       # empty list publishes every file
//! freshness = "content"       # "content" (blake3) or "mtime"
//! ```
//!
//! Files whose name starts with `.` or `#` (editor artifacts) are skipped.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::actor::messages::validate_name;
use crate::config::{ConfigDiagnostics, FieldPath};
use crate::freshness::Strategy;
use crate::utils::path::artifact_name;

/// Directory watcher producer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Run the directory watcher while serving.
    pub enable: bool,

    /// Watched directory (absolute after loading).
    pub dir: PathBuf,

    /// Artifact name prefix.
    pub prefix: String,

    /// File extensions to publish, without the dot.
    pub extensions: Vec<String>,

    /// How unchanged files are detected.
    pub freshness: Strategy,
}

impl WatchConfig {
    const DIR: FieldPath = FieldPath::new("watch.dir");
    const PREFIX: FieldPath = FieldPath::new("watch.prefix");
    const EXTENSIONS: FieldPath = FieldPath::new("watch.extensions");

    /// Whether a file with this extension is published.
    pub fn accepts_extension(&self, ext: Option<&str>) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        ext.is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.enable {
            return;
        }
        if self.dir.as_os_str().is_empty() {
            diag.error(Self::DIR, "watched directory is empty");
        } else if !self.dir.is_dir() {
            diag.warn(
                Self::DIR,
                format!("`{}` does not exist yet, watching starts once it does", self.dir.display()),
            );
        }
        if let Err(e) = validate_name(&artifact_name(&self.prefix, "file")) {
            diag.error(Self::PREFIX, e.to_string());
        }
        if self.extensions.iter().any(|e| e.starts_with('.')) {
            diag.error_with_hint(
                Self::EXTENSIONS,
                "extensions are matched without the leading dot",
                "write `glsl`, not `.glsl`",
            );
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enable: true,
            dir: PathBuf::from("game/cyber/shader"),
            prefix: "/shader".into(),
            extensions: vec!["glsl".into()],
            freshness: Strategy::Content,
        }
    }
}
