//! Global config handle.
//!
//! Uses `arc-swap` for lock-free reads from the HTTP pool, the actor runtime
//! and session threads.

use crate::config::ProjectConfig;
use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};

/// Global config storage.
pub static CONFIG: LazyLock<ArcSwap<ProjectConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(ProjectConfig::default()));

#[inline]
pub fn cfg() -> Arc<ProjectConfig> {
    CONFIG.load_full()
}

/// Publish the loaded config and return a handle to it.
#[inline]
pub fn init_config(config: ProjectConfig) -> Arc<ProjectConfig> {
    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}
