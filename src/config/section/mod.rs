//! Configuration section definitions.
//!
//! Each module corresponds to a section in `livestamp.toml`:
//!
//! | Module   | TOML Section | Purpose                                  |
//! |----------|--------------|------------------------------------------|
//! | `build`  | `[build]`    | Watch-build command producer             |
//! | `reload` | `[reload]`   | Session timing and version retention     |
//! | `serve`  | `[serve]`    | HTTP and WebSocket listeners             |
//! | `watch`  | `[watch]`    | Directory watcher producer               |

mod build;
mod reload;
mod serve;
mod watch;

pub use build::BuildConfig;
pub use reload::ReloadConfig;
pub use serve::ServeConfig;
pub use watch::WatchConfig;
