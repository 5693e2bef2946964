//! Shutdown state for serve mode.
//!
//! `SHUTDOWN` is set once by the Ctrl+C handler and never cleared. The HTTP
//! server and the actor runtime's shutdown channel are registered after
//! binding, so an interrupt before that point simply exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crossbeam::channel::Sender;
use tiny_http::Server;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Shutdown signal sender for the actor runtime
static SHUTDOWN_TX: OnceLock<Sender<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start
///
/// - Before `register_server()`: exits immediately
/// - After `register_server()`: unblocks the server and notifies the actors
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        let graceful = signal_shutdown(
            &SHUTDOWN,
            SHUTDOWN_TX.get(),
            SERVER.get().map(|server| server.as_ref()),
        );
        if !graceful {
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Raise `flag`, notify the actors and unblock the server.
///
/// Returns `false` when no server is registered yet.
fn signal_shutdown(flag: &AtomicBool, tx: Option<&Sender<()>>, server: Option<&Server>) -> bool {
    flag.store(true, Ordering::SeqCst);

    if let Some(tx) = tx {
        let _ = tx.send(());
    }

    match server {
        Some(server) => {
            crate::log!("serve"; "shutting down...");
            server.unblock();
            true
        }
        None => false,
    }
}

/// Register the HTTP server for graceful shutdown
///
/// Call this after binding the server, before entering the request loop
pub fn register_server(server: Arc<Server>, shutdown_tx: Sender<()>) {
    let _ = SERVER.set(server);
    let _ = SHUTDOWN_TX.set(shutdown_tx);
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
