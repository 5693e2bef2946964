//! Server lifecycle management.

use crate::{
    actor::{Coordinator, coordinator::run_actors},
    config::ProjectConfig,
    core::register_server,
    log,
};
use anyhow::Result;
use crossbeam::channel::{Receiver, Sender};
use std::{
    net::{IpAddr, SocketAddr, TcpListener},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};
use tiny_http::Server;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut port = base_port;
    for offset in 0..MAX_PORT_RETRIES {
        port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(_) if offset + 1 < MAX_PORT_RETRIES => continue,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to bind after {} attempts (ports {}-{}): {}",
                    MAX_PORT_RETRIES,
                    base_port,
                    port,
                    e
                ));
            }
        }
    }
    anyhow::bail!("no port available in {}-{}", base_port, port)
}

/// Register server for graceful shutdown.
///
/// When Ctrl+C is pressed, the handler installed in `main()` unblocks the
/// server and notifies the actor runtime.
pub fn register_server_for_shutdown(server: Arc<Server>, shutdown_tx: Sender<()>) {
    register_server(server, shutdown_tx);
}

/// Spawn the actor runtime (heartbeat, producers, WebSocket sessions).
pub fn spawn_actors(
    coordinator: Arc<Coordinator>,
    config: Arc<ProjectConfig>,
    ws_listener: TcpListener,
    shutdown_rx: Receiver<()>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("actors".into())
        .spawn(move || run_actor_system(coordinator, config, ws_listener, shutdown_rx))?;
    Ok(handle)
}

fn run_actor_system(
    coordinator: Arc<Coordinator>,
    config: Arc<ProjectConfig>,
    ws_listener: TcpListener,
    shutdown_rx: Receiver<()>,
) {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log!("actor"; "failed to create tokio runtime: {}", e);
            coordinator.shutdown();
            return;
        }
    };

    rt.block_on(async {
        if let Err(e) = run_actors(Arc::clone(&coordinator), config, ws_listener, shutdown_rx).await {
            log!("actor"; "error: {}", e);
            coordinator.shutdown();
        }
    });
}

/// Wait for the actor runtime to stop (max 2 seconds).
pub fn wait_for_shutdown(handle: JoinHandle<()>) {
    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
    log!("serve"; "actors did not stop in time");
}
