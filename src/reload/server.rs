//! WebSocket Server for Live Reload
//!
//! Accepts subscriber connections on their own port and hands each one to a
//! [`Session`](crate::actor::session::Session) thread.

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::actor::Coordinator;
use crate::actor::session::{self, SessionConfig};
use crate::{debug, log};

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Accept loop poll interval while no client is waiting.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Bind the WebSocket listener, trying the next port if one is in use.
pub fn bind(interface: IpAddr, base_port: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                if offset > 0 {
                    log!("reload"; "port {} in use, using {} instead", base_port, actual_port);
                }
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        MAX_PORT_RETRIES,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Spawn the accept thread. It exits once the coordinator shuts down.
pub fn start(
    listener: TcpListener,
    coordinator: Arc<Coordinator>,
    config: SessionConfig,
) -> Result<JoinHandle<()>> {
    listener.set_nonblocking(true)?;

    thread::Builder::new()
        .name("ws-accept".into())
        .spawn(move || {
            while !coordinator.is_shutdown() {
                match listener.accept() {
                    Ok((stream, addr)) => {
                        debug!("reload"; "client connected: {}", addr);

                        // Sessions use blocking I/O with timeouts
                        if let Err(e) = stream.set_nonblocking(false) {
                            debug!("reload"; "{}: {}", addr, e);
                            continue;
                        }
                        if let Err(e) = session::spawn(stream, Arc::clone(&coordinator), config) {
                            log!("reload"; "{:#}", e);
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                    Err(e) => {
                        log!("reload"; "accept error: {}", e);
                        thread::sleep(ACCEPT_POLL);
                    }
                }
            }
            debug!("reload"; "accept loop stopped");
        })
        .context("failed to spawn accept thread")
}
