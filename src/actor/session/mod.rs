//! Session - One Live Reload Subscriber
//!
//! Each accepted WebSocket runs on two threads sharing one closed flag:
//!
//! ```text
//!            +--> inbound  (read deadline, pongs extend it)
//! socket ----+
//!            +--> outbound (Coordinator::next_update -> ping / delta)
//! ```
//!
//! Whichever side fails first closes the session: the flag is set, the TCP
//! stream is shut down in both directions (unblocking a pending read or
//! write) and the coordinator wakes its waiters (unblocking a parked
//! outbound thread).

mod inbound;
mod outbound;

#[cfg(test)]
mod tests;

use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tungstenite::WebSocket;
use tungstenite::protocol::Role;

use super::coordinator::Coordinator;
use crate::config::ReloadConfig;
use crate::debug;
use crate::reload::message;

/// Session timing.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Longest silence tolerated between pongs.
    pub pong_timeout: Duration,
    /// Longest a single outbound message may take.
    pub write_timeout: Duration,
}

impl From<&ReloadConfig> for SessionConfig {
    fn from(config: &ReloadConfig) -> Self {
        Self {
            pong_timeout: config.pong_timeout(),
            write_timeout: config.write_timeout(),
        }
    }
}

/// State shared by the two halves of a session.
struct Shared {
    peer: SocketAddr,
    /// Handle used only to shut the socket down.
    stream: TcpStream,
    closed: AtomicBool,
    coordinator: Arc<Coordinator>,
}

impl Shared {
    /// Close the session. Only the first call has an effect.
    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.stream.shutdown(Shutdown::Both);
        self.coordinator.wake_all();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// A connected subscriber.
pub struct Session {
    shared: Arc<Shared>,
    reader: WebSocket<TcpStream>,
    writer: WebSocket<TcpStream>,
    config: SessionConfig,
}

impl Session {
    /// Perform the WebSocket handshake on `stream`.
    ///
    /// The handshake is bounded by the pong timeout so a silent client
    /// cannot hold the thread.
    pub fn accept(
        stream: TcpStream,
        coordinator: Arc<Coordinator>,
        config: SessionConfig,
    ) -> Result<Self> {
        let peer = stream.peer_addr().context("peer address")?;
        stream.set_read_timeout(Some(config.pong_timeout))?;
        stream.set_write_timeout(Some(config.write_timeout))?;

        let reader = tungstenite::accept_with_config(stream, Some(message::session_config()))
            .map_err(|e| anyhow!("handshake failed: {e}"))?;
        let writer = WebSocket::from_raw_socket(
            reader.get_ref().try_clone()?,
            Role::Server,
            Some(message::session_config()),
        );
        let control = reader.get_ref().try_clone()?;

        Ok(Self {
            shared: Arc::new(Shared {
                peer,
                stream: control,
                closed: AtomicBool::new(false),
                coordinator,
            }),
            reader,
            writer,
            config,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.shared.peer
    }

    /// Run both halves until the session closes. Blocks the calling thread.
    pub fn run(self) -> Result<()> {
        let Self {
            shared,
            reader,
            writer,
            config,
        } = self;
        let coordinator = Arc::clone(&shared.coordinator);
        let view = coordinator.open_session();
        debug!("session"; "{} connected ({} active)", shared.peer, coordinator.sessions());

        let outbound = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(format!("session-out-{}", shared.peer))
                .spawn(move || outbound::run(writer, &shared, view, config.write_timeout))
        };

        match outbound {
            Ok(handle) => {
                inbound::run(reader, &shared, config.pong_timeout);
                let _ = handle.join();
            }
            Err(e) => {
                shared.close();
                coordinator.close_session();
                return Err(e).context("failed to spawn outbound thread");
            }
        }

        coordinator.close_session();
        debug!("session"; "{} disconnected ({} active)", shared.peer, coordinator.sessions());
        Ok(())
    }
}

/// Handshake and run a session on its own thread. Returns immediately.
pub fn spawn(stream: TcpStream, coordinator: Arc<Coordinator>, config: SessionConfig) -> Result<()> {
    thread::Builder::new()
        .name("session".into())
        .spawn(move || {
            let session = match Session::accept(stream, coordinator, config) {
                Ok(session) => session,
                Err(e) => {
                    debug!("session"; "{:#}", e);
                    return;
                }
            };
            let peer = session.peer();
            if let Err(e) = session.run() {
                crate::log!("session"; "{}: {:#}", peer, e);
            }
        })
        .context("failed to spawn session thread")?;
    Ok(())
}

/// Log a transport error: expected disconnects quietly, the rest loudly.
fn report(peer: SocketAddr, side: &str, error: &tungstenite::Error) {
    use tungstenite::Error;

    match error {
        Error::ConnectionClosed | Error::AlreadyClosed => {
            debug!("session"; "{} {}: closed", peer, side);
        }
        Error::Io(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ) =>
        {
            debug!("session"; "{} {}: {}", peer, side, e);
        }
        Error::Protocol(e) => debug!("session"; "{} {}: {}", peer, side, e),
        other => crate::log!("session"; "{} {}: {}", peer, side, other),
    }
}
