//! Inbound half: liveness.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use tungstenite::{Error, WebSocket};

use super::{Shared, report};
use crate::debug;
use crate::reload::message::Inbound;

/// Read frames until the client closes, errs or stays silent past the
/// deadline. Each pong pushes the deadline `pong_timeout` into the future.
pub(super) fn run(mut ws: WebSocket<TcpStream>, shared: &Shared, pong_timeout: Duration) {
    let mut deadline = Instant::now() + pong_timeout;

    while !shared.is_closed() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!("session"; "{} missed heartbeat", shared.peer);
            break;
        }
        if let Err(e) = ws.get_ref().set_read_timeout(Some(remaining)) {
            debug!("session"; "{} inbound: {}", shared.peer, e);
            break;
        }

        match ws.read() {
            Ok(message) => match Inbound::classify(&message) {
                Inbound::Ack => deadline = Instant::now() + pong_timeout,
                Inbound::Close => {
                    debug!("session"; "{} sent close", shared.peer);
                    break;
                }
                Inbound::Ignore => {}
            },
            // Deadline re-checked at the top of the loop
            Err(Error::Io(e)) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(Error::Capacity(e)) => {
                debug!("session"; "{} sent an oversized message: {}", shared.peer, e);
                break;
            }
            Err(e) => {
                if !shared.is_closed() {
                    report(shared.peer, "inbound", &e);
                }
                break;
            }
        }
    }

    shared.close();
}
