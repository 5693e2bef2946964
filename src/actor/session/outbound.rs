//! Outbound half: heartbeats and deltas.

use std::net::TcpStream;
use std::time::Duration;

use tungstenite::WebSocket;

use super::{Shared, report};
use crate::actor::coordinator::SessionView;
use crate::reload::message;
use crate::{debug, log};

/// Push every update the coordinator hands out until the session closes.
///
/// A heartbeat becomes a ping frame, a non-empty delta one text frame.
/// Each write is bounded by `write_timeout`.
pub(super) fn run(
    mut ws: WebSocket<TcpStream>,
    shared: &Shared,
    mut view: SessionView,
    write_timeout: Duration,
) {
    if let Err(e) = ws.get_ref().set_write_timeout(Some(write_timeout)) {
        debug!("session"; "{} outbound: {}", shared.peer, e);
        shared.close();
        return;
    }

    while let Some(update) = shared.coordinator.next_update(&mut view, &shared.closed) {
        if update.heartbeat
            && let Err(e) = ws.send(message::heartbeat())
        {
            if !shared.is_closed() {
                report(shared.peer, "heartbeat", &e);
            }
            break;
        }

        if update.delta.is_empty() {
            continue;
        }
        let frame = match message::delta(&update.delta) {
            Ok(frame) => frame,
            Err(e) => {
                log!("session"; "failed to encode delta: {}", e);
                break;
            }
        };
        debug!("session"; "{} <- {} changes", shared.peer, update.delta.len());
        if let Err(e) = ws.send(frame) {
            if !shared.is_closed() {
                report(shared.peer, "outbound", &e);
            }
            break;
        }
    }

    shared.close();
}
