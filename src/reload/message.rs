//! Live Reload Wire Protocol
//!
//! Server → client:
//!
//! - text frame: JSON object mapping artifact names to their new stamp, or
//!   `null` when the artifact was removed
//!   (`{"/game.js":"2024-06-15T14:30:45.123456","/shader/old.glsl":null}`)
//! - ping frame: heartbeat, answered by the client's pong
//!
//! Client → server: pongs keep the session alive. Anything else is ignored.
//! A message or frame over [`MAX_INBOUND_MESSAGE`] bytes fails the read and
//! closes the session.

use tungstenite::protocol::{Message, WebSocketConfig};

use crate::store::Delta;

/// Largest client message accepted, of any kind (clients have nothing to say).
pub const MAX_INBOUND_MESSAGE: usize = 1024;

/// Socket config enforcing [`MAX_INBOUND_MESSAGE`] on reads.
pub fn session_config() -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(MAX_INBOUND_MESSAGE))
        .max_frame_size(Some(MAX_INBOUND_MESSAGE))
}

/// Encode a manifest delta as one text frame.
pub fn delta(delta: &Delta) -> serde_json::Result<Message> {
    Ok(Message::text(serde_json::to_string(delta)?))
}

/// Heartbeat probe.
pub fn heartbeat() -> Message {
    Message::Ping(Default::default())
}

/// What an inbound frame means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Heartbeat acknowledged: extend the read deadline.
    Ack,
    /// Client is going away.
    Close,
    /// Anything else.
    Ignore,
}

impl Inbound {
    pub fn classify(message: &Message) -> Self {
        match message {
            Message::Pong(_) => Self::Ack,
            Message::Close(_) => Self::Close,
            _ => Self::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use super::*;
    use crate::store::{ArtifactChange, Content, Manifest, VersionedStore};

    #[test]
    fn test_delta_message_is_json_text() {
        let t1 = UNIX_EPOCH + Duration::from_secs(946_728_000);
        let mut store = VersionedStore::default();
        store.upsert("/game.js", t1, ArtifactChange::Put(Content::new("main()")));
        store.upsert("/shader/old.glsl", t1, ArtifactChange::Put(Content::new("x")));

        let mut manifest = Manifest::new();
        store.compute_delta(&mut manifest);
        store.upsert(
            "/shader/old.glsl",
            t1 + Duration::from_secs(1),
            ArtifactChange::Tombstone,
        );
        let later: SystemTime = t1 + Duration::from_millis(1500);
        store.upsert("/game.js", later, ArtifactChange::Put(Content::new("main(2)")));

        let message = delta(&store.compute_delta(&mut manifest)).unwrap();
        let Message::Text(text) = message else {
            panic!("expected a text frame");
        };
        assert_eq!(
            text.as_str(),
            r#"{"/game.js":"2000-01-01T12:00:01.500000","/shader/old.glsl":null}"#
        );
    }

    #[test]
    fn test_heartbeat_is_ping() {
        assert!(matches!(heartbeat(), Message::Ping(_)));
    }

    #[test]
    fn test_classify_inbound() {
        assert_eq!(Inbound::classify(&Message::Pong(Default::default())), Inbound::Ack);
        assert_eq!(Inbound::classify(&Message::Close(None)), Inbound::Close);
        assert_eq!(Inbound::classify(&Message::text("hello")), Inbound::Ignore);
        assert_eq!(Inbound::classify(&Message::Ping(Default::default())), Inbound::Ignore);
    }
}
