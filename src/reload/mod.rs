//! Live reload wire layer.
//!
//! # Modules
//!
//! - `message` - Outbound delta / manifest frames and inbound limits
//! - `server` - WebSocket listener and accept loop
//!
//! Session logic lives in `actor::session`; this module only knows how to
//! bind, accept and encode.

pub mod message;
pub mod server;
