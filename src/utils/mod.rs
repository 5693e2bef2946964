//! Utility modules shared across the server.

pub mod date;
pub mod mime;
pub mod path;
pub mod plural;
