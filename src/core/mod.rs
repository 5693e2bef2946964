//! Process-wide state shared by the CLI, the request loop and the actors.

mod state;

pub use state::{is_shutdown, register_server, setup_shutdown_handler};
