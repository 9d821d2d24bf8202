pub mod hello_server;
pub mod types;

pub use types::{Connection, Listener};
