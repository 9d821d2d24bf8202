pub mod exchange_log;
pub mod record_conn;
pub mod record_listener;
pub mod types;

pub use exchange_log::log_exchange;
pub use record_conn::RecordConn;
pub use record_listener::{RecordListener, RecordListenerBuilder};
pub use types::{Callback, Direction};
