//! Transparent traffic recording for network listeners.
//!
//! [`RecordListener`](data_capture::RecordListener) wraps any
//! [`Listener`](network::Listener); every connection it accepts captures the
//! bytes read from and written to it and hands both to a callback, once, when
//! the connection is closed. Otherwise the decorated listener and connections
//! behave exactly like the wrapped ones.
//!
//! **Everything is held in memory while a connection is alive.** Do not use
//! this for long-lived connections or large volumes of data.

pub mod configuration;
pub mod data_capture;
pub mod error_handling;
pub mod network;
