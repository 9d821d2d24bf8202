//! Common data types used across the data_capture subsystem.

use std::sync::Arc;

/// Receives everything that passed through a connection, once, when it closes.
///
/// The first slice holds every byte read from the connection (`in`), the second
/// every byte written to it (`out`). Both are borrowed for the duration of the
/// call only; copy them to keep them. The callback runs inline on the close
/// path, so it must not block for long, and it has no way to return an error:
/// report failures through logging or a channel of your own.
///
/// One callback is shared by every connection accepted from the same
/// [`RecordListener`](super::RecordListener).
pub type Callback = Arc<dyn Fn(&[u8], &[u8]) + Send + Sync>;

/// Direction of captured bytes, relative to the local end of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes read from the connection.
    Inbound,
    /// Bytes written to the connection.
    Outbound,
}

impl Direction {
    pub(crate) fn arrow(self) -> &'static str {
        match self {
            Direction::Inbound => "<-",
            Direction::Outbound => "->",
        }
    }
}
