//! Connection decorator recording both directions of traffic.
//!
//! [`RecordConn`] sits between a [`Connection`] and its user. Reads and writes
//! pass through untouched while their bytes are appended to two in-memory
//! buffers; when the connection is closed the buffers are handed to the
//! shared [`Callback`](super::Callback).
//!
//! # Closing
//!
//! The callback fires exactly once, on whichever comes first:
//! - the first `poll_shutdown` (e.g. [`AsyncWriteExt::shutdown`]), before the
//!   wrapped shutdown is polled;
//! - dropping the decorator, before the wrapped connection is dropped.
//!
//! Once delivered, the buffers are released and later I/O is forwarded without
//! being recorded.
//!
//! # Memory
//!
//! Buffers are unbounded and live as long as the connection. Do not record
//! long-lived or high-volume connections.

use std::io::{self, IoSlice};
use std::pin::Pin;
use std::task::{Context, Poll};

use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

use super::types::{Callback, Direction};
use crate::network::types::Connection;

const PREVIEW_BYTES: usize = 64;

/// A connection whose traffic is captured and delivered on close.
///
/// Produced by [`RecordListener::accept`](super::RecordListener); behaves
/// exactly like the wrapped connection apart from the recording side effect.
pub struct RecordConn<C> {
    inner: C,
    incoming: Vec<u8>,
    outgoing: Vec<u8>,
    callback: Callback,
    delivered: bool,
}

impl<C> RecordConn<C> {
    pub(crate) fn new(inner: C, callback: Callback) -> Self {
        Self {
            inner,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            callback,
            delivered: false,
        }
    }

    /// Returns a reference to the wrapped connection.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Returns a mutable reference to the wrapped connection.
    ///
    /// I/O performed directly on it bypasses recording.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    fn record(&mut self, direction: Direction, bytes: &[u8]) {
        if self.delivered || bytes.is_empty() {
            return;
        }
        let preview = &bytes[..bytes.len().min(PREVIEW_BYTES)];
        trace!(
            "captured {} {} bytes: {}{}",
            direction.arrow(),
            bytes.len(),
            String::from_utf8_lossy(preview),
            if bytes.len() > PREVIEW_BYTES { " ..." } else { "" }
        );
        match direction {
            Direction::Inbound => self.incoming.extend_from_slice(bytes),
            Direction::Outbound => self.outgoing.extend_from_slice(bytes),
        }
    }

    fn deliver(&mut self) {
        if self.delivered {
            return;
        }
        self.delivered = true;
        debug!(
            "connection closed, delivering {} inbound and {} outbound bytes",
            self.incoming.len(),
            self.outgoing.len()
        );
        (self.callback)(&self.incoming, &self.outgoing);
        self.incoming = Vec::new();
        self.outgoing = Vec::new();
    }
}

impl<C: AsyncWrite + Unpin> RecordConn<C> {
    /// Shuts the connection down and drops it, delivering the capture.
    ///
    /// Returns the wrapped shutdown result.
    pub async fn close(mut self) -> io::Result<()> {
        self.shutdown().await
    }
}

impl<C: Connection> Connection for RecordConn<C> {
    type Addr = C::Addr;

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }

    fn peer_addr(&self) -> io::Result<Self::Addr> {
        self.inner.peer_addr()
    }
}

impl<C: AsyncRead + Unpin> AsyncRead for RecordConn<C> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let res = Pin::new(&mut this.inner).poll_read(cx, buf);
        // Anything the wrapped read placed in the buffer counts, even next to an error.
        let filled = &buf.filled()[before..];
        if !filled.is_empty() {
            this.record(Direction::Inbound, filled);
        }
        res
    }
}

impl<C: AsyncWrite + Unpin> AsyncWrite for RecordConn<C> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let res = Pin::new(&mut this.inner).poll_write(cx, buf);
        match &res {
            Poll::Ready(Ok(n)) => this.record(Direction::Outbound, &buf[..*n]),
            Poll::Ready(Err(_)) => this.record(Direction::Outbound, buf),
            Poll::Pending => {}
        }
        res
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let res = Pin::new(&mut this.inner).poll_write_vectored(cx, bufs);
        let accepted = match &res {
            Poll::Ready(Ok(n)) => *n,
            Poll::Ready(Err(_)) => usize::MAX,
            Poll::Pending => 0,
        };
        let mut remaining = accepted;
        for slice in bufs {
            if remaining == 0 {
                break;
            }
            let take = slice.len().min(remaining);
            this.record(Direction::Outbound, &slice[..take]);
            remaining -= take;
        }
        res
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.deliver();
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}

impl<C> Drop for RecordConn<C> {
    fn drop(&mut self) {
        self.deliver();
    }
}
