//! Listener decorator producing recorded connections.
//!
//! ```no_run
//! use netrec::data_capture::RecordListener;
//! use netrec::network::Listener;
//! use tokio::io::AsyncWriteExt;
//! use tokio::net::TcpListener;
//!
//! # async fn run() -> std::io::Result<()> {
//! let inner = TcpListener::bind("127.0.0.1:8080").await?;
//! let mut listener = RecordListener::new(inner, |inb: &[u8], outb: &[u8]| {
//!     println!("read {} bytes, wrote {} bytes", inb.len(), outb.len());
//! });
//!
//! let (mut conn, _peer) = listener.accept().await?;
//! conn.write_all(b"hello").await?;
//! conn.close().await?; // callback fires here
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::io;
use std::sync::Arc;

use log::debug;

use super::record_conn::RecordConn;
use super::types::Callback;
use crate::error_handling::types::RecordError;
use crate::network::types::Listener;

/// Wraps a [`Listener`] so every accepted connection is a [`RecordConn`].
///
/// The wrapped listener is owned: dropping the decorator closes it. Apart from
/// wrapping accepted connections, every operation is forwarded unchanged.
pub struct RecordListener<L> {
    inner: L,
    callback: Callback,
}

impl<L: Listener> RecordListener<L> {
    /// Wraps `listener`, delivering each connection's capture to `callback`
    /// when that connection closes.
    pub fn new<F>(listener: L, callback: F) -> Self
    where
        F: Fn(&[u8], &[u8]) + Send + Sync + 'static,
    {
        Self::with_callback(listener, Arc::new(callback))
    }

    /// Like [`new`](Self::new), for a callback already behind an `Arc`.
    pub fn with_callback(listener: L, callback: Callback) -> Self {
        Self {
            inner: listener,
            callback,
        }
    }

    /// Starts a builder, for callers that only learn the callback later.
    pub fn builder(listener: L) -> RecordListenerBuilder<L> {
        RecordListenerBuilder {
            listener,
            callback: None,
        }
    }

    pub fn get_ref(&self) -> &L {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut L {
        &mut self.inner
    }

    /// Unwraps the listener. Connections already accepted keep recording.
    pub fn into_inner(self) -> L {
        self.inner
    }
}

impl<L: Listener> Listener for RecordListener<L> {
    type Conn = RecordConn<L::Conn>;
    type Addr = L::Addr;

    fn accept(
        &mut self,
    ) -> impl Future<Output = io::Result<(Self::Conn, Self::Addr)>> + Send + '_ {
        async move {
            let (conn, peer) = self.inner.accept().await?;
            debug!("recording connection from {:?}", peer);
            Ok((RecordConn::new(conn, Arc::clone(&self.callback)), peer))
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

/// Builder for [`RecordListener`]; fails at build time without a callback.
pub struct RecordListenerBuilder<L> {
    listener: L,
    callback: Option<Callback>,
}

impl<L: Listener> RecordListenerBuilder<L> {
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[u8], &[u8]) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn shared_callback(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// # Errors
    ///
    /// Returns [`RecordError::MissingCallback`] if no callback was supplied.
    pub fn build(self) -> Result<RecordListener<L>, RecordError> {
        let callback = self.callback.ok_or(RecordError::MissingCallback)?;
        Ok(RecordListener::with_callback(self.listener, callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::types::mock::{MockListener, LOCAL, PEER};
    use crate::network::types::Connection;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_test::io::Builder;

    type Captures = Arc<Mutex<Vec<(Vec<u8>, Vec<u8>)>>>;

    fn capturing_callback() -> (Callback, Captures) {
        let captures: Captures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captures);
        let callback: Callback = Arc::new(move |inb: &[u8], outb: &[u8]| {
            sink.lock().unwrap().push((inb.to_vec(), outb.to_vec()));
        });
        (callback, captures)
    }

    #[tokio::test]
    async fn test_accept_wraps_and_isolates_connections() {
        let (callback, captures) = capturing_callback();
        let inner = MockListener::new(vec![
            Ok(Builder::new().read(b"first").write(b"1").build()),
            Ok(Builder::new().read(b"second").write(b"2").build()),
        ]);
        let mut listener = RecordListener::with_callback(inner, callback);

        let (mut a, peer_a) = listener.accept().await.unwrap();
        let (mut b, _) = listener.accept().await.unwrap();
        assert_eq!(peer_a, PEER);
        assert_eq!(a.peer_addr().unwrap(), PEER);

        let mut buf = [0u8; 16];
        let n = b.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"second");
        let n = a.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"first");
        a.write_all(b"1").await.unwrap();
        b.write_all(b"2").await.unwrap();

        b.close().await.unwrap();
        a.close().await.unwrap();

        let captures = captures.lock().unwrap();
        assert_eq!(
            *captures,
            vec![
                (b"second".to_vec(), b"2".to_vec()),
                (b"first".to_vec(), b"1".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn test_accept_error_passes_through_without_connection() {
        let (callback, captures) = capturing_callback();
        let mut listener = RecordListener::with_callback(MockListener::new(vec![]), callback);

        let err = listener.accept().await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::AddrNotAvailable);
        assert_eq!(err.to_string(), "exhausted");
        assert!(captures.lock().unwrap().is_empty());
    }

    #[test]
    fn test_local_addr_forwarded() {
        let listener = RecordListener::new(MockListener::new(vec![]), |_: &[u8], _: &[u8]| {});
        assert_eq!(listener.local_addr().unwrap(), LOCAL);
        assert!(listener.get_ref().pending.is_empty());
    }

    #[tokio::test]
    async fn test_get_mut_reaches_wrapped_listener() {
        let (callback, captures) = capturing_callback();
        let mut listener = RecordListener::with_callback(MockListener::new(vec![]), callback);

        listener
            .get_mut()
            .pending
            .push_back(Ok(Builder::new().write(b"late").build()));

        let (mut conn, _) = listener.accept().await.unwrap();
        conn.write_all(b"late").await.unwrap();
        drop(conn);

        assert_eq!(captures.lock().unwrap()[0].1, b"late");
    }

    #[tokio::test]
    async fn test_into_inner_keeps_accepted_connections_recording() {
        let (callback, captures) = capturing_callback();
        let mut listener = RecordListener::with_callback(
            MockListener::new(vec![
                Ok(Builder::new().read(b"kept").build()),
                Ok(Builder::new().read(b"plain").build()),
            ]),
            callback,
        );

        let (mut recorded, _) = listener.accept().await.unwrap();
        let mut inner = listener.into_inner();
        let (mut plain, _) = inner.accept().await.unwrap();

        let mut buf = [0u8; 8];
        let n = plain.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"plain");
        drop(plain);
        assert!(captures.lock().unwrap().is_empty());

        let n = recorded.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"kept");
        drop(recorded);

        let captures = captures.lock().unwrap();
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].0, b"kept");
    }

    #[test]
    fn test_builder_without_callback_fails() {
        let result = RecordListener::builder(MockListener::new(vec![])).build();
        assert_eq!(result.err(), Some(RecordError::MissingCallback));
    }

    #[test]
    fn test_builder_with_callback_succeeds() {
        let listener = RecordListener::builder(MockListener::new(vec![]))
            .callback(|_: &[u8], _: &[u8]| {})
            .build();
        assert!(listener.is_ok());
    }

    #[tokio::test]
    async fn test_builder_shared_callback_is_shared() {
        let (callback, captures) = capturing_callback();
        let mut first = RecordListener::builder(MockListener::new(vec![Ok(Builder::new()
            .write(b"a")
            .build())]))
        .shared_callback(Arc::clone(&callback))
        .build()
        .unwrap();
        let mut second = RecordListener::builder(MockListener::new(vec![Ok(Builder::new()
            .write(b"b")
            .build())]))
        .shared_callback(callback)
        .build()
        .unwrap();

        let (mut a, _) = first.accept().await.unwrap();
        let (mut b, _) = second.accept().await.unwrap();
        a.write_all(b"a").await.unwrap();
        b.write_all(b"b").await.unwrap();
        a.close().await.unwrap();
        b.close().await.unwrap();

        let captures = captures.lock().unwrap();
        assert_eq!(captures.len(), 2);
        assert_eq!(captures[0].1, b"a");
        assert_eq!(captures[1].1, b"b");
    }
}
