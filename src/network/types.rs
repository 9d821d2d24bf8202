//! Transport-agnostic listener and connection capabilities.
//!
//! The recording decorators wrap anything implementing these traits and
//! implement them again themselves, so a decorated value can be handed to any
//! code written against a plain [`Listener`] or [`Connection`].
//!
//! Closing follows tokio conventions: a listener is closed by dropping it, a
//! connection by `shutdown` (see [`tokio::io::AsyncWriteExt::shutdown`]) and/or
//! dropping it. Sockets carry no deadline setters here; callers bound I/O with
//! [`tokio::time::timeout`], which composes with any wrapper unchanged.

use std::fmt::Debug;
use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

/// A bidirectional byte stream with addressing metadata.
pub trait Connection: AsyncRead + AsyncWrite + Unpin + Send {
    /// Address type of both endpoints (e.g. [`std::net::SocketAddr`]).
    type Addr: Debug + Send;

    /// Returns the local address of this connection.
    fn local_addr(&self) -> io::Result<Self::Addr>;

    /// Returns the address of the remote peer.
    fn peer_addr(&self) -> io::Result<Self::Addr>;
}

/// A passive endpoint accepting incoming [`Connection`]s.
pub trait Listener: Send {
    /// The concrete connection type produced by [`accept`](Listener::accept).
    type Conn: Connection;

    /// Address type reported for the listener and for accepted peers.
    type Addr: Debug + Send;

    /// Waits for and accepts the next inbound connection, returning it along
    /// with the peer address.
    fn accept(
        &mut self,
    ) -> impl Future<Output = io::Result<(Self::Conn, Self::Addr)>> + Send + '_;

    /// Returns the local address the listener is bound to.
    fn local_addr(&self) -> io::Result<Self::Addr>;
}

impl Connection for TcpStream {
    type Addr = std::net::SocketAddr;

    fn local_addr(&self) -> io::Result<Self::Addr> {
        TcpStream::local_addr(self)
    }

    fn peer_addr(&self) -> io::Result<Self::Addr> {
        TcpStream::peer_addr(self)
    }
}

impl Listener for TcpListener {
    type Conn = TcpStream;
    type Addr = std::net::SocketAddr;

    fn accept(
        &mut self,
    ) -> impl Future<Output = io::Result<(Self::Conn, Self::Addr)>> + Send + '_ {
        TcpListener::accept(self)
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        TcpListener::local_addr(self)
    }
}

#[cfg(unix)]
mod unix {
    use std::future::Future;
    use std::io;

    use tokio::net::{unix::SocketAddr, UnixListener, UnixStream};

    use super::{Connection, Listener};

    impl Connection for UnixStream {
        type Addr = SocketAddr;

        fn local_addr(&self) -> io::Result<Self::Addr> {
            UnixStream::local_addr(self)
        }

        fn peer_addr(&self) -> io::Result<Self::Addr> {
            UnixStream::peer_addr(self)
        }
    }

    impl Listener for UnixListener {
        type Conn = UnixStream;
        type Addr = SocketAddr;

        fn accept(
            &mut self,
        ) -> impl Future<Output = io::Result<(Self::Conn, Self::Addr)>> + Send + '_ {
            UnixListener::accept(self)
        }

        fn local_addr(&self) -> io::Result<Self::Addr> {
            UnixListener::local_addr(self)
        }
    }
}
