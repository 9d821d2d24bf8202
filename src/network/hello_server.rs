//! # Hello Server Module
//!
//! A minimal HTTP responder used to exercise recorded listeners: every request
//! gets `200 OK` with a fixed body and the connection is closed.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use netrec::data_capture::{log_exchange, RecordListener};
//! use netrec::error_handling::types::NetworkError;
//! use netrec::network::hello_server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), NetworkError> {
//!     let listener = hello_server::bind("127.0.0.1:8080".parse().unwrap()).await?;
//!     let recorded = RecordListener::new(listener, log_exchange(0));
//!     hello_server::serve(recorded, Arc::from("Hello World!")).await
//! }
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

use super::types::Listener;
use crate::error_handling::types::NetworkError;

/// Upper bound on bytes read while waiting for the end of a request head.
pub const MAX_REQUEST_HEAD: usize = 64 * 1024;

/// Upper bound on request body bytes read after the head.
pub const MAX_REQUEST_BODY: usize = 1024 * 1024;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

const MIN_ACCEPT_BACKOFF: Duration = Duration::from_millis(5);
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

// ENOMEM, ENFILE, EMFILE: same values on Linux and the BSDs.
const EXHAUSTION_ERRNOS: [i32; 3] = [12, 23, 24];

/// Binds a TCP listener on `addr`.
///
/// # Errors
///
/// Returns [`NetworkError::BindError`] if the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, NetworkError> {
    TcpListener::bind(addr).await.map_err(|e| {
        error!("[!] Bind error on {}: {:?}", addr, e);
        NetworkError::BindError(e)
    })
}

/// Accepts connections forever, answering each in its own task.
///
/// Transient accept failures (aborted handshakes, descriptor or memory
/// exhaustion) are logged and retried after a delay doubling from 5ms up
/// to 1s; the delay resets on the next successful accept.
///
/// # Errors
///
/// Returns [`NetworkError::AcceptFailed`] on the first accept failure that is
/// not transient. Failures on individual connections are logged and do not
/// stop the loop.
pub async fn serve<L>(mut listener: L, response_body: Arc<str>) -> Result<(), NetworkError>
where
    L: Listener,
    L::Conn: 'static,
    L::Addr: 'static,
{
    let mut backoff: Option<Duration> = None;
    loop {
        let (conn, peer) = match listener.accept().await {
            Ok(accepted) => {
                backoff = None;
                accepted
            }
            Err(e) if is_transient(&e) => {
                let delay =
                    backoff.map_or(MIN_ACCEPT_BACKOFF, |d| (d * 2).min(MAX_ACCEPT_BACKOFF));
                backoff = Some(delay);
                warn!("accept error: {}; retrying in {:?}", e, delay);
                tokio::time::sleep(delay).await;
                continue;
            }
            Err(e) => return Err(NetworkError::AcceptFailed(e)),
        };
        debug!("accepted connection from {:?}", peer);

        let body = Arc::clone(&response_body);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(conn, &body).await {
                warn!("connection from {:?} failed: {}", peer, e);
            }
        });
    }
}

/// Whether an accept failure is worth retrying.
pub fn is_transient(err: &io::Error) -> bool {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock
        | io::ErrorKind::TimedOut
        | io::ErrorKind::OutOfMemory => true,
        _ => err
            .raw_os_error()
            .is_some_and(|code| EXHAUSTION_ERRNOS.contains(&code)),
    }
}

/// Reads one request (head, then a `Content-Length` body), writes the
/// response, then shuts the stream down.
///
/// A peer closing before sending a full head gets no response. A body cut
/// short by EOF is answered with whatever arrived. Bodies beyond
/// [`MAX_REQUEST_BODY`] are left unread.
pub async fn handle_connection<C>(mut conn: C, body: &str) -> io::Result<()>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let mut request = Vec::new();
    let mut buffer = [0u8; 4096];
    let head_len = loop {
        let n = conn.read(&mut buffer).await?;
        if n == 0 {
            debug!("peer closed before completing a request ({} bytes)", request.len());
            return conn.shutdown().await;
        }
        request.extend_from_slice(&buffer[..n]);
        if let Some(end) = head_end(&request) {
            break end;
        }
        if request.len() >= MAX_REQUEST_HEAD {
            break request.len();
        }
    };

    let wanted = content_length(&request[..head_len]).unwrap_or(0);
    let total = head_len + wanted.min(MAX_REQUEST_BODY);
    while request.len() < total {
        let n = conn.read(&mut buffer).await?;
        if n == 0 {
            debug!(
                "peer closed with {} of {} body bytes",
                request.len() - head_len,
                wanted
            );
            break;
        }
        request.extend_from_slice(&buffer[..n]);
    }

    conn.write_all(response(body).as_bytes()).await?;
    conn.shutdown().await
}

pub(crate) fn response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

/// Length of the request head including its terminator, once complete.
fn head_end(data: &[u8]) -> Option<usize> {
    data.windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
        .map(|pos| pos + HEAD_TERMINATOR.len())
}

fn content_length(head: &[u8]) -> Option<usize> {
    String::from_utf8_lossy(head)
        .split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
}
