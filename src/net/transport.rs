//! Transport seams between the connector and the socket layer.
//!
//! # Responsibilities
//! - Define how a connection to one endpoint is opened (`Dialer`)
//! - Define what the connector may still do with a live connection (`Transport`)
//! - Provide the TCP implementation used by the binary
//!
//! # Design Decisions
//! - Dialing returns a boxed `'static` future so attempts can run as detached tasks
//! - The connector only ever calls `wake_up` and `close` on a live transport;
//!   reading and writing belong to the client that received it in `init`

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tokio::time::timeout;

use crate::config::ConnectConfig;
use crate::net::endpoint::Endpoint;

/// Errors raised while opening a connection to one endpoint.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The socket layer refused or failed the connection.
    #[error("failed to connect to {endpoint}: {source}")]
    Io {
        endpoint: Endpoint,
        #[source]
        source: std::io::Error,
    },

    /// The connection was not established before the connect timeout.
    #[error("connect to {endpoint} timed out after {secs} seconds")]
    Timeout { endpoint: Endpoint, secs: u64 },
}

/// A live connection, as seen by the connector.
pub trait Transport: Send + Sync + 'static {
    /// Resume any paused readiness polling on this connection.
    fn wake_up(&self);

    /// Close the connection. Must be idempotent.
    fn close(&self);
}

/// Opens transports to endpoints.
pub trait Dialer: Send + Sync + 'static {
    type Transport: Transport;

    fn dial(&self, endpoint: &Endpoint) -> BoxFuture<'static, Result<Self::Transport, ConnectError>>;
}

/// Dials plain TCP connections with a connect timeout.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    connect_timeout: Duration,
    nodelay: bool,
}

impl TcpDialer {
    pub fn new(config: &ConnectConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.timeout_secs),
            nodelay: config.nodelay,
        }
    }
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self::new(&ConnectConfig::default())
    }
}

impl Dialer for TcpDialer {
    type Transport = TcpTransport;

    fn dial(&self, endpoint: &Endpoint) -> BoxFuture<'static, Result<TcpTransport, ConnectError>> {
        let endpoint = endpoint.clone();
        let connect_timeout = self.connect_timeout;
        let nodelay = self.nodelay;

        async move {
            let result = {
                let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
                timeout(connect_timeout, connect).await
            };
            let stream = match result {
                Ok(Ok(stream)) => stream,
                Ok(Err(source)) => return Err(ConnectError::Io { endpoint, source }),
                Err(_) => {
                    return Err(ConnectError::Timeout {
                        endpoint,
                        secs: connect_timeout.as_secs(),
                    })
                }
            };

            if nodelay {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!(endpoint = %endpoint, error = %e, "Failed to set TCP_NODELAY");
                }
            }

            let peer_addr = stream
                .peer_addr()
                .map_err(|source| ConnectError::Io { endpoint: endpoint.clone(), source })?;

            tracing::debug!(endpoint = %endpoint, peer_addr = %peer_addr, "TCP connection established");
            Ok(TcpTransport::new(stream, peer_addr))
        }
        .boxed()
    }
}

/// An established TCP connection.
///
/// The client takes the stream out in `init` and drives I/O itself; the
/// transport keeps the wake-up and close signals the connector uses.
#[derive(Debug)]
pub struct TcpTransport {
    stream: Mutex<Option<TcpStream>>,
    peer_addr: SocketAddr,
    wake: Notify,
    closed: AtomicBool,
}

impl TcpTransport {
    fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        Self {
            stream: Mutex::new(Some(stream)),
            peer_addr,
            wake: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Take ownership of the socket. Returns `None` once taken or closed.
    pub fn take_stream(&self) -> Option<TcpStream> {
        if self.is_closed() {
            return None;
        }
        self.stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Resolves on the next `wake_up` or `close`.
    pub fn woken(&self) -> Notified<'_> {
        self.wake.notified()
    }
}

impl Transport for TcpTransport {
    fn wake_up(&self) {
        tracing::trace!(peer_addr = %self.peer_addr, "Waking transport");
        self.wake.notify_waiters();
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Dropping an untaken stream closes the socket.
        drop(
            self.stream
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        self.wake.notify_waiters();
        tracing::debug!(peer_addr = %self.peer_addr, "Transport closed");
    }
}
