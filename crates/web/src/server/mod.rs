//! Connection serving.
//!
//! Two interchangeable backends over the same decoder/matcher/service stack:
//!
//! - [`event_loop`]: the default. One tokio runtime; `workers` accept tasks
//!   share the listening socket and the kernel spreads incoming connections
//!   across them. Each connection runs as its own task over a framed
//!   read/write pair, enforcing read/write timeouts and the request size
//!   cap. The bound [`Matcher`](crate::routing::Matcher) is a frozen `Arc`
//!   snapshot, so the hot path takes no locks.
//! - [`blocking`]: a portable single-threaded fallback over `std::net`,
//!   selected with [`ServerBuilder::blocking`].
//!
//! Listening happens on TCP or on a UNIX-domain socket (mutually exclusive;
//! setting a socket path switches the target). The socket file is removed
//! on clean shutdown.

mod blocking;
mod event_loop;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use carafe_http::codec::{DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_REQUEST_BYTES};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::routing::Matcher;
use crate::service::Service;

pub use event_loop::BoundServer;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("bind error on {target}: {source}")]
    Bind { target: String, source: io::Error },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ServeError {
    fn bind<T: ToString>(target: T, source: io::Error) -> Self {
        Self::Bind { target: target.to_string(), source }
    }
}

/// Where the server listens.
#[derive(Debug, Clone)]
enum BindTarget {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

/// Limits and knobs shared by both backends.
#[derive(Debug, Clone)]
pub(crate) struct ServerConfig {
    pub(crate) workers: usize,
    pub(crate) read_timeout: Duration,
    pub(crate) write_timeout: Duration,
    pub(crate) max_header_bytes: usize,
    pub(crate) max_request_bytes: usize,
}

/// Staged server configuration.
#[derive(Debug, Clone)]
pub struct ServerBuilder {
    target: BindTarget,
    blocking: bool,
    config: ServerConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self {
            target: BindTarget::Tcp { host: "127.0.0.1".to_owned(), port: 5000 },
            blocking: false,
            config: ServerConfig {
                workers: 1,
                read_timeout: Duration::from_secs(30),
                write_timeout: Duration::from_secs(30),
                max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
                max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            },
        }
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// TCP listen host; switches the target back to TCP if a socket path
    /// was set.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        let port = match &self.target {
            BindTarget::Tcp { port, .. } => *port,
            BindTarget::Unix(_) => 5000,
        };
        self.target = BindTarget::Tcp { host: host.into(), port };
        self
    }

    /// TCP listen port; switches the target back to TCP if a socket path
    /// was set.
    pub fn port(mut self, port: u16) -> Self {
        let host = match self.target {
            BindTarget::Tcp { host, .. } => host,
            BindTarget::Unix(_) => "127.0.0.1".to_owned(),
        };
        self.target = BindTarget::Tcp { host, port };
        self
    }

    /// Listen on a UNIX-domain socket instead of TCP.
    pub fn unix_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = BindTarget::Unix(path.into());
        self
    }

    /// Number of accept tasks sharing the listening socket.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers.max(1);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Cap on the request line + header section of one request.
    pub fn max_header_bytes(mut self, limit: usize) -> Self {
        self.config.max_header_bytes = limit;
        self
    }

    /// Cap on one whole request, declared body included.
    pub fn max_request_bytes(mut self, limit: usize) -> Self {
        self.config.max_request_bytes = limit;
        self
    }

    /// Selects the single-threaded blocking backend.
    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    pub fn build(self) -> Server {
        Server { target: self.target, blocking: self.blocking, config: self.config }
    }
}

/// A configured, not-yet-bound server.
#[derive(Debug)]
pub struct Server {
    target: BindTarget,
    blocking: bool,
    config: ServerConfig,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds and serves until interrupted (Ctrl-C, or SIGTERM on unix).
    /// This is the blocking entry point: it owns the runtime.
    pub fn run<S: Service>(self, matcher: Matcher, service: S) -> Result<(), ServeError> {
        if self.blocking {
            return blocking::serve(&self.target, &self.config, matcher, Arc::new(service));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        runtime.block_on(async {
            let bound = self.bind().await?;
            bound.serve_with_shutdown(matcher, service, shutdown_signal()).await
        })
    }

    /// Binds the listening socket for the event-driven backend, returning a
    /// handle that can report its local address before serving.
    pub async fn bind(self) -> Result<BoundServer, ServeError> {
        let listener = match &self.target {
            BindTarget::Tcp { host, port } => {
                let address = format!("{host}:{port}");
                let listener =
                    TcpListener::bind(&address).await.map_err(|e| ServeError::bind(&address, e))?;
                info!(%address, "listening on tcp");
                event_loop::Listener::Tcp(listener)
            }
            #[cfg(unix)]
            BindTarget::Unix(path) => {
                // a previous unclean shutdown may have left the file behind
                let _ = std::fs::remove_file(path);
                let listener = tokio::net::UnixListener::bind(path)
                    .map_err(|e| ServeError::bind(path.display(), e))?;
                info!(path = %path.display(), "listening on unix socket");
                event_loop::Listener::Unix { listener, path: path.clone() }
            }
            #[cfg(not(unix))]
            BindTarget::Unix(path) => {
                return Err(ServeError::bind(
                    path.display(),
                    io::Error::new(io::ErrorKind::Unsupported, "unix sockets require a unix platform"),
                ));
            }
        };
        Ok(BoundServer::new(listener, self.config))
    }

}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                tracing::warn!(cause = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
