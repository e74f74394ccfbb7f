//! The event-driven backend.
//!
//! `workers` accept tasks share one listening socket; the kernel distributes
//! incoming connections across whichever is parked in `accept`. Each
//! connection becomes its own task running a framed read/dispatch/write
//! cycle until keep-alive ends, a timeout or size cap fires, or shutdown is
//! requested.
//!
//! Shutdown is graceful by default: a watch signal stops the accept tasks
//! and the per-connection keep-alive loops, and a guard channel waits for
//! every in-flight connection to finish before `serve` returns.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use carafe_http::codec::{RequestDecoder, ResponseEncoder};
use carafe_http::protocol::{ParseError, Response};
use futures::{SinkExt, StreamExt};
use http::StatusCode;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use crate::request::Request;
use crate::routing::Matcher;
use crate::server::{ServeError, ServerConfig};
use crate::service::{RequestContext, Service};

pub(crate) enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix { listener: tokio::net::UnixListener, path: PathBuf },
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp(l) => f.debug_tuple("Tcp").field(&l.local_addr().ok()).finish(),
            #[cfg(unix)]
            Self::Unix { path, .. } => f.debug_tuple("Unix").field(path).finish(),
        }
    }
}

trait Stream: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> Stream for T {}

impl Listener {
    async fn accept(&self) -> io::Result<Box<dyn Stream>> {
        match self {
            Self::Tcp(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok(Box::new(stream))
            }
            #[cfg(unix)]
            Self::Unix { listener, .. } => {
                let (stream, _) = listener.accept().await?;
                Ok(Box::new(stream))
            }
        }
    }
}

/// A bound, not-yet-serving event-driven server.
#[derive(Debug)]
pub struct BoundServer {
    listener: Listener,
    config: ServerConfig,
}

impl BoundServer {
    pub(crate) fn new(listener: Listener, config: ServerConfig) -> Self {
        Self { listener, config }
    }

    /// The bound TCP address; `None` for a UNIX-domain socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            Listener::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            Listener::Unix { .. } => None,
        }
    }

    /// Serves until the process dies; see
    /// [`serve_with_shutdown`](Self::serve_with_shutdown).
    pub async fn serve<S: Service>(self, matcher: Matcher, service: S) -> Result<(), ServeError> {
        self.serve_with_shutdown(matcher, service, std::future::pending()).await
    }

    /// Serves until `shutdown` resolves, then drains: accept tasks stop,
    /// in-flight connections finish their current request, the socket file
    /// (if any) is removed.
    pub async fn serve_with_shutdown<S: Service>(
        self,
        matcher: Matcher,
        service: S,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ServeError> {
        let socket_path: Option<PathBuf> = match &self.listener {
            #[cfg(unix)]
            Listener::Unix { path, .. } => Some(path.clone()),
            _ => None,
        };

        let listener = Arc::new(self.listener);
        let config = Arc::new(self.config);
        let service = Arc::new(service);
        let (stop_tx, stop_rx) = watch::channel(false);
        let (guard_tx, mut guard_rx) = mpsc::channel::<()>(1);

        for worker in 0..config.workers {
            let listener = Arc::clone(&listener);
            let config = Arc::clone(&config);
            let matcher = matcher.clone();
            let service = Arc::clone(&service);
            let stop = stop_rx.clone();
            let guard = guard_tx.clone();
            tokio::spawn(accept_loop(worker, listener, config, matcher, service, stop, guard));
        }
        drop(guard_tx);
        drop(stop_rx);

        shutdown.await;
        info!("shutdown requested, draining connections");
        let _ = stop_tx.send(true);

        // every accept task and connection task holds a guard sender; recv
        // yields None once the last one is gone
        let _ = guard_rx.recv().await;

        if let Some(path) = socket_path {
            let _ = std::fs::remove_file(path);
        }
        info!("server stopped");
        Ok(())
    }
}

async fn accept_loop<S: Service>(
    worker: usize,
    listener: Arc<Listener>,
    config: Arc<ServerConfig>,
    matcher: Matcher,
    service: Arc<S>,
    mut stop: watch::Receiver<bool>,
    guard: mpsc::Sender<()>,
) {
    debug!(worker, "accept task started");
    loop {
        let accepted = tokio::select! {
            _ = stop.changed() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok(stream) => {
                let config = Arc::clone(&config);
                let matcher = matcher.clone();
                let service = Arc::clone(&service);
                let stop = stop.clone();
                let guard = guard.clone();
                tokio::spawn(handle_connection(stream, config, matcher, service, stop, guard));
            }
            Err(e) => {
                warn!(worker, cause = %e, "accept failed");
            }
        }
    }
    debug!(worker, "accept task stopped");
}

async fn handle_connection<S: Service>(
    stream: Box<dyn Stream>,
    config: Arc<ServerConfig>,
    matcher: Matcher,
    service: Arc<S>,
    mut stop: watch::Receiver<bool>,
    _guard: mpsc::Sender<()>,
) {
    let (read_half, write_half) = tokio::io::split(stream);
    let decoder = RequestDecoder::with_limits(config.max_header_bytes, config.max_request_bytes);
    let mut reader = FramedRead::new(read_half, decoder);
    let mut writer = FramedWrite::new(write_half, ResponseEncoder::new());

    loop {
        let frame = tokio::select! {
            _ = stop.changed() => break,
            frame = timeout(config.read_timeout, reader.next()) => frame,
        };
        let frame = match frame {
            Ok(frame) => frame,
            Err(_) => {
                debug!("read timeout, closing connection");
                break;
            }
        };

        match frame {
            None => break, // peer closed

            Some(Err(error)) => {
                // unusable buffer: answer once if we still can, then close
                debug!(cause = %error, "request parse failed");
                let _ = timeout(config.write_timeout, writer.send(parse_error_response(&error))).await;
                break;
            }

            Some(Ok(parsed)) => {
                let keep_alive = parsed.keep_alive();
                let request = Request::new(parsed);
                let route = matcher.match_path(request.path(), request.method());
                let mut response = service.call(RequestContext { request, route });

                if !keep_alive || *stop.borrow() {
                    response.headers_mut().set("Connection", "close");
                }
                let closing = response
                    .headers()
                    .get("connection")
                    .is_some_and(|v| v.eq_ignore_ascii_case("close"));

                match timeout(config.write_timeout, writer.send(response)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!(cause = %e, "write failed, closing connection");
                        break;
                    }
                    Err(_) => {
                        debug!("write timeout, closing connection");
                        break;
                    }
                }
                if closing {
                    break;
                }
            }
        }
    }
}

pub(crate) fn parse_error_response(error: &ParseError) -> Response {
    let response = if error.is_limit_breach() {
        Response::text("Payload Too Large").with_status(StatusCode::PAYLOAD_TOO_LARGE)
    } else {
        Response::text("Bad Request").with_status(StatusCode::BAD_REQUEST)
    };
    response.with_header("Connection", "close")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_breach_maps_to_413() {
        let response = parse_error_response(&ParseError::request_too_large(2_000_000, 1_000_000));
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers().get("connection"), Some("close"));
    }

    #[test]
    fn malformed_input_maps_to_400() {
        let response = parse_error_response(&ParseError::invalid_request_line("missing separator"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
