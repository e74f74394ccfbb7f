//! The synchronous fallback backend.
//!
//! Single-threaded blocking accept loop over `std::net`: one connection at
//! a time, read/parse/dispatch/write cycles while keep-alive holds. The
//! same decoder and encoder as the event-driven backend, fed by hand.

use std::io::{Read, Write};
use std::sync::Arc;

use bytes::BytesMut;
use carafe_http::codec::{RequestDecoder, ResponseEncoder};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, info, warn};

use crate::request::Request;
use crate::routing::Matcher;
use crate::server::event_loop::parse_error_response;
use crate::server::{BindTarget, ServeError, ServerConfig};
use crate::service::{RequestContext, Service};

pub(crate) fn serve<S: Service>(
    target: &BindTarget,
    config: &ServerConfig,
    matcher: Matcher,
    service: Arc<S>,
) -> Result<(), ServeError> {
    match target {
        BindTarget::Tcp { host, port } => {
            let address = format!("{host}:{port}");
            let listener =
                std::net::TcpListener::bind(&address).map_err(|e| ServeError::bind(&address, e))?;
            info!(%address, "listening on tcp (blocking backend)");
            serve_tcp(listener, config, &matcher, &*service)
        }

        #[cfg(unix)]
        BindTarget::Unix(path) => {
            let _ = std::fs::remove_file(path);
            let listener = std::os::unix::net::UnixListener::bind(path)
                .map_err(|e| ServeError::bind(path.display(), e))?;
            info!(path = %path.display(), "listening on unix socket (blocking backend)");
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        let _ = stream.set_read_timeout(Some(config.read_timeout));
                        let _ = stream.set_write_timeout(Some(config.write_timeout));
                        handle_connection(stream, config, &matcher, &*service);
                    }
                    Err(e) => warn!(cause = %e, "accept failed"),
                }
            }
            Ok(())
        }

        #[cfg(not(unix))]
        BindTarget::Unix(path) => Err(ServeError::bind(
            path.display(),
            std::io::Error::new(std::io::ErrorKind::Unsupported, "unix sockets require a unix platform"),
        )),
    }
}

pub(crate) fn serve_tcp<S: Service>(
    listener: std::net::TcpListener,
    config: &ServerConfig,
    matcher: &Matcher,
    service: &S,
) -> Result<(), ServeError> {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let _ = stream.set_read_timeout(Some(config.read_timeout));
                let _ = stream.set_write_timeout(Some(config.write_timeout));
                handle_connection(stream, config, matcher, service);
            }
            Err(e) => warn!(cause = %e, "accept failed"),
        }
    }
    Ok(())
}

fn handle_connection<C: Read + Write, S: Service>(
    mut stream: C,
    config: &ServerConfig,
    matcher: &Matcher,
    service: &S,
) {
    let mut decoder = RequestDecoder::with_limits(config.max_header_bytes, config.max_request_bytes);
    let mut encoder = ResponseEncoder::new();
    let mut buffer = BytesMut::with_capacity(8 * 1024);
    let mut chunk = [0u8; 8 * 1024];

    loop {
        match decoder.decode(&mut buffer) {
            Ok(None) => {
                let n = match stream.read(&mut chunk) {
                    Ok(0) => break, // peer closed
                    Ok(n) => n,
                    Err(e) => {
                        debug!(cause = %e, "read failed, closing connection");
                        break;
                    }
                };
                buffer.extend_from_slice(&chunk[..n]);
            }

            Ok(Some(parsed)) => {
                let keep_alive = parsed.keep_alive();
                let request = Request::new(parsed);
                let route = matcher.match_path(request.path(), request.method());
                let mut response = service.call(RequestContext { request, route });
                if !keep_alive {
                    response.headers_mut().set("Connection", "close");
                }
                if write_response(&mut stream, &mut encoder, response).is_err() || !keep_alive {
                    break;
                }
            }

            Err(error) => {
                debug!(cause = %error, "request parse failed");
                let _ = write_response(&mut stream, &mut encoder, parse_error_response(&error));
                break;
            }
        }
    }
}

fn write_response<C: Write>(
    stream: &mut C,
    encoder: &mut ResponseEncoder,
    response: carafe_http::protocol::Response,
) -> std::io::Result<()> {
    let mut out = BytesMut::new();
    encoder.encode(response, &mut out).map_err(std::io::Error::other)?;
    stream.write_all(&out)?;
    stream.flush()
}
