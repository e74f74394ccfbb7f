//! Wire-level parsed request.
//!
//! [`ParsedRequest`] is the output of the request decoder: the request line
//! split into method, path and query string, the header multi-map, the
//! Content-Length framed body, and the keep-alive decision. Higher layers wrap
//! it with lazily-derived views; this type itself stays a plain data carrier.

use bytes::Bytes;
use http::Version;

use crate::protocol::{Headers, Method};

/// One complete HTTP/1.x request as read off the wire.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    method: Method,
    path: String,
    query: String,
    version: Version,
    headers: Headers,
    body: Bytes,
    keep_alive: bool,
}

impl ParsedRequest {
    pub(crate) fn new(
        method: Method,
        path: String,
        query: String,
        version: Version,
        headers: Headers,
        body: Bytes,
        keep_alive: bool,
    ) -> Self {
        Self { method, path, query, version, headers, body, keep_alive }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request target up to (not including) the first `?`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string after the first `?`, empty if there was none.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// First value of the named header, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the connection may serve another request after this one.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }
}
