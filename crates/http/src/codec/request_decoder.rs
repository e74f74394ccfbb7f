//! HTTP/1.x request decoder.
//!
//! This decoder turns buffered socket bytes into [`ParsedRequest`] values
//! using a two-phase state machine: first the request line and header section
//! (terminated by the blank line), then a Content-Length framed body.
//!
//! The grammar is deliberately lenient — it is fed untrusted, possibly
//! adversarial bytes and must stay total:
//!
//! - `Ok(None)` means "no complete request yet", never an error;
//! - a complete-but-unusable buffer yields a [`ParseError`] that the serving
//!   layer turns into a 400 (or 413 for limit breaches) — never a panic;
//! - colonless header lines are skipped, duplicate headers are all kept,
//!   and an unparseable or negative `Content-Length` means "no declared
//!   length" rather than a rejection;
//! - a declared length is validated against the request-size limit *before*
//!   any body allocation, so an attacker-supplied length field never drives
//!   memory use;
//! - pipelined input is consumed one message at a time, leaving the rest of
//!   the buffer for the next decode cycle.

use bytes::{Bytes, BytesMut};
use http::Version;
use memchr::{memchr, memmem};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{Headers, Method, ParseError, ParsedRequest};

/// Default cap on the request line + header section.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 64 * 1024;

/// Default cap on the whole request (header section + declared body).
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// A decoder for HTTP/1.x requests with buffered bodies.
///
/// The state machine lives in the `pending` field: `None` while waiting for a
/// complete header section, `Some` while waiting for the declared body bytes.
#[derive(Debug)]
pub struct RequestDecoder {
    max_header_bytes: usize,
    max_request_bytes: usize,
    pending: Option<PendingBody>,
}

/// A fully parsed head whose body has not completely arrived yet.
#[derive(Debug)]
struct PendingBody {
    method: Method,
    path: String,
    query: String,
    version: Version,
    headers: Headers,
    keep_alive: bool,
    content_length: usize,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a decoder with explicit header and total-request size caps.
    pub fn with_limits(max_header_bytes: usize, max_request_bytes: usize) -> Self {
        Self { max_header_bytes, max_request_bytes, pending: None }
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_REQUEST_BYTES)
    }
}

impl Decoder for RequestDecoder {
    type Item = ParsedRequest;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // body phase
        if let Some(pending) = self.pending.take() {
            if src.len() < pending.content_length {
                self.pending = Some(pending);
                return Ok(None);
            }
            let body = src.split_to(pending.content_length).freeze();
            return Ok(Some(pending.into_request(body)));
        }

        // header phase: wait for the blank-line terminator
        let Some(head_end) = memmem::find(src, b"\r\n\r\n") else {
            ensure!(src.len() <= self.max_header_bytes, ParseError::too_large_header(src.len(), self.max_header_bytes));
            return Ok(None);
        };

        let head_len = head_end + 4;
        ensure!(head_len <= self.max_header_bytes, ParseError::too_large_header(head_len, self.max_header_bytes));

        let head = src.split_to(head_len);
        let pending = parse_head(&head, self.max_request_bytes)?;
        trace!(path = %pending.path, content_length = pending.content_length, "parsed request head");

        if src.len() >= pending.content_length {
            let body = src.split_to(pending.content_length).freeze();
            Ok(Some(pending.into_request(body)))
        } else {
            self.pending = Some(pending);
            Ok(None)
        }
    }
}

impl PendingBody {
    fn into_request(self, body: Bytes) -> ParsedRequest {
        ParsedRequest::new(self.method, self.path, self.query, self.version, self.headers, body, self.keep_alive)
    }
}

/// Parses the request line and header section (`head` includes the blank-line
/// terminator). Only the request line and version can fail; header lines
/// degrade by skipping.
fn parse_head(head: &[u8], max_request_bytes: usize) -> Result<PendingBody, ParseError> {
    let Some(line_end) = memmem::find(head, b"\r\n") else {
        return Err(ParseError::invalid_request_line("missing line terminator"));
    };
    let request_line = &head[..line_end];

    // METHOD SP TARGET SP VERSION
    let first_sp = memchr(b' ', request_line).ok_or_else(|| ParseError::invalid_request_line("missing method separator"))?;
    let rest = &request_line[first_sp + 1..];
    let second_sp = memchr(b' ', rest).ok_or_else(|| ParseError::invalid_request_line("missing version separator"))?;

    let method_bytes = &request_line[..first_sp];
    let target = &rest[..second_sp];
    let version_bytes = &rest[second_sp + 1..];

    if version_bytes.len() < 6 || !version_bytes.starts_with(b"HTTP/") {
        return Err(ParseError::invalid_version(latin1(version_bytes)));
    }
    let version = if version_bytes == b"HTTP/1.0" { Version::HTTP_10 } else { Version::HTTP_11 };

    // target splits on the first '?'; further '?' stay in the query string
    let (path, query) = match memchr(b'?', target) {
        Some(idx) => (latin1(&target[..idx]), latin1(&target[idx + 1..])),
        None => (latin1(target), String::new()),
    };

    let method = Method::parse(&latin1(method_bytes));
    let headers = parse_header_lines(&head[line_end + 2..head.len() - 2]);

    // A parseable non-negative Content-Length frames the body; anything
    // unparseable, negative or overflowing is treated as no declared length.
    // The last occurrence of a duplicated header wins. A parseable length
    // past the request cap is a limit breach.
    let content_length = match headers.get_all("content-length").last().and_then(|v| v.trim().parse::<u64>().ok()) {
        Some(n) => {
            let total = (head.len() as u64).saturating_add(n);
            ensure!(total <= max_request_bytes as u64, ParseError::request_too_large(total as usize, max_request_bytes));
            n as usize
        }
        None => 0,
    };

    let keep_alive = match headers.get("connection") {
        Some(value) if value.eq_ignore_ascii_case("close") => false,
        Some(value) if value.eq_ignore_ascii_case("keep-alive") => true,
        _ => version != Version::HTTP_10,
    };

    Ok(PendingBody { method, path, query, version, headers, keep_alive, content_length })
}

/// Parses the header section: one line per entry, split on the first `:`,
/// value whitespace trimmed, colonless lines skipped, duplicates kept.
fn parse_header_lines(mut section: &[u8]) -> Headers {
    let mut headers = Headers::with_capacity(8);
    while !section.is_empty() {
        let (line, rest) = match memmem::find(section, b"\r\n") {
            Some(idx) => (&section[..idx], &section[idx + 2..]),
            None => (section, &section[section.len()..]),
        };
        section = rest;

        let Some(colon) = memchr(b':', line) else {
            continue;
        };
        let name = &line[..colon];
        let value = trim_ascii(&line[colon + 1..]);
        headers.append(latin1(name), latin1(value));
    }
    headers
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = bytes {
        bytes = rest;
    }
    bytes
}

/// Decodes bytes as ISO-8859-1, which never fails; arbitrary bytes (NULs
/// included) survive round trips.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
