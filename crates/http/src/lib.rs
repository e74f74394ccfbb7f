//! Wire-level HTTP/1.x support for the carafe web stack.
//!
//! This crate owns everything between raw socket bytes and a routed request:
//! a lenient request decoder, a buffered response encoder, and parsers for
//! the payload formats browsers produce.
//!
//! # Design stance
//!
//! Every parser in this crate is fed untrusted input, so all of them are
//! total: they either succeed, report "need more bytes", or return a typed
//! error the serving layer can map to a 400 or 413. None of them panic, and
//! none of them let a client-controlled length field drive allocation.
//!
//! The grammar is intentionally more forgiving than the RFCs:
//!
//! - header lines without a colon are skipped, not fatal;
//! - an unparseable `Content-Length` means "no body", not a rejection;
//! - header bytes are decoded as ISO-8859-1, so arbitrary bytes survive;
//! - query strings and multipart field values that decode to invalid UTF-8
//!   keep the offending bytes as `%XX` escapes instead of replacement
//!   characters, so no information is destroyed.
//!
//! # Modules
//!
//! - [`protocol`]: shared data types ([`protocol::Headers`],
//!   [`protocol::Method`], [`protocol::ParsedRequest`],
//!   [`protocol::Response`]) and error enums
//! - [`codec`]: [`codec::RequestDecoder`] and [`codec::ResponseEncoder`]
//!   for use with `tokio_util::codec`
//! - [`form`]: query string, cookie and multipart parsing
//!
//! # Limitations
//!
//! - `Content-Length` framing only: chunked request bodies are not decoded
//! - HTTP/1.x only, no TLS
//! - bodies are buffered in full, bounded by the request-size limit

pub mod codec;
pub mod form;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
