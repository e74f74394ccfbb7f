//! Body and header payload parsers: query strings, cookies, multipart.
//!
//! All three parsers share the same stance as the wire decoder: input is
//! untrusted, so they are total functions that degrade (skip, pass through)
//! instead of failing.

mod querystring;
pub use querystring::QueryMap;
pub use querystring::parse_qs;

mod cookies;
pub use cookies::parse_cookies;

mod multipart;
pub use multipart::FilePart;
pub use multipart::MultipartResult;
pub use multipart::extract_param;
pub use multipart::parse_multipart;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Decodes bytes as UTF-8, preserving invalid byte runs as uppercase `%XX`
/// escapes instead of replacement characters. Nothing is lost: the original
/// bytes can be recovered from the escapes.
pub(crate) fn lossless_utf8(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
        for &b in chunk.invalid() {
            out.push('%');
            out.push(HEX_UPPER[(b >> 4) as usize] as char);
            out.push(HEX_UPPER[(b & 0x0f) as usize] as char);
        }
    }
    out
}
