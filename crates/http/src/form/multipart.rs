//! `multipart/form-data` parsing.
//!
//! Parts are delimited by `--boundary` markers that must sit at the start of
//! a line and be followed by either CRLF (another part) or `--` (the final
//! delimiter). A byte sequence that merely contains the boundary text — say,
//! inside uploaded file content prefixed by other characters, or as a prefix
//! of a longer token — is not a delimiter. Parts without a terminating
//! delimiter are discarded.

use bytes::Bytes;
use memchr::{memchr, memmem};

use crate::form::{QueryMap, lossless_utf8};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One uploaded file from a multipart body.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// The `name` parameter of the part's `Content-Disposition`.
    pub name: String,
    /// The client-supplied `filename` parameter, verbatim.
    pub filename: String,
    /// The part's `Content-Type`, defaulting to `application/octet-stream`.
    pub content_type: String,
    /// Raw file bytes, untouched.
    pub data: Bytes,
}

/// The outcome of parsing a multipart body: text fields and file parts,
/// each in arrival order.
#[derive(Debug, Clone, Default)]
pub struct MultipartResult {
    pub form: QueryMap,
    pub files: Vec<FilePart>,
}

/// Parses a `multipart/form-data` body against the given boundary.
///
/// Parts whose `Content-Disposition` carries a `filename` become
/// [`FilePart`]s; the rest become form fields with their content decoded via
/// the same lossless UTF-8 rules as query strings. Parts without a `name`
/// parameter or without a blank line after their headers are skipped.
pub fn parse_multipart(body: &[u8], boundary: &str) -> MultipartResult {
    let mut result = MultipartResult::default();
    if boundary.is_empty() {
        return result;
    }

    let delimiter = format!("--{boundary}");
    let anchors = anchored_delimiters(body, &delimiter);

    // each part spans from just after one delimiter's CRLF to just before
    // the CRLF that precedes the next delimiter
    for (idx, &(start, is_final)) in anchors.iter().enumerate() {
        if is_final {
            break;
        }
        let content_start = start + delimiter.len() + 2;
        let Some(&(next, _)) = anchors.get(idx + 1) else {
            break; // unterminated part
        };
        let part_end = next.saturating_sub(2).max(content_start);
        parse_part(&body[content_start..part_end], &mut result);
    }
    result
}

/// Finds delimiter positions that are anchored: at offset 0 or preceded by
/// CRLF, and followed by CRLF or `--`. Returns `(offset, is_final)` pairs.
fn anchored_delimiters(body: &[u8], delimiter: &str) -> Vec<(usize, bool)> {
    let mut candidates = Vec::new();
    if body.starts_with(delimiter.as_bytes()) {
        candidates.push(0);
    }
    let line_start = format!("\r\n{delimiter}");
    for pos in memmem::find_iter(body, line_start.as_bytes()) {
        candidates.push(pos + 2);
    }

    let mut anchors = Vec::with_capacity(candidates.len());
    for start in candidates {
        let after = &body[start + delimiter.len()..];
        if after.starts_with(b"--") {
            anchors.push((start, true));
        } else if after.starts_with(b"\r\n") {
            anchors.push((start, false));
        }
        // otherwise the delimiter is a prefix of a longer token: not ours
    }
    anchors
}

fn parse_part(raw: &[u8], result: &mut MultipartResult) {
    let Some(head_end) = memmem::find(raw, b"\r\n\r\n") else {
        return;
    };
    let (head, content) = (&raw[..head_end], &raw[head_end + 4..]);

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    let mut section = head;
    while !section.is_empty() {
        let (line, rest) = match memmem::find(section, b"\r\n") {
            Some(idx) => (&section[..idx], &section[idx + 2..]),
            None => (section, &section[section.len()..]),
        };
        section = rest;

        let Some(colon) = memchr(b':', line) else {
            continue;
        };
        let header_name = lossless_utf8(&line[..colon]);
        let header_value = lossless_utf8(&line[colon + 1..]);
        let header_value = header_value.trim();

        if header_name.eq_ignore_ascii_case("content-disposition") {
            name = extract_param(header_value, "name");
            filename = extract_param(header_value, "filename");
        } else if header_name.eq_ignore_ascii_case("content-type") {
            content_type = Some(header_value.to_owned());
        }
    }

    let Some(name) = name else {
        return;
    };

    match filename {
        Some(filename) => result.files.push(FilePart {
            name,
            filename,
            content_type: content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned()),
            data: Bytes::copy_from_slice(content),
        }),
        None => result.form.append(name, lossless_utf8(content)),
    }
}

/// Extracts one `key=value` parameter from a structured header value such as
/// `form-data; name="field"; filename="a.txt"`. Quoted values keep semicolons
/// and surrounding whitespace; backslashes are kept as-is. Parameter names
/// match case-insensitively.
pub fn extract_param(value: &str, name: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b';') {
            i += 1;
        }
        let key_start = i;
        while i < bytes.len() && bytes[i] != b'=' && bytes[i] != b';' {
            i += 1;
        }
        let key = value[key_start..i].trim();

        if i >= bytes.len() || bytes[i] == b';' {
            continue; // bare token such as `form-data`
        }

        i += 1; // consume '='
        let param_value = if i < bytes.len() && bytes[i] == b'"' {
            i += 1;
            let value_start = i;
            while i < bytes.len() && bytes[i] != b'"' {
                i += 1;
            }
            let v = &value[value_start..i];
            if i < bytes.len() {
                i += 1;
            }
            v.to_owned()
        } else {
            let value_start = i;
            while i < bytes.len() && bytes[i] != b';' {
                i += 1;
            }
            value[value_start..i].trim().to_owned()
        };

        if key.eq_ignore_ascii_case(name) {
            return Some(param_value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "XyZ123";

    fn body(parts: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for part in parts {
            out.extend_from_slice(format!("--{BOUNDARY}\r\n{part}\r\n").as_bytes());
        }
        out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        out
    }

    #[test]
    fn text_fields_and_files_separated() {
        let body = body(&[
            "Content-Disposition: form-data; name=\"title\"\r\n\r\nhello world",
            "Content-Disposition: form-data; name=\"upload\"; filename=\"a.bin\"\r\nContent-Type: image/png\r\n\r\n\x01\x02\x03",
        ]);
        let result = parse_multipart(&body, BOUNDARY);

        assert_eq!(result.form.get("title"), Some("hello world"));
        assert_eq!(result.files.len(), 1);
        let file = &result.files[0];
        assert_eq!(file.name, "upload");
        assert_eq!(file.filename, "a.bin");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(&file.data[..], b"\x01\x02\x03");
    }

    #[test]
    fn missing_content_type_defaults_to_octet_stream() {
        let body = body(&["Content-Disposition: form-data; name=\"f\"; filename=\"x\"\r\n\r\ndata"]);
        let result = parse_multipart(&body, BOUNDARY);
        assert_eq!(result.files[0].content_type, "application/octet-stream");
    }

    #[test]
    fn boundary_text_inside_content_is_not_a_delimiter() {
        // the boundary appears mid-line inside the file data
        let content = format!("prefix --{BOUNDARY} suffix");
        let body = body(&[&format!(
            "Content-Disposition: form-data; name=\"f\"; filename=\"x\"\r\n\r\n{content}"
        )]);
        let result = parse_multipart(&body, BOUNDARY);
        assert_eq!(result.files.len(), 1);
        assert_eq!(&result.files[0].data[..], content.as_bytes());
    }

    #[test]
    fn longer_token_sharing_the_prefix_is_not_a_delimiter() {
        // "--XyZ123456" starts a line but is not our boundary
        let content = format!("line one\r\n--{BOUNDARY}456\r\nline three");
        let body = body(&[&format!("Content-Disposition: form-data; name=\"t\"\r\n\r\n{content}")]);
        let result = parse_multipart(&body, BOUNDARY);
        assert_eq!(result.form.get("t"), Some(content.as_str()));
    }

    #[test]
    fn unterminated_part_is_discarded() {
        let raw = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\ncomplete\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"b\"\r\n\r\ncut off"
        );
        let result = parse_multipart(raw.as_bytes(), BOUNDARY);
        assert_eq!(result.form.get("a"), Some("complete"));
        assert!(result.form.get("b").is_none());
    }

    #[test]
    fn part_without_name_is_skipped() {
        let body = body(&["Content-Disposition: form-data\r\n\r\nanonymous"]);
        let result = parse_multipart(&body, BOUNDARY);
        assert!(result.form.is_empty());
        assert!(result.files.is_empty());
    }

    #[test]
    fn invalid_utf8_field_value_preserved_as_escapes() {
        let mut raw = format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"v\"\r\n\r\n").into_bytes();
        raw.extend_from_slice(b"ok\xff");
        raw.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        let result = parse_multipart(&raw, BOUNDARY);
        assert_eq!(result.form.get("v"), Some("ok%FF"));
    }

    #[test]
    fn file_bytes_round_trip_all_256_values() {
        let payload: Vec<u8> = (0u8..=255).collect();
        let mut raw = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"bin\"; filename=\"all.bin\"\r\n\r\n"
        )
        .into_bytes();
        raw.extend_from_slice(&payload);
        raw.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let result = parse_multipart(&raw, BOUNDARY);
        assert_eq!(&result.files[0].data[..], &payload[..]);
    }

    #[test]
    fn empty_body_or_boundary_yields_nothing() {
        assert!(parse_multipart(b"", BOUNDARY).form.is_empty());
        assert!(parse_multipart(b"--x\r\n\r\n--x--", "").form.is_empty());
    }

    #[test]
    fn extract_param_variants() {
        let header = "form-data; name=\"a;b\"; filename=plain.txt; empty=\"\"";
        assert_eq!(extract_param(header, "name").as_deref(), Some("a;b"));
        assert_eq!(extract_param(header, "filename").as_deref(), Some("plain.txt"));
        assert_eq!(extract_param(header, "empty").as_deref(), Some(""));
        assert_eq!(extract_param(header, "NAME").as_deref(), Some("a;b"));
        assert!(extract_param(header, "missing").is_none());
    }
}
