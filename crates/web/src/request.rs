//! The request view handed to services.
//!
//! [`Request`] wraps a decoded [`ParsedRequest`] and derives the expensive
//! views — query args, form fields, uploaded files, cookies, JSON — on
//! first access, caching each for the life of the request. `form()` and
//! `files()` share a single body parse.

use carafe_http::form::{self, FilePart, QueryMap};
use carafe_http::protocol::{Headers, Method, ParsedRequest};
use bytes::Bytes;
use mime::Mime;
use once_cell::sync::OnceCell;

/// One in-flight request plus its lazily computed derived views.
#[derive(Debug)]
pub struct Request {
    inner: ParsedRequest,
    args: OnceCell<QueryMap>,
    cookies: OnceCell<QueryMap>,
    body_form: OnceCell<BodyForm>,
    json: OnceCell<Option<serde_json::Value>>,
}

#[derive(Debug, Default)]
struct BodyForm {
    fields: QueryMap,
    files: Vec<FilePart>,
}

impl Request {
    pub fn new(inner: ParsedRequest) -> Self {
        Self {
            inner,
            args: OnceCell::new(),
            cookies: OnceCell::new(),
            body_form: OnceCell::new(),
            json: OnceCell::new(),
        }
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn path(&self) -> &str {
        self.inner.path()
    }

    pub fn query(&self) -> &str {
        self.inner.query()
    }

    pub fn headers(&self) -> &Headers {
        self.inner.headers()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.header(name)
    }

    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    pub fn keep_alive(&self) -> bool {
        self.inner.keep_alive()
    }

    /// Decoded query-string arguments.
    pub fn args(&self) -> &QueryMap {
        self.args.get_or_init(|| form::parse_qs(self.inner.query()))
    }

    /// Cookies from the first `Cookie` header.
    pub fn cookies(&self) -> &QueryMap {
        self.cookies.get_or_init(|| form::parse_cookies(self.inner.header("cookie").unwrap_or("")))
    }

    /// Text form fields, from either a urlencoded or a multipart body.
    pub fn form(&self) -> &QueryMap {
        &self.parse_body_form().fields
    }

    /// Uploaded files from a multipart body.
    pub fn files(&self) -> &[FilePart] {
        &self.parse_body_form().files
    }

    /// The body parsed as JSON, when the content type says so and the body
    /// is valid JSON.
    pub fn json(&self) -> Option<&serde_json::Value> {
        self.json
            .get_or_init(|| {
                let mime = self.mime()?;
                let is_json = (mime.type_() == mime::APPLICATION && mime.subtype() == mime::JSON)
                    || mime.suffix() == Some(mime::JSON);
                if !is_json {
                    return None;
                }
                serde_json::from_slice(self.inner.body()).ok()
            })
            .as_ref()
    }

    fn mime(&self) -> Option<Mime> {
        self.inner.header("content-type")?.parse().ok()
    }

    fn parse_body_form(&self) -> &BodyForm {
        self.body_form.get_or_init(|| {
            let Some(mime) = self.mime() else {
                return BodyForm::default();
            };
            if mime.type_() == mime::APPLICATION && mime.subtype() == mime::WWW_FORM_URLENCODED {
                return BodyForm { fields: form::parse_qs(&latin1(self.inner.body())), files: Vec::new() };
            }
            if mime.type_() == mime::MULTIPART && mime.subtype() == mime::FORM_DATA {
                let Some(boundary) = mime.get_param(mime::BOUNDARY) else {
                    return BodyForm::default();
                };
                let parsed = form::parse_multipart(self.inner.body(), boundary.as_str());
                return BodyForm { fields: parsed.form, files: parsed.files };
            }
            BodyForm::default()
        })
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use carafe_http::codec::RequestDecoder;
    use indoc::indoc;
    use tokio_util::codec::Decoder;

    fn request(raw: &[u8]) -> Request {
        let mut decoder = RequestDecoder::new();
        let mut buf = BytesMut::from(raw);
        Request::new(decoder.decode(&mut buf).unwrap().unwrap())
    }

    #[test]
    fn args_are_cached_query_pairs() {
        let req = request(b"GET /search?q=rust&page=2 HTTP/1.1\r\n\r\n");
        assert_eq!(req.args().get("q"), Some("rust"));
        assert_eq!(req.args().get("page"), Some("2"));
        // second access hits the cache and agrees
        assert!(std::ptr::eq(req.args(), req.args()));
    }

    #[test]
    fn cookies_from_header() {
        let req = request(b"GET / HTTP/1.1\r\nCookie: session=s1; theme=dark\r\n\r\n");
        assert_eq!(req.cookies().get("session"), Some("s1"));
        assert_eq!(req.cookies().get("theme"), Some("dark"));

        let bare = request(b"GET / HTTP/1.1\r\n\r\n");
        assert!(bare.cookies().is_empty());
    }

    #[test]
    fn urlencoded_form_body() {
        let raw = b"POST /login HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 24\r\n\r\nuser=alice&pass=w%40rd+1";
        let req = request(raw);
        assert_eq!(req.form().get("user"), Some("alice"));
        assert_eq!(req.form().get("pass"), Some("w@rd 1"));
        assert!(req.files().is_empty());
    }

    #[test]
    fn multipart_form_and_files_share_one_parse() {
        let body = "--B42\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nhi\r\n--B42\r\nContent-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\r\ncontents\r\n--B42--\r\n";
        let raw = format!(
            "POST /upload HTTP/1.1\r\nContent-Type: multipart/form-data; boundary=B42\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        let req = request(raw.as_bytes());

        assert_eq!(req.form().get("title"), Some("hi"));
        assert_eq!(req.files().len(), 1);
        assert_eq!(req.files()[0].filename, "a.txt");
        assert_eq!(&req.files()[0].data[..], b"contents");
        assert!(std::ptr::eq(req.form(), req.form()));
    }

    #[test]
    fn json_requires_a_json_content_type() {
        let raw = indoc! {"
            POST /api HTTP/1.1\r
            Content-Type: application/json\r
            Content-Length: 13\r
            \r
            {\"answer\":42}"};
        let req = request(raw.as_bytes());
        assert_eq!(req.json().and_then(|v| v["answer"].as_i64()), Some(42));

        let raw = b"POST /api HTTP/1.1\r\nContent-Type: text/plain\r\nContent-Length: 13\r\n\r\n{\"answer\":42}";
        assert!(request(raw).json().is_none());
    }

    #[test]
    fn json_suffix_types_accepted() {
        let raw = b"POST /api HTTP/1.1\r\nContent-Type: application/vnd.api+json\r\nContent-Length: 2\r\n\r\n{}";
        assert!(request(raw).json().is_some());
    }

    #[test]
    fn invalid_json_body_is_none_not_an_error() {
        let raw = b"POST /api HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 5\r\n\r\n{oops";
        assert!(request(raw).json().is_none());
    }

    #[test]
    fn body_without_content_type_yields_empty_form() {
        let req = request(b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc");
        assert!(req.form().is_empty());
        assert!(req.files().is_empty());
    }
}
