//! Outgoing response model.
//!
//! A [`Response`] stays mutable (status, headers, body) until the encoder
//! serializes it; the encoder owns the `Content-Length` header so the body
//! length on the wire always matches what is emitted.

use bytes::Bytes;
use http::StatusCode;

use crate::protocol::Headers;

/// A buffered HTTP response: status code, header multi-map and body bytes.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Creates an empty-bodied response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: Headers::new(), body: Bytes::new() }
    }

    /// A `200 OK` response with no body.
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// A `200 OK` plain-text response (`text/plain; charset=utf-8`).
    pub fn text(body: impl Into<String>) -> Self {
        let mut response = Self::ok();
        response.headers.set("Content-Type", "text/plain; charset=utf-8");
        response.body = Bytes::from(body.into());
        response
    }

    /// A `200 OK` `application/json` response with the serialized value as
    /// its body.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        let mut response = Self::ok();
        response.headers.set("Content-Type", "application/json");
        response.body = Bytes::from(body);
        Ok(response)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Builder-style status assignment.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Builder-style header assignment.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Builder-style body assignment.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_sets_content_type() {
        let response = Response::text("hello");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(&response.body()[..], b"hello");
    }

    #[test]
    fn json_serializes_and_sets_content_type() {
        let response = Response::json(&serde_json::json!({"answer": 42})).unwrap();
        assert_eq!(response.headers().get("content-type"), Some("application/json"));
        assert_eq!(&response.body()[..], br#"{"answer":42}"#);
    }

    #[test]
    fn mutable_until_encoded() {
        let mut response = Response::new(StatusCode::NOT_FOUND);
        response.set_status(StatusCode::OK);
        response.headers_mut().set("X-Answer", "42");
        response.set_body("ok");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-answer"), Some("42"));
    }
}
