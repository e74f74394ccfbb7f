//! HTTP/1.1 response encoder.
//!
//! Serializes a buffered [`Response`] into wire bytes. The encoder owns the
//! `Content-Length` header: whatever the handler set is dropped and replaced
//! with the actual body length, so framing can never disagree with the bytes
//! that follow.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{Response, SendError};

#[derive(Debug, Default)]
pub struct ResponseEncoder;

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Encoder<Response> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = item.body();
        dst.reserve(64 + item.headers().len() * 32 + body.len());

        dst.put_slice(b"HTTP/1.1 ");
        dst.put_slice(item.status().as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(item.status().canonical_reason().unwrap_or("Unknown").as_bytes());
        dst.put_slice(b"\r\n");

        for (name, value) in item.headers().iter() {
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }

        dst.put_slice(b"Content-Length: ");
        dst.put_slice(body.len().to_string().as_bytes());
        dst.put_slice(b"\r\n\r\n");
        dst.put_slice(body);
        Ok(())
    }
}
