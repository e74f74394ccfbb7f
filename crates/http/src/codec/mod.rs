//! Framing codecs for HTTP/1.x over `tokio_util::codec`.

mod request_decoder;
pub use request_decoder::RequestDecoder;
pub use request_decoder::{DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_REQUEST_BYTES};

mod response_encoder;
pub use response_encoder::ResponseEncoder;
