//! Core protocol types shared by the codec and the serving layers.
//!
//! - [`Headers`]: case-insensitive, order-preserving header multi-map
//! - [`Method`] / [`MethodSet`]: bitmask-backed method representation
//! - [`ParsedRequest`]: one decoded wire request
//! - [`Response`]: the mutable outgoing response
//! - [`ParseError`] / [`SendError`]: decode/encode failures

mod headers;
pub use headers::Headers;

mod method;
pub use method::Method;
pub use method::MethodSet;

mod request;
pub use request::ParsedRequest;

mod response;
pub use response::Response;

mod error;
pub use error::ParseError;
pub use error::SendError;
