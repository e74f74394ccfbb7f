use std::io;
use thiserror::Error;

/// Failure to decode a complete request from buffered bytes.
///
/// Note the decoder never returns an error for merely *incomplete* input;
/// these variants all mean the buffer is definitively unusable, and the
/// serving layer maps them to a 400 (or 413 for the size variants) before
/// closing the connection.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header section too large, current: {current_size} exceeds the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("request too large: {declared} bytes declared, limit {max_size}")]
    RequestTooLarge { declared: usize, max_size: usize },

    #[error("invalid request line: {reason}")]
    InvalidRequestLine { reason: String },

    #[error("invalid http version: {found}")]
    InvalidVersion { found: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn request_too_large(declared: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { declared, max_size }
    }

    pub fn invalid_request_line<S: ToString>(reason: S) -> Self {
        Self::InvalidRequestLine { reason: reason.to_string() }
    }

    pub fn invalid_version<S: ToString>(found: S) -> Self {
        Self::InvalidVersion { found: found.to_string() }
    }

    /// True when the failure is a resource-limit breach rather than a
    /// malformed message, i.e. the 413 rather than the 400 family.
    pub fn is_limit_breach(&self) -> bool {
        matches!(self, Self::TooLargeHeader { .. } | Self::RequestTooLarge { .. })
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}
