use std::num::ParseIntError;
use thiserror::Error;

/// Errors produced while normalizing, packetizing or multiplexing a sample.
///
/// Every error is local to the call that raised it: no bytes are written to
/// the caller's destination when an operation fails.
#[derive(Error, Debug)]
pub enum MuxError {
    /// Failure of the underlying sink.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A NAL length prefix runs past the end of its buffer, or the buffer
    /// cannot be classified.
    #[error("malformed stream: {0}")]
    MalformedStream(String),

    /// A value does not fit in the bit field it is encoded into.
    #[error("value out of range: {0}")]
    Range(String),

    /// The session configuration cannot satisfy the request.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Bit-level reading ran out of data or hit an invalid code.
    #[error("bitstream error: {0}")]
    Bitstream(String),

    /// A numeric configuration override could not be parsed.
    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MuxError>;
