// [libs/infra/transport/src/errors.rs]
use thiserror::Error;

/// Fatal errors raised by the framed transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying reader/writer failed.
    #[error("transport I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be bincode-encoded.
    #[error("frame encode failure: {0}")]
    Encode(#[from] bincode::Error),

    /// A frame's declared length exceeds the configured ceiling.
    #[error("frame of {declared} bytes exceeds the {limit} byte ceiling")]
    FrameTooLarge {
        /// Length declared in the frame header.
        declared: u64,
        /// Configured ceiling.
        limit: u64,
    },

    /// Zstd (de)compression failed.
    #[error("zstd (de)compression failure: {0}")]
    Compression(std::io::Error),
}

/// Result alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, TransportError>;
