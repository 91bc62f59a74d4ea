//! Error types for header, heap and file I/O

use std::io;

use fitskit_core::FitsError;
use thiserror::Error;

/// Errors raised while reading or writing FITS structures
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended in the middle of a structure
    #[error("file truncated at offset {offset}")]
    TruncatedFile { offset: u64 },

    /// No further header/data unit in the stream
    #[error("end of input")]
    EndOfInput,

    /// The first record of a header is not SIMPLE or XTENSION
    #[error("not a FITS header at offset {offset}: {record}")]
    NotAStructure { offset: u64, record: String },

    /// In-place rewrite was requested but the element has moved or grown
    #[error("{element} cannot be rewritten in place")]
    RewriteNotEligible { element: &'static str },

    /// The heap would grow past the 2 GiB offset limit
    #[error("heap cannot grow to {requested} bytes")]
    HeapOverflow { requested: u64 },

    /// A heap payload could not be decoded
    #[error("cannot decode heap data at offset {offset}: {reason}")]
    Decode { offset: u64, reason: &'static str },

    #[cfg(feature = "serde")]
    #[error("invalid options: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// True when the stream simply has no more units
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, Error::EndOfInput)
    }
}

/// Result type for I/O operations
pub type Result<T> = std::result::Result<T, Error>;
