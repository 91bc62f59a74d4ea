//! Error types for card, field and keyed-list operations

use thiserror::Error;

/// Errors raised by the pure codecs in this crate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FitsError {
    /// A fixed-width numeric or logical field could not be decoded
    #[error("malformed field at offset {offset}: {reason}")]
    Format { reason: &'static str, offset: usize },

    /// A card value does not fit in the value columns
    #[error("value of {len} characters exceeds the {max} available")]
    ValueTooLong { len: usize, max: usize },

    /// A pre-quoted string literal has no closing quote
    #[error("quoted literal is missing its closing quote")]
    QuoteMismatch,

    /// A keyword longer than 8 characters outside the HIERARCH convention
    #[error("keyword '{key}' is too long")]
    KeywordTooLong { key: String },

    /// A keyed insert collided with an existing entry
    #[error("duplicate key '{key}'")]
    DuplicateKey { key: String },

    /// The mandatory keyword sequence of a header is broken
    #[error("expected {expected} at card {position}, found {}", found.as_deref().unwrap_or("nothing"))]
    Structure {
        expected: String,
        found: Option<String>,
        position: usize,
    },
}

impl FitsError {
    /// Shorthand for a [`FitsError::Format`] at `offset`
    pub(crate) fn format(reason: &'static str, offset: usize) -> Self {
        FitsError::Format { reason, offset }
    }

    /// True for errors a caller can recover from by choosing a fallback value
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FitsError::Format { .. } | FitsError::DuplicateKey { .. })
    }
}

/// Result type for core operations
pub type Result<T> = core::result::Result<T, FitsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_message_names_keyword() {
        let err = FitsError::Structure {
            expected: "NAXIS2".to_string(),
            found: Some("PCOUNT".to_string()),
            position: 4,
        };
        assert_eq!(err.to_string(), "expected NAXIS2 at card 4, found PCOUNT");

        let err = FitsError::Structure {
            expected: "BITPIX".to_string(),
            found: None,
            position: 1,
        };
        assert_eq!(err.to_string(), "expected BITPIX at card 1, found nothing");
    }

    #[test]
    fn test_recoverable() {
        assert!(FitsError::format("no digits", 3).is_recoverable());
        assert!(!FitsError::QuoteMismatch.is_recoverable());
    }
}
