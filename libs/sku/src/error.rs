//! Error types for SKU parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing a SKU or one of its prefixes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SkuError {
    /// The SKU string is empty.
    #[error("SKU cannot be empty")]
    Empty,

    /// The SKU does not have exactly four `-`-separated segments.
    #[error("SKU must have {expected} segments separated by '-', got {actual}")]
    SegmentCount { expected: usize, actual: usize },

    /// The leading organization segment does not match the configured prefix.
    #[error("invalid organization prefix: expected '{expected}', got '{actual}'")]
    OrgPrefixMismatch { expected: String, actual: String },

    /// A prefix segment has the wrong length.
    #[error("{kind} prefix must be {expected} characters, got '{value}'")]
    PrefixLength {
        kind: &'static str,
        expected: usize,
        value: String,
    },

    /// A prefix segment contains characters outside `[A-Z0-9]`.
    #[error("{kind} prefix may only contain A-Z and 0-9, got '{value}'")]
    PrefixCharacters { kind: &'static str, value: String },

    /// The sequence segment is not made of ASCII digits.
    #[error("sequence must be numeric, got '{value}'")]
    NonNumericSequence { value: String },

    /// The sequence segment does not fit in 64 bits.
    #[error("sequence out of range: '{value}'")]
    SequenceOutOfRange { value: String },

    /// The sequence is numeric but not in its canonical zero-padded form.
    #[error("sequence '{value}' is not padded to {width} digits")]
    NonCanonicalSequence { value: String, width: usize },

    /// Sequence numbers start at 1.
    #[error("sequence must be greater than zero")]
    ZeroSequence,

    /// The format configuration itself is invalid.
    #[error("invalid SKU format: {message}")]
    InvalidFormat { message: String },
}

impl SkuError {
    /// Returns true if this error concerns one of the prefix segments.
    pub fn is_prefix_error(&self) -> bool {
        matches!(
            self,
            SkuError::OrgPrefixMismatch { .. }
                | SkuError::PrefixLength { .. }
                | SkuError::PrefixCharacters { .. }
        )
    }

    /// Returns true if this error concerns the numeric sequence segment.
    pub fn is_sequence_error(&self) -> bool {
        matches!(
            self,
            SkuError::NonNumericSequence { .. }
                | SkuError::SequenceOutOfRange { .. }
                | SkuError::NonCanonicalSequence { .. }
                | SkuError::ZeroSequence
        )
    }
}
