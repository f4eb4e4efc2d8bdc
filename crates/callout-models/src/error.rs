//! Error types for the `callout-models` crate.
//!
//! All fallible constructors and `TryFrom` implementations in this crate
//! return variants of [`ModelError`].

/// Errors produced when constructing or validating model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A required claim field was absent or empty.
    #[error("missing required field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// The `nats.type` discriminator did not match the expected claim type.
    #[error("unexpected claim type \"{found}\", expected \"{expected}\"")]
    UnexpectedClaimType {
        /// The claim type the decoder required.
        expected: String,
        /// The claim type carried by the token.
        found: String,
    },

    /// A subject pattern was empty or contained invalid tokens.
    #[error("invalid subject \"{value}\": {reason}")]
    InvalidSubject {
        /// The value that failed validation.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// An account name was empty.
    #[error("invalid account name \"{value}\": {reason}")]
    InvalidAccount {
        /// The value that failed validation.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },
}
