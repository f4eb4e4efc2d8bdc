//! Error types for the callout service.
//!
//! [`CalloutError`] unifies all failure modes. Request-level errors never
//! escape the handler: [`CalloutError::client_message`] turns each one into
//! the text placed in the signed response.

use callout_models::ModelError;

/// Message returned for unknown users and wrong passwords alike.
pub const INVALID_CREDENTIALS: &str = "invalid username and password";

/// Message returned when the request itself could not be decoded.
pub const MALFORMED_REQUEST: &str = "malformed authorization request";

/// Message returned for server-side faults.
pub const INTERNAL_ERROR: &str = "internal server error";

/// Errors that can occur while serving authorization requests.
#[derive(Debug, thiserror::Error)]
pub enum CalloutError {
    /// The signing seed could not be turned into a key pair.
    #[error("invalid signing seed: {0}")]
    InvalidSeed(String),

    /// The inbound payload is not a well-formed, validly signed request.
    #[error("malformed authorization request: {0}")]
    MalformedRequest(String),

    /// Unknown username or wrong password.
    #[error("invalid username and password")]
    InvalidCredentials,

    /// Issued claims failed the structural self-check.
    #[error("invalid claims: {}", .0.join("; "))]
    InvalidClaims(Vec<String>),

    /// Signing or serialising a token failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// NATS transport error (connect, subscribe, publish, drain).
    #[error("NATS error: {0}")]
    Transport(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON (de)serialisation error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CalloutError {
    /// Text sent back to the server for this error.
    ///
    /// Credential failures share one message so callers cannot tell an
    /// unknown user from a wrong password; server faults never leak detail.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => INVALID_CREDENTIALS,
            Self::MalformedRequest(_) => MALFORMED_REQUEST,
            Self::InvalidSeed(_)
            | Self::InvalidClaims(_)
            | Self::Encoding(_)
            | Self::Transport(_)
            | Self::Config(_)
            | Self::Serialization(_)
            | Self::Io(_) => INTERNAL_ERROR,
        }
    }

    /// `true` for faults on this side rather than in the client's input.
    pub fn is_server_fault(&self) -> bool {
        !matches!(self, Self::InvalidCredentials | Self::MalformedRequest(_))
    }
}

impl From<ModelError> for CalloutError {
    fn from(e: ModelError) -> Self {
        CalloutError::MalformedRequest(e.to_string())
    }
}

impl From<async_nats::ConnectError> for CalloutError {
    fn from(e: async_nats::ConnectError) -> Self {
        CalloutError::Transport(e.to_string())
    }
}

impl From<async_nats::PublishError> for CalloutError {
    fn from(e: async_nats::PublishError) -> Self {
        CalloutError::Transport(e.to_string())
    }
}

impl From<async_nats::SubscribeError> for CalloutError {
    fn from(e: async_nats::SubscribeError) -> Self {
        CalloutError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failure_message_is_generic() {
        assert_eq!(
            CalloutError::InvalidCredentials.client_message(),
            "invalid username and password"
        );
        assert_eq!(
            CalloutError::InvalidCredentials.to_string(),
            "invalid username and password"
        );
    }

    #[test]
    fn server_faults_do_not_leak_detail() {
        let err = CalloutError::InvalidClaims(vec!["subject is not a user key".into()]);
        assert_eq!(err.client_message(), "internal server error");
        assert!(err.is_server_fault());
        assert_eq!(
            err.to_string(),
            "invalid claims: subject is not a user key"
        );

        let err = CalloutError::Encoding("boom".into());
        assert_eq!(err.client_message(), INTERNAL_ERROR);
    }

    #[test]
    fn model_errors_are_malformed_requests() {
        let err: CalloutError = ModelError::MissingField {
            field: "nats.user_nkey".into(),
        }
        .into();
        assert!(matches!(err, CalloutError::MalformedRequest(_)));
        assert_eq!(err.client_message(), MALFORMED_REQUEST);
        assert!(!err.is_server_fault());
    }
}
