//! Authorization requests and responses as seen by the callout handler.
//!
//! These are the flattened, validated views over the wire claims in
//! [`crate::claims`]. An [`AuthorizationRequest`] only exists if the fields
//! the handler relies on are present; an [`AuthorizationResponse`] carries
//! exactly one of an issued token or an error.

use std::fmt;

use crate::claims::{
    AuthorizationRequestClaims, AuthorizationRequestNats, AuthorizationResponseClaims,
    AuthorizationResponseNats, ClaimsData, NatsClaim,
};
use crate::error::ModelError;

// ---------------------------------------------------------------------------
// AuthorizationRequest
// ---------------------------------------------------------------------------

/// A decoded connection attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Public key the server generated for the connecting client.
    pub requesting_user_public_key: String,
    /// Username from the client's `CONNECT`.
    pub connect_username: String,
    /// Password from the client's `CONNECT`.
    pub connect_password: String,
    /// Remote host of the client.
    pub client_host: String,
    /// Connection name the client chose.
    pub client_name: String,
    /// Connection kind (`Client`, `Leafnode`, ...).
    pub client_kind: String,
    /// Public key of the server that forwarded the request.
    pub origin_server_id: String,
}

impl TryFrom<AuthorizationRequestClaims> for AuthorizationRequest {
    type Error = ModelError;

    fn try_from(claims: AuthorizationRequestClaims) -> Result<Self, Self::Error> {
        let nats = claims.nats;

        if nats.claim_type() != AuthorizationRequestNats::CLAIM_TYPE {
            return Err(ModelError::UnexpectedClaimType {
                expected: AuthorizationRequestNats::CLAIM_TYPE.into(),
                found: nats.claim_type.clone(),
            });
        }
        if nats.user_nkey.is_empty() {
            return Err(ModelError::MissingField {
                field: "nats.user_nkey".into(),
            });
        }
        if nats.server_id.id.is_empty() {
            return Err(ModelError::MissingField {
                field: "nats.server_id.id".into(),
            });
        }

        Ok(Self {
            requesting_user_public_key: nats.user_nkey,
            connect_username: nats.connect_opts.user,
            connect_password: nats.connect_opts.pass,
            client_host: nats.client_info.host,
            client_name: nats.client_info.name,
            client_kind: nats.client_info.kind,
            origin_server_id: nats.server_id.id,
        })
    }
}

impl fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("requesting_user_public_key", &self.requesting_user_public_key)
            .field("connect_username", &self.connect_username)
            .field("connect_password", &"<redacted>")
            .field("client_host", &self.client_host)
            .field("client_name", &self.client_name)
            .field("client_kind", &self.client_kind)
            .field("origin_server_id", &self.origin_server_id)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AuthorizationResponse
// ---------------------------------------------------------------------------

/// Result carried by a response: exactly one of a token or an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// A signed user token was issued.
    Issued(String),
    /// The connection is refused for the given reason.
    Rejected(String),
}

/// The answer to one [`AuthorizationRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    /// Server the response is addressed to; empty when the request could
    /// not be decoded.
    pub audience: String,
    /// Public key of the connecting client; empty when unknown.
    pub subject: String,
    /// Token or error.
    pub outcome: ResponseOutcome,
}

impl AuthorizationResponse {
    /// Successful response carrying `token`.
    pub fn issued(request: &AuthorizationRequest, token: impl Into<String>) -> Self {
        Self {
            audience: request.origin_server_id.clone(),
            subject: request.requesting_user_public_key.clone(),
            outcome: ResponseOutcome::Issued(token.into()),
        }
    }

    /// Refusal addressed to the request's server.
    pub fn rejected(request: &AuthorizationRequest, error: impl Into<String>) -> Self {
        Self {
            audience: request.origin_server_id.clone(),
            subject: request.requesting_user_public_key.clone(),
            outcome: ResponseOutcome::Rejected(error.into()),
        }
    }

    /// Refusal for a request whose origin is unknown.
    pub fn unaddressed(error: impl Into<String>) -> Self {
        Self {
            audience: String::new(),
            subject: String::new(),
            outcome: ResponseOutcome::Rejected(error.into()),
        }
    }

    /// The issued token, if any.
    pub fn token(&self) -> Option<&str> {
        match &self.outcome {
            ResponseOutcome::Issued(token) => Some(token),
            ResponseOutcome::Rejected(_) => None,
        }
    }

    /// The error, if any.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ResponseOutcome::Issued(_) => None,
            ResponseOutcome::Rejected(error) => Some(error),
        }
    }
}

impl From<AuthorizationResponse> for AuthorizationResponseClaims {
    fn from(response: AuthorizationResponse) -> Self {
        let nats = match response.outcome {
            ResponseOutcome::Issued(token) => AuthorizationResponseNats::issued(token),
            ResponseOutcome::Rejected(error) => AuthorizationResponseNats::rejected(error),
        };
        ClaimsData::new(response.subject, nats).with_audience(response.audience)
    }
}

impl TryFrom<AuthorizationResponseClaims> for AuthorizationResponse {
    type Error = ModelError;

    fn try_from(claims: AuthorizationResponseClaims) -> Result<Self, Self::Error> {
        if claims.nats.claim_type() != AuthorizationResponseNats::CLAIM_TYPE {
            return Err(ModelError::UnexpectedClaimType {
                expected: AuthorizationResponseNats::CLAIM_TYPE.into(),
                found: claims.nats.claim_type.clone(),
            });
        }

        let audience = claims.audience().to_string();
        let outcome = match (claims.nats.jwt.is_empty(), claims.nats.error.is_empty()) {
            (false, true) => ResponseOutcome::Issued(claims.nats.jwt),
            (true, false) => ResponseOutcome::Rejected(claims.nats.error),
            _ => {
                return Err(ModelError::MissingField {
                    field: "exactly one of nats.jwt / nats.error".into(),
                });
            }
        };

        Ok(Self {
            audience,
            subject: claims.sub,
            outcome,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
