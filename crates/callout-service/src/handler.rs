//! Per-request authorization pipeline.
//!
//! Each inbound message goes through:
//!
//! 1. **Decode**: verify and parse the server-signed request JWT.
//! 2. **Authenticate**: look the username up and compare the password.
//! 3. **Authorize**: derive the permission set from the privilege level.
//! 4. **Issue**: build the user claims, self-check them, sign them.
//! 5. **Sign & respond**: wrap the token (or the error) in a signed
//!    authorization response and publish it on the reply subject.
//!
//! Steps 1–4 produce an [`AuthorizationResponse`] value on every path;
//! step 5 is the single place a reply is sent, so each request gets
//! exactly one answer.

use std::future::Future;
use std::time::Instant;

use callout_models::{
    AuthorizationRequest, AuthorizationResponse, CalloutSubjects, ClaimsData, UserClaims,
    UserNats,
};
use nkeys::KeyPair;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::CalloutError;
use crate::jwt;
use crate::policy;
use crate::signing::SigningIdentity;
use crate::store::CredentialStore;

/// Sent instead of a response JWT when the response itself cannot be
/// signed, so the server does not wait for a reply that never comes.
pub const FAILURE_MARKER: &[u8] = b"failed";

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// One inbound authorization request as delivered by the transport.
#[derive(Debug, Clone)]
pub struct CalloutMessage {
    /// Subject the request arrived on.
    pub subject: String,
    /// One-shot reply subject.
    pub reply: Option<String>,
    /// Raw request JWT.
    pub payload: Vec<u8>,
}

impl From<async_nats::Message> for CalloutMessage {
    fn from(message: async_nats::Message) -> Self {
        Self {
            subject: message.subject.to_string(),
            reply: message.reply.map(|reply| reply.to_string()),
            payload: message.payload.to_vec(),
        }
    }
}

/// Sends a reply payload to a reply subject.
pub trait Replier: Send + Sync {
    /// Publish `payload` on `reply_to`.
    fn reply(
        &self,
        reply_to: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), CalloutError>> + Send;
}

impl Replier for async_nats::Client {
    fn reply(
        &self,
        reply_to: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), CalloutError>> + Send {
        let subject = reply_to.to_string();
        async move {
            self.publish(subject, payload.into()).await?;
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Stateless request handler; the store and identity are read-only.
#[derive(Debug)]
pub struct CalloutHandler {
    store: CredentialStore,
    identity: SigningIdentity,
    token_ttl_secs: Option<u64>,
}

impl CalloutHandler {
    /// Handler issuing non-expiring tokens.
    pub fn new(store: CredentialStore, identity: SigningIdentity) -> Self {
        Self {
            store,
            identity,
            token_ttl_secs: None,
        }
    }

    /// Set the lifetime of issued user tokens.
    pub fn with_token_ttl(mut self, ttl_secs: Option<u64>) -> Self {
        self.token_ttl_secs = ttl_secs;
        self
    }

    /// Build the handler from validated configuration.
    ///
    /// Fails if the configuration is incomplete or the seed is malformed.
    pub fn from_config(config: &AppConfig) -> Result<Self, CalloutError> {
        config.validate()?;
        let identity = SigningIdentity::from_seed(&config.nkey_seed)?;
        let store = config.credential_store()?;
        Ok(Self::new(store, identity).with_token_ttl(config.token_ttl_secs))
    }

    /// Public key every token is issued by.
    pub fn public_key(&self) -> String {
        self.identity.public_key()
    }

    /// The credential store requests are checked against.
    pub fn credentials(&self) -> &CredentialStore {
        &self.store
    }

    /// Handle one message and send exactly one reply.
    ///
    /// Messages without a reply subject cannot be answered and are dropped.
    /// A failed send is logged and not retried: the reply subject is
    /// single-use.
    pub async fn handle<R: Replier>(&self, replier: &R, message: CalloutMessage) {
        let started = Instant::now();
        info!(
            subject = %message.subject,
            reply = message.reply.as_deref().unwrap_or_default(),
            "received authorization request"
        );

        let Some(reply_to) = message.reply.as_deref() else {
            warn!(
                subject = %message.subject,
                "authorization request has no reply subject, dropping"
            );
            return;
        };

        let response = self.authorize(&message.payload);
        let granted = response.token().is_some();
        let payload = self.seal(response);

        match replier.reply(reply_to, payload).await {
            Ok(()) if granted => info!(
                reply = reply_to,
                elapsed_secs = started.elapsed().as_secs_f64(),
                "authorization succeeded"
            ),
            Ok(()) => debug!(reply = reply_to, "rejection sent"),
            Err(e) => error!(
                reply = reply_to,
                error = %e,
                "failed to send authorization response"
            ),
        }
    }

    /// Run decode → authenticate → authorize → issue and return the
    /// response to send. Never fails: every error becomes a rejection.
    pub fn authorize(&self, payload: &[u8]) -> AuthorizationResponse {
        let request = match jwt::decode_request(payload) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "decoding authorization request failed");
                return AuthorizationResponse::unaddressed(e.client_message());
            }
        };

        info!(
            username = %request.connect_username,
            client_host = %request.client_host,
            client_kind = %request.client_kind,
            server_id = %request.origin_server_id,
            "new client wants to connect"
        );

        match self.issue(&request) {
            Ok(token) => AuthorizationResponse::issued(&request, token),
            Err(e) if e.is_server_fault() => {
                error!(
                    username = %request.connect_username,
                    error = %e,
                    "failed to issue user token"
                );
                AuthorizationResponse::rejected(&request, e.client_message())
            }
            Err(e) => {
                warn!(
                    username = %request.connect_username,
                    client_host = %request.client_host,
                    "authentication failed"
                );
                AuthorizationResponse::rejected(&request, e.client_message())
            }
        }
    }

    /// Authenticate, authorize, and sign a user token for `request`.
    fn issue(&self, request: &AuthorizationRequest) -> Result<String, CalloutError> {
        let entry = self
            .store
            .authenticate(&request.connect_username, &request.connect_password)?;

        let permissions = policy::derive(entry.privilege());
        let claims = ClaimsData::new(
            request.requesting_user_public_key.clone(),
            UserNats::from_rules(&permissions),
        )
        .with_audience(entry.target_account().as_str())
        .with_name(request.connect_username.clone());

        validate_user_claims(&claims)?;

        debug!(
            username = %request.connect_username,
            account = %entry.target_account(),
            privilege = %entry.privilege(),
            "issuing user token"
        );

        match self.token_ttl_secs {
            Some(ttl) => jwt::encode_with_ttl(claims, &self.identity, ttl),
            None => jwt::encode(claims, &self.identity),
        }
    }

    /// Sign `response` for transmission.
    ///
    /// Falls back to [`FAILURE_MARKER`] only if signing itself fails.
    pub fn seal(&self, response: AuthorizationResponse) -> Vec<u8> {
        match jwt::encode_response(response, &self.identity) {
            Ok(token) => token.into_bytes(),
            Err(e) => {
                error!(error = %e, "failed to encode authorization response");
                FAILURE_MARKER.to_vec()
            }
        }
    }
}

/// Structural self-check of user claims before they are signed.
fn validate_user_claims(claims: &UserClaims) -> Result<(), CalloutError> {
    let mut errors = Vec::new();

    if !claims.sub.starts_with('U') || KeyPair::from_public_key(&claims.sub).is_err() {
        errors.push(format!("subject \"{}\" is not a user public key", claims.sub));
    }
    if claims.audience().trim().is_empty() {
        errors.push("audience must not be empty".to_string());
    }
    if claims.name.trim().is_empty() {
        errors.push("name must not be empty".to_string());
    }

    let rules = claims.nats.rules();
    for pattern in rules.publish.patterns().chain(rules.subscribe.patterns()) {
        if let Err(e) = CalloutSubjects::validate(pattern) {
            errors.push(e.to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CalloutError::InvalidClaims(errors))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
