//! NATS JWT claim types (wire format, claims version 2).
//!
//! Every token exchanged with the server is a JWT whose body is a
//! [`ClaimsData`] envelope (standard registered claims) wrapping a
//! NATS-specific `nats` object:
//!
//! ```text
//! ClaimsData<T>
//! ├── jti / iat / iss / name / sub / aud / exp
//! └── nats: T
//!     ├── UserNats                     (type "user")
//!     ├── AuthorizationRequestNats     (type "authorization_request")
//!     └── AuthorizationResponseNats    (type "authorization_response")
//! ```
//!
//! Field names follow the server's JSON encoding exactly; unknown fields are
//! ignored when decoding and empty optional fields are omitted when
//! encoding.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::permissions::{PermissionRuleSet, ResponseLimits, SubjectRules};

/// Claims schema version understood by NATS server 2.10+.
pub const CLAIMS_VERSION: i32 = 2;

/// Limit value meaning "unlimited" for subscription/data/payload limits.
pub const NO_LIMIT: i64 = -1;

/// Audience the server puts on authorization requests.
pub const AUTHORIZATION_REQUEST_AUDIENCE: &str = "nats-authorization-request";

fn no_limit() -> i64 {
    NO_LIMIT
}

/// A claim body carrying a `type` discriminator.
pub trait NatsClaim {
    /// The value of `nats.type` for this body.
    const CLAIM_TYPE: &'static str;

    /// Public-key prefix the issuer must carry: `N` for servers, `A` for
    /// accounts.
    const ISSUER_PREFIX: char;

    /// The `nats.type` carried by this instance.
    fn claim_type(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Registered JWT claims shared by every NATS token, wrapping the
/// type-specific `nats` body.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClaimsData<T> {
    /// Unique token identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jti: String,
    /// Issued-at, seconds since the Unix epoch.
    #[serde(default)]
    pub iat: i64,
    /// Public key of the signer.
    #[serde(default)]
    pub iss: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Public key the claims are about.
    #[serde(default)]
    pub sub: String,
    /// Intended audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Expiry, seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// NATS-specific body.
    pub nats: T,
}

impl<T> ClaimsData<T> {
    /// Claims about `subject` with the given body; issuer and timestamps are
    /// stamped when the token is signed.
    pub fn new(subject: impl Into<String>, nats: T) -> Self {
        Self {
            jti: String::new(),
            iat: 0,
            iss: String::new(),
            name: String::new(),
            sub: subject.into(),
            aud: None,
            exp: None,
            nats,
        }
    }

    /// Set the audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        let audience = audience.into();
        self.aud = (!audience.is_empty()).then_some(audience);
        self
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Audience, or `""` when absent.
    pub fn audience(&self) -> &str {
        self.aud.as_deref().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// User claims
// ---------------------------------------------------------------------------

/// Allow / deny lists as encoded in a user token.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Permission {
    /// Allowed subjects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,
    /// Denied subjects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<String>,
}

impl From<&SubjectRules> for Permission {
    fn from(rules: &SubjectRules) -> Self {
        Self {
            allow: rules.allow.clone(),
            deny: rules.deny.iter().cloned().collect(),
        }
    }
}

impl From<&Permission> for SubjectRules {
    fn from(permission: &Permission) -> Self {
        Self {
            allow: permission.allow.clone(),
            deny: permission.deny.iter().cloned().collect(),
        }
    }
}

/// Reply-subject permission (`resp`); `ttl` is in nanoseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponsePermission {
    /// Maximum number of responses.
    pub max: i64,
    /// Validity window in nanoseconds; zero means no expiry.
    pub ttl: i64,
}

impl From<ResponseLimits> for ResponsePermission {
    fn from(limits: ResponseLimits) -> Self {
        Self {
            max: i64::from(limits.max_responses),
            ttl: i64::try_from(limits.expiry.as_nanos()).unwrap_or(i64::MAX),
        }
    }
}

impl From<ResponsePermission> for ResponseLimits {
    fn from(resp: ResponsePermission) -> Self {
        Self {
            max_responses: u32::try_from(resp.max.max(0)).unwrap_or(u32::MAX),
            expiry: Duration::from_nanos(u64::try_from(resp.ttl.max(0)).unwrap_or_default()),
        }
    }
}

/// `nats` body of a user token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserNats {
    /// Publish permissions.
    #[serde(rename = "pub", default)]
    pub publish: Permission,
    /// Subscribe permissions.
    #[serde(rename = "sub", default)]
    pub subscribe: Permission,
    /// Reply-subject permission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resp: Option<ResponsePermission>,
    /// Maximum subscriptions.
    #[serde(default = "no_limit")]
    pub subs: i64,
    /// Maximum bytes.
    #[serde(default = "no_limit")]
    pub data: i64,
    /// Maximum message payload.
    #[serde(default = "no_limit")]
    pub payload: i64,
    /// Account public key when signed by a signing key rather than the
    /// account itself.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer_account: String,
    /// Always `"user"`.
    #[serde(rename = "type")]
    pub claim_type: String,
    /// Claims version.
    pub version: i32,
}

impl UserNats {
    /// User body granting exactly `rules`, with unlimited connection limits.
    pub fn from_rules(rules: &PermissionRuleSet) -> Self {
        Self {
            publish: Permission::from(&rules.publish),
            subscribe: Permission::from(&rules.subscribe),
            resp: Some(ResponsePermission::from(rules.response_limits)),
            subs: NO_LIMIT,
            data: NO_LIMIT,
            payload: NO_LIMIT,
            issuer_account: String::new(),
            claim_type: Self::CLAIM_TYPE.to_string(),
            version: CLAIMS_VERSION,
        }
    }

    /// The rule set encoded in this body.
    pub fn rules(&self) -> PermissionRuleSet {
        PermissionRuleSet {
            publish: SubjectRules::from(&self.publish),
            subscribe: SubjectRules::from(&self.subscribe),
            response_limits: self.resp.map(ResponseLimits::from).unwrap_or_default(),
        }
    }
}

impl NatsClaim for UserNats {
    const CLAIM_TYPE: &'static str = "user";
    const ISSUER_PREFIX: char = 'A';

    fn claim_type(&self) -> &str {
        &self.claim_type
    }
}

/// Claims of an issued user token.
pub type UserClaims = ClaimsData<UserNats>;

// ---------------------------------------------------------------------------
// Authorization request
// ---------------------------------------------------------------------------

/// Identity of the server that forwarded the connection attempt.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ServerId {
    /// Server name.
    pub name: String,
    /// Server host.
    pub host: String,
    /// Server public key; the audience of the response.
    pub id: String,
    /// Server version.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Cluster name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster: String,
    /// Server tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Server curve key for encrypted callouts.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub xkey: String,
}

/// Information the server knows about the connecting client.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ClientInformation {
    /// Remote host.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    /// Server-assigned client id.
    #[serde(skip_serializing_if = "is_zero")]
    pub id: u64,
    /// User the client authenticated as, if any.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user: String,
    /// Client-supplied connection name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Client tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Name tag.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name_tag: String,
    /// Connection kind (`Client`, `Leafnode`, ...).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Client protocol type (`nats`, `mqtt`, `websocket`, ...).
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub client_type: String,
    /// MQTT client id.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mqtt_id: String,
    /// Nonce presented to the client.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub nonce: String,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Options the client sent in its `CONNECT`.
///
/// `Debug` never prints the password or auth token.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectOpts {
    /// User JWT, for decentralized auth.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub jwt: String,
    /// User nkey.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub nkey: String,
    /// Nonce signature.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sig: String,
    /// Token auth.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub auth_token: String,
    /// Username.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user: String,
    /// Password.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pass: String,
    /// Connection name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Client library language.
    pub lang: String,
    /// Client library version.
    pub version: String,
    /// Protocol level.
    pub protocol: i32,
}

impl fmt::Debug for ConnectOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOpts")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("auth_token", &"<redacted>")
            .field("nkey", &self.nkey)
            .field("name", &self.name)
            .field("lang", &self.lang)
            .field("version", &self.version)
            .field("protocol", &self.protocol)
            .finish()
    }
}

/// `nats` body of an authorization request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AuthorizationRequestNats {
    /// Forwarding server.
    pub server_id: ServerId,
    /// Public key the server generated for this client; the token subject.
    pub user_nkey: String,
    /// Client information.
    pub client_info: ClientInformation,
    /// Client connect options.
    pub connect_opts: ConnectOpts,
    /// Nonce for the request.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub request_nonce: String,
    /// Always `"authorization_request"`.
    #[serde(rename = "type")]
    pub claim_type: String,
    /// Claims version.
    pub version: i32,
}

impl NatsClaim for AuthorizationRequestNats {
    const CLAIM_TYPE: &'static str = "authorization_request";
    const ISSUER_PREFIX: char = 'N';

    fn claim_type(&self) -> &str {
        &self.claim_type
    }
}

/// Claims of an authorization request sent by the server.
pub type AuthorizationRequestClaims = ClaimsData<AuthorizationRequestNats>;

// ---------------------------------------------------------------------------
// Authorization response
// ---------------------------------------------------------------------------

/// `nats` body of an authorization response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponseNats {
    /// Issued user token.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jwt: String,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Account public key when signed by a signing key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer_account: String,
    /// Always `"authorization_response"`.
    #[serde(rename = "type")]
    pub claim_type: String,
    /// Claims version.
    pub version: i32,
}

impl AuthorizationResponseNats {
    fn new(jwt: String, error: String) -> Self {
        Self {
            jwt,
            error,
            issuer_account: String::new(),
            claim_type: Self::CLAIM_TYPE.to_string(),
            version: CLAIMS_VERSION,
        }
    }

    /// Body carrying an issued token.
    pub fn issued(jwt: impl Into<String>) -> Self {
        Self::new(jwt.into(), String::new())
    }

    /// Body carrying a failure reason.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self::new(String::new(), error.into())
    }
}

impl NatsClaim for AuthorizationResponseNats {
    const CLAIM_TYPE: &'static str = "authorization_response";
    const ISSUER_PREFIX: char = 'A';

    fn claim_type(&self) -> &str {
        &self.claim_type
    }
}

/// Claims of the response sent back to the server.
pub type AuthorizationResponseClaims = ClaimsData<AuthorizationResponseNats>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
