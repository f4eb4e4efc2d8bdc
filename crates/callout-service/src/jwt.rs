//! NATS JWT encoding and decoding.
//!
//! Tokens are `base64url(header).base64url(body).base64url(sig)` with the
//! header `{"typ":"JWT","alg":"ed25519-nkey"}` and an Ed25519 signature
//! over the first two segments, made by the key whose public half is the
//! token's `iss`.

use std::time::SystemTime;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use callout_models::{
    AuthorizationRequest, AuthorizationRequestNats, AuthorizationResponse,
    AuthorizationResponseNats, ClaimsData, NatsClaim,
};
use nkeys::KeyPair;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CalloutError;
use crate::signing::SigningIdentity;

/// Header `typ` of every NATS token.
const TOKEN_TYPE: &str = "JWT";

/// Header `alg` of NATS v2 tokens.
const ALGORITHM: &str = "ed25519-nkey";

#[derive(Serialize, Deserialize)]
struct Header {
    typ: String,
    alg: String,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Sign `claims` as `identity`, stamping `jti`, `iat` and `iss`.
pub fn encode<T: Serialize>(
    claims: ClaimsData<T>,
    identity: &SigningIdentity,
) -> Result<String, CalloutError> {
    sign_claims(claims, identity, None)
}

/// Like [`encode`], additionally setting `exp` to `iat + ttl_secs`.
pub fn encode_with_ttl<T: Serialize>(
    claims: ClaimsData<T>,
    identity: &SigningIdentity,
    ttl_secs: u64,
) -> Result<String, CalloutError> {
    sign_claims(claims, identity, Some(ttl_secs))
}

/// Sign an authorization response.
pub fn encode_response(
    response: AuthorizationResponse,
    identity: &SigningIdentity,
) -> Result<String, CalloutError> {
    encode(ClaimsData::<AuthorizationResponseNats>::from(response), identity)
}

fn sign_claims<T: Serialize>(
    mut claims: ClaimsData<T>,
    identity: &SigningIdentity,
    ttl_secs: Option<u64>,
) -> Result<String, CalloutError> {
    let now = unix_now();
    claims.jti = uuid::Uuid::new_v4().simple().to_string();
    claims.iat = now;
    claims.iss = identity.public_key();
    if let Some(ttl) = ttl_secs {
        claims.exp = Some(now.saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX)));
    }

    encode_and_sign(identity, &claims)
}

/// Encode claims as `base64url(header).base64url(body).base64url(sig)`.
fn encode_and_sign<T: Serialize>(
    identity: &SigningIdentity,
    claims: &ClaimsData<T>,
) -> Result<String, CalloutError> {
    let header = Header {
        typ: TOKEN_TYPE.to_string(),
        alg: ALGORITHM.to_string(),
    };

    let encoded_header = URL_SAFE_NO_PAD.encode(
        serde_json::to_string(&header).map_err(|e| CalloutError::Encoding(e.to_string()))?,
    );
    let encoded_body = URL_SAFE_NO_PAD.encode(
        serde_json::to_string(claims).map_err(|e| CalloutError::Encoding(e.to_string()))?,
    );
    let signing_input = format!("{encoded_header}.{encoded_body}");

    let sig = identity.sign(signing_input.as_bytes())?;
    let encoded_sig = URL_SAFE_NO_PAD.encode(sig);

    Ok(format!("{signing_input}.{encoded_sig}"))
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode and verify a token whose body is `T`.
///
/// Checks the segment count, the header type and algorithm, the `nats.type`
/// discriminator, the issuer's key type, and the signature against the
/// `iss` public key.
pub fn decode<T>(token: &str) -> Result<ClaimsData<T>, CalloutError>
where
    T: DeserializeOwned + NatsClaim,
{
    let mut segments = token.trim().split('.');
    let (Some(header_b64), Some(body_b64), Some(sig_b64), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(malformed("expected three dot-separated segments"));
    };

    let header: Header = serde_json::from_slice(&base64_segment(header_b64, "header")?)
        .map_err(|e| malformed(format!("header: {e}")))?;
    if header.typ != TOKEN_TYPE {
        return Err(malformed(format!("unsupported token type \"{}\"", header.typ)));
    }
    if header.alg != ALGORITHM {
        return Err(malformed(format!("unsupported algorithm \"{}\"", header.alg)));
    }

    let claims: ClaimsData<T> = serde_json::from_slice(&base64_segment(body_b64, "body")?)
        .map_err(|e| malformed(format!("body: {e}")))?;
    if claims.nats.claim_type() != T::CLAIM_TYPE {
        return Err(malformed(format!(
            "claim type \"{}\", expected \"{}\"",
            claims.nats.claim_type(),
            T::CLAIM_TYPE
        )));
    }

    if !claims.iss.starts_with(T::ISSUER_PREFIX) {
        return Err(malformed(format!(
            "issuer \"{}\" is not a valid {} issuer",
            claims.iss,
            T::CLAIM_TYPE
        )));
    }

    let sig = base64_segment(sig_b64, "signature")?;
    let verifier = KeyPair::from_public_key(&claims.iss)
        .map_err(|e| malformed(format!("issuer \"{}\": {e}", claims.iss)))?;
    verifier
        .verify(format!("{header_b64}.{body_b64}").as_bytes(), &sig)
        .map_err(|_| malformed("signature verification failed"))?;

    Ok(claims)
}

/// Decode the raw payload of an inbound authorization request.
pub fn decode_request(payload: &[u8]) -> Result<AuthorizationRequest, CalloutError> {
    let token =
        std::str::from_utf8(payload).map_err(|_| malformed("payload is not valid UTF-8"))?;
    let claims = decode::<AuthorizationRequestNats>(token)?;
    Ok(AuthorizationRequest::try_from(claims)?)
}

/// Decode a signed authorization response.
pub fn decode_response(token: &str) -> Result<AuthorizationResponse, CalloutError> {
    let claims = decode::<AuthorizationResponseNats>(token)?;
    Ok(AuthorizationResponse::try_from(claims)?)
}

fn base64_segment(segment: &str, what: &str) -> Result<Vec<u8>, CalloutError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| malformed(format!("{what} is not base64url: {e}")))
}

fn malformed(reason: impl Into<String>) -> CalloutError {
    CalloutError::MalformedRequest(reason.into())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use callout_models::{
        AUTHORIZATION_REQUEST_AUDIENCE, AuthorizationRequestClaims, ConnectOpts, PermissionRuleSet,
        ServerId, SubjectRules, UserNats,
    };

    fn server_identity() -> SigningIdentity {
        SigningIdentity::from_seed(&KeyPair::new_server().seed().unwrap()).unwrap()
    }

    fn request_claims(user: &str, pass: &str) -> AuthorizationRequestClaims {
        let user_nkey = KeyPair::new_user().public_key();
        let nats = AuthorizationRequestNats {
            server_id: ServerId {
                id: "NSERVERID".into(),
                name: "test-server".into(),
                ..Default::default()
            },
            user_nkey: user_nkey.clone(),
            connect_opts: ConnectOpts {
                user: user.into(),
                pass: pass.into(),
                ..Default::default()
            },
            claim_type: AuthorizationRequestNats::CLAIM_TYPE.into(),
            version: 2,
            ..Default::default()
        };
        ClaimsData::new(user_nkey, nats).with_audience(AUTHORIZATION_REQUEST_AUDIENCE)
    }

    fn body_json(token: &str) -> serde_json::Value {
        let body_b64 = token.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(body_b64).unwrap()).unwrap()
    }

    #[test]
    fn token_has_three_parts_and_nkey_header() {
        let identity = SigningIdentity::generate();
        let token = encode(request_claims("a", "b"), &identity).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let header_b64 = token.split('.').next().unwrap();
        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_b64).unwrap()).unwrap();
        assert_eq!(header["alg"], "ed25519-nkey");
        assert_eq!(header["typ"], "JWT");
    }

    #[test]
    fn encode_stamps_issuer_and_ids() {
        let identity = SigningIdentity::generate();
        let token = encode(request_claims("a", "b"), &identity).unwrap();
        let body = body_json(&token);

        assert_eq!(body["iss"].as_str().unwrap(), identity.public_key());
        assert!(!body["jti"].as_str().unwrap().is_empty());
        assert!(body["iat"].as_i64().unwrap() > 0);
        assert!(body.get("exp").is_none());
    }

    #[test]
    fn ttl_sets_expiry() {
        let identity = SigningIdentity::generate();
        let rules = PermissionRuleSet {
            publish: SubjectRules::allow_all(),
            subscribe: SubjectRules::allow_all(),
            ..Default::default()
        };
        let claims = ClaimsData::new("UKEY", UserNats::from_rules(&rules));
        let token = encode_with_ttl(claims, &identity, 7200).unwrap();
        let body = body_json(&token);

        let iat = body["iat"].as_i64().unwrap();
        let exp = body["exp"].as_i64().unwrap();
        assert_eq!(exp - iat, 7200);
    }

    #[test]
    fn decode_request_accepts_server_signed_payload() {
        let server = server_identity();
        let claims = request_claims("admin", "admin");
        let user_nkey = claims.nats.user_nkey.clone();
        let token = encode(claims, &server).unwrap();

        let req = decode_request(token.as_bytes()).unwrap();
        assert_eq!(req.connect_username, "admin");
        assert_eq!(req.connect_password, "admin");
        assert_eq!(req.origin_server_id, "NSERVERID");
        assert_eq!(req.requesting_user_public_key, user_nkey);
    }

    #[test]
    fn decode_rejects_tampered_body() {
        let server = server_identity();
        let token = encode(request_claims("bob", "pw"), &server).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let mut body = body_json(&token);
        body["nats"]["connect_opts"]["user"] = "admin".into();
        let forged_body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&body).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_body, parts[2]);

        let err = decode_request(forged.as_bytes()).unwrap_err();
        assert!(matches!(err, CalloutError::MalformedRequest(_)));
    }

    #[test]
    fn decode_rejects_request_not_signed_by_a_server() {
        let user = SigningIdentity::from_seed(&KeyPair::new_user().seed().unwrap()).unwrap();
        let account = SigningIdentity::generate();

        for signer in [user, account] {
            let token = encode(request_claims("admin", "admin"), &signer).unwrap();
            let err = decode_request(token.as_bytes()).unwrap_err();
            assert!(matches!(err, CalloutError::MalformedRequest(_)));
            assert!(err.to_string().contains("issuer"), "{err}");
        }
    }

    #[test]
    fn decode_rejects_response_signed_by_a_server() {
        let response = AuthorizationResponse {
            audience: "NSERVERID".into(),
            subject: "UCLIENT".into(),
            outcome: callout_models::ResponseOutcome::Rejected("x".into()),
        };
        let token = encode_response(response, &server_identity()).unwrap();
        assert!(decode_response(&token).is_err());
    }

    #[test]
    fn decode_rejects_non_jwt_header_type() {
        let server = server_identity();
        let token = encode(request_claims("a", "b"), &server).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let header = URL_SAFE_NO_PAD.encode(r#"{"typ":"JWS","alg":"ed25519-nkey"}"#);
        let forged = format!("{header}.{}.{}", parts[1], parts[2]);

        let err = decode_request(forged.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("token type"), "{err}");
    }

    #[test]
    fn decode_rejects_structurally_invalid_input() {
        let payloads: [&[u8]; 6] = [
            b"failed",
            b"",
            b"a.b",
            b"a.b.c.d",
            b"!!!.???.###",
            &[0xff, 0xfe, 0x00],
        ];
        for payload in payloads {
            let err = decode_request(payload).unwrap_err();
            assert!(matches!(err, CalloutError::MalformedRequest(_)));
        }
    }

    #[test]
    fn decode_rejects_wrong_claim_type() {
        let identity = SigningIdentity::generate();
        let token = encode(
            ClaimsData::new("UKEY", AuthorizationResponseNats::rejected("x")),
            &identity,
        )
        .unwrap();

        let err = decode_request(token.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("claim type"));
    }

    #[test]
    fn decode_rejects_missing_required_fields() {
        let server = server_identity();
        let mut claims = request_claims("a", "b");
        claims.nats.server_id.id.clear();
        let token = encode(claims, &server).unwrap();

        assert!(matches!(
            decode_request(token.as_bytes()),
            Err(CalloutError::MalformedRequest(_))
        ));
    }

    #[test]
    fn response_survives_encode_then_decode() {
        let identity = SigningIdentity::generate();
        let response = AuthorizationResponse {
            audience: "NSERVERID".into(),
            subject: "UCLIENT".into(),
            outcome: callout_models::ResponseOutcome::Rejected(
                "invalid username and password".into(),
            ),
        };

        let token = encode_response(response.clone(), &identity).unwrap();
        let decoded = decode_response(&token).unwrap();
        assert_eq!(decoded, response);

        let claims = decode::<AuthorizationResponseNats>(&token).unwrap();
        assert_eq!(claims.iss, identity.public_key());
    }
}
