//! The callout's signing identity.
//!
//! Every issued user token and every authorization response is signed with
//! the same nkey pair, derived once from a seed at startup. The server
//! verifies responses against the public half configured as the callout
//! issuer.

use std::fmt;

use nkeys::KeyPair;

use crate::error::CalloutError;

/// Long-lived nkey pair used to sign tokens.
pub struct SigningIdentity {
    key_pair: KeyPair,
}

impl SigningIdentity {
    /// Derive the identity from an encoded nkey seed (`S...`).
    ///
    /// Fails with [`CalloutError::InvalidSeed`] when the seed has the wrong
    /// length, prefix, or checksum.
    pub fn from_seed(seed: &str) -> Result<Self, CalloutError> {
        let key_pair =
            KeyPair::from_seed(seed.trim()).map_err(|e| CalloutError::InvalidSeed(e.to_string()))?;
        Ok(Self { key_pair })
    }

    /// Fresh random account identity, for tests and local tooling.
    pub fn generate() -> Self {
        Self {
            key_pair: KeyPair::new_account(),
        }
    }

    /// Public key, the `iss` of every token this identity signs.
    pub fn public_key(&self) -> String {
        self.key_pair.public_key()
    }

    /// Ed25519 signature over `payload`.
    pub fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, CalloutError> {
        self.key_pair
            .sign(payload)
            .map_err(|e| CalloutError::Encoding(format!("signing failed: {e}")))
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_seed_round_trips_public_key() {
        let kp = KeyPair::new_account();
        let seed = kp.seed().unwrap();

        let identity = SigningIdentity::from_seed(&seed).unwrap();
        assert_eq!(identity.public_key(), kp.public_key());
        assert!(identity.public_key().starts_with('A'));
    }

    #[test]
    fn malformed_seed_is_rejected() {
        for seed in ["", "not-a-seed", "SAANDLKMXL6CUS3CP52WIXBEDN6YJ545GDKC65U5JZPPV6WH6ESWUA6Y"] {
            let err = SigningIdentity::from_seed(seed).unwrap_err();
            assert!(matches!(err, CalloutError::InvalidSeed(_)), "{seed}");
        }
    }

    #[test]
    fn signature_verifies_with_public_key() {
        let identity = SigningIdentity::generate();
        let sig = identity.sign(b"payload").unwrap();

        let verifier = KeyPair::from_public_key(&identity.public_key()).unwrap();
        assert!(verifier.verify(b"payload", &sig).is_ok());
        assert!(verifier.verify(b"tampered", &sig).is_err());
    }

    #[test]
    fn debug_does_not_print_seed() {
        let kp = KeyPair::new_account();
        let seed = kp.seed().unwrap();
        let identity = SigningIdentity::from_seed(&seed).unwrap();
        let dbg = format!("{identity:?}");
        assert!(!dbg.contains(&seed));
        assert!(dbg.contains(&kp.public_key()));
    }
}
