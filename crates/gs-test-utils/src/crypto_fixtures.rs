//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 keypairs that stand in for a learning
//! platform's signing keys. The same seed always yields the same key.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::{json, Value};
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// A platform signing key with its published JWK form.
#[derive(Clone)]
pub struct TestKeypair {
    kid: String,
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl TestKeypair {
    /// Derive a keypair from a one-byte seed.
    ///
    /// # Example
    /// ```rust,ignore
    /// let a = TestKeypair::from_seed(1, "k1")?;
    /// let b = TestKeypair::from_seed(1, "k1")?;
    /// assert_eq!(a.jwk_json(), b.jwk_json());
    /// ```
    pub fn from_seed(seed: u8, kid: &str) -> Result<Self, FixtureError> {
        let mut seed_bytes = [0u8; 32];
        for (i, byte) in seed_bytes.iter_mut().enumerate() {
            *byte = seed.wrapping_mul(i as u8 + 1).wrapping_add(i as u8);
        }

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
            .map_err(|e| FixtureError::Crypto(format!("Failed to derive test keypair: {:?}", e)))?;

        Ok(Self {
            kid: kid.to_string(),
            pkcs8: build_pkcs8_from_seed(&seed_bytes),
            public_key: key_pair.public_key().as_ref().to_vec(),
        })
    }

    /// Key ID placed in token headers and the JWK.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The public half as a JWKS entry.
    pub fn jwk_json(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "alg": "EdDSA",
            "use": "sig",
            "kid": self.kid,
            "x": URL_SAFE_NO_PAD.encode(&self.public_key),
        })
    }

    /// Sign `claims` as an EdDSA JWT with this key's `kid`.
    pub fn sign(&self, claims: &Value) -> Result<String, FixtureError> {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.kid.clone());

        encode(&header, claims, &EncodingKey::from_ed_der(&self.pkcs8))
            .map_err(|e| FixtureError::Signing(e.to_string()))
    }
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// This is a test-only utility. Production code must use ring::rand::SystemRandom.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    // SEQUENCE { version INTEGER 0, AlgorithmIdentifier { 1.3.101.112 },
    //            privateKey OCTET STRING { OCTET STRING seed } }
    let mut pkcs8 = Vec::with_capacity(48);
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);
    pkcs8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_is_deterministic() {
        let a = TestKeypair::from_seed(1, "k1").unwrap();
        let b = TestKeypair::from_seed(1, "k1").unwrap();

        assert_eq!(a.jwk_json(), b.jwk_json());
    }

    #[test]
    fn test_different_seeds_produce_different_keys() {
        let a = TestKeypair::from_seed(1, "k1").unwrap();
        let b = TestKeypair::from_seed(2, "k1").unwrap();

        assert_ne!(a.jwk_json()["x"], b.jwk_json()["x"]);
    }

    #[test]
    fn test_pkcs8_is_accepted_by_ring() {
        let key = TestKeypair::from_seed(7, "k7").unwrap();
        let parsed = Ed25519KeyPair::from_pkcs8_maybe_unchecked(&key.pkcs8).unwrap();

        assert_eq!(parsed.public_key().as_ref(), key.public_key.as_slice());
    }

    #[test]
    fn test_signed_token_carries_kid() {
        let key = TestKeypair::from_seed(3, "platform-key").unwrap();
        let token = key.sign(&json!({"sub": "learner"})).unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some("platform-key"));
        assert_eq!(header.alg, Algorithm::EdDSA);
    }
}
