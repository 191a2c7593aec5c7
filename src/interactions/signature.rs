//! Ed25519 verification of inbound interaction requests.
//!
//! The signed message is the timestamp header followed by the raw body.

use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Missing signature headers")]
    Missing,

    #[error("Invalid signature")]
    Invalid,
}

/// Verifies request signatures against the application public key.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    /// Build a verifier from a hex-encoded public key.
    pub fn from_hex(public_key: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(public_key.trim())
            .map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))?;
        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            SignatureError::InvalidPublicKey(format!("expected {} bytes", PUBLIC_KEY_LENGTH))
        })?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))?;

        Ok(Self { key })
    }

    /// Verify a request. Any missing or malformed input fails closed.
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<(), SignatureError> {
        let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
            return Err(SignatureError::Missing);
        };

        let signature_bytes = hex::decode(signature).map_err(|_| SignatureError::Invalid)?;
        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| SignatureError::Invalid)?;

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify(&message, &signature)
            .map_err(|_| SignatureError::Invalid)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    pub(crate) fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    pub(crate) fn public_key_hex() -> String {
        hex::encode(signing_key().verifying_key().to_bytes())
    }

    pub(crate) fn sign(timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(signing_key().sign(&message).to_bytes())
    }

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::from_hex(&public_key_hex()).unwrap()
    }

    #[test]
    fn test_valid_signature() {
        let body = br#"{"type":1}"#;
        let signature = sign("1700000000", body);

        assert_eq!(
            verifier().verify(Some("1700000000"), body, Some(&signature)),
            Ok(())
        );
    }

    #[test]
    fn test_tampered_body() {
        let signature = sign("1700000000", br#"{"type":1}"#);

        assert_eq!(
            verifier().verify(Some("1700000000"), br#"{"type":2}"#, Some(&signature)),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn test_wrong_timestamp() {
        let body = br#"{"type":1}"#;
        let signature = sign("1700000000", body);

        assert_eq!(
            verifier().verify(Some("1700000001"), body, Some(&signature)),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn test_missing_headers() {
        let body = b"{}";
        assert_eq!(
            verifier().verify(None, body, Some("00")),
            Err(SignatureError::Missing)
        );
        assert_eq!(
            verifier().verify(Some("1"), body, None),
            Err(SignatureError::Missing)
        );
    }

    #[test]
    fn test_malformed_signature() {
        let body = b"{}";
        assert_eq!(
            verifier().verify(Some("1"), body, Some("not-hex")),
            Err(SignatureError::Invalid)
        );
        assert_eq!(
            verifier().verify(Some("1"), body, Some("abcd")),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn test_invalid_public_key() {
        assert!(matches!(
            SignatureVerifier::from_hex("zz"),
            Err(SignatureError::InvalidPublicKey(_))
        ));
        assert!(matches!(
            SignatureVerifier::from_hex("abcd"),
            Err(SignatureError::InvalidPublicKey(_))
        ));
    }
}
