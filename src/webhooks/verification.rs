//! Pay2 webhook authentication and decryption.
//!
//! # Tracing Events
//!
//! - `webhooks.pay2.signature_mismatch` - HMAC did not match (possible forgery)
//! - `webhooks.pay2.decryption_failed` - HMAC matched but the cipher step failed

use aes::Aes256;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::envelope::{Envelope, decode_lenient};
use super::notification::Pay2Notification;
use crate::error::{FloodgateError, Result};

type HmacSha256 = Hmac<Sha256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

/// AES block size; the IV must decode to exactly this many bytes
const IV_LEN: usize = 16;

/// Why an envelope was refused
///
/// Every variant is terminal: no plaintext is returned alongside any of them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationFailure {
    /// The input could not be decoded or split into three parts
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The HMAC did not match; treat as forged or corrupted
    #[error("signature mismatch")]
    SignatureMismatch,

    /// The HMAC matched but decryption failed
    ///
    /// Points at a key or algorithm mismatch rather than an attacker.
    #[error("decryption failed: {0}")]
    DecryptionError(String),
}

/// Verifier for `Pay2-House-Signature` envelopes
///
/// The shared secret doubles as the HMAC key and, hashed with SHA-256, as the
/// AES-256 key. It is held as a [`SecretString`] so it never shows up in
/// debug output.
///
/// # Example
///
/// ```rust,ignore
/// use floodgate::webhooks::Pay2Verifier;
///
/// let verifier = Pay2Verifier::new(api_key);
/// let plaintext = verifier.verify_and_decrypt(signature_header)?;
/// ```
#[derive(Debug)]
pub struct Pay2Verifier {
    secret: SecretString,
}

impl Pay2Verifier {
    pub fn new(secret: impl Into<SecretString>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Authenticate an envelope and return the decrypted payload
    pub fn verify_and_decrypt(&self, encoded: &str) -> std::result::Result<Vec<u8>, VerificationFailure> {
        let envelope = Envelope::parse(encoded)?;

        let expected = hex::encode(self.compute_signature(&envelope.signed_bytes()));
        if !constant_time_compare(expected.as_bytes(), &envelope.signature) {
            tracing::warn!(
                target: "webhooks.pay2.signature_mismatch",
                received_len = envelope.signature.len(),
                "Pay2 webhook signature does not match"
            );
            return Err(VerificationFailure::SignatureMismatch);
        }

        self.decrypt(&envelope).inspect_err(|failure| {
            tracing::error!(
                target: "webhooks.pay2.decryption_failed",
                error = %failure,
                "Pay2 webhook signature matched but decryption failed"
            );
        })
    }

    /// Like [`verify_and_decrypt`](Self::verify_and_decrypt), requiring UTF-8 plaintext
    pub fn verify_and_decrypt_str(&self, encoded: &str) -> std::result::Result<String, VerificationFailure> {
        let plaintext = self.verify_and_decrypt(encoded)?;
        String::from_utf8(plaintext).map_err(|_| {
            VerificationFailure::DecryptionError("plaintext is not valid UTF-8".to_string())
        })
    }

    /// Verify, decrypt and parse the payment notification
    pub fn verify_notification(&self, encoded: &str) -> Result<Pay2Notification> {
        let plaintext = self.verify_and_decrypt(encoded)?;
        serde_json::from_slice(&plaintext).map_err(|e| {
            tracing::error!(error = %e, "Decrypted Pay2 webhook is not a JSON notification");
            FloodgateError::bad_request("Decrypted webhook payload is not valid JSON")
        })
    }

    /// Build an envelope the way the gateway does, with a random IV
    pub fn seal(&self, plaintext: &[u8]) -> String {
        self.seal_with_iv(rand::random::<[u8; IV_LEN]>(), plaintext)
    }

    /// Build an envelope with a caller-chosen IV
    pub fn seal_with_iv(&self, iv: [u8; IV_LEN], plaintext: &[u8]) -> String {
        let key = self.cipher_key();
        let raw = Aes256CbcEnc::new(&key, &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let iv_hex = hex::encode(iv).into_bytes();
        let ciphertext = STANDARD.encode(STANDARD.encode(raw)).into_bytes();
        let mut envelope = Envelope {
            iv: iv_hex,
            signature: Vec::new(),
            ciphertext,
        };
        envelope.signature = hex::encode(self.compute_signature(&envelope.signed_bytes())).into_bytes();
        envelope.encode()
    }

    fn compute_signature(&self, message: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }

    /// SHA-256 of the secret, used raw as the AES-256 key
    fn cipher_key(&self) -> sha2::digest::Output<Sha256> {
        Sha256::digest(self.secret.expose_secret().as_bytes())
    }

    fn decrypt(&self, envelope: &Envelope) -> std::result::Result<Vec<u8>, VerificationFailure> {
        let iv = hex::decode(&envelope.iv).map_err(|e| {
            VerificationFailure::DecryptionError(format!("IV is not valid hex: {}", e))
        })?;
        if iv.len() != IV_LEN {
            return Err(VerificationFailure::DecryptionError(format!(
                "IV must be {} bytes, got {}",
                IV_LEN,
                iv.len()
            )));
        }

        let segment = decode_lenient(&envelope.ciphertext).map_err(|e| {
            VerificationFailure::DecryptionError(format!("ciphertext segment is not base64: {}", e))
        })?;
        let raw = unwrap_cipher_output(segment);

        let key = self.cipher_key();
        let cipher = Aes256CbcDec::new_from_slices(&key, &iv)
            .map_err(|e| VerificationFailure::DecryptionError(format!("invalid key or IV: {}", e)))?;

        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&raw)
            .map_err(|_| VerificationFailure::DecryptionError("bad padding or wrong key".to_string()))
    }
}

/// The gateway base64-encodes its cipher output before wrapping it in the
/// envelope, so the segment normally decodes to base64 text. Segments that
/// already hold raw whole blocks are used as they are.
fn unwrap_cipher_output(segment: Vec<u8>) -> Vec<u8> {
    match decode_lenient(&segment) {
        Ok(inner) if !inner.is_empty() && inner.len() % IV_LEN == 0 => inner,
        _ => segment,
    }
}

/// Constant-time comparison to prevent timing attacks
///
/// Length is not secret (the expected value is always 64 hex characters), so
/// the early return on a length difference leaks nothing useful.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}
