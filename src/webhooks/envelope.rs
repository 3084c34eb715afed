//! The `Pay2-House-Signature` envelope.
//!
//! Wire format, fixed by the gateway:
//!
//! ```text
//! base64( hex(iv) "|" hex(hmac_sha256) "|" base64( base64(aes_256_cbc_ciphertext) ) )
//! ```
//!
//! The ciphertext segment is base64 of the gateway's own base64-encoded
//! cipher output, so it is normally decoded twice before decryption.

use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::{DecodeError, Engine, alphabet};

use super::verification::VerificationFailure;

const DELIMITER: u8 = b'|';

/// Standard alphabet, padding optional and stray trailing bits ignored
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode base64 the way the gateway's own tooling accepts it
///
/// Whitespace anywhere in the input is skipped and `=` padding may be
/// missing. Encoding always uses padded [`STANDARD`].
pub(crate) fn decode_lenient(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let compact: Vec<u8> = input
        .iter()
        .copied()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    LENIENT.decode(compact)
}

/// The three raw segments of a decoded envelope
///
/// Segments are kept exactly as received; the HMAC is computed over these
/// bytes, not over any re-encoding of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Hex-encoded 16 byte initialization vector
    pub iv: Vec<u8>,
    /// Hex-encoded HMAC-SHA256
    pub signature: Vec<u8>,
    /// Base64 text wrapping the cipher output
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Decode and split an envelope
    ///
    /// Fails with [`VerificationFailure::MalformedEnvelope`] unless the input
    /// is valid base64 holding exactly three `|`-separated parts.
    pub fn parse(encoded: &str) -> Result<Self, VerificationFailure> {
        let decoded = decode_lenient(encoded.as_bytes()).map_err(|e| {
            VerificationFailure::MalformedEnvelope(format!("outer base64 is invalid: {}", e))
        })?;

        let parts: Vec<&[u8]> = decoded.split(|byte| *byte == DELIMITER).collect();
        let [iv, signature, ciphertext] = parts.as_slice() else {
            return Err(VerificationFailure::MalformedEnvelope(format!(
                "expected 3 parts, got {}",
                parts.len()
            )));
        };

        Ok(Self {
            iv: iv.to_vec(),
            signature: signature.to_vec(),
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// The bytes covered by the signature: `iv "|" ciphertext`
    pub fn signed_bytes(&self) -> Vec<u8> {
        join_segments(&[self.iv.as_slice(), self.ciphertext.as_slice()])
    }

    /// Re-encode in wire format
    pub fn encode(&self) -> String {
        STANDARD.encode(join_segments(&[
            self.iv.as_slice(),
            self.signature.as_slice(),
            self.ciphertext.as_slice(),
        ]))
    }
}

fn join_segments(segments: &[&[u8]]) -> Vec<u8> {
    let len = segments.iter().map(|s| s.len() + 1).sum();
    let mut out = Vec::with_capacity(len);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        out.extend_from_slice(segment);
    }
    out
}
