//! Webhook signature verification.
//!
//! The provider signs each notification as
//! `SHA-256(account_token + "-" + raw_body)`, hex-encoded, delivered in the
//! `x-authenticity-token` header. The hash covers the exact bytes on the
//! wire, so the HTTP layer must hand this module the unmodified request body
//! — re-serializing parsed JSON produces different bytes and a mismatch.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compute the provider signature for a raw body: lowercase hex of
/// `SHA-256(secret + "-" + raw_body)`.
pub fn compute_signature(shared_secret: &str, raw_body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(shared_secret.as_bytes());
    hasher.update(b"-");
    hasher.update(raw_body);
    hex::encode(hasher.finalize())
}

/// Verify a provider signature against the raw request body.
///
/// Fails closed: an empty secret or empty/missing signature never verifies,
/// so a misconfigured deployment cannot accept unsigned traffic. The
/// comparison is constant-time over the decoded digest; a signature that is
/// not valid hex is compared against a zero digest rather than rejected
/// early, keeping the timing profile uniform.
pub fn verify(raw_body: &[u8], shared_secret: &str, provided_signature: &str) -> bool {
    if shared_secret.is_empty() || provided_signature.is_empty() {
        return false;
    }

    let mut hasher = Sha256::new();
    hasher.update(shared_secret.as_bytes());
    hasher.update(b"-");
    hasher.update(raw_body);
    let expected = hasher.finalize();

    let provided: [u8; 32] = match hex::decode(provided_signature) {
        Ok(bytes) => bytes.try_into().unwrap_or([0u8; 32]),
        Err(_) => [0u8; 32],
    };

    expected.ct_eq(&provided).into()
}
