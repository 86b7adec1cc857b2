//! Cryptographic utilities for payout webhook verification.
//!
//! The payout provider signs each webhook body with HMAC-SHA256 over the raw
//! payload. We recompute the signature with the shared secret and compare in
//! constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 over `message` and return the hex-encoded digest.
///
/// # Panics
///
/// Never panics in practice: HMAC-SHA256 accepts keys of any size per
/// RFC 2104, so `new_from_slice` only fails if the Hmac implementation is
/// broken.
#[must_use]
pub fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(message.as_bytes());
    let result = mac.finalize();

    hex::encode(result.into_bytes())
}

/// Constant-time string comparison.
///
/// Used when checking webhook signatures so the comparison does not leak
/// how many leading characters matched.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_digest_is_64_hex_chars() {
        let result = hmac_sha256_hex("payout-secret", r#"{"transaction_id":"x","success":true}"#);
        assert_eq!(result.len(), 64);
    }

    #[test]
    fn hmac_is_deterministic() {
        assert_eq!(
            hmac_sha256_hex("secret", "payload"),
            hmac_sha256_hex("secret", "payload")
        );
    }

    #[test]
    fn hmac_differs_across_secrets_and_payloads() {
        let base = hmac_sha256_hex("secret", "payload");
        assert_ne!(base, hmac_sha256_hex("other", "payload"));
        assert_ne!(base, hmac_sha256_hex("secret", "payload2"));
    }

    #[test]
    fn constant_time_eq_equal_strings() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn constant_time_eq_different_strings() {
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
        assert!(!constant_time_eq("abc", "ABC"));
    }
}
