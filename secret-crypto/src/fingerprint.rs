//! HMAC fingerprinting.
//!
//! Computed over the raw bytes of the *base64-encoded* secret content, not
//! the decoded plaintext — the API accepts base64 content and the HMAC is
//! taken over those encoded bytes as received. Unusual, but preserved
//! deliberately for wire compatibility with existing consumers.

use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 over `base64_content`.
pub fn compute_hmac(hmac_key: &[u8; 32], base64_content: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(hmac_key).expect("HMAC accepts keys of any length");
    mac.update(base64_content);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let key = [9u8; 32];
        assert_eq!(
            compute_hmac(&key, b"cGFzczEyMw=="),
            compute_hmac(&key, b"cGFzczEyMw==")
        );
    }

    #[test]
    fn distinct_inputs_differ() {
        let key = [9u8; 32];
        assert_ne!(
            compute_hmac(&key, b"cGFzczEyMw=="),
            compute_hmac(&key, b"c29tZXRoaW5nZWxzZQ==")
        );
    }
}
