//! Self-describing ciphertext wire format: version byte + nonce + AEAD
//! ciphertext (tag included), base64-encoded for storage as an opaque
//! string (the `encryptedContent` column).

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use getrandom::getrandom;

use crate::error::CryptoError;

const WIRE_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;

fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// Encrypt `plaintext` under `key`, returning a base64 string carrying the
/// wire version, nonce, and AEAD ciphertext.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CryptoError::Aead(format!("bad key: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    getrandom(&mut nonce_bytes).map_err(|e| CryptoError::Aead(format!("rng: {}", e)))?;
    let nonce = Nonce::try_from(nonce_bytes.as_slice()).expect("12-byte nonce");

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Aead(format!("seal: {}", e)))?;

    let mut wire = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
    wire.push(WIRE_VERSION);
    wire.extend_from_slice(&nonce_bytes);
    wire.extend_from_slice(&ciphertext);

    Ok(b64().encode(wire))
}

/// Decrypt a ciphertext produced by [`encrypt`]. Fails with
/// [`CryptoError::Aead`] if `key` does not match the key the ciphertext was
/// sealed under (the AEAD authentication tag won't verify), and with
/// [`CryptoError::MalformedCiphertext`] if the wire framing is corrupt.
pub fn decrypt(key: &[u8; 32], encoded: &str) -> Result<Vec<u8>, CryptoError> {
    let wire = b64()
        .decode(encoded)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("base64: {}", e)))?;

    if wire.len() < 1 + NONCE_LEN {
        return Err(CryptoError::MalformedCiphertext(
            "ciphertext shorter than header".into(),
        ));
    }

    let version = wire[0];
    if version != WIRE_VERSION {
        return Err(CryptoError::MalformedCiphertext(format!(
            "unknown wire version {}",
            version
        )));
    }

    let nonce_bytes = &wire[1..1 + NONCE_LEN];
    let ciphertext = &wire[1 + NONCE_LEN..];

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CryptoError::Aead(format!("bad key: {}", e)))?;
    let nonce = Nonce::try_from(nonce_bytes).expect("12-byte nonce");

    cipher
        .decrypt(&nonce, ciphertext)
        .map_err(|e| CryptoError::Aead(format!("open: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let key = [3u8; 32];
        let ct = encrypt(&key, b"hello world").unwrap();
        assert_eq!(decrypt(&key, &ct).unwrap(), b"hello world");
    }

    #[test]
    fn wrong_key_fails() {
        let ct = encrypt(&[1u8; 32], b"hello world").unwrap();
        assert!(decrypt(&[2u8; 32], &ct).is_err());
    }

    #[test]
    fn malformed_ciphertext_is_rejected() {
        assert!(decrypt(&[1u8; 32], "not-base64!!!").is_err());
        assert!(decrypt(&[1u8; 32], "AA==").is_err());
    }
}
