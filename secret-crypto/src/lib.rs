//! Envelope encryption and HMAC fingerprinting for secret content (C1).
//!
//! Encryption is AES-256-GCM; the key for a given secret name is derived
//! deterministically from a master key via HKDF-SHA256, so two calls with
//! the same name yield the same key and copying a ciphertext between
//! series breaks decryption. The master key itself is held by a keystore
//! external to this crate — see [`MasterKeySource`].

mod error;
mod fingerprint;
mod keys;
mod wire;

pub use error::{CryptoError, DecryptError, EncryptError};
pub use keys::{derive_hmac_key, derive_key, MasterKeySource, StaticMasterKey};

/// Facade composing key derivation, AEAD envelope encryption, and HMAC
/// fingerprinting behind one object — mirrors how callers actually use
/// this crate (one `Cryptographer` per process, keyed by one master key).
pub struct Cryptographer {
    master: Box<dyn MasterKeySource>,
}

impl Cryptographer {
    pub fn new(master: impl MasterKeySource + 'static) -> Self {
        Self {
            master: Box::new(master),
        }
    }

    /// Deterministic per-name subkey.
    pub fn derive_key(&self, name: &str) -> [u8; 32] {
        derive_key(self.master.as_ref(), name)
    }

    /// Encrypt `plaintext` under the key derived for `name`.
    pub fn encrypt(&self, name: &str, plaintext: &[u8]) -> Result<String, EncryptError> {
        let key = self.derive_key(name);
        Ok(wire::encrypt(&key, plaintext)?)
    }

    /// Decrypt ciphertext produced by [`Cryptographer::encrypt`] for the
    /// same `name`.
    pub fn decrypt(&self, name: &str, ciphertext: &str) -> Result<Vec<u8>, DecryptError> {
        let key = self.derive_key(name);
        Ok(wire::decrypt(&key, ciphertext)?)
    }

    /// Keyed fingerprint over the raw bytes of the base64-encoded content
    /// as received over the wire (see [`fingerprint`] module docs).
    pub fn compute_hmac(&self, base64_content: &[u8]) -> String {
        let key = derive_hmac_key(self.master.as_ref());
        fingerprint::compute_hmac(&key, base64_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crypto() -> Cryptographer {
        Cryptographer::new(StaticMasterKey::new([5u8; 32]))
    }

    #[test]
    fn envelope_roundtrip() {
        let c = crypto();
        let ct = c.encrypt("db-password", b"s3cr3t").unwrap();
        assert_eq!(c.decrypt("db-password", &ct).unwrap(), b"s3cr3t");
    }

    #[test]
    fn key_binding_rejects_cross_name_decrypt() {
        let c = crypto();
        let ct = c.encrypt("name-a", b"payload").unwrap();
        assert!(c.decrypt("name-b", &ct).is_err());
    }

    #[test]
    fn hmac_is_deterministic_and_name_independent() {
        let c = crypto();
        assert_eq!(c.compute_hmac(b"Zm9v"), c.compute_hmac(b"Zm9v"));
    }
}
