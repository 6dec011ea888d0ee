//! Master key handling and per-name key derivation.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::CryptoError;

/// Where the AES-256 master key comes from. The master key itself lives in
/// a keystore external to this crate (out of scope here — see spec §1);
/// this trait is the seam that keystore exposes.
pub trait MasterKeySource: Send + Sync {
    fn master_key(&self) -> &[u8; 32];
}

/// A master key supplied directly, e.g. from an environment variable at
/// process bootstrap. Not a substitute for a real KMS integration.
pub struct StaticMasterKey([u8; 32]);

impl StaticMasterKey {
    pub fn new(key: [u8; 32]) -> Self {
        Self(key)
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_key)
            .map_err(|e| CryptoError::BadMasterKey(format!("invalid hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(CryptoError::BadMasterKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }
}

impl MasterKeySource for StaticMasterKey {
    fn master_key(&self) -> &[u8; 32] {
        &self.0
    }
}

const ENCRYPTION_INFO_PREFIX: &[u8] = b"secret-crypto|enc|";
const HMAC_INFO: &[u8] = b"secret-crypto|hmac|v1";

/// Deterministic per-secret-name subkey: two calls with the same `name`
/// against the same master key yield the same key. Binding the name into
/// the HKDF `info` means a ciphertext copied to a different series fails
/// to decrypt under that series' key.
pub fn derive_key(master: &dyn MasterKeySource, name: &str) -> [u8; 32] {
    let mut info = Vec::with_capacity(ENCRYPTION_INFO_PREFIX.len() + name.len());
    info.extend_from_slice(ENCRYPTION_INFO_PREFIX);
    info.extend_from_slice(name.as_bytes());

    let hk = Hkdf::<Sha256>::new(None, master.master_key());
    let mut out = [0u8; 32];
    hk.expand(&info, &mut out)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    out
}

/// Subkey used to key the content fingerprint. Fixed `info` label, distinct
/// from the per-name encryption subkey, so a leaked fingerprint key can
/// never be used to derive an encryption key or vice versa.
pub fn derive_hmac_key(master: &dyn MasterKeySource) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, master.master_key());
    let mut out = [0u8; 32];
    hk.expand(HMAC_INFO, &mut out)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic() {
        let master = StaticMasterKey::new([7u8; 32]);
        assert_eq!(
            derive_key(&master, "db-password"),
            derive_key(&master, "db-password")
        );
    }

    #[test]
    fn derive_key_binds_to_name() {
        let master = StaticMasterKey::new([7u8; 32]);
        assert_ne!(
            derive_key(&master, "db-password"),
            derive_key(&master, "other-secret")
        );
    }

    #[test]
    fn hmac_key_differs_from_encryption_key() {
        let master = StaticMasterKey::new([7u8; 32]);
        assert_ne!(derive_hmac_key(&master), derive_key(&master, "anything"));
    }
}
