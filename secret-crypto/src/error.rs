//! Error types for the cryptographer.

use std::fmt;

#[derive(Debug)]
pub enum CryptoError {
    /// Master key material was malformed (wrong length, not set).
    BadMasterKey(String),
    /// AEAD seal/open failed — for `open` this also covers key-binding
    /// failures (wrong derived key, truncated ciphertext).
    Aead(String),
    /// Ciphertext was shorter than the nonce, or carried an unknown
    /// wire version byte.
    MalformedCiphertext(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMasterKey(msg) => write!(f, "bad master key: {}", msg),
            Self::Aead(msg) => write!(f, "aead error: {}", msg),
            Self::MalformedCiphertext(msg) => write!(f, "malformed ciphertext: {}", msg),
        }
    }
}

impl std::error::Error for CryptoError {}

#[derive(Debug)]
pub struct EncryptError(pub CryptoError);
impl fmt::Display for EncryptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::error::Error for EncryptError {}
impl From<CryptoError> for EncryptError {
    fn from(e: CryptoError) -> Self {
        Self(e)
    }
}

#[derive(Debug)]
pub struct DecryptError(pub CryptoError);
impl fmt::Display for DecryptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::error::Error for DecryptError {}
impl From<CryptoError> for DecryptError {
    fn from(e: CryptoError) -> Self {
        Self(e)
    }
}
