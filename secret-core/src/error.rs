//! Error kinds mapped to HTTP status at the API boundary (spec §7).

use std::fmt;

#[derive(Debug)]
pub enum CoreError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    Auth(String),
    Integrity(String),
    /// Storage failure that isn't a logical conflict — maps to 500.
    Storage(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(m) => write!(f, "validation: {}", m),
            Self::NotFound(m) => write!(f, "not found: {}", m),
            Self::Conflict(m) => write!(f, "{}", m),
            Self::Auth(m) => write!(f, "auth: {}", m),
            Self::Integrity(m) => write!(f, "integrity: {}", m),
            Self::Storage(m) => write!(f, "storage error: {}", m),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<secret_store::StoreError> for CoreError {
    fn from(e: secret_store::StoreError) -> Self {
        match e {
            secret_store::StoreError::NotFound(m) => Self::NotFound(m),
            secret_store::StoreError::AlreadyExists(name) => {
                Self::Conflict(format!("Cannot create secret {}.", name))
            }
            secret_store::StoreError::BadVersion(m) => Self::Integrity(m),
            secret_store::StoreError::Validation(m) => Self::Validation(m),
            secret_store::StoreError::Storage(m) => Self::Storage(m),
        }
    }
}
