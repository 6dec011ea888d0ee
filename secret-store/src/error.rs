//! Error types for the store.

use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    AlreadyExists(String),
    BadVersion(String),
    Validation(String),
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "not found: {}", what),
            Self::AlreadyExists(what) => write!(f, "already exists: {}", what),
            Self::BadVersion(msg) => write!(f, "bad version: {}", msg),
            Self::Validation(msg) => write!(f, "validation: {}", msg),
            Self::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}
