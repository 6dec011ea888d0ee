//! ACL engine (C5), secret controller (C6), and automation-client
//! authenticator (C9) — the layer between the HTTP surface and the
//! encrypted persistent store.

pub mod acl;
pub mod auth;
pub mod error;
pub mod service;

pub use acl::AclEngine;
pub use auth::Authenticator;
pub use error::CoreError;
pub use service::{CreateSecretRequest, SecretService};
