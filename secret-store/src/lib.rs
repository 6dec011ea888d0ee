//! Persistence for secrets, the group/client directory, and the audit log.
//!
//! Two storage traits (`SecretBackend`, `DirectoryBackend`) with an
//! in-memory implementation and a file-backed one, plus the audit sink
//! stack used by both.

pub mod audit;
pub mod backend;
pub mod error;
pub mod file;
pub mod memory;
pub mod types;

pub use audit::{AuditEvent, AuditSinkSync, AuditTag, FileAuditSink, InMemoryAuditSink, IntegrityChainSink, TracingAuditSink};
pub use backend::{DirectoryBackend, SecretBackend, SecretWrite};
pub use error::StoreError;
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use types::{Client, Group, Id, SanitizedSecret, Secret, SecretContent, SecretSeries};
