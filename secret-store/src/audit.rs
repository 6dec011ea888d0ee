//! Audit logging: every mutating operation on a secret or access edge
//! emits a structured, tagged event (spec §8).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// What happened. Tags match the spec's literal event names so external
/// audit consumers can filter on them without translation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditTag {
    SecretCreate,
    SecretCreateOrUpdate,
    SecretDelete,
    SecretChangeVersion,
    SecretBackfillExpiry,
    AccessAdd,
    AccessRemove,
}

impl AuditTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecretCreate => "SECRET_CREATE",
            Self::SecretCreateOrUpdate => "SECRET_CREATEORUPDATE",
            Self::SecretDelete => "SECRET_DELETE",
            Self::SecretChangeVersion => "SECRET_CHANGEVERSION",
            Self::SecretBackfillExpiry => "SECRET_BACKFILLEXPIRY",
            Self::AccessAdd => "ACCESS_ADD",
            Self::AccessRemove => "ACCESS_REMOVE",
        }
    }
}

/// A structured audit event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub tag: AuditTag,
    /// The secret name or `group:client` pair the event concerns.
    pub subject: String,
    /// Certificate CN of the caller.
    pub actor: String,
    pub success: bool,
    pub detail: Option<String>,
    /// Monotonic sequence number (populated by the integrity chain sink).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    /// SHA-256 hex of the previous event's JSON (integrity chain sink).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
}

impl AuditEvent {
    pub fn new(tag: AuditTag, subject: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            tag,
            subject: subject.into(),
            actor: actor.into(),
            success: true,
            detail: None,
            sequence: None,
            prev_hash: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.success = false;
        self
    }
}

/// Where audit events go. Synchronous to avoid an async-trait dependency;
/// async sinks should use interior mutability (e.g. a channel). An audit
/// append that fails must fail the caller's request (spec §7), so
/// `record` returns `Result` rather than swallowing I/O errors.
pub trait AuditSinkSync: Send + Sync {
    fn record(&self, event: AuditEvent) -> Result<(), StoreError>;
}

/// Logs events via `tracing`.
pub struct TracingAuditSink;

impl AuditSinkSync for TracingAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), StoreError> {
        tracing::info!(
            timestamp = %event.timestamp,
            tag = event.tag.as_str(),
            subject = %event.subject,
            actor = %event.actor,
            success = event.success,
            detail = ?event.detail,
            "audit"
        );
        Ok(())
    }
}

/// Collects events in memory — used by tests and the API layer's
/// introspection endpoints.
pub struct InMemoryAuditSink {
    events: std::sync::Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, subject: &str) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.subject == subject)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSinkSync for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), StoreError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Appends JSON events to a file, one per line.
pub struct FileAuditSink {
    path: std::path::PathBuf,
}

impl FileAuditSink {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuditSinkSync for FileAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), StoreError> {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::Storage(format!("cannot open audit file {:?}: {}", self.path, e)))?;
        let json = serde_json::to_string(&event)
            .map_err(|e| StoreError::Storage(format!("audit event serialize failed: {}", e)))?;
        writeln!(file, "{}", json).map_err(|e| StoreError::Storage(format!("audit file write failed: {}", e)))
    }
}

/// Wraps any `AuditSinkSync` and adds a SHA-256 hash chain so a verifier
/// can replay the log and detect insertion, deletion, or edits. Genesis
/// hash is `SHA-256("secret-store-audit-genesis")`.
pub struct IntegrityChainSink {
    inner: Arc<dyn AuditSinkSync>,
    state: std::sync::Mutex<ChainState>,
}

struct ChainState {
    sequence: u64,
    prev_hash: String,
}

impl IntegrityChainSink {
    pub fn new(inner: Arc<dyn AuditSinkSync>) -> Self {
        use sha2::{Digest, Sha256};
        let genesis = hex::encode(Sha256::digest(b"secret-store-audit-genesis"));
        Self {
            inner,
            state: std::sync::Mutex::new(ChainState { sequence: 0, prev_hash: genesis }),
        }
    }
}

impl AuditSinkSync for IntegrityChainSink {
    fn record(&self, mut event: AuditEvent) -> Result<(), StoreError> {
        use sha2::{Digest, Sha256};

        let mut state = self.state.lock().unwrap();
        event.sequence = Some(state.sequence);
        event.prev_hash = Some(state.prev_hash.clone());

        let json = serde_json::to_string(&event)
            .map_err(|e| StoreError::Storage(format!("audit event serialize failed: {}", e)))?;
        state.prev_hash = hex::encode(Sha256::digest(json.as_bytes()));
        state.sequence += 1;

        drop(state);
        self.inner.record(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest;

    #[test]
    fn chain_links_consecutive_events() {
        let inner = Arc::new(InMemoryAuditSink::new());
        let sink = IntegrityChainSink::new(inner.clone());
        sink.record(AuditEvent::new(AuditTag::SecretCreate, "db-password", "alice")).unwrap();
        sink.record(AuditEvent::new(AuditTag::SecretDelete, "db-password", "alice")).unwrap();

        let events = inner.events();
        assert_eq!(events[0].sequence, Some(0));
        assert_eq!(events[1].sequence, Some(1));
        assert_ne!(events[1].prev_hash, events[0].prev_hash);
        assert_eq!(
            hex::encode(sha2::Sha256::digest(b"secret-store-audit-genesis")),
            events[0].prev_hash.clone().unwrap()
        );
    }

    #[test]
    fn in_memory_sink_filters_by_subject() {
        let sink = InMemoryAuditSink::new();
        sink.record(AuditEvent::new(AuditTag::SecretCreate, "a", "alice")).unwrap();
        sink.record(AuditEvent::new(AuditTag::SecretCreate, "b", "alice")).unwrap();
        assert_eq!(sink.events_for("a").len(), 1);
        assert_eq!(sink.events().len(), 2);
    }
}
