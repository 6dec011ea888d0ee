//! Core entities: SecretSeries, SecretContent, Group, Client, and the two
//! edge relations that wire them together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Id = u64;

/// Identity of a secret by human name. Owns its `SecretContent` versions;
/// deleting the series deletes all versions and access edges.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecretSeries {
    pub id: Id,
    pub name: String,
    pub description: String,
    /// Free-form tag, e.g. `"cert"`. Empty string means untyped.
    pub secret_type: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    /// `None` only during the creation window before the first content
    /// version is persisted.
    pub current_version_id: Option<Id>,
}

/// One immutable version of a series. Once persisted, no field mutates;
/// new versions are appended rather than edited in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecretContent {
    pub id: Id,
    pub series_id: Id,
    /// Opaque ciphertext string produced by `secret-crypto`.
    pub encrypted_content: String,
    /// Hex HMAC fingerprint over the base64 content as received.
    pub hmac: String,
    pub metadata: HashMap<String, String>,
    /// Unix seconds; `0` means unknown.
    pub expiry: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Client {
    pub id: Id,
    /// Derived from the certificate CN.
    pub name: String,
    pub enabled: bool,
    pub automation_allowed: bool,
    /// `None` is normalized "never" (the wire/storage value `0` collapses
    /// to this at the seam, per spec §9 — absent is represented distinctly
    /// on the wire, not as a literal zero timestamp).
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `Secret` hydrated with its current content — the controller's (C6)
/// return shape, with the decrypted view filled in by the caller.
#[derive(Clone, Debug)]
pub struct Secret {
    pub series: SecretSeries,
    pub current: SecretContent,
}

/// Projection safe to return in listings: no ciphertext, no HMAC.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SanitizedSecret {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub secret_type: String,
    pub metadata: HashMap<String, String>,
    pub expiry: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl From<Secret> for SanitizedSecret {
    fn from(s: Secret) -> Self {
        Self {
            id: s.series.id,
            name: s.series.name,
            description: s.series.description,
            secret_type: s.series.secret_type,
            metadata: s.current.metadata,
            expiry: s.current.expiry,
            created_at: s.series.created_at,
            created_by: s.series.created_by,
            updated_at: s.series.updated_at,
            updated_by: s.series.updated_by,
        }
    }
}
