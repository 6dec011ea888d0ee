//! Storage trait seams (C3: secrets, C4: groups/clients/edges).
//!
//! Mirrors the shape of a `StorageBackend` trait with in-memory and file
//! implementations behind it — here split into two traits because secrets
//! and the group/client graph are independently swappable persistence
//! concerns, matching spec §4.3/§4.4's separate component boundaries.

use crate::error::StoreError;
use crate::types::{Client, Group, Id, SecretContent, SecretSeries};
use std::collections::HashMap;

/// Parameters for creating or upserting a secret, collected into one
/// struct rather than a long parameter list or a language-level builder
/// chain (spec §9's "builder idiom" note).
#[derive(Clone, Debug)]
pub struct SecretWrite {
    pub name: String,
    pub encrypted_content: String,
    pub hmac: String,
    pub creator: String,
    pub description: String,
    pub metadata: HashMap<String, String>,
    pub expiry: i64,
    pub secret_type: String,
}

pub trait SecretBackend: Send + Sync {
    fn get_by_id(&self, id: Id) -> Result<Option<(SecretSeries, Option<SecretContent>)>, StoreError>;
    fn get_by_name(&self, name: &str) -> Result<Option<(SecretSeries, Option<SecretContent>)>, StoreError>;
    fn list_names(&self) -> Result<Vec<(Id, String)>, StoreError>;

    /// `content.expiry ∈ (0, max_expiry]` when `max_expiry` is given, else
    /// every secret regardless of expiry.
    fn list_secrets(&self, max_expiry: Option<i64>) -> Result<Vec<(SecretSeries, SecretContent)>, StoreError>;

    /// Fails with `AlreadyExists` if a live series with this name exists.
    fn create_secret(&self, write: SecretWrite) -> Result<Id, StoreError>;

    /// Upserts the series; always appends a new content version and makes
    /// it current, even if byte-identical to the prior version (spec §9:
    /// intentionally not deduplicated).
    fn create_or_update_secret(&self, write: SecretWrite) -> Result<Id, StoreError>;

    /// Versions for `name`, newest-first. `None` when the series doesn't exist.
    fn get_versions_by_name(
        &self,
        name: &str,
        offset: usize,
        count: usize,
    ) -> Result<Option<Vec<SecretContent>>, StoreError>;

    fn set_current_version_by_name(&self, name: &str, version_id: Id) -> Result<(), StoreError>;

    /// Updates the current content's expiry; returns whether a row was affected.
    fn set_expiration(&self, name: &str, expiry: i64) -> Result<bool, StoreError>;

    /// Removes the series, all versions, and (via the directory backend)
    /// its access edges. Returns whether anything was deleted.
    fn delete_secret_by_name(&self, name: &str) -> Result<Option<Id>, StoreError>;
}

pub trait DirectoryBackend: Send + Sync {
    fn get_group(&self, name: &str) -> Result<Option<Group>, StoreError>;
    fn get_group_by_id(&self, id: Id) -> Result<Option<Group>, StoreError>;
    fn create_group(&self, name: &str, description: &str) -> Result<Id, StoreError>;
    fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    fn get_client(&self, name: &str) -> Result<Option<Client>, StoreError>;
    fn create_client(&self, name: &str, automation_allowed: bool) -> Result<Id, StoreError>;
    fn touch_last_seen(&self, client_id: Id) -> Result<(), StoreError>;
    /// Enables or disables a client for automation access (spec §4/§5).
    fn set_enabled(&self, client_id: Id, enabled: bool) -> Result<(), StoreError>;

    /// Idempotent edge insert. Returns `true` if a new edge was created
    /// (false on a no-op repeat), matching the ACL idempotence property.
    fn add_access(&self, secret_id: Id, group_id: Id) -> Result<bool, StoreError>;
    fn remove_access(&self, secret_id: Id, group_id: Id) -> Result<bool, StoreError>;
    fn groups_for_secret(&self, secret_id: Id) -> Result<Vec<Group>, StoreError>;
    fn clients_for_secret(&self, secret_id: Id) -> Result<Vec<Client>, StoreError>;
    fn secret_ids_for_group(&self, group_id: Id) -> Result<Vec<Id>, StoreError>;
    fn group_ids_for_client(&self, client_id: Id) -> Result<Vec<Id>, StoreError>;

    fn add_membership(&self, client_id: Id, group_id: Id) -> Result<bool, StoreError>;
    fn remove_membership(&self, client_id: Id, group_id: Id) -> Result<bool, StoreError>;

    /// Cascade-delete every access edge referencing `secret_id` (called
    /// when the owning series is deleted).
    fn remove_access_for_secret(&self, secret_id: Id) -> Result<(), StoreError>;
}
