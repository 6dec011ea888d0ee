//! C6: the secret controller — composes C1 (crypto) + C3 (store) behind
//! one facade, plus the read/listing/backfill/group-management surface
//! the automation API drives.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use secret_crypto::Cryptographer;
use secret_store::{
    AuditEvent, AuditSinkSync, AuditTag, DirectoryBackend, Id, SanitizedSecret, Secret, SecretBackend, SecretContent,
    SecretWrite,
};

use crate::acl::AclEngine;
use crate::error::CoreError;

/// Parameters for creating a secret, mirroring `CreateSecretRequest` in
/// spec §6 — a plain struct rather than a builder chain (spec §9).
#[derive(Clone, Debug, Default)]
pub struct CreateSecretRequest {
    pub name: String,
    /// Base64-encoded secret bytes, as received on the wire.
    pub content_base64: String,
    pub description: String,
    pub metadata: HashMap<String, String>,
    pub secret_type: String,
    pub expiry: i64,
    pub groups: Vec<String>,
}

pub struct SecretService {
    store: Arc<dyn SecretBackend>,
    directory: Arc<dyn DirectoryBackend>,
    crypto: Cryptographer,
    audit: Arc<dyn AuditSinkSync>,
    acl: AclEngine,
}

impl SecretService {
    pub fn new(
        store: Arc<dyn SecretBackend>,
        directory: Arc<dyn DirectoryBackend>,
        crypto: Cryptographer,
        audit: Arc<dyn AuditSinkSync>,
    ) -> Self {
        let acl = AclEngine::new(directory.clone(), audit.clone());
        Self { store, directory, crypto, audit, acl }
    }

    fn encrypt_and_hmac(&self, name: &str, content_base64: &str) -> Result<(String, String), CoreError> {
        let plaintext = BASE64
            .decode(content_base64.as_bytes())
            .map_err(|e| CoreError::Validation(format!("content is not valid base64: {}", e)))?;
        // HMAC is computed over the base64 bytes as received, not the
        // decoded plaintext (spec §9 open question — preserved for wire
        // compatibility).
        let hmac = self.crypto.compute_hmac(content_base64.as_bytes());
        let ciphertext = self
            .crypto
            .encrypt(name, &plaintext)
            .map_err(|e| CoreError::Storage(e.to_string()))?;
        Ok((ciphertext, hmac))
    }

    fn hydrate(&self, series_id: Id) -> Result<Secret, CoreError> {
        let (series, current) = self
            .store
            .get_by_id(series_id)?
            .ok_or_else(|| CoreError::NotFound(format!("secret series {}", series_id)))?;
        let current = current.ok_or_else(|| CoreError::NotFound("secret has no content version".into()))?;
        Ok(Secret { series, current })
    }

    /// Validates, encrypts, persists, wires initial groups, and audits.
    pub fn create_secret(&self, req: CreateSecretRequest, actor: &str) -> Result<Secret, CoreError> {
        if req.name.trim().is_empty() {
            return Err(CoreError::Validation("name must not be empty".into()));
        }
        if req.content_base64.is_empty() {
            return Err(CoreError::Validation("content must not be empty".into()));
        }
        if actor.trim().is_empty() {
            return Err(CoreError::Validation("creator must not be empty".into()));
        }

        let (ciphertext, hmac) = self.encrypt_and_hmac(&req.name, &req.content_base64)?;

        let series_id = self.store.create_secret(SecretWrite {
            name: req.name.clone(),
            encrypted_content: ciphertext,
            hmac,
            creator: actor.to_string(),
            description: req.description,
            metadata: req.metadata,
            expiry: req.expiry,
            secret_type: req.secret_type,
        })?;

        self.audit.record(AuditEvent::new(AuditTag::SecretCreate, &req.name, actor))?;

        for group_name in &req.groups {
            if let Some(group) = self.directory.get_group(group_name)? {
                self.acl.find_and_allow_access(series_id, group.id, actor, &req.name)?;
            } else {
                tracing::info!(group = %group_name, secret = %req.name, "create: unknown group skipped");
            }
        }

        self.hydrate(series_id)
    }

    /// Upserts the series, always appending a version (spec §9 — no
    /// content deduplication).
    pub fn create_or_update_secret(&self, req: CreateSecretRequest, actor: &str) -> Result<Secret, CoreError> {
        if req.name.trim().is_empty() {
            return Err(CoreError::Validation("name must not be empty".into()));
        }
        if req.content_base64.is_empty() {
            return Err(CoreError::Validation("content must not be empty".into()));
        }

        let (ciphertext, hmac) = self.encrypt_and_hmac(&req.name, &req.content_base64)?;

        let series_id = self.store.create_or_update_secret(SecretWrite {
            name: req.name.clone(),
            encrypted_content: ciphertext,
            hmac,
            creator: actor.to_string(),
            description: req.description,
            metadata: req.metadata,
            expiry: req.expiry,
            secret_type: req.secret_type,
        })?;

        self.audit.record(AuditEvent::new(AuditTag::SecretCreateOrUpdate, &req.name, actor))?;

        self.hydrate(series_id)
    }

    pub fn get_secret(&self, name: &str) -> Result<Secret, CoreError> {
        let (series, current) = self
            .store
            .get_by_name(name)?
            .ok_or_else(|| CoreError::NotFound(format!("secret {}", name)))?;
        let current = current.ok_or_else(|| CoreError::NotFound(format!("secret {} has no content", name)))?;
        Ok(Secret { series, current })
    }

    /// The series alone, without requiring a current content version —
    /// used to build a version listing where each entry pairs the one
    /// series with a different historical content.
    pub fn get_series(&self, name: &str) -> Result<secret_store::SecretSeries, CoreError> {
        let (series, _) = self
            .store
            .get_by_name(name)?
            .ok_or_else(|| CoreError::NotFound(format!("secret {}", name)))?;
        Ok(series)
    }

    /// Decrypts a secret's current content. Not reachable from the
    /// automation API's wire surface (§6 returns `SecretDetail` without
    /// content) — used by internal callers and read-surface consumers
    /// outside this core.
    pub fn decrypt(&self, secret: &Secret) -> Result<Vec<u8>, CoreError> {
        self.crypto
            .decrypt(&secret.series.name, &secret.current.encrypted_content)
            .map_err(|e| CoreError::Storage(e.to_string()))
    }

    pub fn list_names(&self) -> Result<Vec<String>, CoreError> {
        Ok(self.store.list_names()?.into_iter().map(|(_, name)| name).collect())
    }

    pub fn list_expiring_names(&self, max_expiry: i64) -> Result<Vec<String>, CoreError> {
        Ok(self
            .store
            .list_secrets(Some(max_expiry))?
            .into_iter()
            .map(|(series, _)| series.name)
            .collect())
    }

    pub fn list_expiring_sanitized(&self, max_expiry: i64) -> Result<Vec<SanitizedSecret>, CoreError> {
        Ok(self
            .store
            .list_secrets(Some(max_expiry))?
            .into_iter()
            .map(|(series, current)| SanitizedSecret::from(Secret { series, current }))
            .collect())
    }

    pub fn list_expiring_names_for_group(&self, max_expiry: i64, group_name: &str) -> Result<Vec<String>, CoreError> {
        let group = self
            .directory
            .get_group(group_name)?
            .ok_or_else(|| CoreError::NotFound(format!("group {}", group_name)))?;
        let allowed: std::collections::HashSet<Id> = self.directory.secret_ids_for_group(group.id)?.into_iter().collect();
        Ok(self
            .store
            .list_secrets(Some(max_expiry))?
            .into_iter()
            .filter(|(series, _)| allowed.contains(&series.id))
            .map(|(series, _)| series.name)
            .collect())
    }

    pub fn delete_secret(&self, name: &str, actor: &str) -> Result<(), CoreError> {
        let deleted = self.store.delete_secret_by_name(name)?;
        if deleted.is_none() {
            return Err(CoreError::NotFound(format!("secret {}", name)));
        }
        self.audit.record(AuditEvent::new(AuditTag::SecretDelete, name, actor))?;
        Ok(())
    }

    pub fn get_versions(&self, name: &str, offset: usize, count: usize) -> Result<Vec<SecretContent>, CoreError> {
        self.store
            .get_versions_by_name(name, offset, count)?
            .ok_or_else(|| CoreError::NotFound(format!("secret {}", name)))
    }

    pub fn set_version(&self, name: &str, version_id: Id, actor: &str) -> Result<(), CoreError> {
        self.store.set_current_version_by_name(name, version_id)?;
        self.audit.record(
            AuditEvent::new(AuditTag::SecretChangeVersion, name, actor).with_detail(format!("version={}", version_id)),
        )?;
        Ok(())
    }

    /// Decrypts the current content, runs expiry extraction against it,
    /// and persists the result if found. Returns `false` (not an error)
    /// when the format is unrecognized or no password opens it.
    pub fn backfill_expiration(&self, name: &str, passwords: &[String], actor: &str) -> Result<bool, CoreError> {
        let secret = self.get_secret(name)?;
        let plaintext = match self.decrypt(&secret) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(false),
        };

        let outcome = secret_expiry::extract(name, &plaintext, passwords);
        match outcome.into_expiry() {
            Some(expiry) => {
                self.store.set_expiration(name, expiry)?;
                self.audit.record(
                    AuditEvent::new(AuditTag::SecretBackfillExpiry, name, actor).with_detail(format!("expiry={}", expiry)),
                )?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn get_groups(&self, name: &str) -> Result<Vec<String>, CoreError> {
        let (series, _) = self
            .store
            .get_by_name(name)?
            .ok_or_else(|| CoreError::NotFound(format!("secret {}", name)))?;
        Ok(self.acl.groups_for_secret(series.id)?.into_iter().map(|g| g.name).collect())
    }

    pub fn modify_groups(&self, name: &str, add: &[String], remove: &[String], actor: &str) -> Result<Vec<String>, CoreError> {
        let (series, _) = self
            .store
            .get_by_name(name)?
            .ok_or_else(|| CoreError::NotFound(format!("secret {}", name)))?;
        self.acl.modify_groups(series.id, name, add, remove, actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secret_crypto::StaticMasterKey;
    use secret_store::{InMemoryAuditSink, InMemoryStore};

    fn service() -> (SecretService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let crypto = Cryptographer::new(StaticMasterKey::new([7u8; 32]));
        let audit = Arc::new(InMemoryAuditSink::new());
        let svc = SecretService::new(store.clone(), store.clone(), crypto, audit);
        (svc, store)
    }

    fn req(name: &str, plaintext: &[u8]) -> CreateSecretRequest {
        CreateSecretRequest {
            name: name.to_string(),
            content_base64: BASE64.encode(plaintext),
            description: String::new(),
            metadata: HashMap::new(),
            secret_type: String::new(),
            expiry: 0,
            groups: vec![],
        }
    }

    #[test]
    fn create_then_fetch() {
        let (svc, _) = service();
        svc.create_secret(req("db-password", b"hunter2"), "alice").unwrap();
        let secret = svc.get_secret("db-password").unwrap();
        assert_eq!(svc.decrypt(&secret).unwrap(), b"hunter2");
    }

    #[test]
    fn duplicate_create_is_conflict() {
        let (svc, _) = service();
        svc.create_secret(req("k", b"v1"), "alice").unwrap();
        let err = svc.create_secret(req("k", b"v2"), "alice").unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[test]
    fn versioning_and_setversion() {
        let (svc, _) = service();
        svc.create_or_update_secret(req("k", b"v1"), "alice").unwrap();
        svc.create_or_update_secret(req("k", b"v2"), "alice").unwrap();

        let versions = svc.get_versions("k", 0, 10).unwrap();
        assert_eq!(versions.len(), 2);
        let v1 = versions.last().unwrap().id;

        svc.set_version("k", v1, "alice").unwrap();
        let secret = svc.get_secret("k").unwrap();
        assert_eq!(svc.decrypt(&secret).unwrap(), b"v1");
    }

    #[test]
    fn expiring_listing_excludes_zero_and_out_of_range() {
        let (svc, _) = service();
        let mut a = req("a", b"x");
        a.expiry = 0;
        let mut b = req("b", b"x");
        b.expiry = 1000;
        let mut c = req("c", b"x");
        c.expiry = 5000;
        svc.create_secret(a, "alice").unwrap();
        svc.create_secret(b, "alice").unwrap();
        svc.create_secret(c, "alice").unwrap();

        assert_eq!(svc.list_expiring_names(3000).unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn group_modification_diffs_as_expected() {
        let (svc, store) = service();
        store.create_group("A", "").unwrap();
        store.create_group("B", "").unwrap();

        let mut create = req("s", b"x");
        create.groups = vec!["A".into(), "B".into()];
        svc.create_secret(create, "alice").unwrap();

        store.create_group("C", "").unwrap();
        let mut groups = svc
            .modify_groups("s", &["B".into(), "C".into()], &["A".into(), "D".into()], "alice")
            .unwrap();
        groups.sort();
        assert_eq!(groups, vec!["B".to_string(), "C".to_string()]);
    }

    #[test]
    fn backfill_sets_expiry_for_recognized_cert() {
        let (svc, _) = service();
        let pem = include_bytes!("../../secret-expiry/tests/fixtures/single.pem");
        svc.create_secret(req("leaf.pem", pem), "alice").unwrap();

        let backfilled = svc.backfill_expiration("leaf.pem", &[], "alice").unwrap();
        assert!(backfilled);
        let secret = svc.get_secret("leaf.pem").unwrap();
        assert!(secret.current.expiry > 0);
    }

    #[test]
    fn backfill_unknown_suffix_returns_false() {
        let (svc, _) = service();
        svc.create_secret(req("opaque.bin", b"not a cert"), "alice").unwrap();
        assert!(!svc.backfill_expiration("opaque.bin", &[], "alice").unwrap());
    }
}
