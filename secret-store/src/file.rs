//! File-based storage: one JSON file per entity, loaded into memory at
//! startup and kept in sync with atomic temp-then-rename writes.
//!
//! Directory layout:
//! ```text
//! <dir>/
//!   series/{id}.json
//!   content/{id}.json
//!   groups/{id}.json
//!   clients/{id}.json
//!   access.json        (Vec<(secret_id, group_id)>)
//!   membership.json     (Vec<(client_id, group_id)>)
//! ```
//!
//! Graph edges don't have a natural per-entity home, so they're kept as
//! two whole-relation snapshot files instead.

use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::{DirectoryBackend, SecretBackend, SecretWrite};
use crate::error::StoreError;
use crate::memory::InMemoryStore;
use crate::types::{Client, Group, Id, SecretContent, SecretSeries};

fn io_err(action: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Storage(format!("{}: {}", action, e))
}

fn write_atomic(path: &Path, json: &str) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(|e| io_err("write", e))?;
    fs::rename(&tmp, path).map_err(|e| io_err("rename", e))?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let data = fs::read_to_string(path).map_err(|e| io_err("read", e))?;
    serde_json::from_str(&data).map_err(|e| io_err("parse", e))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| io_err("serialize", e))?;
    write_atomic(path, &json)
}

fn list_entities<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_err("readdir", e))? {
        let entry = entry.map_err(|e| io_err("entry", e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            out.push(read_json(&path)?);
        }
    }
    Ok(out)
}

/// Persists to disk; delegates in-memory bookkeeping (indexes, id
/// sequencing) to an `InMemoryStore` rebuilt from disk at startup, then
/// mirrors every successful mutation back out to its JSON file(s).
pub struct FileStore {
    dir: PathBuf,
    inner: InMemoryStore,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        for sub in ["series", "content", "groups", "clients"] {
            fs::create_dir_all(dir.join(sub)).map_err(|e| io_err("create dir", e))?;
        }

        let inner = InMemoryStore::new();
        let store = Self { dir, inner };

        for series in list_entities::<SecretSeries>(&store.dir.join("series"))? {
            store.inner.load_series(series);
        }
        for content in list_entities::<SecretContent>(&store.dir.join("content"))? {
            store.inner.load_content(content);
        }
        for group in list_entities::<Group>(&store.dir.join("groups"))? {
            store.inner.load_group(group);
        }
        for client in list_entities::<Client>(&store.dir.join("clients"))? {
            store.inner.load_client(client);
        }
        let access_path = store.dir.join("access.json");
        if access_path.exists() {
            let edges: Vec<(Id, Id)> = read_json(&access_path)?;
            store.inner.load_access(edges);
        }
        let membership_path = store.dir.join("membership.json");
        if membership_path.exists() {
            let edges: Vec<(Id, Id)> = read_json(&membership_path)?;
            store.inner.load_membership(edges);
        }

        Ok(store)
    }

    fn series_path(&self, id: Id) -> PathBuf {
        self.dir.join("series").join(format!("{}.json", id))
    }
    fn content_path(&self, id: Id) -> PathBuf {
        self.dir.join("content").join(format!("{}.json", id))
    }
    fn group_path(&self, id: Id) -> PathBuf {
        self.dir.join("groups").join(format!("{}.json", id))
    }
    fn client_path(&self, id: Id) -> PathBuf {
        self.dir.join("clients").join(format!("{}.json", id))
    }

    fn flush_series_and_content(&self, series_id: Id) -> Result<(), StoreError> {
        let (series, _) = self
            .inner
            .get_by_id(series_id)?
            .ok_or_else(|| StoreError::Storage("flushed series vanished from memory".into()))?;
        write_json(&self.series_path(series_id), &series)?;
        if let Some(versions) = self.inner.get_versions_by_name(&series.name, 0, usize::MAX)? {
            for version in versions {
                write_json(&self.content_path(version.id), &version)?;
            }
        }
        Ok(())
    }

    fn flush_access(&self) -> Result<(), StoreError> {
        write_json(&self.dir.join("access.json"), &self.inner.snapshot_access())
    }

    fn flush_membership(&self) -> Result<(), StoreError> {
        write_json(&self.dir.join("membership.json"), &self.inner.snapshot_membership())
    }
}

impl SecretBackend for FileStore {
    fn get_by_id(&self, id: Id) -> Result<Option<(SecretSeries, Option<SecretContent>)>, StoreError> {
        self.inner.get_by_id(id)
    }

    fn get_by_name(&self, name: &str) -> Result<Option<(SecretSeries, Option<SecretContent>)>, StoreError> {
        self.inner.get_by_name(name)
    }

    fn list_names(&self) -> Result<Vec<(Id, String)>, StoreError> {
        self.inner.list_names()
    }

    fn list_secrets(&self, max_expiry: Option<i64>) -> Result<Vec<(SecretSeries, SecretContent)>, StoreError> {
        self.inner.list_secrets(max_expiry)
    }

    fn create_secret(&self, write: SecretWrite) -> Result<Id, StoreError> {
        let id = self.inner.create_secret(write)?;
        self.flush_series_and_content(id)?;
        Ok(id)
    }

    fn create_or_update_secret(&self, write: SecretWrite) -> Result<Id, StoreError> {
        let id = self.inner.create_or_update_secret(write)?;
        self.flush_series_and_content(id)?;
        Ok(id)
    }

    fn get_versions_by_name(
        &self,
        name: &str,
        offset: usize,
        count: usize,
    ) -> Result<Option<Vec<SecretContent>>, StoreError> {
        self.inner.get_versions_by_name(name, offset, count)
    }

    fn set_current_version_by_name(&self, name: &str, version_id: Id) -> Result<(), StoreError> {
        self.inner.set_current_version_by_name(name, version_id)?;
        let (series, _) = self
            .inner
            .get_by_name(name)?
            .ok_or_else(|| StoreError::NotFound(format!("secret {}", name)))?;
        write_json(&self.series_path(series.id), &series)
    }

    fn set_expiration(&self, name: &str, expiry: i64) -> Result<bool, StoreError> {
        let changed = self.inner.set_expiration(name, expiry)?;
        if changed {
            if let Some((series, Some(content))) = self.inner.get_by_name(name)? {
                write_json(&self.content_path(content.id), &content)?;
                let _ = series;
            }
        }
        Ok(changed)
    }

    fn delete_secret_by_name(&self, name: &str) -> Result<Option<Id>, StoreError> {
        let versions = self.inner.get_versions_by_name(name, 0, usize::MAX)?;
        let deleted = self.inner.delete_secret_by_name(name)?;
        if let Some(series_id) = deleted {
            let path = self.series_path(series_id);
            if path.exists() {
                fs::remove_file(&path).map_err(|e| io_err("delete", e))?;
            }
            if let Some(versions) = versions {
                for version in versions {
                    let path = self.content_path(version.id);
                    if path.exists() {
                        fs::remove_file(&path).map_err(|e| io_err("delete", e))?;
                    }
                }
            }
            // InMemoryStore::delete_secret_by_name already drops the access
            // edges in memory; this persists that to disk.
            self.flush_access()?;
        }
        Ok(deleted)
    }
}

impl DirectoryBackend for FileStore {
    fn get_group(&self, name: &str) -> Result<Option<Group>, StoreError> {
        self.inner.get_group(name)
    }

    fn get_group_by_id(&self, id: Id) -> Result<Option<Group>, StoreError> {
        self.inner.get_group_by_id(id)
    }

    fn create_group(&self, name: &str, description: &str) -> Result<Id, StoreError> {
        let id = self.inner.create_group(name, description)?;
        if let Some(group) = self.inner.get_group_by_id(id)? {
            write_json(&self.group_path(id), &group)?;
        }
        Ok(id)
    }

    fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        self.inner.list_groups()
    }

    fn get_client(&self, name: &str) -> Result<Option<Client>, StoreError> {
        self.inner.get_client(name)
    }

    fn create_client(&self, name: &str, automation_allowed: bool) -> Result<Id, StoreError> {
        let id = self.inner.create_client(name, automation_allowed)?;
        if let Some(client) = self.inner.get_client(name)? {
            write_json(&self.client_path(id), &client)?;
        }
        Ok(id)
    }

    fn touch_last_seen(&self, client_id: Id) -> Result<(), StoreError> {
        self.inner.touch_last_seen(client_id)?;
        if let Some(client) = self.inner.get_client_by_id(client_id)? {
            write_json(&self.client_path(client_id), &client)?;
        }
        Ok(())
    }

    fn set_enabled(&self, client_id: Id, enabled: bool) -> Result<(), StoreError> {
        self.inner.set_enabled(client_id, enabled)?;
        if let Some(client) = self.inner.get_client_by_id(client_id)? {
            write_json(&self.client_path(client_id), &client)?;
        }
        Ok(())
    }

    fn add_access(&self, secret_id: Id, group_id: Id) -> Result<bool, StoreError> {
        let added = self.inner.add_access(secret_id, group_id)?;
        if added {
            self.flush_access()?;
        }
        Ok(added)
    }

    fn remove_access(&self, secret_id: Id, group_id: Id) -> Result<bool, StoreError> {
        let removed = self.inner.remove_access(secret_id, group_id)?;
        if removed {
            self.flush_access()?;
        }
        Ok(removed)
    }

    fn groups_for_secret(&self, secret_id: Id) -> Result<Vec<Group>, StoreError> {
        self.inner.groups_for_secret(secret_id)
    }

    fn clients_for_secret(&self, secret_id: Id) -> Result<Vec<Client>, StoreError> {
        self.inner.clients_for_secret(secret_id)
    }

    fn secret_ids_for_group(&self, group_id: Id) -> Result<Vec<Id>, StoreError> {
        self.inner.secret_ids_for_group(group_id)
    }

    fn group_ids_for_client(&self, client_id: Id) -> Result<Vec<Id>, StoreError> {
        self.inner.group_ids_for_client(client_id)
    }

    fn add_membership(&self, client_id: Id, group_id: Id) -> Result<bool, StoreError> {
        let added = self.inner.add_membership(client_id, group_id)?;
        if added {
            self.flush_membership()?;
        }
        Ok(added)
    }

    fn remove_membership(&self, client_id: Id, group_id: Id) -> Result<bool, StoreError> {
        let removed = self.inner.remove_membership(client_id, group_id)?;
        if removed {
            self.flush_membership()?;
        }
        Ok(removed)
    }

    fn remove_access_for_secret(&self, secret_id: Id) -> Result<(), StoreError> {
        self.inner.remove_access_for_secret(secret_id)?;
        self.flush_access()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn write(name: &str) -> SecretWrite {
        SecretWrite {
            name: name.to_string(),
            encrypted_content: "ct".to_string(),
            hmac: "hmac".to_string(),
            creator: "tester".to_string(),
            description: String::new(),
            metadata: HashMap::new(),
            expiry: 0,
            secret_type: String::new(),
        }
    }

    #[test]
    fn secret_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.create_secret(write("db-password")).unwrap();
        }
        let reopened = FileStore::open(dir.path()).unwrap();
        let (series, content) = reopened.get_by_name("db-password").unwrap().unwrap();
        assert_eq!(series.name, "db-password");
        assert!(content.is_some());
    }

    #[test]
    fn access_edges_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            let id = store.create_secret(write("k")).unwrap();
            let group_id = store.create_group("team-db", "").unwrap();
            store.add_access(id, group_id).unwrap();
        }
        let reopened = FileStore::open(dir.path()).unwrap();
        let (series, _) = reopened.get_by_name("k").unwrap().unwrap();
        assert_eq!(reopened.groups_for_secret(series.id).unwrap().len(), 1);
    }

    #[test]
    fn delete_removes_content_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.create_secret(write("k")).unwrap();
        store.delete_secret_by_name("k").unwrap();
        let reopened = FileStore::open(dir.path()).unwrap();
        assert!(reopened.get_by_name("k").unwrap().is_none());
    }
}
