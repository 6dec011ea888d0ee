//! In-memory backend — the default for tests and for `secret-api` when no
//! data directory is configured.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::Utc;

use crate::backend::{DirectoryBackend, SecretBackend, SecretWrite};
use crate::error::StoreError;
use crate::types::{Client, Group, Id, SecretContent, SecretSeries};

#[derive(Default)]
struct Tables {
    series: HashMap<Id, SecretSeries>,
    series_by_name: HashMap<String, Id>,
    content: HashMap<Id, SecretContent>,
    content_by_series: HashMap<Id, Vec<Id>>,

    groups: HashMap<Id, Group>,
    groups_by_name: HashMap<String, Id>,
    clients: HashMap<Id, Client>,
    clients_by_name: HashMap<String, Id>,

    access: HashSet<(Id, Id)>,        // (secret_series_id, group_id)
    membership: HashSet<(Id, Id)>,    // (client_id, group_id)
}

/// Single in-memory store backing both `SecretBackend` and
/// `DirectoryBackend` — one shared id sequence guarantees the
/// insert-time ordering the concurrency model relies on (spec §4.3).
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    next_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> Id {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn bump_sequence_past(&self, id: Id) {
        self.next_id.fetch_max(id + 1, Ordering::SeqCst);
    }

    /// Restores a series loaded from disk. For `FileStore` bootstrap only.
    pub fn load_series(&self, series: SecretSeries) {
        self.bump_sequence_past(series.id);
        let mut t = self.tables.write().unwrap();
        t.series_by_name.insert(series.name.clone(), series.id);
        t.series.insert(series.id, series);
    }

    pub fn load_content(&self, content: SecretContent) {
        self.bump_sequence_past(content.id);
        let mut t = self.tables.write().unwrap();
        t.content_by_series.entry(content.series_id).or_default().push(content.id);
        t.content.insert(content.id, content);
    }

    pub fn load_group(&self, group: Group) {
        self.bump_sequence_past(group.id);
        let mut t = self.tables.write().unwrap();
        t.groups_by_name.insert(group.name.clone(), group.id);
        t.groups.insert(group.id, group);
    }

    pub fn load_client(&self, client: Client) {
        self.bump_sequence_past(client.id);
        let mut t = self.tables.write().unwrap();
        t.clients_by_name.insert(client.name.clone(), client.id);
        t.clients.insert(client.id, client);
    }

    pub fn load_access(&self, edges: Vec<(Id, Id)>) {
        let mut t = self.tables.write().unwrap();
        t.access.extend(edges);
    }

    pub fn load_membership(&self, edges: Vec<(Id, Id)>) {
        let mut t = self.tables.write().unwrap();
        t.membership.extend(edges);
    }

    pub fn snapshot_access(&self) -> Vec<(Id, Id)> {
        self.tables.read().unwrap().access.iter().copied().collect()
    }

    pub fn snapshot_membership(&self) -> Vec<(Id, Id)> {
        self.tables.read().unwrap().membership.iter().copied().collect()
    }

    pub fn get_client_by_id(&self, id: Id) -> Result<Option<Client>, StoreError> {
        Ok(self.tables.read().unwrap().clients.get(&id).cloned())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretBackend for InMemoryStore {
    fn get_by_id(&self, id: Id) -> Result<Option<(SecretSeries, Option<SecretContent>)>, StoreError> {
        let t = self.tables.read().unwrap();
        let Some(series) = t.series.get(&id) else {
            return Ok(None);
        };
        let current = series
            .current_version_id
            .and_then(|cid| t.content.get(&cid))
            .cloned();
        Ok(Some((series.clone(), current)))
    }

    fn get_by_name(&self, name: &str) -> Result<Option<(SecretSeries, Option<SecretContent>)>, StoreError> {
        let t = self.tables.read().unwrap();
        let Some(&id) = t.series_by_name.get(name) else {
            return Ok(None);
        };
        let series = t.series.get(&id).expect("name index is consistent").clone();
        let current = series
            .current_version_id
            .and_then(|cid| t.content.get(&cid))
            .cloned();
        Ok(Some((series, current)))
    }

    fn list_names(&self) -> Result<Vec<(Id, String)>, StoreError> {
        let t = self.tables.read().unwrap();
        let mut out: Vec<(Id, String)> = t.series.values().map(|s| (s.id, s.name.clone())).collect();
        out.sort_by_key(|(id, _)| *id);
        Ok(out)
    }

    fn list_secrets(&self, max_expiry: Option<i64>) -> Result<Vec<(SecretSeries, SecretContent)>, StoreError> {
        let t = self.tables.read().unwrap();
        let mut out = Vec::new();
        for series in t.series.values() {
            let Some(cid) = series.current_version_id else {
                continue;
            };
            let Some(content) = t.content.get(&cid) else {
                continue;
            };
            if let Some(max) = max_expiry {
                if !(content.expiry > 0 && content.expiry <= max) {
                    continue;
                }
            }
            out.push((series.clone(), content.clone()));
        }
        out.sort_by_key(|(s, _)| s.id);
        Ok(out)
    }

    fn create_secret(&self, write: SecretWrite) -> Result<Id, StoreError> {
        let mut t = self.tables.write().unwrap();
        if t.series_by_name.contains_key(&write.name) {
            return Err(StoreError::AlreadyExists(write.name));
        }
        let series_id = self.next_id();
        let content_id = self.next_id();
        let now = Utc::now();

        let content = SecretContent {
            id: content_id,
            series_id,
            encrypted_content: write.encrypted_content,
            hmac: write.hmac,
            metadata: write.metadata,
            expiry: write.expiry,
            created_at: now,
            created_by: write.creator.clone(),
        };
        let series = SecretSeries {
            id: series_id,
            name: write.name.clone(),
            description: write.description,
            secret_type: write.secret_type,
            created_at: now,
            created_by: write.creator.clone(),
            updated_at: now,
            updated_by: write.creator,
            current_version_id: Some(content_id),
        };

        t.series_by_name.insert(write.name, series_id);
        t.content_by_series.entry(series_id).or_default().push(content_id);
        t.content.insert(content_id, content);
        t.series.insert(series_id, series);

        Ok(series_id)
    }

    fn create_or_update_secret(&self, write: SecretWrite) -> Result<Id, StoreError> {
        let mut t = self.tables.write().unwrap();
        let now = Utc::now();

        let series_id = match t.series_by_name.get(&write.name).copied() {
            Some(id) => id,
            None => {
                let id = self.next_id();
                t.series_by_name.insert(write.name.clone(), id);
                t.series.insert(
                    id,
                    SecretSeries {
                        id,
                        name: write.name.clone(),
                        description: write.description.clone(),
                        secret_type: write.secret_type.clone(),
                        created_at: now,
                        created_by: write.creator.clone(),
                        updated_at: now,
                        updated_by: write.creator.clone(),
                        current_version_id: None,
                    },
                );
                id
            }
        };

        let content_id = self.next_id();
        let content = SecretContent {
            id: content_id,
            series_id,
            encrypted_content: write.encrypted_content,
            hmac: write.hmac,
            metadata: write.metadata,
            expiry: write.expiry,
            created_at: now,
            created_by: write.creator.clone(),
        };
        t.content_by_series.entry(series_id).or_default().push(content_id);
        t.content.insert(content_id, content);

        let series = t.series.get_mut(&series_id).expect("just inserted or found");
        series.current_version_id = Some(content_id);
        series.description = write.description;
        series.secret_type = write.secret_type;
        series.updated_at = now;
        series.updated_by = write.creator;

        Ok(series_id)
    }

    fn get_versions_by_name(
        &self,
        name: &str,
        offset: usize,
        count: usize,
    ) -> Result<Option<Vec<SecretContent>>, StoreError> {
        let t = self.tables.read().unwrap();
        let Some(&series_id) = t.series_by_name.get(name) else {
            return Ok(None);
        };
        let mut versions: Vec<SecretContent> = t
            .content_by_series
            .get(&series_id)
            .into_iter()
            .flatten()
            .filter_map(|cid| t.content.get(cid).cloned())
            .collect();
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let page = versions.into_iter().skip(offset).take(count).collect();
        Ok(Some(page))
    }

    fn set_current_version_by_name(&self, name: &str, version_id: Id) -> Result<(), StoreError> {
        let mut t = self.tables.write().unwrap();
        let Some(&series_id) = t.series_by_name.get(name) else {
            return Err(StoreError::NotFound(format!("secret {}", name)));
        };
        let belongs = t
            .content_by_series
            .get(&series_id)
            .map(|v| v.contains(&version_id))
            .unwrap_or(false);
        if !belongs {
            return Err(StoreError::BadVersion(format!(
                "version {} does not belong to secret {}",
                version_id, name
            )));
        }
        let series = t.series.get_mut(&series_id).expect("name index is consistent");
        series.current_version_id = Some(version_id);
        series.updated_at = Utc::now();
        Ok(())
    }

    fn set_expiration(&self, name: &str, expiry: i64) -> Result<bool, StoreError> {
        let mut t = self.tables.write().unwrap();
        let Some(&series_id) = t.series_by_name.get(name) else {
            return Ok(false);
        };
        let Some(current_id) = t.series.get(&series_id).and_then(|s| s.current_version_id) else {
            return Ok(false);
        };
        if let Some(content) = t.content.get_mut(&current_id) {
            content.expiry = expiry;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn delete_secret_by_name(&self, name: &str) -> Result<Option<Id>, StoreError> {
        let mut t = self.tables.write().unwrap();
        let Some(series_id) = t.series_by_name.remove(name) else {
            return Ok(None);
        };
        t.series.remove(&series_id);
        if let Some(content_ids) = t.content_by_series.remove(&series_id) {
            for cid in content_ids {
                t.content.remove(&cid);
            }
        }
        t.access.retain(|(s, _)| *s != series_id);
        Ok(Some(series_id))
    }
}

impl DirectoryBackend for InMemoryStore {
    fn get_group(&self, name: &str) -> Result<Option<Group>, StoreError> {
        let t = self.tables.read().unwrap();
        Ok(t.groups_by_name.get(name).and_then(|id| t.groups.get(id)).cloned())
    }

    fn get_group_by_id(&self, id: Id) -> Result<Option<Group>, StoreError> {
        let t = self.tables.read().unwrap();
        Ok(t.groups.get(&id).cloned())
    }

    fn create_group(&self, name: &str, description: &str) -> Result<Id, StoreError> {
        let mut t = self.tables.write().unwrap();
        if let Some(&id) = t.groups_by_name.get(name) {
            return Ok(id);
        }
        let id = self.next_id();
        let now = Utc::now();
        t.groups_by_name.insert(name.to_string(), id);
        t.groups.insert(
            id,
            Group {
                id,
                name: name.to_string(),
                description: description.to_string(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let t = self.tables.read().unwrap();
        let mut out: Vec<Group> = t.groups.values().cloned().collect();
        out.sort_by_key(|g| g.id);
        Ok(out)
    }

    fn get_client(&self, name: &str) -> Result<Option<Client>, StoreError> {
        let t = self.tables.read().unwrap();
        Ok(t.clients_by_name.get(name).and_then(|id| t.clients.get(id)).cloned())
    }

    fn create_client(&self, name: &str, automation_allowed: bool) -> Result<Id, StoreError> {
        let mut t = self.tables.write().unwrap();
        if let Some(&id) = t.clients_by_name.get(name) {
            return Ok(id);
        }
        let id = self.next_id();
        let now = Utc::now();
        t.clients_by_name.insert(name.to_string(), id);
        t.clients.insert(
            id,
            Client {
                id,
                name: name.to_string(),
                enabled: true,
                automation_allowed,
                last_seen: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    fn touch_last_seen(&self, client_id: Id) -> Result<(), StoreError> {
        let mut t = self.tables.write().unwrap();
        if let Some(c) = t.clients.get_mut(&client_id) {
            c.last_seen = Some(Utc::now());
        }
        Ok(())
    }

    fn set_enabled(&self, client_id: Id, enabled: bool) -> Result<(), StoreError> {
        let mut t = self.tables.write().unwrap();
        if let Some(c) = t.clients.get_mut(&client_id) {
            c.enabled = enabled;
            c.updated_at = Utc::now();
        }
        Ok(())
    }

    fn add_access(&self, secret_id: Id, group_id: Id) -> Result<bool, StoreError> {
        let mut t = self.tables.write().unwrap();
        Ok(t.access.insert((secret_id, group_id)))
    }

    fn remove_access(&self, secret_id: Id, group_id: Id) -> Result<bool, StoreError> {
        let mut t = self.tables.write().unwrap();
        Ok(t.access.remove(&(secret_id, group_id)))
    }

    fn groups_for_secret(&self, secret_id: Id) -> Result<Vec<Group>, StoreError> {
        let t = self.tables.read().unwrap();
        let mut out: Vec<Group> = t
            .access
            .iter()
            .filter(|(s, _)| *s == secret_id)
            .filter_map(|(_, g)| t.groups.get(g).cloned())
            .collect();
        out.sort_by_key(|g| g.id);
        Ok(out)
    }

    fn clients_for_secret(&self, secret_id: Id) -> Result<Vec<Client>, StoreError> {
        let t = self.tables.read().unwrap();
        let group_ids: HashSet<Id> = t
            .access
            .iter()
            .filter(|(s, _)| *s == secret_id)
            .map(|(_, g)| *g)
            .collect();
        let client_ids: HashSet<Id> = t
            .membership
            .iter()
            .filter(|(_, g)| group_ids.contains(g))
            .map(|(c, _)| *c)
            .collect();
        let mut out: Vec<Client> = client_ids.into_iter().filter_map(|c| t.clients.get(&c).cloned()).collect();
        out.sort_by_key(|c| c.id);
        Ok(out)
    }

    fn secret_ids_for_group(&self, group_id: Id) -> Result<Vec<Id>, StoreError> {
        let t = self.tables.read().unwrap();
        let mut out: Vec<Id> = t
            .access
            .iter()
            .filter(|(_, g)| *g == group_id)
            .map(|(s, _)| *s)
            .collect();
        out.sort_unstable();
        Ok(out)
    }

    fn group_ids_for_client(&self, client_id: Id) -> Result<Vec<Id>, StoreError> {
        let t = self.tables.read().unwrap();
        let mut out: Vec<Id> = t
            .membership
            .iter()
            .filter(|(c, _)| *c == client_id)
            .map(|(_, g)| *g)
            .collect();
        out.sort_unstable();
        Ok(out)
    }

    fn add_membership(&self, client_id: Id, group_id: Id) -> Result<bool, StoreError> {
        let mut t = self.tables.write().unwrap();
        Ok(t.membership.insert((client_id, group_id)))
    }

    fn remove_membership(&self, client_id: Id, group_id: Id) -> Result<bool, StoreError> {
        let mut t = self.tables.write().unwrap();
        Ok(t.membership.remove(&(client_id, group_id)))
    }

    fn remove_access_for_secret(&self, secret_id: Id) -> Result<(), StoreError> {
        let mut t = self.tables.write().unwrap();
        t.access.retain(|(s, _)| *s != secret_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn create_then_duplicate_fails() {
        let store = InMemoryStore::new();
        store.create_secret(write("db-password")).unwrap();
        let err = store.create_secret(write("db-password")).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn name_is_freed_after_delete() {
        let store = InMemoryStore::new();
        store.create_secret(write("k")).unwrap();
        store.delete_secret_by_name("k").unwrap();
        store.create_secret(write("k")).unwrap();
    }

    #[test]
    fn create_or_update_always_appends_version() {
        let store = InMemoryStore::new();
        store.create_or_update_secret(write("k")).unwrap();
        store.create_or_update_secret(write("k")).unwrap();
        let versions = store.get_versions_by_name("k", 0, 10).unwrap().unwrap();
        assert_eq!(versions.len(), 2);
    }

    #[test]
    fn access_edge_is_idempotent() {
        let store = InMemoryStore::new();
        assert!(store.add_access(1, 1).unwrap());
        assert!(!store.add_access(1, 1).unwrap());
    }

    #[test]
    fn delete_clears_access_edges() {
        let store = InMemoryStore::new();
        let series_id = store.create_secret(write("k")).unwrap();
        let group_id = store.create_group("g", "").unwrap();
        store.add_access(series_id, group_id).unwrap();

        store.delete_secret_by_name("k").unwrap();

        assert!(store.groups_for_secret(series_id).unwrap().is_empty());
        // re-adding the edge after recreation must not inherit the old grant
        let new_series_id = store.create_secret(write("k")).unwrap();
        assert!(store.groups_for_secret(new_series_id).unwrap().is_empty());
    }
}
