//! C5: grant/revoke access and resolve secret/group/client visibility.

use std::collections::HashSet;
use std::sync::Arc;

use secret_store::{AuditEvent, AuditSinkSync, AuditTag, Client, DirectoryBackend, Group, Id};

use crate::error::CoreError;

pub struct AclEngine {
    directory: Arc<dyn DirectoryBackend>,
    audit: Arc<dyn AuditSinkSync>,
}

impl AclEngine {
    pub fn new(directory: Arc<dyn DirectoryBackend>, audit: Arc<dyn AuditSinkSync>) -> Self {
        Self { directory, audit }
    }

    /// Idempotent edge insert; audits only on an actual state change.
    pub fn find_and_allow_access(&self, secret_id: Id, group_id: Id, actor: &str, subject: &str) -> Result<(), CoreError> {
        if self.directory.add_access(secret_id, group_id)? {
            self.audit.record(AuditEvent::new(AuditTag::AccessAdd, subject, actor))?;
        }
        Ok(())
    }

    /// Idempotent edge delete; audits only on an actual state change.
    pub fn find_and_revoke_access(&self, secret_id: Id, group_id: Id, actor: &str, subject: &str) -> Result<(), CoreError> {
        if self.directory.remove_access(secret_id, group_id)? {
            self.audit.record(AuditEvent::new(AuditTag::AccessRemove, subject, actor))?;
        }
        Ok(())
    }

    pub fn groups_for_secret(&self, secret_id: Id) -> Result<Vec<Group>, CoreError> {
        Ok(self.directory.groups_for_secret(secret_id)?)
    }

    pub fn clients_for_secret(&self, secret_id: Id) -> Result<Vec<Client>, CoreError> {
        Ok(self.directory.clients_for_secret(secret_id)?)
    }

    /// Secrets visible to `client_id`: join across membership and access,
    /// deduplicated by secret id.
    pub fn secret_ids_for_client(&self, client_id: Id) -> Result<Vec<Id>, CoreError> {
        let groups = self.directory.group_ids_for_client(client_id)?;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for group_id in groups {
            for secret_id in self.directory.secret_ids_for_group(group_id)? {
                if seen.insert(secret_id) {
                    out.push(secret_id);
                }
            }
        }
        Ok(out)
    }

    /// Applies `add`/`remove` group name sets to `secret_id`. Names that
    /// don't resolve to a group are skipped (not failed) — each skip is
    /// logged. Returns the resulting group name set.
    pub fn modify_groups(
        &self,
        secret_id: Id,
        subject: &str,
        add: &[String],
        remove: &[String],
        actor: &str,
    ) -> Result<Vec<String>, CoreError> {
        let existing: HashSet<Id> = self
            .directory
            .groups_for_secret(secret_id)?
            .into_iter()
            .map(|g| g.id)
            .collect();

        let resolve = |name: &str| -> Option<Id> {
            match self.directory.get_group(name) {
                Ok(Some(g)) => Some(g.id),
                Ok(None) => {
                    tracing::info!(group = name, "group-modify: unknown group skipped");
                    None
                }
                Err(e) => {
                    tracing::warn!(group = name, error = %e, "group-modify: lookup failed, skipped");
                    None
                }
            }
        };

        let add_ids: HashSet<Id> = add.iter().filter_map(|n| resolve(n)).collect();
        let remove_ids: HashSet<Id> = remove.iter().filter_map(|n| resolve(n)).collect();

        let to_add: Vec<Id> = add_ids.difference(&existing).copied().collect();
        let to_remove: Vec<Id> = remove_ids.intersection(&existing).copied().collect();

        for group_id in to_add {
            self.find_and_allow_access(secret_id, group_id, actor, subject)?;
        }
        for group_id in to_remove {
            self.find_and_revoke_access(secret_id, group_id, actor, subject)?;
        }

        Ok(self
            .directory
            .groups_for_secret(secret_id)?
            .into_iter()
            .map(|g| g.name)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secret_store::InMemoryAuditSink;
    use secret_store::InMemoryStore;

    fn setup() -> (Arc<InMemoryStore>, AclEngine, Arc<InMemoryAuditSink>) {
        let dir = Arc::new(InMemoryStore::new());
        let sink = Arc::new(InMemoryAuditSink::new());
        let acl = AclEngine::new(dir.clone(), sink.clone());
        (dir, acl, sink)
    }

    #[test]
    fn allow_is_idempotent_and_audits_once() {
        let (_dir, acl, sink) = setup();
        acl.find_and_allow_access(1, 1, "alice", "s").unwrap();
        acl.find_and_allow_access(1, 1, "alice", "s").unwrap();
        assert_eq!(sink.events().len(), 1);
        assert_eq!(acl.groups_for_secret(1).unwrap().len(), 0); // group row doesn't exist, edge does
    }

    #[test]
    fn modify_groups_computes_add_and_remove_diff() {
        let (dir, acl, sink) = setup();
        let a = dir.create_group("A", "").unwrap();
        let b = dir.create_group("B", "").unwrap();
        let c = dir.create_group("C", "").unwrap();
        let secret_id = 100;
        acl.find_and_allow_access(secret_id, a, "alice", "s").unwrap();
        acl.find_and_allow_access(secret_id, b, "alice", "s").unwrap();

        let result = acl
            .modify_groups(secret_id, "s", &["B".into(), "C".into()], &["A".into(), "D".into()], "alice")
            .unwrap();

        let mut names: Vec<String> = result;
        names.sort();
        assert_eq!(names, vec!["B".to_string(), "C".to_string()]);

        let add_events = sink.events().into_iter().filter(|e| e.tag == AuditTag::AccessAdd).count();
        let remove_events = sink.events().into_iter().filter(|e| e.tag == AuditTag::AccessRemove).count();
        assert_eq!(add_events, 3); // initial A, initial B, then C
        assert_eq!(remove_events, 1); // A only; D never existed
        let _ = c;
    }

    #[test]
    fn secret_ids_for_client_dedupes_across_groups() {
        let (dir, acl, _sink) = setup();
        let a = dir.create_group("A", "").unwrap();
        let b = dir.create_group("B", "").unwrap();
        let client_id = dir.create_client("svc", true).unwrap();
        dir.add_membership(client_id, a).unwrap();
        dir.add_membership(client_id, b).unwrap();
        dir.add_access(42, a).unwrap();
        dir.add_access(42, b).unwrap();

        let ids = acl.secret_ids_for_client(client_id).unwrap();
        assert_eq!(ids, vec![42]);
    }
}
