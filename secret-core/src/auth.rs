//! C9: maps a TLS-peer identity (certificate CN) to a `Client` principal.
//!
//! The TLS layer that extracts the CN from the peer certificate chain is
//! out of scope here; this takes the already-extracted name.

use std::sync::Arc;

use secret_store::{Client, DirectoryBackend};

use crate::error::CoreError;

pub struct Authenticator {
    directory: Arc<dyn DirectoryBackend>,
}

impl Authenticator {
    pub fn new(directory: Arc<dyn DirectoryBackend>) -> Self {
        Self { directory }
    }

    /// Looks up `cn`, requiring `enabled` and `automationAllowed`, then
    /// touches `lastSeen` out-of-band (failure to do so doesn't fail auth).
    pub fn authenticate_automation(&self, cn: &str) -> Result<Client, CoreError> {
        let client = self
            .directory
            .get_client(cn)?
            .ok_or_else(|| CoreError::Auth(format!("unknown client {}", cn)))?;

        if !client.enabled {
            return Err(CoreError::Auth(format!("client {} disabled", cn)));
        }
        if !client.automation_allowed {
            return Err(CoreError::Auth(format!("client {} not automation-allowed", cn)));
        }

        if let Err(e) = self.directory.touch_last_seen(client.id) {
            tracing::warn!(client = %cn, error = %e, "failed to update last_seen");
        }

        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secret_store::InMemoryStore;

    fn directory() -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::new())
    }

    #[test]
    fn unknown_client_is_rejected() {
        let auth = Authenticator::new(directory());
        assert!(matches!(
            auth.authenticate_automation("nobody"),
            Err(CoreError::Auth(_))
        ));
    }

    #[test]
    fn non_automation_client_is_rejected() {
        let dir = directory();
        dir.create_client("reader", false).unwrap();
        let auth = Authenticator::new(dir);
        assert!(matches!(
            auth.authenticate_automation("reader"),
            Err(CoreError::Auth(_))
        ));
    }

    #[test]
    fn automation_client_is_accepted_and_touched() {
        let dir = directory();
        let id = dir.create_client("deployer", true).unwrap();
        let auth = Authenticator::new(dir.clone());
        let client = auth.authenticate_automation("deployer").unwrap();
        assert_eq!(client.id, id);
        assert!(dir.get_client("deployer").unwrap().unwrap().last_seen.is_some());
    }
}
