use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::ApiError;
use crate::models::{Credential, User};

/// Session file name within the store directory
const SESSION_FILE: &str = "session.json";

/// Persisted layout. The two opaque fields travel in one document so the
/// token can never be observed without its user record or vice versa.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    #[serde(rename = "authToken")]
    auth_token: String,
    /// JSON-encoded `{id, email, name}`
    user: String,
}

/// Durable storage for the current session.
///
/// `save`/`clear` are atomic with respect to `load`: writes go through a
/// temp file and rename, and clearing removes the whole document.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Persist the credential, replacing any previous session entirely.
    pub fn save(&self, credential: &Credential) -> Result<(), ApiError> {
        let stored = StoredSession {
            auth_token: credential.token.clone(),
            user: serde_json::to_string(&credential.user).map_err(Self::storage_err)?,
        };
        let contents = serde_json::to_string_pretty(&stored).map_err(Self::storage_err)?;

        fs::create_dir_all(&self.dir).map_err(Self::storage_err)?;
        let tmp = self.dir.join(format!("{SESSION_FILE}.tmp"));
        fs::write(&tmp, contents).map_err(Self::storage_err)?;
        fs::rename(&tmp, self.session_path()).map_err(Self::storage_err)?;
        Ok(())
    }

    /// Load the persisted credential, if any. An unreadable or corrupt file
    /// is a [`ApiError::Storage`]; callers fold that into "no session".
    pub fn load(&self) -> Result<Option<Credential>, ApiError> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).map_err(Self::storage_err)?;
        let stored: StoredSession = serde_json::from_str(&contents).map_err(Self::storage_err)?;
        let user: User = serde_json::from_str(&stored.user).map_err(Self::storage_err)?;
        Ok(Some(Credential {
            token: stored.auth_token,
            user,
        }))
    }

    /// Remove the stored session. Clearing an empty store is a no-op.
    pub fn clear(&self) -> Result<(), ApiError> {
        let path = self.session_path();
        if path.exists() {
            fs::remove_file(&path).map_err(Self::storage_err)?;
            debug!("stored session cleared");
        }
        Ok(())
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    fn storage_err<E: std::fmt::Display>(err: E) -> ApiError {
        ApiError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(id: &str, email: &str, token: &str) -> Credential {
        Credential {
            token: token.to_string(),
            user: User {
                id: id.to_string(),
                email: email.to_string(),
                name: "Test User".to_string(),
            },
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().to_path_buf());

        let cred = credential("1", "a@a.com", "jwt-abc");
        store.save(&cred).expect("save");

        let loaded = store.load().expect("load").expect("credential present");
        assert_eq!(loaded, cred);
    }

    #[test]
    fn load_on_empty_store_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().to_path_buf());
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn clear_removes_token_and_user_together() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().to_path_buf());

        store.save(&credential("1", "a@a.com", "jwt-abc")).expect("save");
        store.clear().expect("clear");
        assert!(store.load().expect("load").is_none());

        // Clearing again is a no-op, not an error.
        store.clear().expect("second clear");
    }

    #[test]
    fn save_overwrites_stale_credential_completely() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().to_path_buf());

        store.save(&credential("1", "old@a.com", "jwt-old")).expect("save old");
        let fresh = credential("2", "a@a.com", "jwt-new");
        store.save(&fresh).expect("save new");

        let loaded = store.load().expect("load").expect("credential present");
        assert_eq!(loaded, fresh);
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().to_path_buf());

        fs::write(dir.path().join(SESSION_FILE), "not json").expect("write");
        assert!(matches!(store.load(), Err(ApiError::Storage(_))));
    }
}
