//! services/app/src/adapters/storage.rs
//!
//! Durable client storage for the `{user, token}` pair: a small JSON file.
//! Implements the `CredentialStore` port from the `core` crate. A missing
//! file means "nothing persisted"; an unreadable payload is reported as
//! malformed so the session store can clear it and continue logged-out.

use async_trait::async_trait;
use campus_core::domain::StoredSession;
use campus_core::ports::{CredentialStore, PortError, PortResult};
use std::path::PathBuf;

/// A file-backed implementation of the `CredentialStore` port.
#[derive(Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> PortResult<Option<StoredSession>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| PortError::Malformed(e.to_string()))
    }

    async fn save(&self, session: &StoredSession) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        let contents = serde_json::to_string_pretty(session)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn clear(&self) -> PortResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::domain::{Role, User};

    fn session() -> StoredSession {
        StoredSession {
            user: User {
                id: "u1".into(),
                name: "Ana".into(),
                email: "ana@example.com".into(),
                role: Role::Student,
                subscription: None,
            },
            token: "tok-1".into(),
        }
    }

    #[tokio::test]
    async fn saves_and_restores_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("session.json"));

        assert!(store.load().await.unwrap().is_none());
        store.save(&session()).await.unwrap();
        let restored = store.load().await.unwrap().unwrap();
        assert_eq!(restored.user.id, "u1");
        assert_eq!(restored.token, "tok-1");
    }

    #[tokio::test]
    async fn malformed_contents_are_reported_as_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = FileCredentialStore::new(path);
        assert!(matches!(
            store.load().await.unwrap_err(),
            PortError::Malformed(_)
        ));
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("session.json"));

        store.save(&session()).await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
