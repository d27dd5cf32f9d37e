//! crates/campus_core/src/testutil.rs
//!
//! Shared fakes for the core component tests: an in-memory credential store
//! and a no-op auth backend, plus helpers that build a session store in a
//! known state.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{Role, StoredSession, Subscription, SubscriptionStatus, User};
use crate::ports::{AuthBackend, CredentialStore, PortError, PortResult};
use crate::session::{SessionStore, TokenSlot};

pub fn student(id: &str) -> User {
    User {
        id: id.to_string(),
        name: "Ana".into(),
        email: format!("{id}@example.com"),
        role: Role::Student,
        subscription: None,
    }
}

pub fn admin(id: &str) -> User {
    User {
        id: id.to_string(),
        name: "Root".into(),
        email: format!("{id}@example.com"),
        role: Role::Admin,
        subscription: Some(Subscription {
            status: SubscriptionStatus::Active,
            expires_at: None,
        }),
    }
}

/// An auth backend for tests that never log in through it.
pub struct NullAuth;

#[async_trait]
impl AuthBackend for NullAuth {
    async fn login(&self, _: &str, _: &str) -> PortResult<(String, User)> {
        Err(PortError::Unauthorized)
    }

    async fn register(&self, _: &str, _: &str, _: &str) -> PortResult<String> {
        Err(PortError::Unexpected("register not scripted".into()))
    }

    async fn fetch_profile(&self) -> PortResult<User> {
        Err(PortError::Unauthorized)
    }

    async fn update_name(&self, _: &str) -> PortResult<User> {
        Err(PortError::Unexpected("update_name not scripted".into()))
    }
}

/// An auth backend that signs any credentials in as the given user.
pub struct ScriptedAuth(pub User);

#[async_trait]
impl AuthBackend for ScriptedAuth {
    async fn login(&self, _: &str, _: &str) -> PortResult<(String, User)> {
        Ok(("test-token".into(), self.0.clone()))
    }

    async fn register(&self, _: &str, _: &str, _: &str) -> PortResult<String> {
        Err(PortError::Unexpected("register not scripted".into()))
    }

    async fn fetch_profile(&self) -> PortResult<User> {
        Ok(self.0.clone())
    }

    async fn update_name(&self, _: &str) -> PortResult<User> {
        Err(PortError::Unexpected("update_name not scripted".into()))
    }
}

#[derive(Default)]
pub struct MemStorage(Mutex<Option<StoredSession>>);

#[async_trait]
impl CredentialStore for MemStorage {
    async fn load(&self) -> PortResult<Option<StoredSession>> {
        Ok(self.0.lock().unwrap().clone())
    }

    async fn save(&self, session: &StoredSession) -> PortResult<()> {
        *self.0.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> PortResult<()> {
        *self.0.lock().unwrap() = None;
        Ok(())
    }
}

/// A session store restored from a persisted session for `user`.
pub async fn signed_in_session(user: User) -> Arc<SessionStore> {
    let storage = MemStorage::default();
    storage
        .save(&StoredSession {
            user,
            token: "test-token".into(),
        })
        .await
        .unwrap();
    let store = Arc::new(SessionStore::new(
        Arc::new(NullAuth),
        Arc::new(storage),
        Arc::new(TokenSlot::default()),
    ));
    store.load_from_storage().await;
    store
}

/// A session store that resolved its restore with nothing persisted.
pub async fn anonymous_session() -> Arc<SessionStore> {
    let store = Arc::new(SessionStore::new(
        Arc::new(NullAuth),
        Arc::new(MemStorage::default()),
        Arc::new(TokenSlot::default()),
    ));
    store.load_from_storage().await;
    store
}
