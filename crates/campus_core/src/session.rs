//! crates/campus_core/src/session.rs
//!
//! The session/identity store: the single source of truth for "who is using
//! the app". Constructed once at startup and passed by reference to every
//! component that needs it.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::{StoredSession, User};
use crate::ports::{AuthBackend, CredentialStore, PortError};

/// Errors surfaced by the session store to its callers.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Auth backend error: {0}")]
    Backend(#[from] PortError),
}

/// The bearer credential shared with the HTTP layer. The session store is
/// the only writer; HTTP adapters read it when attaching the
/// `Authorization` header.
#[derive(Default)]
pub struct TokenSlot(RwLock<Option<String>>);

impl TokenSlot {
    pub async fn get(&self) -> Option<String> {
        self.0.read().await.clone()
    }

    async fn set(&self, token: String) {
        *self.0.write().await = Some(token);
    }

    async fn clear(&self) {
        *self.0.write().await = None;
    }
}

#[derive(Default)]
struct SessionState {
    user: Option<User>,
    /// True until the initial storage restore resolves. Consumers must not
    /// act on `is_authenticated` while this is set, or a slow restore shows
    /// a flash of logged-out state.
    loading: bool,
}

/// Holds the current user and drives the login/logout lifecycle.
pub struct SessionStore {
    auth: Arc<dyn AuthBackend>,
    storage: Arc<dyn CredentialStore>,
    token: Arc<TokenSlot>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        storage: Arc<dyn CredentialStore>,
        token: Arc<TokenSlot>,
    ) -> Self {
        Self {
            auth,
            storage,
            token,
            state: RwLock::new(SessionState {
                user: None,
                loading: true,
            }),
        }
    }

    //=====================================================================================
    // Derived flags — always recomputed from the user record, never cached
    //=====================================================================================

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.user.is_some()
    }

    pub async fn is_admin(&self) -> bool {
        self.state
            .read()
            .await
            .user
            .as_ref()
            .map(User::is_admin)
            .unwrap_or(false)
    }

    pub async fn is_premium(&self) -> bool {
        self.state
            .read()
            .await
            .user
            .as_ref()
            .map(User::is_premium)
            .unwrap_or(false)
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    //=====================================================================================
    // Lifecycle operations
    //=====================================================================================

    /// Restores a persisted `{user, token}` pair on startup. Malformed
    /// persisted data is cleared and reported as logged-out. Always resolves
    /// the `loading` flag, on every path.
    pub async fn load_from_storage(&self) {
        match self.storage.load().await {
            Ok(Some(stored)) => {
                info!("Restored session for user {}", stored.user.id);
                self.token.set(stored.token).await;
                self.state.write().await.user = Some(stored.user);
            }
            Ok(None) => {}
            Err(PortError::Malformed(e)) => {
                warn!("Persisted session is malformed ({}), clearing storage", e);
                if let Err(e) = self.storage.clear().await {
                    warn!("Failed to clear malformed session: {}", e);
                }
            }
            Err(e) => {
                warn!("Failed to read persisted session: {}", e);
            }
        }
        self.state.write().await.loading = false;
    }

    /// Delegates to the auth backend. On success persists the pair and swaps
    /// the in-memory state; on failure returns the error with state
    /// untouched. The stored token flows into all subsequent HTTP calls.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, SessionError> {
        let (token, user) = self.auth.login(email, password).await.map_err(|e| match e {
            PortError::Unauthorized => SessionError::InvalidCredentials,
            other => SessionError::Backend(other),
        })?;

        let stored = StoredSession {
            user: user.clone(),
            token: token.clone(),
        };
        if let Err(e) = self.storage.save(&stored).await {
            // The in-memory session still works; only the restore is lost.
            warn!("Failed to persist session: {}", e);
        }

        self.token.set(token).await;
        self.state.write().await.user = Some(user.clone());
        info!("User {} logged in", user.id);
        Ok(user)
    }

    /// Clears persisted and in-memory state. Safe to call when already
    /// logged out. This is also the documented recovery action after a 401
    /// on any authenticated call.
    pub async fn logout(&self) {
        if let Err(e) = self.storage.clear().await {
            warn!("Failed to clear persisted session: {}", e);
        }
        self.token.clear().await;
        self.state.write().await.user = None;
        info!("Session cleared");
    }

    /// Re-fetches the authoritative profile and overwrites both persisted
    /// and in-memory state. On failure the existing state is left untouched
    /// and `false` is returned; nothing else is surfaced.
    pub async fn refresh_profile(&self) -> bool {
        let user = match self.auth.fetch_profile().await {
            Ok(user) => user,
            Err(e) => {
                warn!("Profile refresh failed: {}", e);
                return false;
            }
        };

        if let Some(token) = self.token.get().await {
            let stored = StoredSession {
                user: user.clone(),
                token,
            };
            if let Err(e) = self.storage.save(&stored).await {
                warn!("Failed to persist refreshed profile: {}", e);
            }
        }

        self.state.write().await.user = Some(user);
        true
    }
}
