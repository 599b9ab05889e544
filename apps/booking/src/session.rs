//! Visitor authentication state.
//!
//! A `Session` holds the bearer token and the hydrated user. The token is
//! persisted in a session-scoped `SessionStore`; nothing else is persisted.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::api::BusinessApi;
use crate::error::ApiError;
use crate::models::User;

/// Session-scoped token storage, keyed by visitor.
pub trait SessionStore: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, token: &str);
    fn remove(&self, key: &str);
}

/// In-memory store. Tokens live as long as the process, like a browser tab's
/// session storage.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    tokens: DashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, key: &str) -> Option<String> {
        self.tokens.get(key).map(|t| t.value().clone())
    }

    fn save(&self, key: &str, token: &str) {
        self.tokens.insert(key.to_string(), token.to_string());
    }

    fn remove(&self, key: &str) {
        self.tokens.remove(key);
    }
}

pub struct Session {
    key: String,
    token: Option<String>,
    user: Option<User>,
    store: Arc<dyn SessionStore>,
}

impl Session {
    /// Loads the persisted token for `key`, if any. The user stays unknown
    /// until `hydrate` runs.
    pub fn restore(store: Arc<dyn SessionStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let token = store.load(&key);
        if token.is_some() {
            tracing::debug!(session = %key, "restored persisted token");
        }
        Self {
            key,
            token,
            user: None,
            store,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Token and user, when both are known.
    pub fn credentials(&self) -> Option<(&str, &User)> {
        Some((self.token.as_deref()?, self.user.as_ref()?))
    }

    /// Stores a freshly issued token. Any previously hydrated user is dropped.
    pub fn sign_in(&mut self, token: String) {
        self.store.save(&self.key, &token);
        self.token = Some(token);
        self.user = None;
    }

    pub fn set_user(&mut self, user: User) {
        self.user = Some(user);
    }

    /// Clears token, user and the persisted copy.
    pub fn logout(&mut self) {
        if self.token.is_some() {
            tracing::info!(session = %self.key, "session logged out");
        }
        self.store.remove(&self.key);
        self.token = None;
        self.user = None;
    }

    /// Fetches the user behind the token when it is not known yet. A 401 logs
    /// the session out; any other failure keeps the token for a retry.
    pub async fn hydrate(&mut self, api: &dyn BusinessApi) -> Result<(), ApiError> {
        let Some(token) = self.token.clone() else {
            return Ok(());
        };
        if self.user.is_some() {
            return Ok(());
        }

        match api.current_user(&token).await {
            Ok(user) => {
                tracing::debug!(session = %self.key, user_id = user.id, "session hydrated");
                self.user = Some(user);
                Ok(())
            }
            Err(ApiError::Unauthorized) => {
                tracing::warn!(session = %self.key, "invalid token, logging out");
                self.logout();
                Err(ApiError::Unauthorized)
            }
            Err(err) => {
                tracing::warn!(session = %self.key, error = %err, "could not hydrate session");
                Err(err)
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("authenticated", &self.token.is_some())
            .field("user", &self.user.as_ref().map(|u| u.id))
            .finish()
    }
}
