//! Session hook
//!
//! Guarded routes ask a [`SessionStore`] for the current session. No store
//! is bundled beyond an in-memory one; applications plug in their own.

use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

use crate::handler::HandlerRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Session {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// A session counts as authenticated when both credentials are present
    pub const fn is_authenticated(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store is not configured")]
    Unavailable,
    #[error("session store failed: {0}")]
    Backend(String),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the session for `request`. `Ok(None)` means no session.
    async fn read(&self, request: &HandlerRequest) -> Result<Option<Session>, SessionError>;
}

/// Store used when the application installs none; every read fails
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSessionStore;

#[async_trait]
impl SessionStore for UnavailableSessionStore {
    async fn read(&self, _request: &HandlerRequest) -> Result<Option<Session>, SessionError> {
        Err(SessionError::Unavailable)
    }
}

/// Process-wide single session, for embedding and tests
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub const fn new(session: Option<Session>) -> Self {
        Self {
            session: RwLock::new(session),
        }
    }

    pub fn replace(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn read(&self, _request: &HandlerRequest) -> Result<Option<Session>, SessionError> {
        Ok(self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
