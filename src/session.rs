//! Session identity and page context.
//!
//! The session identifier lives in the session-scoped store and is created
//! on first use. If that store is unusable, a process-stable fallback id is
//! handed out instead so audit entries still correlate.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use uuid::Uuid;

use crate::observability::metrics;
use crate::storage::{KeyValueStore, SESSION_ID_KEY};

/// Accessor for the current browsing session.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    fallback_id: Arc<OnceLock<String>>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            fallback_id: Arc::new(OnceLock::new()),
        }
    }

    /// Return the session id, creating it if the store holds none.
    pub fn id(&self) -> String {
        match self.store.get(SESSION_ID_KEY) {
            Ok(Some(id)) => id,
            Ok(None) => {
                let id = format!("sess_{}", Uuid::new_v4().simple());
                if let Err(e) = self.store.set(SESSION_ID_KEY, &id) {
                    metrics::record_storage_failure("session_id");
                    tracing::warn!(error = %e, "Failed to persist session id");
                    return self.fallback();
                }
                tracing::debug!(session_id = %id, "Created session id");
                id
            }
            Err(e) => {
                metrics::record_storage_failure("session_id");
                tracing::warn!(error = %e, "Session store unavailable, using fallback session id");
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> String {
        self.fallback_id
            .get_or_init(|| format!("sess_{}", Uuid::new_v4().simple()))
            .clone()
    }
}

/// Where the user currently is, and what they are running.
#[derive(Clone)]
pub struct PageContext {
    url: Arc<RwLock<String>>,
    agent: Arc<str>,
}

impl PageContext {
    pub fn new(url: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            url: Arc::new(RwLock::new(url.into())),
            agent: Arc::from(agent.into()),
        }
    }

    pub fn url(&self) -> String {
        self.url.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Record a navigation.
    pub fn set_url(&self, url: impl Into<String>) {
        *self.url.write().unwrap_or_else(PoisonError::into_inner) = url.into();
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }
}
