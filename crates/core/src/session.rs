//! In-memory session registry.
//!
//! Sessions are held only in memory: a restart logs everyone out. Each
//! login opens a fresh [`SessionContext`] carried by a bearer token; logout
//! is the reset operation that closes it.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::SessionContext;

/// Registry of active sessions, keyed by bearer token.
pub struct SessionRegistry {
    ttl: Duration,
    sessions: RwLock<HashMap<String, SessionContext>>,
}

impl SessionRegistry {
    /// Create a registry whose sessions live for `ttl_hours` after login.
    pub fn new(ttl_hours: u64) -> Self {
        Self {
            ttl: Duration::hours(ttl_hours as i64),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a session for `username` and return its context.
    ///
    /// Expired sessions are pruned opportunistically on this write path.
    pub async fn open(&self, username: &str) -> SessionContext {
        let now = Utc::now();
        let context = SessionContext {
            token: Uuid::new_v4().to_string(),
            username: username.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired());
        sessions.insert(context.token.clone(), context.clone());
        info!(username, "opened session");
        context
    }

    /// Resolve a bearer token to its session context, if the session is
    /// still live. Expired entries are treated as absent.
    pub async fn resolve(&self, token: &str) -> Option<SessionContext> {
        let sessions = self.sessions.read().await;
        sessions.get(token).filter(|s| !s.is_expired()).cloned()
    }

    /// Close the session for `token`. Returns whether one was open.
    pub async fn close(&self, token: &str) -> bool {
        let removed = self.sessions.write().await.remove(token).is_some();
        if removed {
            debug!("closed session");
        }
        removed
    }

    /// Number of live (unexpired) sessions.
    pub async fn active_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.values().filter(|s| !s.is_expired()).count()
    }
}
