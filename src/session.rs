// src/session.rs

//! Page sessions: one scheduling workflow, and therefore one appointment
//! snapshot, per bearer token. A session's mutex orders that caller's writes;
//! different callers never share a snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::backend::BackendConnector;
use crate::middleware::auth_context::AuthContext;
use crate::workflow::{Paging, SchedulingWorkflow};

pub type SharedWorkflow = Arc<Mutex<SchedulingWorkflow>>;

struct SessionEntry {
    workflow: SharedWorkflow,
    last_used: Instant,
}

pub struct SessionRegistry {
    idle_ttl: Duration,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            idle_ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The caller's workflow, created on first use. Sessions idle longer than
    /// the TTL are dropped on the way.
    pub async fn workflow_for(
        &self,
        auth: &AuthContext,
        connector: &dyn BackendConnector,
        paging: Paging,
    ) -> SharedWorkflow {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        let before = sessions.len();
        sessions.retain(|_, s| now.duration_since(s.last_used) < self.idle_ttl);
        if sessions.len() < before {
            tracing::debug!(expired = before - sessions.len(), "expired idle agenda sessions");
        }

        let entry = sessions
            .entry(auth.session_key.clone())
            .or_insert_with(|| {
                tracing::info!("opening agenda session");
                SessionEntry {
                    workflow: Arc::new(Mutex::new(SchedulingWorkflow::new(
                        connector.connect(auth),
                        paging,
                    ))),
                    last_used: now,
                }
            });
        entry.last_used = now;
        entry.workflow.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AgendaBackend;
    use crate::backend::testing::MemoryBackend;

    struct Fixed(Arc<MemoryBackend>);

    impl BackendConnector for Fixed {
        fn connect(&self, _auth: &AuthContext) -> Arc<dyn AgendaBackend> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn same_token_same_session() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let connector = Fixed(Arc::new(MemoryBackend::default()));
        let a = AuthContext::from_token("token-a");
        let b = AuthContext::from_token("token-b");

        let first = registry.workflow_for(&a, &connector, Paging::default()).await;
        let again = registry.workflow_for(&a, &connector, Paging::default()).await;
        let other = registry.workflow_for(&b, &connector, Paging::default()).await;

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.sessions.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let registry = SessionRegistry::new(Duration::ZERO);
        let connector = Fixed(Arc::new(MemoryBackend::default()));
        let a = AuthContext::from_token("token-a");

        let first = registry.workflow_for(&a, &connector, Paging::default()).await;
        let second = registry.workflow_for(&a, &connector, Paging::default()).await;
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(registry.sessions.lock().await.len(), 1);
    }
}
