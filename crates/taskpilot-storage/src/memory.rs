//! In-process session store. Contents are lost on restart.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use taskpilot_core::error::{Result, TaskpilotError};
use taskpilot_core::types::SessionState;

use crate::store::SessionStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions written so far.
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> TaskpilotError {
    TaskpilotError::Storage(format!("Session map lock poisoned: {}", e))
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionState>> {
        let sessions = self.sessions.lock().map_err(poisoned)?;
        Ok(sessions.get(session_id).cloned())
    }

    async fn put(&self, session_id: &str, state: &SessionState) -> Result<()> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        sessions.insert(session_id.to_string(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpilot_core::types::{Priority, Role, Task, Timestamp};

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("nobody").await.unwrap().is_none());
        assert_eq!(store.load("nobody").await.unwrap(), SessionState::default());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryStore::new();
        let mut state = SessionState::new();
        state.tasks.push(Task::new("a", None, Priority::High, Timestamp(1)));
        state.push_turn(Role::User, "add task: a");

        store.put("s1", &state).await.unwrap();
        assert_eq!(store.get("s1").await.unwrap(), Some(state));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = MemoryStore::new();
        let mut state = SessionState::new();
        state.push_turn(Role::User, "hi");
        store.put("alice", &state).await.unwrap();

        assert!(store.get("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let store = MemoryStore::new();
        let mut state = SessionState::new();
        state.push_turn(Role::User, "one");
        store.put("s", &state).await.unwrap();
        store.put("s", &SessionState::new()).await.unwrap();
        assert_eq!(store.load("s").await.unwrap(), SessionState::new());
    }
}
