use async_trait::async_trait;
use taskpilot_core::error::Result;
use taskpilot_core::types::SessionState;

/// Durable per-session key-value storage.
///
/// One opaque [`SessionState`] per session id. No transactions or
/// versioning: `put` replaces whatever was stored.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the stored state, or `None` for a session never written.
    async fn get(&self, session_id: &str) -> Result<Option<SessionState>>;

    /// Replace the stored state.
    async fn put(&self, session_id: &str, state: &SessionState) -> Result<()>;

    /// Fetch the stored state, defaulting to an empty session.
    async fn load(&self, session_id: &str) -> Result<SessionState> {
        Ok(self.get(session_id).await?.unwrap_or_default())
    }
}
