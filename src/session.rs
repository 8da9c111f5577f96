use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Maps each live connection to the user that joined on it, if any.
#[derive(Clone, Default)]
pub struct SessionTracker {
    sessions: Arc<RwLock<HashMap<String, Option<String>>>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.to_string(), None);
    }

    /// Repeat joins on the same session overwrite the previous user.
    pub async fn associate(&self, session_id: &str, user_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.to_string(), Some(user_id.to_string()));
    }

    pub async fn resolve(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned().flatten()
    }

    pub async fn release(&self, session_id: &str) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id).flatten()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_associate_then_release() {
        let tracker = SessionTracker::new();
        tracker.register("s1").await;
        assert!(tracker.contains("s1").await);
        assert_eq!(tracker.resolve("s1").await, None);

        tracker.associate("s1", "42").await;
        tracker.associate("s1", "42").await;
        assert_eq!(tracker.resolve("s1").await.as_deref(), Some("42"));

        assert_eq!(tracker.release("s1").await.as_deref(), Some("42"));
        assert_eq!(tracker.resolve("s1").await, None);
        assert!(!tracker.contains("s1").await);
    }

    #[tokio::test]
    async fn unknown_sessions_resolve_to_none() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.resolve("ghost").await, None);
        assert_eq!(tracker.release("ghost").await, None);
        assert_eq!(tracker.len().await, 0);
    }
}
