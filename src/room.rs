use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use log::{error, warn};
use tokio::sync::mpsc;
use tokio::sync::RwLock;

use crate::error::RealtimeError;
use crate::messages::ServerMessage;

/// Outbound half of a session: serialized frames queued for its write pump.
pub type Outbox = mpsc::UnboundedSender<String>;

pub fn user_room(user_id: &str) -> String {
    format!("user_{user_id}")
}

#[derive(Default)]
struct Registry {
    connections: HashMap<String, Outbox>,
    rooms: HashMap<String, HashSet<String>>,
    // Reverse index so leaving only touches the rooms the session is in.
    memberships: HashMap<String, HashSet<String>>,
}

/// Room membership and the sender table used for fan-out.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self, session_id: &str, outbox: Outbox) {
        let mut inner = self.inner.write().await;
        inner.connections.insert(session_id.to_string(), outbox);
    }

    /// Adding a session that is already a member is a no-op.
    pub async fn join(&self, room_id: &str, session_id: &str) {
        let mut inner = self.inner.write().await;
        inner
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(session_id.to_string());
        inner
            .memberships
            .entry(session_id.to_string())
            .or_default()
            .insert(room_id.to_string());
    }

    /// Drops the session from every room it joined and from the sender table.
    /// Returns the rooms it was removed from.
    pub async fn leave(&self, session_id: &str) -> Vec<String> {
        let mut inner = self.inner.write().await;
        inner.connections.remove(session_id);

        let Some(rooms) = inner.memberships.remove(session_id) else {
            return Vec::new();
        };
        for room_id in &rooms {
            if let Some(members) = inner.rooms.get_mut(room_id) {
                members.remove(session_id);
                if members.is_empty() {
                    inner.rooms.remove(room_id);
                }
            }
        }
        rooms.into_iter().collect()
    }

    pub async fn members(&self, room_id: &str) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(room_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn rooms_of(&self, session_id: &str) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .memberships
            .get(session_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Delivers to every member of the room. Returns how many sessions accepted the frame.
    pub async fn broadcast(&self, room_id: &str, message: &ServerMessage) -> usize {
        let Some(frame) = encode(message) else {
            return 0;
        };
        let targets: Vec<(String, Outbox)> = {
            let inner = self.inner.read().await;
            match inner.rooms.get(room_id) {
                Some(members) => members
                    .iter()
                    .filter_map(|id| inner.connections.get(id).map(|tx| (id.clone(), tx.clone())))
                    .collect(),
                None => Vec::new(),
            }
        };
        deliver(&targets, &frame)
    }

    /// Delivers to the connection snapshot taken at emission time, regardless of rooms.
    pub async fn broadcast_all(&self, message: &ServerMessage) -> usize {
        let Some(frame) = encode(message) else {
            return 0;
        };
        let targets: Vec<(String, Outbox)> = {
            let inner = self.inner.read().await;
            inner
                .connections
                .iter()
                .map(|(id, tx)| (id.clone(), tx.clone()))
                .collect()
        };
        deliver(&targets, &frame)
    }

    pub async fn send_to(&self, session_id: &str, message: &ServerMessage) -> Result<(), RealtimeError> {
        let frame = encode(message).ok_or_else(|| RealtimeError::Transport {
            session_id: session_id.to_string(),
        })?;
        let inner = self.inner.read().await;
        inner
            .connections
            .get(session_id)
            .and_then(|tx| tx.send(frame).ok())
            .ok_or_else(|| RealtimeError::Transport {
                session_id: session_id.to_string(),
            })
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!("Failed to serialize {} event: {}", message.name(), e);
            None
        }
    }
}

fn deliver(targets: &[(String, Outbox)], frame: &str) -> usize {
    let mut delivered = 0;
    for (session_id, tx) in targets {
        if tx.send(frame.to_string()).is_ok() {
            delivered += 1;
        } else {
            let err = RealtimeError::Transport {
                session_id: session_id.clone(),
            };
            warn!("{err}, skipping");
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ChallengeProgress;

    fn progress() -> ServerMessage {
        ServerMessage::ChallengeUpdated(ChallengeProgress {
            challenge_id: Some("c1".into()),
            user_id: Some("u1".into()),
            progress: Some(3.0),
        })
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let registry = RoomRegistry::new();
        registry.join("user_1", "s1").await;
        registry.join("user_1", "s1").await;
        assert_eq!(registry.members("user_1").await, vec!["s1".to_string()]);
        assert_eq!(registry.rooms_of("s1").await, vec!["user_1".to_string()]);
    }

    #[tokio::test]
    async fn leave_removes_session_from_every_room() {
        let registry = RoomRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.connect("s1", tx).await;
        registry.join("a", "s1").await;
        registry.join("b", "s1").await;
        registry.join("b", "s2").await;

        let mut left = registry.leave("s1").await;
        left.sort();
        assert_eq!(left, vec!["a".to_string(), "b".to_string()]);
        assert!(registry.members("a").await.is_empty());
        assert_eq!(registry.members("b").await, vec!["s2".to_string()]);
        assert!(registry.rooms_of("s1").await.is_empty());
        assert_eq!(registry.connection_count().await, 0);
        assert!(registry.leave("s1").await.is_empty());
    }

    #[tokio::test]
    async fn broadcast_to_empty_room_is_noop() {
        let registry = RoomRegistry::new();
        assert_eq!(registry.broadcast("nobody_here", &progress()).await, 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_members_only() {
        let registry = RoomRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.connect("s1", tx1).await;
        registry.connect("s2", tx2).await;
        registry.join("user_7", "s1").await;

        assert_eq!(registry.broadcast("user_7", &progress()).await, 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());

        assert_eq!(registry.broadcast_all(&progress()).await, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn dead_recipient_does_not_block_others() {
        let registry = RoomRegistry::new();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        drop(dead_rx);
        registry.connect("dead", dead_tx).await;
        registry.connect("live", live_tx).await;
        registry.join("r", "dead").await;
        registry.join("r", "live").await;

        assert_eq!(registry.broadcast("r", &progress()).await, 1);
        assert!(live_rx.try_recv().is_ok());
        assert!(registry.send_to("dead", &progress()).await.is_err());
    }
}
