use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::RealtimeError;
use crate::models::{Challenge, Comment, Participant, Post};

/// Authoritative posts and challenges. Each method is one atomic mutation;
/// broadcasts are built from what it returns.
#[async_trait]
pub trait CommunityStore: Send + Sync {
    async fn create_post(&self, post: Post) -> Post;

    /// Returns the post after its like counter was incremented by one.
    async fn like_post(&self, post_id: &str) -> Result<Post, RealtimeError>;

    async fn add_comment(&self, post_id: &str, comment: Comment) -> Result<Post, RealtimeError>;

    async fn create_challenge(&self, challenge: Challenge) -> Challenge;

    async fn join_challenge(
        &self,
        challenge_id: &str,
        participant: Participant,
    ) -> Result<Challenge, RealtimeError>;

    /// Newest first.
    async fn posts(&self) -> Vec<Post>;

    async fn post(&self, post_id: &str) -> Option<Post>;

    async fn challenges(&self) -> Vec<Challenge>;

    async fn challenge(&self, challenge_id: &str) -> Option<Challenge>;
}

struct Collection<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Collection<T> {
    fn insert(&mut self, id: String, item: T) {
        self.index.insert(id, self.items.len());
        self.items.push(item);
    }

    fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.index.get(id).map(|&i| &mut self.items[i])
    }
}

/// Process-local store with no persistence.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    posts: Arc<RwLock<Collection<Post>>>,
    challenges: Arc<RwLock<Collection<Challenge>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommunityStore for InMemoryStore {
    async fn create_post(&self, post: Post) -> Post {
        let mut posts = self.posts.write().await;
        posts.insert(post.id.clone(), post.clone());
        post
    }

    async fn like_post(&self, post_id: &str) -> Result<Post, RealtimeError> {
        let mut posts = self.posts.write().await;
        let post = posts
            .get_mut(post_id)
            .ok_or_else(|| RealtimeError::post_not_found(post_id))?;
        post.like();
        Ok(post.clone())
    }

    async fn add_comment(&self, post_id: &str, comment: Comment) -> Result<Post, RealtimeError> {
        let mut posts = self.posts.write().await;
        let post = posts
            .get_mut(post_id)
            .ok_or_else(|| RealtimeError::post_not_found(post_id))?;
        post.add_comment(comment);
        Ok(post.clone())
    }

    async fn create_challenge(&self, challenge: Challenge) -> Challenge {
        let mut challenges = self.challenges.write().await;
        challenges.insert(challenge.id.clone(), challenge.clone());
        challenge
    }

    async fn join_challenge(
        &self,
        challenge_id: &str,
        participant: Participant,
    ) -> Result<Challenge, RealtimeError> {
        let mut challenges = self.challenges.write().await;
        let challenge = challenges
            .get_mut(challenge_id)
            .ok_or_else(|| RealtimeError::challenge_not_found(challenge_id))?;
        challenge.add_participant(participant)?;
        Ok(challenge.clone())
    }

    async fn posts(&self) -> Vec<Post> {
        let posts = self.posts.read().await;
        let mut list = posts.items.clone();
        // Insertion order breaks timestamp ties.
        list.reverse();
        list.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        list
    }

    async fn post(&self, post_id: &str) -> Option<Post> {
        self.posts.read().await.get(post_id).cloned()
    }

    async fn challenges(&self) -> Vec<Challenge> {
        self.challenges.read().await.items.clone()
    }

    async fn challenge(&self, challenge_id: &str) -> Option<Challenge> {
        self.challenges.read().await.get(challenge_id).cloned()
    }
}
