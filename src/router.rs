use std::sync::Arc;
use chrono::Utc;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::{required, RealtimeError};
use crate::messages::{
    ChallengeProgress, ChatMessage, ClientMessage, OutgoingChat, PostInteraction, ServerMessage, UserRef,
};
use crate::models::{Challenge, JoinChallenge, NewChallenge, NewComment, NewPost, Post};
use crate::room::{user_room, Outbox, RoomRegistry};
use crate::session::SessionTracker;
use crate::store::CommunityStore;

/// Validates inbound events, commits them to the store, then fans them out.
///
/// Every operation either fails before touching the store or broadcasts
/// the committed result; a rejected event never reaches any session.
#[derive(Clone)]
pub struct EventRouter {
    store: Arc<dyn CommunityStore>,
    rooms: RoomRegistry,
    sessions: SessionTracker,
}

impl EventRouter {
    pub fn new(store: Arc<dyn CommunityStore>) -> Self {
        EventRouter {
            store,
            rooms: RoomRegistry::new(),
            sessions: SessionTracker::new(),
        }
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    pub async fn connect(&self, session_id: &str, outbox: Outbox) {
        self.sessions.register(session_id).await;
        self.rooms.connect(session_id, outbox).await;
        let hello = ServerMessage::Connected {
            socket_id: session_id.to_string(),
        };
        if let Err(e) = self.rooms.send_to(session_id, &hello).await {
            warn!("{e}");
        }
        info!("Session {session_id} connected");
    }

    pub async fn disconnect(&self, session_id: &str) {
        let user = self.sessions.release(session_id).await;
        let left = self.rooms.leave(session_id).await;
        match user {
            Some(user_id) => info!(
                "Session {session_id} (user {user_id}) disconnected, left {} room(s)",
                left.len()
            ),
            None => info!("Session {session_id} disconnected before joining"),
        }
    }

    /// Parses and dispatches one text frame. Rejections are reported back to
    /// the sending session as an `error` event.
    pub async fn handle_frame(&self, session_id: &str, text: &str) -> Result<(), RealtimeError> {
        let result = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle(session_id, message).await,
            Err(e) => Err(RealtimeError::validation(format!("malformed event: {e}"))),
        };

        if let Err(ref err) = result {
            warn!("Rejected event from {session_id}: {err}");
            let reply = ServerMessage::Error {
                kind: err.kind().to_string(),
                message: err.to_string(),
            };
            if let Err(e) = self.rooms.send_to(session_id, &reply).await {
                warn!("{e}");
            }
        }
        result
    }

    pub async fn handle(&self, session_id: &str, message: ClientMessage) -> Result<(), RealtimeError> {
        match message {
            ClientMessage::Join(user) => self.join(session_id, &user).await,
            ClientMessage::SendMessage(chat) => self.send_message(chat).await.map(drop),
            ClientMessage::PostInteraction(interaction) => self.relay_post_interaction(interaction).await,
            ClientMessage::ChallengeUpdate(progress) => self.relay_challenge_update(progress).await,
            ClientMessage::CreatePost(new_post) => self.create_post(new_post).await.map(drop),
            ClientMessage::LikePost { post_id } => {
                let post_id = required(post_id.as_deref(), "postId")?;
                self.like_post(post_id).await.map(drop)
            }
            ClientMessage::AddComment(request) => {
                let (post_id, comment) = request.into_parts();
                let post_id = required(post_id.as_deref(), "postId")?;
                self.add_comment(post_id, comment).await.map(drop)
            }
            ClientMessage::CreateChallenge(new_challenge) => self.create_challenge(new_challenge).await.map(drop),
            ClientMessage::JoinChallenge(request) => {
                let (challenge_id, join) = request.into_parts();
                let challenge_id = required(challenge_id.as_deref(), "challengeId")?;
                self.join_challenge(challenge_id, join).await.map(drop)
            }
        }
    }

    /// Silent: associates the session with the user and its `user_<id>` room.
    pub async fn join(&self, session_id: &str, user: &UserRef) -> Result<(), RealtimeError> {
        let user_id = user
            .user_id()
            .ok_or_else(|| RealtimeError::validation("user id is required"))?;
        self.sessions.associate(session_id, &user_id).await;
        let room = user_room(&user_id);
        self.rooms.join(&room, session_id).await;
        info!("Session {session_id} joined {room}");
        Ok(())
    }

    pub async fn send_message(&self, chat: OutgoingChat) -> Result<ChatMessage, RealtimeError> {
        let room_id = required(chat.room_id.as_deref(), "roomId")?;
        let message = required(chat.message.as_deref(), "message")?;
        let sender = required(chat.sender.as_deref(), "sender")?;

        let relayed = ChatMessage {
            id: Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            message: message.to_string(),
            sender: sender.to_string(),
            timestamp: Utc::now(),
        };
        let delivered = self
            .rooms
            .broadcast(room_id, &ServerMessage::ReceiveMessage(relayed.clone()))
            .await;
        debug!("Message {} delivered to {delivered} session(s) in {room_id}", relayed.id);
        Ok(relayed)
    }

    pub async fn relay_post_interaction(&self, interaction: PostInteraction) -> Result<(), RealtimeError> {
        required(interaction.post_id.as_deref(), "postId")?;
        required(interaction.kind.as_deref(), "type")?;
        self.rooms.broadcast_all(&ServerMessage::PostUpdated(interaction)).await;
        Ok(())
    }

    pub async fn relay_challenge_update(&self, progress: ChallengeProgress) -> Result<(), RealtimeError> {
        required(progress.challenge_id.as_deref(), "challengeId")?;
        required(progress.user_id.as_deref(), "userId")?;
        self.rooms.broadcast_all(&ServerMessage::ChallengeUpdated(progress)).await;
        Ok(())
    }

    pub async fn create_post(&self, new_post: NewPost) -> Result<Post, RealtimeError> {
        let post = self.store.create_post(new_post.into_post(Utc::now())?).await;
        info!("Post {} created by {}", post.id, post.user);
        self.rooms.broadcast_all(&ServerMessage::NewPost(post.clone())).await;
        Ok(post)
    }

    pub async fn like_post(&self, post_id: &str) -> Result<Post, RealtimeError> {
        let post = self.store.like_post(post_id).await?;
        self.rooms
            .broadcast_all(&ServerMessage::PostLiked {
                post_id: post.id.clone(),
                likes: post.likes,
            })
            .await;
        Ok(post)
    }

    pub async fn add_comment(&self, post_id: &str, comment: NewComment) -> Result<Post, RealtimeError> {
        let comment = comment.into_comment(Utc::now())?;
        let post = self.store.add_comment(post_id, comment.clone()).await?;
        self.rooms
            .broadcast_all(&ServerMessage::NewComment {
                post_id: post.id.clone(),
                comment,
            })
            .await;
        Ok(post)
    }

    pub async fn create_challenge(&self, new_challenge: NewChallenge) -> Result<Challenge, RealtimeError> {
        let challenge = self
            .store
            .create_challenge(new_challenge.into_challenge(Utc::now())?)
            .await;
        info!("Challenge {} created, ends {}", challenge.id, challenge.end_date);
        self.rooms
            .broadcast_all(&ServerMessage::NewChallenge(challenge.clone()))
            .await;
        Ok(challenge)
    }

    pub async fn join_challenge(&self, challenge_id: &str, join: JoinChallenge) -> Result<Challenge, RealtimeError> {
        let participant = join.into_participant(Utc::now())?;
        let challenge = self.store.join_challenge(challenge_id, participant.clone()).await?;
        info!("User {} joined challenge {challenge_id}", participant.user_id);
        self.rooms
            .broadcast_all(&ServerMessage::ChallengeJoined {
                challenge_id: challenge.id.clone(),
                participant,
            })
            .await;
        Ok(challenge)
    }

    pub async fn posts(&self) -> Vec<Post> {
        self.store.posts().await
    }

    pub async fn challenges(&self) -> Vec<Challenge> {
        self.store.challenges().await
    }
}
