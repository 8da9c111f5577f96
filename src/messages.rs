use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Challenge, Comment, JoinChallenge, NewChallenge, NewComment, NewPost, Participant, Post};

/// A user id sent either as a JSON string or a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScalarId {
    Text(String),
    Number(i64),
}

impl ScalarId {
    fn normalized(&self) -> Option<String> {
        match self {
            ScalarId::Text(id) => Some(id.trim().to_string()).filter(|id| !id.is_empty()),
            ScalarId::Number(id) => Some(id.to_string()),
        }
    }
}

/// User identifier carried by `join`: a bare id or `{ "userId": <id> }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Bare(ScalarId),
    Object {
        #[serde(rename = "userId")]
        user_id: Option<ScalarId>,
    },
}

impl UserRef {
    pub fn user_id(&self) -> Option<String> {
        match self {
            UserRef::Bare(id) => id.normalized(),
            UserRef::Object { user_id } => user_id.as_ref().and_then(ScalarId::normalized),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingChat {
    pub room_id: Option<String>,
    pub message: Option<String>,
    pub sender: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub room_id: String,
    pub message: String,
    pub sender: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostInteraction {
    pub post_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeProgress {
    pub challenge_id: Option<String>,
    pub user_id: Option<String>,
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub post_id: Option<String>,
    #[serde(alias = "author")]
    pub user: Option<String>,
    pub content: Option<String>,
}

impl CommentRequest {
    pub fn into_parts(self) -> (Option<String>, NewComment) {
        (
            self.post_id,
            NewComment {
                user: self.user,
                content: self.content,
            },
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinChallengeRequest {
    pub challenge_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

impl JoinChallengeRequest {
    pub fn into_parts(self) -> (Option<String>, JoinChallenge) {
        (
            self.challenge_id,
            JoinChallenge {
                user_id: self.user_id,
                user_name: self.user_name,
            },
        )
    }
}

/// Frames sent by clients: `{"event": "<name>", "data": <payload>}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Join(UserRef),
    SendMessage(OutgoingChat),
    PostInteraction(PostInteraction),
    ChallengeUpdate(ChallengeProgress),
    CreatePost(NewPost),
    #[serde(rename_all = "camelCase")]
    LikePost {
        post_id: Option<String>,
    },
    AddComment(CommentRequest),
    CreateChallenge(NewChallenge),
    JoinChallenge(JoinChallengeRequest),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Connected {
        socket_id: String,
    },
    ReceiveMessage(ChatMessage),
    PostUpdated(PostInteraction),
    ChallengeUpdated(ChallengeProgress),
    NewPost(Post),
    #[serde(rename_all = "camelCase")]
    PostLiked {
        post_id: String,
        likes: u64,
    },
    #[serde(rename_all = "camelCase")]
    NewComment {
        post_id: String,
        comment: Comment,
    },
    NewChallenge(Challenge),
    #[serde(rename_all = "camelCase")]
    ChallengeJoined {
        challenge_id: String,
        participant: Participant,
    },
    Error {
        kind: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn name(&self) -> &'static str {
        match self {
            ServerMessage::Connected { .. } => "connected",
            ServerMessage::ReceiveMessage(_) => "receive_message",
            ServerMessage::PostUpdated(_) => "post_updated",
            ServerMessage::ChallengeUpdated(_) => "challenge_updated",
            ServerMessage::NewPost(_) => "new_post",
            ServerMessage::PostLiked { .. } => "post_liked",
            ServerMessage::NewComment { .. } => "new_comment",
            ServerMessage::NewChallenge(_) => "new_challenge",
            ServerMessage::ChallengeJoined { .. } => "challenge_joined",
            ServerMessage::Error { .. } => "error",
        }
    }
}
