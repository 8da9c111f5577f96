use std::collections::HashSet;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{required, RealtimeError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub user: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub user: String,
    pub content: String,
    pub category: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub timestamp: DateTime<Utc>,
    pub comments_list: Vec<Comment>,
}

impl Post {
    pub fn like(&mut self) -> u64 {
        self.likes += 1;
        self.likes
    }

    pub fn add_comment(&mut self, comment: Comment) {
        self.comments_list.push(comment);
        self.comments = self.comments_list.len() as u64;
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub user_name: String,
    pub joined_at: DateTime<Utc>,
    pub progress: f64,
    pub current_streak: u32,
    pub best_streak: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub difficulty: String,
    pub duration: u32,
    pub target: f64,
    pub unit: String,
    pub reward: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub participants: Vec<Participant>,
    #[serde(skip)]
    participant_ids: HashSet<String>,
}

impl Challenge {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant_ids.contains(user_id)
    }

    pub fn add_participant(&mut self, participant: Participant) -> Result<(), RealtimeError> {
        if !self.participant_ids.insert(participant.user_id.clone()) {
            return Err(RealtimeError::Conflict(format!(
                "user {} already joined challenge {}",
                participant.user_id, self.id
            )));
        }
        self.participants.push(participant);
        Ok(())
    }

    /// Expiry is reported but never enforced on joins or progress.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.end_date
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    #[serde(alias = "author")]
    pub user: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NewPost {
    pub fn into_post(self, now: DateTime<Utc>) -> Result<Post, RealtimeError> {
        let content = required(self.content.as_deref(), "content")?.to_string();
        let user = required(self.user.as_deref(), "user")?.to_string();
        let category = self
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "general".to_string());

        Ok(Post {
            id: Uuid::new_v4().to_string(),
            user,
            content,
            category,
            image: self.image.filter(|i| !i.is_empty()),
            tags: self.tags.unwrap_or_default(),
            likes: 0,
            comments: 0,
            shares: 0,
            timestamp: now,
            comments_list: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    #[serde(alias = "author")]
    pub user: Option<String>,
    pub content: Option<String>,
}

impl NewComment {
    pub fn into_comment(self, now: DateTime<Utc>) -> Result<Comment, RealtimeError> {
        let content = required(self.content.as_deref(), "content")?.to_string();
        let user = required(self.user.as_deref(), "user")?.to_string();
        Ok(Comment {
            id: Uuid::new_v4().to_string(),
            user,
            content,
            timestamp: now,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChallenge {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub difficulty: Option<String>,
    pub duration: Option<u32>,
    pub target: Option<f64>,
    pub unit: Option<String>,
    pub reward: Option<String>,
}

impl NewChallenge {
    pub fn into_challenge(self, now: DateTime<Utc>) -> Result<Challenge, RealtimeError> {
        let name = required(self.name.as_deref(), "name")?.to_string();
        let description = required(self.description.as_deref(), "description")?.to_string();
        let kind = required(self.kind.as_deref(), "type")?.to_string();
        let difficulty = required(self.difficulty.as_deref(), "difficulty")?.to_string();
        let unit = required(self.unit.as_deref(), "unit")?.to_string();
        let reward = required(self.reward.as_deref(), "reward")?.to_string();

        let duration = match self.duration {
            Some(days) if days >= 1 => days,
            _ => return Err(RealtimeError::validation("duration must be at least one day")),
        };
        let end_date = Duration::try_days(i64::from(duration))
            .and_then(|days| now.checked_add_signed(days))
            .ok_or_else(|| RealtimeError::validation("duration is too long"))?;
        let target = match self.target {
            Some(t) if t.is_finite() && t > 0.0 => t,
            _ => return Err(RealtimeError::validation("target must be a positive number")),
        };

        Ok(Challenge {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            kind,
            difficulty,
            duration,
            target,
            unit,
            reward,
            start_date: now,
            end_date,
            participants: Vec::new(),
            participant_ids: HashSet::new(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinChallenge {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

impl JoinChallenge {
    pub fn into_participant(self, now: DateTime<Utc>) -> Result<Participant, RealtimeError> {
        let user_id = required(self.user_id.as_deref(), "userId")?.to_string();
        let user_name = self
            .user_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| user_id.clone());
        Ok(Participant {
            user_id,
            user_name,
            joined_at: now,
            progress: 0.0,
            current_streak: 0,
            best_streak: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_challenge(duration: u32) -> NewChallenge {
        NewChallenge {
            name: Some("Plank month".into()),
            description: Some("Hold a plank every day".into()),
            kind: Some("strength".into()),
            difficulty: Some("medium".into()),
            duration: Some(duration),
            target: Some(30.0),
            unit: Some("minutes".into()),
            reward: Some("badge".into()),
        }
    }

    #[test]
    fn new_post_defaults() {
        let now = Utc::now();
        let post = NewPost {
            user: Some("A".into()),
            content: Some("hi".into()),
            ..Default::default()
        }
        .into_post(now)
        .unwrap();
        assert_eq!(post.category, "general");
        assert_eq!((post.likes, post.comments, post.shares), (0, 0, 0));
        assert!(post.comments_list.is_empty());
        assert_eq!(post.timestamp, now);
    }

    #[test]
    fn new_post_requires_author_and_content() {
        let missing_user = NewPost {
            content: Some("hi".into()),
            ..Default::default()
        };
        assert!(matches!(missing_user.into_post(Utc::now()), Err(RealtimeError::Validation(_))));
    }

    #[test]
    fn author_alias_is_accepted() {
        let input: NewPost = serde_json::from_str(r#"{"author":"A","content":"hi"}"#).unwrap();
        assert_eq!(input.user.as_deref(), Some("A"));
    }

    #[test]
    fn comment_count_tracks_list() {
        let now = Utc::now();
        let mut post = NewPost {
            user: Some("A".into()),
            content: Some("hi".into()),
            ..Default::default()
        }
        .into_post(now)
        .unwrap();
        for i in 0..3 {
            let comment = NewComment {
                user: Some(format!("u{i}")),
                content: Some("nice".into()),
            }
            .into_comment(now)
            .unwrap();
            post.add_comment(comment);
            assert_eq!(post.comments, post.comments_list.len() as u64);
        }
    }

    #[test]
    fn end_date_is_exact_day_offset() {
        let now = Utc::now();
        let challenge = sample_challenge(7).into_challenge(now).unwrap();
        assert_eq!(challenge.end_date - challenge.start_date, Duration::seconds(7 * 86_400));
        assert!(challenge.is_active(now));
        assert!(!challenge.is_active(now + Duration::days(8)));
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert!(sample_challenge(0).into_challenge(Utc::now()).is_err());
    }

    #[test]
    fn duration_past_the_calendar_is_rejected() {
        let result = sample_challenge(4_000_000_000).into_challenge(Utc::now());
        assert_eq!(result.unwrap_err(), RealtimeError::validation("duration is too long"));
        assert!(sample_challenge(u32::MAX).into_challenge(Utc::now()).is_err());
    }

    #[test]
    fn duplicate_participant_conflicts() {
        let now = Utc::now();
        let mut challenge = sample_challenge(3).into_challenge(now).unwrap();
        let join = JoinChallenge {
            user_id: Some("u1".into()),
            user_name: None,
        };
        challenge.add_participant(join.clone().into_participant(now).unwrap()).unwrap();
        assert_eq!(challenge.participants[0].user_name, "u1");
        assert_eq!(challenge.participants[0].progress, 0.0);

        let second = challenge.add_participant(join.into_participant(now).unwrap());
        assert!(matches!(second, Err(RealtimeError::Conflict(_))));
        assert_eq!(challenge.participants.len(), 1);
        assert!(challenge.has_participant("u1"));
    }
}
