use thiserror::Error;
use warp::http::StatusCode;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RealtimeError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{0}")]
    Conflict(String),
    #[error("failed to deliver to session {session_id}")]
    Transport { session_id: String },
}

impl RealtimeError {
    pub fn validation(message: impl Into<String>) -> Self {
        RealtimeError::Validation(message.into())
    }

    pub fn post_not_found(id: &str) -> Self {
        RealtimeError::NotFound {
            entity: "post",
            id: id.to_string(),
        }
    }

    pub fn challenge_not_found(id: &str) -> Self {
        RealtimeError::NotFound {
            entity: "challenge",
            id: id.to_string(),
        }
    }

    /// Stable tag sent to clients in `error` events and REST error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            RealtimeError::Validation(_) => "validation_error",
            RealtimeError::NotFound { .. } => "not_found",
            RealtimeError::Conflict(_) => "conflict",
            RealtimeError::Transport { .. } => "transport_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RealtimeError::Validation(_) => StatusCode::BAD_REQUEST,
            RealtimeError::NotFound { .. } => StatusCode::NOT_FOUND,
            RealtimeError::Conflict(_) => StatusCode::CONFLICT,
            RealtimeError::Transport { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Returns the trimmed value when it is present and non-blank.
pub fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, RealtimeError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RealtimeError::validation(format!("{field} is required"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_blank_and_missing() {
        assert_eq!(required(Some("  hi "), "content"), Ok("hi"));
        assert_eq!(
            required(Some("   "), "content"),
            Err(RealtimeError::validation("content is required"))
        );
        assert!(required(None, "user").is_err());
    }

    #[test]
    fn status_codes_follow_kind() {
        assert_eq!(RealtimeError::post_not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(RealtimeError::Conflict("dup".into()).kind(), "conflict");
        assert_eq!(
            RealtimeError::challenge_not_found("c1").to_string(),
            "challenge c1 not found"
        );
    }
}
