use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::engagement::TargetKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub target_kind: TargetKind,
    pub target_id: Uuid,
    pub author_id: Uuid,
    pub author_username: Option<String>, // Denormalized for performance
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub target_kind: TargetKind,
    pub target_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            target_kind: comment.target_kind,
            target_id: comment.target_id,
            author_id: comment.author_id,
            author_username: comment.author_username.unwrap_or_default(),
            content: comment.content,
            created_at: comment.created_at,
        }
    }
}
