use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use crate::db::repository::{CommentRepository, UserRepository};
use crate::models::{Comment, Page, TargetKind};
use crate::models::comment::{CommentResponse, CreateCommentRequest};
use crate::services::{require_profile, validate_text, TargetLookup};
use crate::{AppError, Result};

const CONTENT_MAX: usize = 2000;

/// Flat comment threads on projects, articles and posts, oldest first
pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    user_repo: Arc<dyn UserRepository>,
    targets: TargetLookup,
}

impl CommentService {
    pub fn new(
        comment_repo: Arc<dyn CommentRepository>,
        user_repo: Arc<dyn UserRepository>,
        targets: TargetLookup,
    ) -> Self {
        Self { comment_repo, user_repo, targets }
    }

    pub async fn create_comment(
        &self,
        author_id: Uuid,
        target_kind: TargetKind,
        target_id: Uuid,
        request: CreateCommentRequest,
    ) -> Result<CommentResponse> {
        let content = validate_text("content", &request.content, 1, CONTENT_MAX)?;
        require_profile(self.user_repo.as_ref(), author_id).await?;
        self.targets.ensure_exists(target_kind, target_id).await?;

        let comment = Comment {
            id: Uuid::new_v4(),
            target_kind,
            target_id,
            author_id,
            author_username: None,
            content,
            created_at: Utc::now(),
        };

        let created = self.comment_repo.create_comment(&comment).await?;
        tracing::debug!("💬 COMMENTS: {} commented on {} {}", author_id, target_kind, target_id);
        Ok(created.into())
    }

    pub async fn list_comments(&self, target_kind: TargetKind, target_id: Uuid, page: Page) -> Result<Vec<CommentResponse>> {
        self.targets.ensure_exists(target_kind, target_id).await?;
        let comments = self.comment_repo.list_comments(target_kind, target_id, page).await?;
        Ok(comments.into_iter().map(CommentResponse::from).collect())
    }

    pub async fn delete_comment(&self, caller: Uuid, comment_id: Uuid) -> Result<()> {
        let comment = self
            .comment_repo
            .get_comment_by_id(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        if comment.author_id != caller {
            return Err(AppError::Forbidden("Only the author can delete this comment".to_string()));
        }

        self.comment_repo.delete_comment(comment_id).await
    }
}
