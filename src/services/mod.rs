pub mod user_service;
pub mod project_service;
pub mod article_service;
pub mod post_service;
pub mod comment_service;
pub mod engagement_service;
pub mod search_service;

pub use user_service::UserService;
pub use project_service::ProjectService;
pub use article_service::ArticleService;
pub use post_service::PostService;
pub use comment_service::CommentService;
pub use engagement_service::EngagementService;
pub use search_service::SearchService;

use std::sync::Arc;
use uuid::Uuid;
use crate::db::repository::{ArticleRepository, PostRepository, ProjectRepository, UserRepository};
use crate::models::{TargetKind, User};
use crate::{AppError, Result};

/// Trims `value` and checks its length in characters against `min..=max`.
pub(crate) fn validate_text(field: &str, value: &str, min: usize, max: usize) -> Result<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min {
        return Err(if min <= 1 {
            AppError::ValidationError(format!("{} must not be empty", field))
        } else {
            AppError::ValidationError(format!("{} must be at least {} characters", field, min))
        });
    }
    if len > max {
        return Err(AppError::ValidationError(format!("{} must be at most {} characters", field, max)));
    }
    Ok(trimmed.to_string())
}

/// Blank optional strings are stored as absent.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Acting users need a profile before they can create or engage with content.
pub(crate) async fn require_profile(users: &dyn UserRepository, user_id: Uuid) -> Result<User> {
    users
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Create a profile before performing this action".to_string()))
}

/// Resolves likeable and commentable targets across the content repositories.
#[derive(Clone)]
pub struct TargetLookup {
    pub projects: Arc<dyn ProjectRepository>,
    pub articles: Arc<dyn ArticleRepository>,
    pub posts: Arc<dyn PostRepository>,
}

impl TargetLookup {
    pub async fn ensure_exists(&self, kind: TargetKind, target_id: Uuid) -> Result<()> {
        let exists = match kind {
            TargetKind::Project => self.projects.get_project_by_id(target_id).await?.is_some(),
            TargetKind::Article => self.articles.get_article_by_id(target_id).await?.is_some(),
            TargetKind::Post => self.posts.get_post_by_id(target_id).await?.is_some(),
        };

        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("{} not found", kind)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text_trims_and_counts_chars() {
        assert_eq!(validate_text("title", "  hello ", 1, 5).unwrap(), "hello");
        assert!(matches!(validate_text("title", "   ", 1, 5), Err(AppError::ValidationError(_))));
        assert!(validate_text("title", "héllo", 1, 5).is_ok());
        assert!(validate_text("title", "héllo!", 1, 5).is_err());
        assert!(validate_text("username", "ab", 3, 30).is_err());
    }

    #[test]
    fn test_optional_text_drops_blank() {
        assert_eq!(optional_text(Some("  ".to_string())), None);
        assert_eq!(optional_text(Some(" x ".to_string())), Some("x".to_string()));
        assert_eq!(optional_text(None), None);
    }
}
