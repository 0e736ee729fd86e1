use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use crate::db::repository::{EngagementRepository, UserRepository};
use crate::models::{EngagementState, Follow, Like, Page, TargetKind, Watch};
use crate::models::user::UserResponse;
use crate::services::{require_profile, TargetLookup};
use crate::{AppError, Result};

/// Likes, follows and project watches. Repeating an action is a no-op.
pub struct EngagementService {
    engagement_repo: Arc<dyn EngagementRepository>,
    user_repo: Arc<dyn UserRepository>,
    targets: TargetLookup,
}

impl EngagementService {
    pub fn new(
        engagement_repo: Arc<dyn EngagementRepository>,
        user_repo: Arc<dyn UserRepository>,
        targets: TargetLookup,
    ) -> Self {
        Self { engagement_repo, user_repo, targets }
    }

    pub async fn like(&self, user_id: Uuid, target_kind: TargetKind, target_id: Uuid) -> Result<EngagementState> {
        require_profile(self.user_repo.as_ref(), user_id).await?;
        self.targets.ensure_exists(target_kind, target_id).await?;

        let like = Like { user_id, target_kind, target_id, created_at: Utc::now() };
        if self.engagement_repo.add_like(&like).await? {
            tracing::debug!("👍 ENGAGEMENT: {} liked {} {}", user_id, target_kind, target_id);
        }

        let count = self.engagement_repo.count_likes(target_kind, target_id).await?;
        Ok(EngagementState { active: true, count })
    }

    pub async fn unlike(&self, user_id: Uuid, target_kind: TargetKind, target_id: Uuid) -> Result<EngagementState> {
        self.targets.ensure_exists(target_kind, target_id).await?;
        self.engagement_repo.remove_like(user_id, target_kind, target_id).await?;

        let count = self.engagement_repo.count_likes(target_kind, target_id).await?;
        Ok(EngagementState { active: false, count })
    }

    pub async fn follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<EngagementState> {
        if follower_id == followee_id {
            return Err(AppError::ValidationError("You cannot follow yourself".to_string()));
        }
        require_profile(self.user_repo.as_ref(), follower_id).await?;
        self.ensure_user(followee_id).await?;

        let follow = Follow { follower_id, followee_id, created_at: Utc::now() };
        if self.engagement_repo.add_follow(&follow).await? {
            tracing::debug!("➕ ENGAGEMENT: {} followed {}", follower_id, followee_id);
        }

        let count = self.engagement_repo.count_followers(followee_id).await?;
        Ok(EngagementState { active: true, count })
    }

    pub async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<EngagementState> {
        self.ensure_user(followee_id).await?;
        self.engagement_repo.remove_follow(follower_id, followee_id).await?;

        let count = self.engagement_repo.count_followers(followee_id).await?;
        Ok(EngagementState { active: false, count })
    }

    pub async fn list_followers(&self, user_id: Uuid, page: Page) -> Result<Vec<UserResponse>> {
        self.ensure_user(user_id).await?;
        let users = self.engagement_repo.list_followers(user_id, page).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn list_following(&self, user_id: Uuid, page: Page) -> Result<Vec<UserResponse>> {
        self.ensure_user(user_id).await?;
        let users = self.engagement_repo.list_following(user_id, page).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn watch(&self, user_id: Uuid, project_id: Uuid) -> Result<EngagementState> {
        require_profile(self.user_repo.as_ref(), user_id).await?;
        self.targets.ensure_exists(TargetKind::Project, project_id).await?;

        let watch = Watch { user_id, project_id, created_at: Utc::now() };
        self.engagement_repo.add_watch(&watch).await?;

        let count = self.engagement_repo.count_watchers(project_id).await?;
        Ok(EngagementState { active: true, count })
    }

    pub async fn unwatch(&self, user_id: Uuid, project_id: Uuid) -> Result<EngagementState> {
        self.targets.ensure_exists(TargetKind::Project, project_id).await?;
        self.engagement_repo.remove_watch(user_id, project_id).await?;

        let count = self.engagement_repo.count_watchers(project_id).await?;
        Ok(EngagementState { active: false, count })
    }

    pub async fn list_watchers(&self, project_id: Uuid, page: Page) -> Result<Vec<UserResponse>> {
        self.targets.ensure_exists(TargetKind::Project, project_id).await?;
        let users = self.engagement_repo.list_watchers(project_id, page).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<()> {
        match self.user_repo.get_user_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("User not found".to_string())),
        }
    }
}
