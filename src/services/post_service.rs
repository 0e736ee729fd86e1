use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use crate::db::repository::{PostRepository, UserRepository};
use crate::models::{Page, Post};
use crate::models::post::{CreatePostRequest, PostResponse, UpdatePostRequest};
use crate::services::{optional_text, require_profile, validate_text};
use crate::{AppError, Result};

const CONTENT_MAX: usize = 1000;

pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl PostService {
    pub fn new(post_repo: Arc<dyn PostRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self { post_repo, user_repo }
    }

    pub async fn create_post(&self, author_id: Uuid, request: CreatePostRequest) -> Result<PostResponse> {
        let content = validate_text("content", &request.content, 1, CONTENT_MAX)?;
        require_profile(self.user_repo.as_ref(), author_id).await?;

        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            author_id,
            author_username: None,
            content,
            image_url: optional_text(request.image_url),
            created_at: now,
            updated_at: now,
            like_count: 0,
            comment_count: 0,
        };

        let created = self.post_repo.create_post(&post).await?;
        tracing::info!("📝 POSTS: Created post {} by {}", created.id, author_id);
        Ok(created.into())
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<PostResponse> {
        self.find_post(post_id).await.map(PostResponse::from)
    }

    pub async fn list_posts(&self, page: Page) -> Result<Vec<PostResponse>> {
        let posts = self.post_repo.list_posts(page).await?;
        Ok(posts.into_iter().map(PostResponse::from).collect())
    }

    pub async fn list_posts_by_author(&self, author_id: Uuid, page: Page) -> Result<Vec<PostResponse>> {
        let posts = self.post_repo.list_posts_by_author(author_id, page).await?;
        Ok(posts.into_iter().map(PostResponse::from).collect())
    }

    pub async fn update_post(&self, caller: Uuid, post_id: Uuid, request: UpdatePostRequest) -> Result<PostResponse> {
        let mut post = self.find_post(post_id).await?;
        if post.author_id != caller {
            return Err(AppError::Forbidden("Only the author can modify this post".to_string()));
        }

        if let Some(content) = request.content {
            post.content = validate_text("content", &content, 1, CONTENT_MAX)?;
        }
        if request.image_url.is_some() {
            post.image_url = optional_text(request.image_url);
        }
        post.updated_at = Utc::now();

        let updated = self.post_repo.update_post(&post).await?;
        Ok(updated.into())
    }

    pub async fn delete_post(&self, caller: Uuid, post_id: Uuid) -> Result<()> {
        let post = self.find_post(post_id).await?;
        if post.author_id != caller {
            return Err(AppError::Forbidden("Only the author can delete this post".to_string()));
        }

        self.post_repo.delete_post(post_id).await?;
        tracing::info!("🗑️ POSTS: Deleted post {}", post_id);
        Ok(())
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Post> {
        self.post_repo
            .get_post_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::InMemoryRepository;
    use crate::models::{User, UserType};

    async fn setup() -> (PostService, Uuid) {
        let repo = Arc::new(InMemoryRepository::new());
        let author = Uuid::new_v4();
        let now = Utc::now();
        repo.create_user(&User {
            id: author,
            username: "linus".to_string(),
            email: "linus@example.com".to_string(),
            full_name: None,
            bio: None,
            avatar_url: None,
            location: None,
            website: None,
            user_type: UserType::Individual,
            created_at: now,
            updated_at: now,
            follower_count: 0,
            following_count: 0,
        })
        .await
        .unwrap();

        (PostService::new(repo.clone(), repo), author)
    }

    #[tokio::test]
    async fn test_content_length_limits() {
        let (service, author) = setup().await;

        let empty = CreatePostRequest { content: " ".to_string(), image_url: None };
        assert!(matches!(service.create_post(author, empty).await, Err(AppError::ValidationError(_))));

        let long = CreatePostRequest { content: "x".repeat(CONTENT_MAX + 1), image_url: None };
        assert!(matches!(service.create_post(author, long).await, Err(AppError::ValidationError(_))));

        let exact = CreatePostRequest { content: "x".repeat(CONTENT_MAX), image_url: None };
        assert!(service.create_post(author, exact).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_by_author_only() {
        let (service, author) = setup().await;
        let post = service
            .create_post(author, CreatePostRequest { content: "hello".to_string(), image_url: None })
            .await
            .unwrap();

        let update = UpdatePostRequest { content: Some("edited".to_string()), image_url: None };
        assert!(matches!(
            service.update_post(Uuid::new_v4(), post.id, update).await,
            Err(AppError::Forbidden(_))
        ));

        let update = UpdatePostRequest { content: Some("edited".to_string()), image_url: None };
        let updated = service.update_post(author, post.id, update).await.unwrap();
        assert_eq!(updated.content, "edited");
        assert_eq!(service.list_posts_by_author(author, Page::default()).await.unwrap().len(), 1);
    }
}
