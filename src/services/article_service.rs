use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use crate::db::repository::{ArticleRepository, UserRepository};
use crate::models::{Article, Page};
use crate::models::article::{ArticleResponse, CreateArticleRequest, UpdateArticleRequest};
use crate::services::{optional_text, require_profile, validate_text};
use crate::{AppError, Result};

const TITLE_MAX: usize = 200;
const BODY_MAX: usize = 100_000;

pub struct ArticleService {
    article_repo: Arc<dyn ArticleRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl ArticleService {
    pub fn new(article_repo: Arc<dyn ArticleRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self { article_repo, user_repo }
    }

    pub async fn create_article(&self, author_id: Uuid, request: CreateArticleRequest) -> Result<ArticleResponse> {
        let title = validate_text("title", &request.title, 1, TITLE_MAX)?;
        let body = validate_text("body", &request.body, 1, BODY_MAX)?;
        require_profile(self.user_repo.as_ref(), author_id).await?;

        let now = Utc::now();
        let article = Article {
            id: Uuid::new_v4(),
            author_id,
            author_username: None,
            title,
            body,
            summary: optional_text(request.summary),
            cover_image_url: optional_text(request.cover_image_url),
            created_at: now,
            updated_at: now,
            like_count: 0,
            comment_count: 0,
        };

        let created = self.article_repo.create_article(&article).await?;
        tracing::info!("📰 ARTICLES: Created article {} by {}", created.id, author_id);
        Ok(created.into())
    }

    pub async fn get_article(&self, article_id: Uuid) -> Result<ArticleResponse> {
        self.find_article(article_id).await.map(ArticleResponse::from)
    }

    pub async fn list_articles(&self, page: Page) -> Result<Vec<ArticleResponse>> {
        let articles = self.article_repo.list_articles(page).await?;
        Ok(articles.into_iter().map(ArticleResponse::from).collect())
    }

    pub async fn list_articles_by_author(&self, author_id: Uuid, page: Page) -> Result<Vec<ArticleResponse>> {
        let articles = self.article_repo.list_articles_by_author(author_id, page).await?;
        Ok(articles.into_iter().map(ArticleResponse::from).collect())
    }

    pub async fn update_article(
        &self,
        caller: Uuid,
        article_id: Uuid,
        request: UpdateArticleRequest,
    ) -> Result<ArticleResponse> {
        let mut article = self.find_article(article_id).await?;
        if article.author_id != caller {
            return Err(AppError::Forbidden("Only the author can modify this article".to_string()));
        }

        if let Some(title) = request.title {
            article.title = validate_text("title", &title, 1, TITLE_MAX)?;
        }
        if let Some(body) = request.body {
            article.body = validate_text("body", &body, 1, BODY_MAX)?;
        }
        if request.summary.is_some() {
            article.summary = optional_text(request.summary);
        }
        if request.cover_image_url.is_some() {
            article.cover_image_url = optional_text(request.cover_image_url);
        }
        article.updated_at = Utc::now();

        let updated = self.article_repo.update_article(&article).await?;
        Ok(updated.into())
    }

    pub async fn delete_article(&self, caller: Uuid, article_id: Uuid) -> Result<()> {
        let article = self.find_article(article_id).await?;
        if article.author_id != caller {
            return Err(AppError::Forbidden("Only the author can delete this article".to_string()));
        }

        self.article_repo.delete_article(article_id).await?;
        tracing::info!("🗑️ ARTICLES: Deleted article {}", article_id);
        Ok(())
    }

    async fn find_article(&self, article_id: Uuid) -> Result<Article> {
        self.article_repo
            .get_article_by_id(article_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Article not found".to_string()))
    }
}
