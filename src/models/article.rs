use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: Option<String>,
    pub title: String,
    pub body: String,
    pub summary: Option<String>,
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub like_count: i64,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateArticleRequest {
    pub title: String,
    pub body: String,
    pub summary: Option<String>,
    pub cover_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateArticleRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub summary: Option<String>,
    pub cover_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleResponse {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub title: String,
    pub body: String,
    pub summary: String,
    pub cover_image_url: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            author_id: article.author_id,
            author_username: article.author_username.unwrap_or_default(),
            title: article.title,
            body: article.body,
            summary: article.summary.unwrap_or_default(),
            cover_image_url: article.cover_image_url.unwrap_or_default(),
            like_count: article.like_count.max(0),
            comment_count: article.comment_count.max(0),
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }
}
