// Library modules for the collaboration platform service
pub mod config;
pub mod models;
pub mod db;
pub mod routes;
pub mod services;
pub mod auth;
pub mod error;
pub mod utils;

use std::sync::Arc;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use config::{AppConfig, StorageMode};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: db::DatabaseClient,
    pub auth_service: Arc<auth::AuthService>,
    pub user_service: Arc<services::UserService>,
    pub project_service: Arc<services::ProjectService>,
    pub article_service: Arc<services::ArticleService>,
    pub post_service: Arc<services::PostService>,
    pub comment_service: Arc<services::CommentService>,
    pub engagement_service: Arc<services::EngagementService>,
    pub search_service: Arc<services::SearchService>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let db = db::DatabaseClient::new(&config).await?;
        Ok(Self::with_database(config, db))
    }

    /// State backed by a fresh in-memory store, regardless of `config.storage`.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::with_database(config, db::DatabaseClient::in_memory())
    }

    fn with_database(config: AppConfig, db: db::DatabaseClient) -> Self {
        let auth_service = Arc::new(auth::AuthService::new(&config.jwt_secret));

        let targets = services::TargetLookup {
            projects: db.project_repo.clone(),
            articles: db.article_repo.clone(),
            posts: db.post_repo.clone(),
        };

        let user_service = Arc::new(services::UserService::new(db.user_repo.clone()));
        let project_service = Arc::new(services::ProjectService::new(
            db.project_repo.clone(),
            db.user_repo.clone(),
        ));
        let article_service = Arc::new(services::ArticleService::new(
            db.article_repo.clone(),
            db.user_repo.clone(),
        ));
        let post_service = Arc::new(services::PostService::new(
            db.post_repo.clone(),
            db.user_repo.clone(),
        ));
        let comment_service = Arc::new(services::CommentService::new(
            db.comment_repo.clone(),
            db.user_repo.clone(),
            targets.clone(),
        ));
        let engagement_service = Arc::new(services::EngagementService::new(
            db.engagement_repo.clone(),
            db.user_repo.clone(),
            targets,
        ));
        let search_service = Arc::new(services::SearchService::new(
            db.user_repo.clone(),
            db.project_repo.clone(),
            db.article_repo.clone(),
            db.post_repo.clone(),
        ));

        Self {
            config,
            db,
            auth_service,
            user_service,
            project_service,
            article_service,
            post_service,
            comment_service,
            engagement_service,
            search_service,
        }
    }
}
