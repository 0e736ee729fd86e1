pub mod migrations;
pub mod postgres;
pub mod repository;

// Database connection and state management
use std::sync::Arc;
use crate::config::{AppConfig, StorageMode};
use crate::utils::{retry_with_backoff, RetryPolicy};
use crate::Result;
use postgres::PostgresDatabase;
use repository::{
    ArticleRepository, CommentRepository, EngagementRepository, InMemoryRepository, PostRepository,
    ProjectRepository, UserRepository,
};

#[derive(Clone)]
pub struct DatabaseClient {
    pub user_repo: Arc<dyn UserRepository>,
    pub project_repo: Arc<dyn ProjectRepository>,
    pub article_repo: Arc<dyn ArticleRepository>,
    pub post_repo: Arc<dyn PostRepository>,
    pub comment_repo: Arc<dyn CommentRepository>,
    pub engagement_repo: Arc<dyn EngagementRepository>,
    pg: Option<Arc<PostgresDatabase>>,
}

impl DatabaseClient {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        match &config.storage {
            StorageMode::Postgres(url) => {
                tracing::info!("🐘 DATABASE: Using PostgreSQL storage");
                let max_connections = config.database_max_connections;
                let database = retry_with_backoff("PostgreSQL connect", &RetryPolicy::default(), || {
                    PostgresDatabase::new(url, max_connections)
                })
                .await?;

                migrations::run_migrations(&database.pool).await?;
                Ok(Self::postgres(database))
            }
            StorageMode::Memory => {
                tracing::warn!("⚠️ DATABASE: DATABASE_URL not set, using in-memory storage (data is lost on restart)");
                Ok(Self::in_memory())
            }
        }
    }

    fn postgres(database: PostgresDatabase) -> Self {
        let repo = Arc::new(database.repository());
        let mut client = Self::from_repository(repo);
        client.pg = Some(Arc::new(database));
        client
    }

    pub fn in_memory() -> Self {
        Self::from_repository(Arc::new(InMemoryRepository::new()))
    }

    fn from_repository<R>(repo: Arc<R>) -> Self
    where
        R: UserRepository
            + ProjectRepository
            + ArticleRepository
            + PostRepository
            + CommentRepository
            + EngagementRepository
            + 'static,
    {
        Self {
            user_repo: repo.clone(),
            project_repo: repo.clone(),
            article_repo: repo.clone(),
            post_repo: repo.clone(),
            comment_repo: repo.clone(),
            engagement_repo: repo,
            pg: None,
        }
    }

    pub fn storage_name(&self) -> &'static str {
        if self.pg.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        if let Some(database) = &self.pg {
            sqlx::query("SELECT 1")
                .execute(&*database.pool)
                .await
                .map_err(|e| crate::AppError::DatabaseError(format!("Health check failed: {}", e)))?;
        }
        Ok(())
    }
}
