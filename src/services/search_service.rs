//! Cross-entity search. Each requested content type is queried concurrently
//! through its repository; a failing query degrades to an empty list and is
//! reported in [`SearchResults::failed`] instead of failing the request.

use std::future::Future;
use std::sync::Arc;

use crate::db::repository::{ArticleRepository, PostRepository, ProjectRepository, UserRepository};
use crate::models::{ContentType, SearchQuery, SearchResults};
use crate::Result;

pub struct SearchService {
    user_repo: Arc<dyn UserRepository>,
    project_repo: Arc<dyn ProjectRepository>,
    article_repo: Arc<dyn ArticleRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl SearchService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        project_repo: Arc<dyn ProjectRepository>,
        article_repo: Arc<dyn ArticleRepository>,
        post_repo: Arc<dyn PostRepository>,
    ) -> Self {
        Self { user_repo, project_repo, article_repo, post_repo }
    }

    pub async fn search(&self, query: &SearchQuery, content_types: &[ContentType]) -> SearchResults {
        tracing::info!(
            "🔎 SEARCH: text={:?} types={:?} sort={:?} page={} size={}",
            query.text,
            content_types,
            query.sort,
            query.page.number,
            query.page.size
        );

        let wants = |content_type: ContentType| content_types.contains(&content_type);

        let (users, projects, articles, posts) = tokio::join!(
            run_if(wants(ContentType::Users), self.user_repo.search_users(query)),
            run_if(wants(ContentType::Projects), self.project_repo.search_projects(query)),
            run_if(wants(ContentType::Articles), self.article_repo.search_articles(query)),
            run_if(wants(ContentType::Posts), self.post_repo.search_posts(query)),
        );

        let mut failed = Vec::new();
        let results = SearchResults {
            users: settle(ContentType::Users, users, &mut failed),
            projects: settle(ContentType::Projects, projects, &mut failed),
            articles: settle(ContentType::Articles, articles, &mut failed),
            posts: settle(ContentType::Posts, posts, &mut failed),
            page: query.page.number,
            page_size: query.page.size,
            failed,
        };

        tracing::debug!(
            "✅ SEARCH: {} users, {} projects, {} articles, {} posts",
            results.users.len(),
            results.projects.len(),
            results.articles.len(),
            results.posts.len()
        );
        results
    }
}

/// Awaits `query` only when its content type was requested.
async fn run_if<T, F>(enabled: bool, query: F) -> Option<Result<Vec<T>>>
where
    F: Future<Output = Result<Vec<T>>>,
{
    if enabled {
        Some(query.await)
    } else {
        None
    }
}

fn settle<T, R>(content_type: ContentType, outcome: Option<Result<Vec<T>>>, failed: &mut Vec<ContentType>) -> Vec<R>
where
    R: From<T>,
{
    match outcome {
        Some(Ok(rows)) => rows.into_iter().map(R::from).collect(),
        Some(Err(e)) => {
            tracing::error!("❌ SEARCH: {} query failed, returning no {}: {}", content_type, content_type, e);
            failed.push(content_type);
            Vec::new()
        }
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use uuid::Uuid;
    use crate::db::repository::InMemoryRepository;
    use crate::models::{Page, Post, Project, SortKey, User, UserType};
    use crate::AppError;

    /// Post store that is always down
    struct FailingPostRepository;

    fn down<T>() -> Result<T> {
        Err(AppError::DatabaseError("connection refused".to_string()))
    }

    #[async_trait]
    impl PostRepository for FailingPostRepository {
        async fn create_post(&self, _post: &Post) -> Result<Post> { down() }
        async fn get_post_by_id(&self, _id: Uuid) -> Result<Option<Post>> { down() }
        async fn list_posts(&self, _page: Page) -> Result<Vec<Post>> { down() }
        async fn list_posts_by_author(&self, _author_id: Uuid, _page: Page) -> Result<Vec<Post>> { down() }
        async fn update_post(&self, _post: &Post) -> Result<Post> { down() }
        async fn delete_post(&self, _id: Uuid) -> Result<()> { down() }
        async fn search_posts(&self, _query: &SearchQuery) -> Result<Vec<Post>> { down() }
    }

    fn user(username: &str, user_type: UserType, age_minutes: i64) -> User {
        let at = Utc::now() - Duration::minutes(age_minutes);
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            full_name: None,
            bio: None,
            avatar_url: None,
            location: None,
            website: None,
            user_type,
            created_at: at,
            updated_at: at,
            follower_count: 0,
            following_count: 0,
        }
    }

    async fn seeded() -> Arc<InMemoryRepository> {
        let repo = Arc::new(InMemoryRepository::new());
        let owner = repo.create_user(&user("rustacean", UserType::Individual, 30)).await.unwrap();
        repo.create_user(&user("rust_mentor", UserType::Mentor, 20)).await.unwrap();
        repo.create_user(&user("gopher", UserType::Organization, 10)).await.unwrap();

        let now = Utc::now();
        repo.create_project(&Project {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            owner_username: None,
            title: "Rust parser".to_string(),
            description: Some("Combinators".to_string()),
            repository_url: None,
            tags: vec!["rust".to_string()],
            created_at: now,
            updated_at: now,
            like_count: 0,
            watch_count: 0,
            comment_count: 0,
        })
        .await
        .unwrap();
        repo
    }

    #[tokio::test]
    async fn test_search_only_queries_requested_types() {
        let repo = seeded().await;
        let service = SearchService::new(repo.clone(), repo.clone(), repo.clone(), Arc::new(FailingPostRepository));

        let query = SearchQuery::new(Some("rust"));
        let results = service.search(&query, &[ContentType::Users]).await;

        assert_eq!(results.users.len(), 2);
        assert!(results.projects.is_empty());
        // The failing post store was never consulted
        assert!(results.failed.is_empty());
    }

    #[tokio::test]
    async fn test_failed_type_yields_empty_list() {
        let repo = seeded().await;
        let service = SearchService::new(repo.clone(), repo.clone(), repo.clone(), Arc::new(FailingPostRepository));

        let results = service.search(&SearchQuery::new(Some("rust")), &ContentType::ALL).await;

        assert!(results.posts.is_empty());
        assert_eq!(results.failed, vec![ContentType::Posts]);
        assert_eq!(results.users.len(), 2);
        assert_eq!(results.projects.len(), 1);
        assert_eq!(results.projects[0].owner_username, "rustacean");
    }

    #[tokio::test]
    async fn test_user_type_filter_and_sort() {
        let repo = seeded().await;
        let service = SearchService::new(repo.clone(), repo.clone(), repo.clone(), repo.clone());

        let mut query = SearchQuery::new(None);
        query.user_types = vec![UserType::Mentor, UserType::Organization];
        query.sort = SortKey::Alphabetical;
        let results = service.search(&query, &ContentType::ALL).await;

        let names: Vec<&str> = results.users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["gopher", "rust_mentor"]);
        // The user-type filter does not touch other content types
        assert_eq!(results.projects.len(), 1);
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let repo = seeded().await;
        let service = SearchService::new(repo.clone(), repo.clone(), repo.clone(), repo.clone());

        let mut query = SearchQuery::new(None);
        query.page = Page::new(Some(5), Some(10));
        let results = service.search(&query, &ContentType::ALL).await;

        assert!(results.users.is_empty());
        assert!(results.failed.is_empty());
        assert_eq!(results.page, 5);
    }
}
