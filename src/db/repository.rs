// Repository trait abstractions for database operations
use crate::models::{Article, Comment, Follow, Like, Page, Post, Project, SearchQuery, TargetKind, User, Watch};
use crate::models::search::apply_search;
use crate::{AppError, Result};
use uuid::Uuid;
use async_trait::async_trait;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<User>;
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn list_users(&self, page: Page) -> Result<Vec<User>>;
    async fn update_user(&self, user: &User) -> Result<User>;
    async fn delete_user(&self, id: Uuid) -> Result<()>;
    async fn search_users(&self, query: &SearchQuery) -> Result<Vec<User>>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create_project(&self, project: &Project) -> Result<Project>;
    async fn get_project_by_id(&self, id: Uuid) -> Result<Option<Project>>;
    async fn list_projects(&self, page: Page) -> Result<Vec<Project>>;
    async fn list_projects_by_owner(&self, owner_id: Uuid, page: Page) -> Result<Vec<Project>>;
    async fn update_project(&self, project: &Project) -> Result<Project>;
    async fn delete_project(&self, id: Uuid) -> Result<()>;
    async fn search_projects(&self, query: &SearchQuery) -> Result<Vec<Project>>;
}

#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn create_article(&self, article: &Article) -> Result<Article>;
    async fn get_article_by_id(&self, id: Uuid) -> Result<Option<Article>>;
    async fn list_articles(&self, page: Page) -> Result<Vec<Article>>;
    async fn list_articles_by_author(&self, author_id: Uuid, page: Page) -> Result<Vec<Article>>;
    async fn update_article(&self, article: &Article) -> Result<Article>;
    async fn delete_article(&self, id: Uuid) -> Result<()>;
    async fn search_articles(&self, query: &SearchQuery) -> Result<Vec<Article>>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, post: &Post) -> Result<Post>;
    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<Post>>;
    async fn list_posts(&self, page: Page) -> Result<Vec<Post>>;
    async fn list_posts_by_author(&self, author_id: Uuid, page: Page) -> Result<Vec<Post>>;
    async fn update_post(&self, post: &Post) -> Result<Post>;
    async fn delete_post(&self, id: Uuid) -> Result<()>;
    async fn search_posts(&self, query: &SearchQuery) -> Result<Vec<Post>>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create_comment(&self, comment: &Comment) -> Result<Comment>;
    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<Comment>>;
    /// Oldest first
    async fn list_comments(&self, target_kind: TargetKind, target_id: Uuid, page: Page) -> Result<Vec<Comment>>;
    async fn delete_comment(&self, id: Uuid) -> Result<()>;
}

/// Likes, follows and watches. Add/remove return whether anything changed.
#[async_trait]
pub trait EngagementRepository: Send + Sync {
    async fn add_like(&self, like: &Like) -> Result<bool>;
    async fn remove_like(&self, user_id: Uuid, target_kind: TargetKind, target_id: Uuid) -> Result<bool>;
    async fn count_likes(&self, target_kind: TargetKind, target_id: Uuid) -> Result<i64>;

    async fn add_follow(&self, follow: &Follow) -> Result<bool>;
    async fn remove_follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool>;
    async fn count_followers(&self, user_id: Uuid) -> Result<i64>;
    async fn list_followers(&self, user_id: Uuid, page: Page) -> Result<Vec<User>>;
    async fn list_following(&self, user_id: Uuid, page: Page) -> Result<Vec<User>>;

    async fn add_watch(&self, watch: &Watch) -> Result<bool>;
    async fn remove_watch(&self, user_id: Uuid, project_id: Uuid) -> Result<bool>;
    async fn count_watchers(&self, project_id: Uuid) -> Result<i64>;
    async fn list_watchers(&self, project_id: Uuid, page: Page) -> Result<Vec<User>>;
}

// In-memory implementation for development and tests (no DATABASE_URL)
use std::collections::HashMap;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryTables {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    articles: HashMap<Uuid, Article>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    likes: HashMap<(Uuid, TargetKind, Uuid), DateTime<Utc>>, // (user, kind, target) -> liked at
    follows: HashMap<(Uuid, Uuid), DateTime<Utc>>,           // (follower, followee) -> followed at
    watches: HashMap<(Uuid, Uuid), DateTime<Utc>>,           // (user, project) -> watched at
}

impl MemoryTables {
    fn username(&self, user_id: Uuid) -> Option<String> {
        self.users.get(&user_id).map(|u| u.username.clone())
    }

    fn like_count(&self, kind: TargetKind, target_id: Uuid) -> i64 {
        self.likes.keys().filter(|(_, k, t)| *k == kind && *t == target_id).count() as i64
    }

    fn comment_count(&self, kind: TargetKind, target_id: Uuid) -> i64 {
        self.comments.values().filter(|c| c.target_kind == kind && c.target_id == target_id).count() as i64
    }

    // Counters and denormalized names are derived on every read
    fn hydrate_user(&self, user: &User) -> User {
        User {
            follower_count: self.follows.keys().filter(|(_, followee)| *followee == user.id).count() as i64,
            following_count: self.follows.keys().filter(|(follower, _)| *follower == user.id).count() as i64,
            ..user.clone()
        }
    }

    fn hydrate_project(&self, project: &Project) -> Project {
        Project {
            owner_username: self.username(project.owner_id),
            like_count: self.like_count(TargetKind::Project, project.id),
            watch_count: self.watches.keys().filter(|(_, p)| *p == project.id).count() as i64,
            comment_count: self.comment_count(TargetKind::Project, project.id),
            ..project.clone()
        }
    }

    fn hydrate_article(&self, article: &Article) -> Article {
        Article {
            author_username: self.username(article.author_id),
            like_count: self.like_count(TargetKind::Article, article.id),
            comment_count: self.comment_count(TargetKind::Article, article.id),
            ..article.clone()
        }
    }

    fn hydrate_post(&self, post: &Post) -> Post {
        Post {
            author_username: self.username(post.author_id),
            like_count: self.like_count(TargetKind::Post, post.id),
            comment_count: self.comment_count(TargetKind::Post, post.id),
            ..post.clone()
        }
    }

    fn hydrate_comment(&self, comment: &Comment) -> Comment {
        Comment {
            author_username: self.username(comment.author_id),
            ..comment.clone()
        }
    }

    fn target_exists(&self, kind: TargetKind, target_id: Uuid) -> bool {
        match kind {
            TargetKind::Project => self.projects.contains_key(&target_id),
            TargetKind::Article => self.articles.contains_key(&target_id),
            TargetKind::Post => self.posts.contains_key(&target_id),
        }
    }

    fn remove_target_engagement(&mut self, kind: TargetKind, target_id: Uuid) {
        self.likes.retain(|(_, k, t), _| !(*k == kind && *t == target_id));
        self.comments.retain(|_, c| !(c.target_kind == kind && c.target_id == target_id));
        if kind == TargetKind::Project {
            self.watches.retain(|(_, p), _| *p != target_id);
        }
    }

    fn users_by_recency(&self, mut entries: Vec<(Uuid, DateTime<Utc>)>, page: Page) -> Vec<User> {
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
        entries
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .filter_map(|(id, _)| self.users.get(&id).map(|u| self.hydrate_user(u)))
            .collect()
    }
}

fn page_query(page: Page) -> SearchQuery {
    SearchQuery { page, ..SearchQuery::default() }
}

pub struct InMemoryRepository {
    tables: RwLock<MemoryTables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(MemoryTables::default()),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn create_user(&self, user: &User) -> Result<User> {
        let mut tables = self.tables.write().await;

        if tables.users.contains_key(&user.id) {
            return Err(AppError::Conflict("Profile already exists".to_string()));
        }
        if tables.users.values().any(|u| u.username.eq_ignore_ascii_case(&user.username)) {
            return Err(AppError::Conflict(format!("Username '{}' is taken", user.username)));
        }

        tables.users.insert(user.id, user.clone());
        Ok(tables.hydrate_user(user))
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|u| tables.hydrate_user(u)))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .map(|u| tables.hydrate_user(u)))
    }

    async fn list_users(&self, page: Page) -> Result<Vec<User>> {
        self.search_users(&page_query(page)).await
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&user.id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(AppError::Conflict(format!("Username '{}' is taken", user.username)));
        }

        tables.users.insert(user.id, user.clone());
        Ok(tables.hydrate_user(user))
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.users.remove(&id);

        // Mirror the ON DELETE CASCADE behaviour of the SQL schema
        let owned: Vec<(TargetKind, Uuid)> = tables
            .projects
            .values()
            .filter(|p| p.owner_id == id)
            .map(|p| (TargetKind::Project, p.id))
            .chain(tables.articles.values().filter(|a| a.author_id == id).map(|a| (TargetKind::Article, a.id)))
            .chain(tables.posts.values().filter(|p| p.author_id == id).map(|p| (TargetKind::Post, p.id)))
            .collect();
        for (kind, target_id) in owned {
            match kind {
                TargetKind::Project => { tables.projects.remove(&target_id); }
                TargetKind::Article => { tables.articles.remove(&target_id); }
                TargetKind::Post => { tables.posts.remove(&target_id); }
            }
            tables.remove_target_engagement(kind, target_id);
        }

        tables.comments.retain(|_, c| c.author_id != id);
        tables.likes.retain(|(user, _, _), _| *user != id);
        tables.follows.retain(|(follower, followee), _| *follower != id && *followee != id);
        tables.watches.retain(|(user, _), _| *user != id);
        Ok(())
    }

    async fn search_users(&self, query: &SearchQuery) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let rows = tables.users.values().map(|u| tables.hydrate_user(u)).collect();
        Ok(apply_search(rows, query))
    }
}

#[async_trait]
impl ProjectRepository for InMemoryRepository {
    async fn create_project(&self, project: &Project) -> Result<Project> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&project.owner_id) {
            return Err(AppError::NotFound("Owner profile not found".to_string()));
        }
        tables.projects.insert(project.id, project.clone());
        Ok(tables.hydrate_project(project))
    }

    async fn get_project_by_id(&self, id: Uuid) -> Result<Option<Project>> {
        let tables = self.tables.read().await;
        Ok(tables.projects.get(&id).map(|p| tables.hydrate_project(p)))
    }

    async fn list_projects(&self, page: Page) -> Result<Vec<Project>> {
        self.search_projects(&page_query(page)).await
    }

    async fn list_projects_by_owner(&self, owner_id: Uuid, page: Page) -> Result<Vec<Project>> {
        let tables = self.tables.read().await;
        let rows = tables
            .projects
            .values()
            .filter(|p| p.owner_id == owner_id)
            .map(|p| tables.hydrate_project(p))
            .collect();
        Ok(apply_search(rows, &page_query(page)))
    }

    async fn update_project(&self, project: &Project) -> Result<Project> {
        let mut tables = self.tables.write().await;
        if !tables.projects.contains_key(&project.id) {
            return Err(AppError::NotFound("Project not found".to_string()));
        }
        tables.projects.insert(project.id, project.clone());
        Ok(tables.hydrate_project(project))
    }

    async fn delete_project(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.projects.remove(&id);
        tables.remove_target_engagement(TargetKind::Project, id);
        Ok(())
    }

    async fn search_projects(&self, query: &SearchQuery) -> Result<Vec<Project>> {
        let tables = self.tables.read().await;
        let rows = tables.projects.values().map(|p| tables.hydrate_project(p)).collect();
        Ok(apply_search(rows, query))
    }
}

#[async_trait]
impl ArticleRepository for InMemoryRepository {
    async fn create_article(&self, article: &Article) -> Result<Article> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&article.author_id) {
            return Err(AppError::NotFound("Author profile not found".to_string()));
        }
        tables.articles.insert(article.id, article.clone());
        Ok(tables.hydrate_article(article))
    }

    async fn get_article_by_id(&self, id: Uuid) -> Result<Option<Article>> {
        let tables = self.tables.read().await;
        Ok(tables.articles.get(&id).map(|a| tables.hydrate_article(a)))
    }

    async fn list_articles(&self, page: Page) -> Result<Vec<Article>> {
        self.search_articles(&page_query(page)).await
    }

    async fn list_articles_by_author(&self, author_id: Uuid, page: Page) -> Result<Vec<Article>> {
        let tables = self.tables.read().await;
        let rows = tables
            .articles
            .values()
            .filter(|a| a.author_id == author_id)
            .map(|a| tables.hydrate_article(a))
            .collect();
        Ok(apply_search(rows, &page_query(page)))
    }

    async fn update_article(&self, article: &Article) -> Result<Article> {
        let mut tables = self.tables.write().await;
        if !tables.articles.contains_key(&article.id) {
            return Err(AppError::NotFound("Article not found".to_string()));
        }
        tables.articles.insert(article.id, article.clone());
        Ok(tables.hydrate_article(article))
    }

    async fn delete_article(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.articles.remove(&id);
        tables.remove_target_engagement(TargetKind::Article, id);
        Ok(())
    }

    async fn search_articles(&self, query: &SearchQuery) -> Result<Vec<Article>> {
        let tables = self.tables.read().await;
        let rows = tables.articles.values().map(|a| tables.hydrate_article(a)).collect();
        Ok(apply_search(rows, query))
    }
}

#[async_trait]
impl PostRepository for InMemoryRepository {
    async fn create_post(&self, post: &Post) -> Result<Post> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&post.author_id) {
            return Err(AppError::NotFound("Author profile not found".to_string()));
        }
        tables.posts.insert(post.id, post.clone());
        Ok(tables.hydrate_post(post))
    }

    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).map(|p| tables.hydrate_post(p)))
    }

    async fn list_posts(&self, page: Page) -> Result<Vec<Post>> {
        self.search_posts(&page_query(page)).await
    }

    async fn list_posts_by_author(&self, author_id: Uuid, page: Page) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let rows = tables
            .posts
            .values()
            .filter(|p| p.author_id == author_id)
            .map(|p| tables.hydrate_post(p))
            .collect();
        Ok(apply_search(rows, &page_query(page)))
    }

    async fn update_post(&self, post: &Post) -> Result<Post> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&post.id) {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        tables.posts.insert(post.id, post.clone());
        Ok(tables.hydrate_post(post))
    }

    async fn delete_post(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.posts.remove(&id);
        tables.remove_target_engagement(TargetKind::Post, id);
        Ok(())
    }

    async fn search_posts(&self, query: &SearchQuery) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let rows = tables.posts.values().map(|p| tables.hydrate_post(p)).collect();
        Ok(apply_search(rows, query))
    }
}

#[async_trait]
impl CommentRepository for InMemoryRepository {
    async fn create_comment(&self, comment: &Comment) -> Result<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.target_exists(comment.target_kind, comment.target_id) {
            return Err(AppError::NotFound(format!("{} not found", comment.target_kind)));
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(tables.hydrate_comment(comment))
    }

    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables.comments.get(&id).map(|c| tables.hydrate_comment(c)))
    }

    async fn list_comments(&self, target_kind: TargetKind, target_id: Uuid, page: Page) -> Result<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.target_kind == target_kind && c.target_id == target_id)
            .map(|c| tables.hydrate_comment(c))
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(comments
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.comments.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl EngagementRepository for InMemoryRepository {
    async fn add_like(&self, like: &Like) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if !tables.target_exists(like.target_kind, like.target_id) {
            return Err(AppError::NotFound(format!("{} not found", like.target_kind)));
        }
        let key = (like.user_id, like.target_kind, like.target_id);
        if tables.likes.contains_key(&key) {
            return Ok(false);
        }
        tables.likes.insert(key, like.created_at);
        Ok(true)
    }

    async fn remove_like(&self, user_id: Uuid, target_kind: TargetKind, target_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.likes.remove(&(user_id, target_kind, target_id)).is_some())
    }

    async fn count_likes(&self, target_kind: TargetKind, target_id: Uuid) -> Result<i64> {
        Ok(self.tables.read().await.like_count(target_kind, target_id))
    }

    async fn add_follow(&self, follow: &Follow) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&follow.followee_id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        let key = (follow.follower_id, follow.followee_id);
        if tables.follows.contains_key(&key) {
            return Ok(false);
        }
        tables.follows.insert(key, follow.created_at);
        Ok(true)
    }

    async fn remove_follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.follows.remove(&(follower_id, followee_id)).is_some())
    }

    async fn count_followers(&self, user_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables.follows.keys().filter(|(_, followee)| *followee == user_id).count() as i64)
    }

    async fn list_followers(&self, user_id: Uuid, page: Page) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let entries = tables
            .follows
            .iter()
            .filter(|((_, followee), _)| *followee == user_id)
            .map(|((follower, _), at)| (*follower, *at))
            .collect();
        Ok(tables.users_by_recency(entries, page))
    }

    async fn list_following(&self, user_id: Uuid, page: Page) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let entries = tables
            .follows
            .iter()
            .filter(|((follower, _), _)| *follower == user_id)
            .map(|((_, followee), at)| (*followee, *at))
            .collect();
        Ok(tables.users_by_recency(entries, page))
    }

    async fn add_watch(&self, watch: &Watch) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if !tables.projects.contains_key(&watch.project_id) {
            return Err(AppError::NotFound("Project not found".to_string()));
        }
        let key = (watch.user_id, watch.project_id);
        if tables.watches.contains_key(&key) {
            return Ok(false);
        }
        tables.watches.insert(key, watch.created_at);
        Ok(true)
    }

    async fn remove_watch(&self, user_id: Uuid, project_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.watches.remove(&(user_id, project_id)).is_some())
    }

    async fn count_watchers(&self, project_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables.watches.keys().filter(|(_, p)| *p == project_id).count() as i64)
    }

    async fn list_watchers(&self, project_id: Uuid, page: Page) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let entries = tables
            .watches
            .iter()
            .filter(|((_, p), _)| *p == project_id)
            .map(|((user, _), at)| (*user, *at))
            .collect();
        Ok(tables.users_by_recency(entries, page))
    }
}
