// PostgreSQL repository implementations using sqlx
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;
use std::sync::Arc;
use std::time::Duration;
use crate::{Result, AppError};
use crate::models::{Article, Comment, ContentType, Follow, Like, Page, Post, Project, SearchQuery, TargetKind, User, UserType, Watch};
use crate::db::repository::{
    ArticleRepository, CommentRepository, EngagementRepository, PostRepository, ProjectRepository, UserRepository,
};

// Search projections: each exposes the columns SortKey::order_by refers to
const USER_PROJECTION: &str = r#"
    SELECT u.id, u.username, u.email, u.full_name, u.bio, u.avatar_url, u.location, u.website,
           u.user_type, u.created_at, u.updated_at,
           (SELECT COUNT(*) FROM follows f WHERE f.followee_id = u.id) AS follower_count,
           (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id) AS following_count
    FROM users u
"#;

const PROJECT_PROJECTION: &str = r#"
    SELECT p.id, p.owner_id, u.username AS owner_username, p.title, p.description, p.repository_url,
           p.tags, p.created_at, p.updated_at,
           (SELECT COUNT(*) FROM likes l WHERE l.target_kind = 'project' AND l.target_id = p.id) AS like_count,
           (SELECT COUNT(*) FROM watches w WHERE w.project_id = p.id) AS watch_count,
           (SELECT COUNT(*) FROM comments c WHERE c.target_kind = 'project' AND c.target_id = p.id) AS comment_count
    FROM projects p
    LEFT JOIN users u ON u.id = p.owner_id
"#;

const ARTICLE_PROJECTION: &str = r#"
    SELECT a.id, a.author_id, u.username AS author_username, a.title, a.body, a.summary, a.cover_image_url,
           a.created_at, a.updated_at,
           (SELECT COUNT(*) FROM likes l WHERE l.target_kind = 'article' AND l.target_id = a.id) AS like_count,
           (SELECT COUNT(*) FROM comments c WHERE c.target_kind = 'article' AND c.target_id = a.id) AS comment_count
    FROM articles a
    LEFT JOIN users u ON u.id = a.author_id
"#;

const POST_PROJECTION: &str = r#"
    SELECT p.id, p.author_id, u.username AS author_username, p.content, p.image_url, p.created_at, p.updated_at,
           (SELECT COUNT(*) FROM likes l WHERE l.target_kind = 'post' AND l.target_id = p.id) AS like_count,
           (SELECT COUNT(*) FROM comments c WHERE c.target_kind = 'post' AND c.target_id = p.id) AS comment_count
    FROM posts p
    LEFT JOIN users u ON u.id = p.author_id
"#;

const COMMENT_PROJECTION: &str = r#"
    SELECT c.id, c.target_kind, c.target_id, c.author_id, u.username AS author_username, c.content, c.created_at
    FROM comments c
    LEFT JOIN users u ON u.id = c.author_id
"#;

// PostgreSQL connection pool wrapper
pub struct PostgresDatabase {
    pub pool: Arc<PgPool>,
}

impl PostgresDatabase {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        tracing::info!("🔗 DATABASE: Configuring connection pool");
        tracing::info!("   📊 Max connections: {}", max_connections);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(3600))
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(|e| {
                tracing::error!("❌ DATABASE: Failed to create connection pool: {}", e);
                AppError::DatabaseError(format!("Failed to connect to PostgreSQL: {}", e))
            })?;

        tracing::info!("✅ DATABASE: Connection pool configured successfully");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn repository(&self) -> PostgresRepository {
        PostgresRepository { pool: self.pool.clone() }
    }
}

/// Maps sqlx errors, keeping unique violations as conflicts and adding context otherwise.
fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| match AppError::from(e) {
        AppError::DatabaseError(msg) => AppError::DatabaseError(format!("{}: {}", context, msg)),
        other => other,
    }
}

fn target_table(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Project => "projects",
        TargetKind::Article => "articles",
        TargetKind::Post => "posts",
    }
}

/// `SELECT * FROM (<projection>) AS hits WHERE TRUE`, ready for `AND ...` filters.
fn select_hits(projection: &str) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT * FROM (");
    builder.push(projection);
    builder.push(") AS hits WHERE TRUE");
    builder
}

fn push_text_filter(builder: &mut QueryBuilder<'static, Postgres>, query: &SearchQuery, columns: &[&str]) {
    let Some(pattern) = query.like_pattern() else {
        return;
    };

    builder.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder.push(*column).push(" ILIKE ").push_bind(pattern.clone());
    }
    builder.push(")");
}

fn push_order_and_page(builder: &mut QueryBuilder<'static, Postgres>, query: &SearchQuery, content_type: ContentType) {
    builder.push(" ORDER BY ").push(query.sort.order_by(content_type));
    push_page(builder, query.page);
}

fn push_page(builder: &mut QueryBuilder<'static, Postgres>, page: Page) {
    builder.push(" LIMIT ").push_bind(page.limit() as i64);
    builder.push(" OFFSET ").push_bind(page.offset() as i64);
}

fn page_query(page: Page) -> SearchQuery {
    SearchQuery { page, ..SearchQuery::default() }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    full_name: Option<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
    location: Option<String>,
    website: Option<String>,
    user_type: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    follower_count: Option<i64>,
    following_count: Option<i64>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let user_type = row
            .user_type
            .as_deref()
            .and_then(|t| t.parse::<UserType>().ok())
            .unwrap_or_default();

        User {
            id: row.id,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            bio: row.bio,
            avatar_url: row.avatar_url,
            location: row.location,
            website: row.website,
            user_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
            follower_count: row.follower_count.unwrap_or(0),
            following_count: row.following_count.unwrap_or(0),
        }
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: Uuid,
    owner_id: Uuid,
    owner_username: Option<String>,
    title: String,
    description: Option<String>,
    repository_url: Option<String>,
    tags: Option<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    like_count: Option<i64>,
    watch_count: Option<i64>,
    comment_count: Option<i64>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            owner_id: row.owner_id,
            owner_username: row.owner_username,
            title: row.title,
            description: row.description,
            repository_url: row.repository_url,
            tags: row.tags.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            like_count: row.like_count.unwrap_or(0),
            watch_count: row.watch_count.unwrap_or(0),
            comment_count: row.comment_count.unwrap_or(0),
        }
    }
}

#[derive(Debug, FromRow)]
struct ArticleRow {
    id: Uuid,
    author_id: Uuid,
    author_username: Option<String>,
    title: String,
    body: String,
    summary: Option<String>,
    cover_image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    like_count: Option<i64>,
    comment_count: Option<i64>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            author_id: row.author_id,
            author_username: row.author_username,
            title: row.title,
            body: row.body,
            summary: row.summary,
            cover_image_url: row.cover_image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
            like_count: row.like_count.unwrap_or(0),
            comment_count: row.comment_count.unwrap_or(0),
        }
    }
}

#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    author_username: Option<String>,
    content: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    like_count: Option<i64>,
    comment_count: Option<i64>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            author_id: row.author_id,
            author_username: row.author_username,
            content: row.content,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
            like_count: row.like_count.unwrap_or(0),
            comment_count: row.comment_count.unwrap_or(0),
        }
    }
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: Uuid,
    target_kind: String,
    target_id: Uuid,
    author_id: Uuid,
    author_username: Option<String>,
    content: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = AppError;

    fn try_from(row: CommentRow) -> Result<Self> {
        let target_kind = row
            .target_kind
            .parse::<TargetKind>()
            .map_err(AppError::DatabaseError)?;

        Ok(Comment {
            id: row.id,
            target_kind,
            target_id: row.target_id,
            author_id: row.author_id,
            author_username: row.author_username,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

pub struct PostgresRepository {
    pool: Arc<PgPool>,
}

impl PostgresRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn target_exists(&self, kind: TargetKind, target_id: Uuid) -> Result<bool> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)", target_table(kind));
        sqlx::query_scalar::<_, bool>(&sql)
            .bind(target_id)
            .fetch_one(&*self.pool)
            .await
            .map_err(db_error("Failed to check target"))
    }

    async fn users_via(&self, join: &'static str, key: Uuid, page: Page) -> Result<Vec<User>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT hits.* FROM (");
        builder.push(USER_PROJECTION);
        builder.push(") AS hits ");
        builder.push(join);
        builder.push_bind(key);
        builder.push(" ORDER BY rel.created_at DESC, hits.id DESC");
        push_page(&mut builder, page);

        let rows = builder
            .build_query_as::<UserRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to list related users"))?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Removes likes and comments that point at content owned by `user_id`;
    /// those rows reference their target polymorphically and are not covered by FK cascades.
    async fn delete_engagement_on_owned_content(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        table: &str,
        user_id: Uuid,
    ) -> Result<()> {
        let sql = format!(
            r#"
            DELETE FROM {table}
            WHERE (target_kind = 'project' AND target_id IN (SELECT id FROM projects WHERE owner_id = $1))
               OR (target_kind = 'article' AND target_id IN (SELECT id FROM articles WHERE author_id = $1))
               OR (target_kind = 'post' AND target_id IN (SELECT id FROM posts WHERE author_id = $1))
            "#
        );
        sqlx::query(&sql)
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(db_error("Failed to delete engagement on owned content"))?;
        Ok(())
    }

    async fn delete_target(&self, kind: TargetKind, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to start transaction"))?;

        for table in ["likes", "comments"] {
            let sql = format!("DELETE FROM {} WHERE target_kind = $1 AND target_id = $2", table);
            sqlx::query(&sql)
                .bind(kind.as_str())
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to delete target engagement"))?;
        }

        let sql = format!("DELETE FROM {} WHERE id = $1", target_table(kind));
        sqlx::query(&sql)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete target"))?;

        tx.commit().await.map_err(db_error("Failed to commit delete"))?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn create_user(&self, user: &User) -> Result<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, full_name, bio, avatar_url, location, website, user_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.bio)
        .bind(&user.avatar_url)
        .bind(&user.location)
        .bind(&user.website)
        .bind(user.user_type.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(db_error("Failed to create user"))?;

        self.get_user_by_id(user.id)
            .await?
            .ok_or_else(|| AppError::DatabaseError("Created user could not be read back".to_string()))
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let mut builder = select_hits(USER_PROJECTION);
        builder.push(" AND id = ").push_bind(id);

        let row = builder
            .build_query_as::<UserRow>()
            .fetch_optional(&*self.pool)
            .await
            .map_err(db_error("Failed to get user by id"))?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let mut builder = select_hits(USER_PROJECTION);
        builder.push(" AND LOWER(username) = LOWER(").push_bind(username.to_string()).push(")");

        let row = builder
            .build_query_as::<UserRow>()
            .fetch_optional(&*self.pool)
            .await
            .map_err(db_error("Failed to get user by username"))?;
        Ok(row.map(User::from))
    }

    async fn list_users(&self, page: Page) -> Result<Vec<User>> {
        self.search_users(&page_query(page)).await
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, full_name = $4, bio = $5, avatar_url = $6,
                location = $7, website = $8, user_type = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.bio)
        .bind(&user.avatar_url)
        .bind(&user.location)
        .bind(&user.website)
        .bind(user.user_type.as_str())
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(db_error("Failed to update user"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        self.get_user_by_id(user.id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to start transaction"))?;

        Self::delete_engagement_on_owned_content(&mut tx, "likes", id).await?;
        Self::delete_engagement_on_owned_content(&mut tx, "comments", id).await?;

        // Remaining rows cascade from users
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete user"))?;

        tx.commit().await.map_err(db_error("Failed to commit user deletion"))?;
        Ok(())
    }

    async fn search_users(&self, query: &SearchQuery) -> Result<Vec<User>> {
        let mut builder = select_hits(USER_PROJECTION);
        push_text_filter(&mut builder, query, &["username", "full_name"]);
        if !query.user_types.is_empty() {
            let types: Vec<String> = query.user_types.iter().map(|t| t.as_str().to_string()).collect();
            builder.push(" AND user_type = ANY(").push_bind(types).push(")");
        }
        push_order_and_page(&mut builder, query, ContentType::Users);

        let rows = builder
            .build_query_as::<UserRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to search users"))?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}

#[async_trait]
impl ProjectRepository for PostgresRepository {
    async fn create_project(&self, project: &Project) -> Result<Project> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, owner_id, title, description, repository_url, tags, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(project.id)
        .bind(project.owner_id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.repository_url)
        .bind(&project.tags)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(db_error("Failed to create project"))?;

        self.get_project_by_id(project.id)
            .await?
            .ok_or_else(|| AppError::DatabaseError("Created project could not be read back".to_string()))
    }

    async fn get_project_by_id(&self, id: Uuid) -> Result<Option<Project>> {
        let mut builder = select_hits(PROJECT_PROJECTION);
        builder.push(" AND id = ").push_bind(id);

        let row = builder
            .build_query_as::<ProjectRow>()
            .fetch_optional(&*self.pool)
            .await
            .map_err(db_error("Failed to get project"))?;
        Ok(row.map(Project::from))
    }

    async fn list_projects(&self, page: Page) -> Result<Vec<Project>> {
        self.search_projects(&page_query(page)).await
    }

    async fn list_projects_by_owner(&self, owner_id: Uuid, page: Page) -> Result<Vec<Project>> {
        let mut builder = select_hits(PROJECT_PROJECTION);
        builder.push(" AND owner_id = ").push_bind(owner_id);
        push_order_and_page(&mut builder, &page_query(page), ContentType::Projects);

        let rows = builder
            .build_query_as::<ProjectRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to list projects by owner"))?;
        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn update_project(&self, project: &Project) -> Result<Project> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET title = $2, description = $3, repository_url = $4, tags = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(project.id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.repository_url)
        .bind(&project.tags)
        .bind(project.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(db_error("Failed to update project"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Project not found".to_string()));
        }

        self.get_project_by_id(project.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
    }

    async fn delete_project(&self, id: Uuid) -> Result<()> {
        self.delete_target(TargetKind::Project, id).await
    }

    async fn search_projects(&self, query: &SearchQuery) -> Result<Vec<Project>> {
        let mut builder = select_hits(PROJECT_PROJECTION);
        push_text_filter(&mut builder, query, &["title", "description"]);
        push_order_and_page(&mut builder, query, ContentType::Projects);

        let rows = builder
            .build_query_as::<ProjectRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to search projects"))?;
        Ok(rows.into_iter().map(Project::from).collect())
    }
}

#[async_trait]
impl ArticleRepository for PostgresRepository {
    async fn create_article(&self, article: &Article) -> Result<Article> {
        sqlx::query(
            r#"
            INSERT INTO articles (id, author_id, title, body, summary, cover_image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(article.id)
        .bind(article.author_id)
        .bind(&article.title)
        .bind(&article.body)
        .bind(&article.summary)
        .bind(&article.cover_image_url)
        .bind(article.created_at)
        .bind(article.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(db_error("Failed to create article"))?;

        self.get_article_by_id(article.id)
            .await?
            .ok_or_else(|| AppError::DatabaseError("Created article could not be read back".to_string()))
    }

    async fn get_article_by_id(&self, id: Uuid) -> Result<Option<Article>> {
        let mut builder = select_hits(ARTICLE_PROJECTION);
        builder.push(" AND id = ").push_bind(id);

        let row = builder
            .build_query_as::<ArticleRow>()
            .fetch_optional(&*self.pool)
            .await
            .map_err(db_error("Failed to get article"))?;
        Ok(row.map(Article::from))
    }

    async fn list_articles(&self, page: Page) -> Result<Vec<Article>> {
        self.search_articles(&page_query(page)).await
    }

    async fn list_articles_by_author(&self, author_id: Uuid, page: Page) -> Result<Vec<Article>> {
        let mut builder = select_hits(ARTICLE_PROJECTION);
        builder.push(" AND author_id = ").push_bind(author_id);
        push_order_and_page(&mut builder, &page_query(page), ContentType::Articles);

        let rows = builder
            .build_query_as::<ArticleRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to list articles by author"))?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn update_article(&self, article: &Article) -> Result<Article> {
        let result = sqlx::query(
            r#"
            UPDATE articles
            SET title = $2, body = $3, summary = $4, cover_image_url = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.body)
        .bind(&article.summary)
        .bind(&article.cover_image_url)
        .bind(article.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(db_error("Failed to update article"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Article not found".to_string()));
        }

        self.get_article_by_id(article.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Article not found".to_string()))
    }

    async fn delete_article(&self, id: Uuid) -> Result<()> {
        self.delete_target(TargetKind::Article, id).await
    }

    async fn search_articles(&self, query: &SearchQuery) -> Result<Vec<Article>> {
        let mut builder = select_hits(ARTICLE_PROJECTION);
        push_text_filter(&mut builder, query, &["title", "summary"]);
        push_order_and_page(&mut builder, query, ContentType::Articles);

        let rows = builder
            .build_query_as::<ArticleRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to search articles"))?;
        Ok(rows.into_iter().map(Article::from).collect())
    }
}

#[async_trait]
impl PostRepository for PostgresRepository {
    async fn create_post(&self, post: &Post) -> Result<Post> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, content, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(db_error("Failed to create post"))?;

        self.get_post_by_id(post.id)
            .await?
            .ok_or_else(|| AppError::DatabaseError("Created post could not be read back".to_string()))
    }

    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        let mut builder = select_hits(POST_PROJECTION);
        builder.push(" AND id = ").push_bind(id);

        let row = builder
            .build_query_as::<PostRow>()
            .fetch_optional(&*self.pool)
            .await
            .map_err(db_error("Failed to get post"))?;
        Ok(row.map(Post::from))
    }

    async fn list_posts(&self, page: Page) -> Result<Vec<Post>> {
        self.search_posts(&page_query(page)).await
    }

    async fn list_posts_by_author(&self, author_id: Uuid, page: Page) -> Result<Vec<Post>> {
        let mut builder = select_hits(POST_PROJECTION);
        builder.push(" AND author_id = ").push_bind(author_id);
        push_order_and_page(&mut builder, &page_query(page), ContentType::Posts);

        let rows = builder
            .build_query_as::<PostRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to list posts by author"))?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn update_post(&self, post: &Post) -> Result<Post> {
        let result = sqlx::query("UPDATE posts SET content = $2, image_url = $3, updated_at = $4 WHERE id = $1")
            .bind(post.id)
            .bind(&post.content)
            .bind(&post.image_url)
            .bind(post.updated_at)
            .execute(&*self.pool)
            .await
            .map_err(db_error("Failed to update post"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        self.get_post_by_id(post.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    async fn delete_post(&self, id: Uuid) -> Result<()> {
        self.delete_target(TargetKind::Post, id).await
    }

    async fn search_posts(&self, query: &SearchQuery) -> Result<Vec<Post>> {
        let mut builder = select_hits(POST_PROJECTION);
        push_text_filter(&mut builder, query, &["content"]);
        push_order_and_page(&mut builder, query, ContentType::Posts);

        let rows = builder
            .build_query_as::<PostRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to search posts"))?;
        Ok(rows.into_iter().map(Post::from).collect())
    }
}

#[async_trait]
impl CommentRepository for PostgresRepository {
    async fn create_comment(&self, comment: &Comment) -> Result<Comment> {
        if !self.target_exists(comment.target_kind, comment.target_id).await? {
            return Err(AppError::NotFound(format!("{} not found", comment.target_kind)));
        }

        sqlx::query(
            r#"
            INSERT INTO comments (id, target_kind, target_id, author_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(comment.id)
        .bind(comment.target_kind.as_str())
        .bind(comment.target_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&*self.pool)
        .await
        .map_err(db_error("Failed to create comment"))?;

        self.get_comment_by_id(comment.id)
            .await?
            .ok_or_else(|| AppError::DatabaseError("Created comment could not be read back".to_string()))
    }

    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        let mut builder = select_hits(COMMENT_PROJECTION);
        builder.push(" AND id = ").push_bind(id);

        let row = builder
            .build_query_as::<CommentRow>()
            .fetch_optional(&*self.pool)
            .await
            .map_err(db_error("Failed to get comment"))?;
        row.map(Comment::try_from).transpose()
    }

    async fn list_comments(&self, target_kind: TargetKind, target_id: Uuid, page: Page) -> Result<Vec<Comment>> {
        let mut builder = select_hits(COMMENT_PROJECTION);
        builder.push(" AND target_kind = ").push_bind(target_kind.as_str());
        builder.push(" AND target_id = ").push_bind(target_id);
        builder.push(" ORDER BY created_at ASC, id ASC");
        push_page(&mut builder, page);

        let rows = builder
            .build_query_as::<CommentRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to list comments"))?;
        rows.into_iter().map(Comment::try_from).collect()
    }

    async fn delete_comment(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(db_error("Failed to delete comment"))?;
        Ok(())
    }
}

#[async_trait]
impl EngagementRepository for PostgresRepository {
    async fn add_like(&self, like: &Like) -> Result<bool> {
        if !self.target_exists(like.target_kind, like.target_id).await? {
            return Err(AppError::NotFound(format!("{} not found", like.target_kind)));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO likes (user_id, target_kind, target_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(like.user_id)
        .bind(like.target_kind.as_str())
        .bind(like.target_id)
        .bind(like.created_at)
        .execute(&*self.pool)
        .await
        .map_err(db_error("Failed to add like"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_like(&self, user_id: Uuid, target_kind: TargetKind, target_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND target_kind = $2 AND target_id = $3")
            .bind(user_id)
            .bind(target_kind.as_str())
            .bind(target_id)
            .execute(&*self.pool)
            .await
            .map_err(db_error("Failed to remove like"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_likes(&self, target_kind: TargetKind, target_id: Uuid) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE target_kind = $1 AND target_id = $2")
            .bind(target_kind.as_str())
            .bind(target_id)
            .fetch_one(&*self.pool)
            .await
            .map_err(db_error("Failed to count likes"))
    }

    async fn add_follow(&self, follow: &Follow) -> Result<bool> {
        if self.get_user_by_id(follow.followee_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, followee_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(follow.follower_id)
        .bind(follow.followee_id)
        .bind(follow.created_at)
        .execute(&*self.pool)
        .await
        .map_err(db_error("Failed to follow user"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
            .bind(follower_id)
            .bind(followee_id)
            .execute(&*self.pool)
            .await
            .map_err(db_error("Failed to unfollow user"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_followers(&self, user_id: Uuid) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE followee_id = $1")
            .bind(user_id)
            .fetch_one(&*self.pool)
            .await
            .map_err(db_error("Failed to count followers"))
    }

    async fn list_followers(&self, user_id: Uuid, page: Page) -> Result<Vec<User>> {
        self.users_via("JOIN follows rel ON rel.follower_id = hits.id WHERE rel.followee_id = ", user_id, page)
            .await
    }

    async fn list_following(&self, user_id: Uuid, page: Page) -> Result<Vec<User>> {
        self.users_via("JOIN follows rel ON rel.followee_id = hits.id WHERE rel.follower_id = ", user_id, page)
            .await
    }

    async fn add_watch(&self, watch: &Watch) -> Result<bool> {
        if !self.target_exists(TargetKind::Project, watch.project_id).await? {
            return Err(AppError::NotFound("Project not found".to_string()));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO watches (user_id, project_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(watch.user_id)
        .bind(watch.project_id)
        .bind(watch.created_at)
        .execute(&*self.pool)
        .await
        .map_err(db_error("Failed to watch project"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_watch(&self, user_id: Uuid, project_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM watches WHERE user_id = $1 AND project_id = $2")
            .bind(user_id)
            .bind(project_id)
            .execute(&*self.pool)
            .await
            .map_err(db_error("Failed to unwatch project"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_watchers(&self, project_id: Uuid) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM watches WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(&*self.pool)
            .await
            .map_err(db_error("Failed to count watchers"))
    }

    async fn list_watchers(&self, project_id: Uuid, page: Page) -> Result<Vec<User>> {
        self.users_via("JOIN watches rel ON rel.user_id = hits.id WHERE rel.project_id = ", project_id, page)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortKey;

    #[test]
    fn test_search_sql_binds_text_and_inlines_allow_listed_order() {
        let mut query = SearchQuery::new(Some("o'brien; --"));
        query.sort = SortKey::Popular;

        let mut builder = select_hits(USER_PROJECTION);
        push_text_filter(&mut builder, &query, &["username", "full_name"]);
        push_order_and_page(&mut builder, &query, ContentType::Users);
        let sql = builder.sql();

        assert!(sql.contains("AND (username ILIKE $1 OR full_name ILIKE $2)"));
        assert!(sql.contains("ORDER BY follower_count DESC, created_at DESC, id DESC LIMIT $3 OFFSET $4"));
        assert!(!sql.contains("o'brien"));
    }

    #[test]
    fn test_search_sql_without_text_has_no_text_filter() {
        let query = SearchQuery::default();
        let mut builder = select_hits(POST_PROJECTION);
        push_text_filter(&mut builder, &query, &["content"]);
        push_order_and_page(&mut builder, &query, ContentType::Posts);

        let sql = builder.sql();
        assert!(!sql.contains("ILIKE"));
        assert!(sql.ends_with("ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"));
    }

    fn user(username: &str, user_type: UserType) -> User {
        let now = Utc::now();
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
            created_at: now,
            updated_at: now,
            follower_count: 0,
            following_count: 0,
        }
    }

    fn project(owner_id: Uuid, title: &str, description: &str) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            owner_id,
            owner_username: None,
            title: title.to_string(),
            description: Some(description.to_string()),
            repository_url: None,
            tags: vec!["search".to_string()],
            created_at: now,
            updated_at: now,
            like_count: 0,
            watch_count: 0,
            comment_count: 0,
        }
    }

    // Needs a reachable database: DATABASE_URL=postgres://... cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_search_against_postgres() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let database = PostgresDatabase::new(&url, 2).await.unwrap();
        crate::db::migrations::run_migrations(&database.pool).await.unwrap();
        let repo = database.repository();

        let tag = Uuid::new_v4().simple().to_string()[..8].to_string();
        let mentor = repo.create_user(&user(&format!("mentor_{}", tag), UserType::Mentor)).await.unwrap();
        let individual = repo.create_user(&user(&format!("solo_{}", tag), UserType::Individual)).await.unwrap();
        let literal = repo
            .create_project(&project(mentor.id, "Coverage", &format!("{}% coverage", tag)))
            .await
            .unwrap();
        let decoy = repo
            .create_project(&project(mentor.id, "Coverage", &format!("{}x coverage", tag)))
            .await
            .unwrap();

        let mut query = SearchQuery::new(Some(tag.as_str()));
        query.user_types = vec![UserType::Mentor, UserType::Organization];
        let users = repo.search_users(&query).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, mentor.id);

        // `%` in the search text is a literal, not a wildcard
        let query = SearchQuery::new(Some(format!("{}%", tag).as_str()));
        let projects = repo.search_projects(&query).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, literal.id);
        assert_eq!(projects[0].owner_username.as_deref(), Some(mentor.username.as_str()));

        repo.delete_project(literal.id).await.unwrap();
        repo.delete_project(decoy.id).await.unwrap();
        repo.delete_user(mentor.id).await.unwrap();
        repo.delete_user(individual.id).await.unwrap();
    }
}
