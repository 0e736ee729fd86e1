//! Explore/search types: content-type selection, the sort-field allow-list,
//! pagination and the merged response.
//!
//! Storage backends share these so the in-memory store and PostgreSQL agree
//! on matching, ordering and paging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::article::{Article, ArticleResponse};
use super::post::{Post, PostResponse};
use super::project::{Project, ProjectResponse};
use super::user::{User, UserResponse, UserType};
use crate::{AppError, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Users,
    Projects,
    Articles,
    Posts,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Users,
        ContentType::Projects,
        ContentType::Articles,
        ContentType::Posts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Users => "users",
            ContentType::Projects => "projects",
            ContentType::Articles => "articles",
            ContentType::Posts => "posts",
        }
    }

    /// Parses a comma-separated list. Blank input selects every content type.
    pub fn parse_list(raw: Option<&str>) -> Result<Vec<ContentType>> {
        let mut selected = Vec::new();
        for name in raw.unwrap_or("").split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let content_type = name.parse::<ContentType>().map_err(AppError::ValidationError)?;
            if !selected.contains(&content_type) {
                selected.push(content_type);
            }
        }

        if selected.is_empty() {
            Ok(Self::ALL.to_vec())
        } else {
            Ok(selected)
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "users" | "user" => Ok(ContentType::Users),
            "projects" | "project" => Ok(ContentType::Projects),
            "articles" | "article" => Ok(ContentType::Articles),
            "posts" | "post" => Ok(ContentType::Posts),
            other => Err(format!("Unknown content type: {}", other)),
        }
    }
}

/// Client-facing sort keys. Each one resolves to a fixed ORDER BY clause per
/// content type; nothing a client sends is ever interpolated into SQL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Popular,
    Alphabetical,
}

impl SortKey {
    /// Unknown keys fall back to `Newest`.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return SortKey::default();
        };

        match raw.to_lowercase().as_str() {
            "newest" | "recent" => SortKey::Newest,
            "oldest" => SortKey::Oldest,
            "popular" | "popularity" => SortKey::Popular,
            "alphabetical" | "name" | "title" => SortKey::Alphabetical,
            other => {
                tracing::warn!("⚠️ SEARCH: Unsupported sort key '{}', using newest", other);
                SortKey::default()
            }
        }
    }

    /// ORDER BY clause over the search projection columns for `content_type`.
    ///
    /// Alphabetical order in Postgres follows the database collation; the
    /// in-memory store compares lowercased code points, so the two may differ
    /// for punctuation and non-ASCII names.
    pub fn order_by(&self, content_type: ContentType) -> &'static str {
        match (self, content_type) {
            (SortKey::Newest, _) => "created_at DESC, id DESC",
            (SortKey::Oldest, _) => "created_at ASC, id ASC",
            (SortKey::Popular, ContentType::Users) => "follower_count DESC, created_at DESC, id DESC",
            (SortKey::Popular, _) => "like_count DESC, created_at DESC, id DESC",
            (SortKey::Alphabetical, ContentType::Users) => "LOWER(username) ASC, id ASC",
            (SortKey::Alphabetical, ContentType::Posts) => "LOWER(content) ASC, id ASC",
            (SortKey::Alphabetical, _) => "LOWER(title) ASC, id ASC",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { number: 1, size: DEFAULT_PAGE_SIZE }
    }
}

impl Page {
    /// Page numbers start at 1; sizes are clamped to `1..=MAX_PAGE_SIZE`.
    pub fn new(number: Option<u32>, size: Option<u32>) -> Self {
        Self {
            number: number.unwrap_or(1).max(1),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.number as u64 - 1) * self.size as u64
    }

    pub fn limit(&self) -> u64 {
        self.size as u64
    }
}

/// Query-string pagination accepted by every list endpoint
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PaginationParams {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.page_size)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub user_types: Vec<UserType>,
    pub sort: SortKey,
    pub page: Page,
}

impl SearchQuery {
    pub fn new(text: Option<&str>) -> Self {
        Self {
            text: text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string),
            ..Self::default()
        }
    }

    /// Case-insensitive substring match against any of `fields`.
    /// No text means everything matches.
    pub fn matches_text(&self, fields: &[Option<&str>]) -> bool {
        let Some(text) = &self.text else {
            return true;
        };
        let needle = text.to_lowercase();
        fields
            .iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    pub fn matches_user_type(&self, user_type: UserType) -> bool {
        self.user_types.is_empty() || self.user_types.contains(&user_type)
    }

    /// `ILIKE` pattern with `\`, `%` and `_` escaped so they match literally.
    pub fn like_pattern(&self) -> Option<String> {
        self.text.as_ref().map(|text| {
            let mut escaped = String::with_capacity(text.len() + 2);
            escaped.push('%');
            for c in text.chars() {
                if matches!(c, '\\' | '%' | '_') {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            escaped.push('%');
            escaped
        })
    }
}

/// Raw `/search` query string
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub content_types: Option<String>,
    pub user_types: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl SearchParams {
    pub fn into_query(self) -> Result<(SearchQuery, Vec<ContentType>)> {
        let content_types = ContentType::parse_list(self.content_types.as_deref())?;

        let mut user_types = Vec::new();
        for name in self.user_types.as_deref().unwrap_or("").split(',').filter(|s| !s.trim().is_empty()) {
            let user_type = name.parse::<UserType>().map_err(AppError::ValidationError)?;
            if !user_types.contains(&user_type) {
                user_types.push(user_type);
            }
        }

        let query = SearchQuery {
            user_types,
            sort: SortKey::parse_or_default(self.sort.as_deref()),
            page: Page::new(self.page, self.page_size),
            ..SearchQuery::new(self.q.as_deref())
        };

        Ok((query, content_types))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub users: Vec<UserResponse>,
    pub projects: Vec<ProjectResponse>,
    pub articles: Vec<ArticleResponse>,
    pub posts: Vec<PostResponse>,
    pub page: u32,
    pub page_size: u32,
    /// Content types whose query failed and were returned empty
    pub failed: Vec<ContentType>,
}

/// Row shape the in-memory store filters, orders and pages with the same
/// semantics as the SQL built from [`SortKey::order_by`].
pub trait Searchable: Clone {
    const CONTENT_TYPE: ContentType;

    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    fn popularity(&self) -> i64;
    fn sort_name(&self) -> &str;
    fn text_fields(&self) -> Vec<Option<&str>>;

    fn user_type(&self) -> Option<UserType> {
        None
    }
}

impl Searchable for User {
    const CONTENT_TYPE: ContentType = ContentType::Users;

    fn id(&self) -> Uuid { self.id }
    fn created_at(&self) -> DateTime<Utc> { self.created_at }
    fn popularity(&self) -> i64 { self.follower_count }
    fn sort_name(&self) -> &str { &self.username }
    fn text_fields(&self) -> Vec<Option<&str>> {
        vec![Some(self.username.as_str()), self.full_name.as_deref()]
    }
    fn user_type(&self) -> Option<UserType> { Some(self.user_type) }
}

impl Searchable for Project {
    const CONTENT_TYPE: ContentType = ContentType::Projects;

    fn id(&self) -> Uuid { self.id }
    fn created_at(&self) -> DateTime<Utc> { self.created_at }
    fn popularity(&self) -> i64 { self.like_count }
    fn sort_name(&self) -> &str { &self.title }
    fn text_fields(&self) -> Vec<Option<&str>> {
        vec![Some(self.title.as_str()), self.description.as_deref()]
    }
}

impl Searchable for Article {
    const CONTENT_TYPE: ContentType = ContentType::Articles;

    fn id(&self) -> Uuid { self.id }
    fn created_at(&self) -> DateTime<Utc> { self.created_at }
    fn popularity(&self) -> i64 { self.like_count }
    fn sort_name(&self) -> &str { &self.title }
    fn text_fields(&self) -> Vec<Option<&str>> {
        vec![Some(self.title.as_str()), self.summary.as_deref()]
    }
}

impl Searchable for Post {
    const CONTENT_TYPE: ContentType = ContentType::Posts;

    fn id(&self) -> Uuid { self.id }
    fn created_at(&self) -> DateTime<Utc> { self.created_at }
    fn popularity(&self) -> i64 { self.like_count }
    fn sort_name(&self) -> &str { &self.content }
    fn text_fields(&self) -> Vec<Option<&str>> {
        vec![Some(self.content.as_str())]
    }
}

fn compare<T: Searchable>(sort: SortKey, a: &T, b: &T) -> Ordering {
    match sort {
        SortKey::Newest => b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id())),
        SortKey::Oldest => a.created_at().cmp(&b.created_at()).then_with(|| a.id().cmp(&b.id())),
        SortKey::Popular => b
            .popularity()
            .cmp(&a.popularity())
            .then_with(|| b.created_at().cmp(&a.created_at()))
            .then_with(|| b.id().cmp(&a.id())),
        SortKey::Alphabetical => a
            .sort_name()
            .to_lowercase()
            .cmp(&b.sort_name().to_lowercase())
            .then_with(|| a.id().cmp(&b.id())),
    }
}

/// Filters, orders and pages `rows` according to `query`.
pub fn apply_search<T: Searchable>(rows: Vec<T>, query: &SearchQuery) -> Vec<T> {
    let mut hits: Vec<T> = rows
        .into_iter()
        .filter(|row| query.matches_text(&row.text_fields()))
        .filter(|row| row.user_type().map_or(true, |t| query.matches_user_type(t)))
        .collect();

    hits.sort_by(|a, b| compare(query.sort, a, b));

    hits.into_iter()
        .skip(query.page.offset() as usize)
        .take(query.page.limit() as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn post(content: &str, likes: i64, age_minutes: i64) -> Post {
        let created_at = Utc::now() - Duration::minutes(age_minutes);
        Post {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            author_username: None,
            content: content.to_string(),
            image_url: None,
            created_at,
            updated_at: created_at,
            like_count: likes,
            comment_count: 0,
        }
    }

    #[test]
    fn test_content_type_list_parsing() {
        assert_eq!(ContentType::parse_list(None).unwrap(), ContentType::ALL.to_vec());
        assert_eq!(ContentType::parse_list(Some(" , ")).unwrap(), ContentType::ALL.to_vec());
        assert_eq!(
            ContentType::parse_list(Some("Projects,users,projects")).unwrap(),
            vec![ContentType::Projects, ContentType::Users]
        );
        assert!(matches!(
            ContentType::parse_list(Some("users,videos")),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_sort_key_allow_list() {
        assert_eq!(SortKey::parse_or_default(None), SortKey::Newest);
        assert_eq!(SortKey::parse_or_default(Some("Popular")), SortKey::Popular);
        assert_eq!(SortKey::parse_or_default(Some("password_hash; DROP TABLE users")), SortKey::Newest);

        assert_eq!(SortKey::Popular.order_by(ContentType::Users), "follower_count DESC, created_at DESC, id DESC");
        assert_eq!(SortKey::Popular.order_by(ContentType::Projects), "like_count DESC, created_at DESC, id DESC");
        assert_eq!(SortKey::Alphabetical.order_by(ContentType::Posts), "LOWER(content) ASC, id ASC");
    }

    #[test]
    fn test_page_clamping_and_offsets() {
        assert_eq!(Page::new(None, None), Page { number: 1, size: DEFAULT_PAGE_SIZE });
        assert_eq!(Page::new(Some(0), Some(0)), Page { number: 1, size: 1 });
        assert_eq!(Page::new(Some(3), Some(500)).size, MAX_PAGE_SIZE);
        assert_eq!(Page::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(SearchQuery::new(Some("  ")).like_pattern(), None);
        assert_eq!(SearchQuery::new(Some("rust")).like_pattern().unwrap(), "%rust%");
        assert_eq!(SearchQuery::new(Some("50%_off\\")).like_pattern().unwrap(), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_text_matching_is_case_insensitive() {
        let query = SearchQuery::new(Some("RuSt"));
        assert!(query.matches_text(&[Some("learning rust"), None]));
        assert!(query.matches_text(&[None, Some("TRUSTED")]));
        assert!(!query.matches_text(&[Some("go"), None]));
        assert!(SearchQuery::new(None).matches_text(&[None]));
    }

    #[test]
    fn test_search_params_into_query() {
        let params = SearchParams {
            q: Some(" graph ".to_string()),
            content_types: Some("users".to_string()),
            user_types: Some("mentor,organization,mentor".to_string()),
            sort: Some("oldest".to_string()),
            page: Some(2),
            page_size: Some(5),
        };
        let (query, types) = params.into_query().unwrap();
        assert_eq!(types, vec![ContentType::Users]);
        assert_eq!(query.text.as_deref(), Some("graph"));
        assert_eq!(query.user_types, vec![UserType::Mentor, UserType::Organization]);
        assert_eq!(query.sort, SortKey::Oldest);
        assert_eq!(query.page.offset(), 5);

        let bad = SearchParams { user_types: Some("robot".to_string()), ..SearchParams::default() };
        assert!(bad.into_query().is_err());
    }

    #[test]
    fn test_apply_search_filters_sorts_and_pages() {
        let rows = vec![
            post("Rust async tips", 2, 30),
            post("rust ownership", 9, 10),
            post("Gardening", 50, 5),
            post("RUST macros", 9, 20),
        ];

        let mut query = SearchQuery::new(Some("rust"));
        query.sort = SortKey::Popular;
        let hits = apply_search(rows.clone(), &query);
        let contents: Vec<&str> = hits.iter().map(|p| p.content.as_str()).collect();
        // Equal likes fall back to newest first
        assert_eq!(contents, vec!["rust ownership", "RUST macros", "Rust async tips"]);

        query.sort = SortKey::Alphabetical;
        query.page = Page::new(Some(2), Some(2));
        let hits = apply_search(rows.clone(), &query);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "rust ownership");

        query.page = Page::new(Some(9), Some(2));
        assert!(apply_search(rows, &query).is_empty());
    }

    #[test]
    fn test_alphabetical_sort_ignores_case() {
        let rows = vec![post("charlie", 0, 1), post("Bravo", 0, 2), post("alpha", 0, 3), post("ALPHA", 0, 4)];

        let mut query = SearchQuery::new(None);
        query.sort = SortKey::Alphabetical;
        let hits = apply_search(rows, &query);

        let names: Vec<String> = hits.iter().map(|p| p.content.to_lowercase()).collect();
        assert_eq!(names, vec!["alpha", "alpha", "bravo", "charlie"]);
        assert_eq!(hits[2].content, "Bravo");
    }
}
