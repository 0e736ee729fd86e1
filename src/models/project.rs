use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_username: Option<String>, // Denormalized, joined on read
    pub title: String,
    pub description: Option<String>,
    pub repository_url: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub like_count: i64,
    pub watch_count: i64,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
    pub repository_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub repository_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub title: String,
    pub description: String,
    pub repository_url: String,
    pub tags: Vec<String>,
    pub like_count: i64,
    pub watch_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            owner_id: project.owner_id,
            owner_username: project.owner_username.unwrap_or_default(),
            title: project.title,
            description: project.description.unwrap_or_default(),
            repository_url: project.repository_url.unwrap_or_default(),
            tags: project.tags,
            like_count: project.like_count.max(0),
            watch_count: project.watch_count.max(0),
            comment_count: project.comment_count.max(0),
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// Normalizes user-supplied tags: trimmed, lowercased, deduplicated in first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}
