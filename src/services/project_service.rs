use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use crate::db::repository::{ProjectRepository, UserRepository};
use crate::models::{Page, Project};
use crate::models::project::{normalize_tags, CreateProjectRequest, ProjectResponse, UpdateProjectRequest};
use crate::services::{optional_text, require_profile, validate_text};
use crate::{AppError, Result};

const TITLE_MAX: usize = 120;
const MAX_TAGS: usize = 10;

pub struct ProjectService {
    project_repo: Arc<dyn ProjectRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl ProjectService {
    pub fn new(project_repo: Arc<dyn ProjectRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self { project_repo, user_repo }
    }

    pub async fn create_project(&self, owner_id: Uuid, request: CreateProjectRequest) -> Result<ProjectResponse> {
        let title = validate_text("title", &request.title, 1, TITLE_MAX)?;
        let tags = validate_tags(&request.tags)?;
        require_profile(self.user_repo.as_ref(), owner_id).await?;

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            owner_id,
            owner_username: None,
            title,
            description: optional_text(request.description),
            repository_url: optional_text(request.repository_url),
            tags,
            created_at: now,
            updated_at: now,
            like_count: 0,
            watch_count: 0,
            comment_count: 0,
        };

        let created = self.project_repo.create_project(&project).await?;
        tracing::info!("📁 PROJECTS: Created project {} by {}", created.id, owner_id);
        Ok(created.into())
    }

    pub async fn get_project(&self, project_id: Uuid) -> Result<ProjectResponse> {
        self.find_project(project_id).await.map(ProjectResponse::from)
    }

    pub async fn list_projects(&self, page: Page) -> Result<Vec<ProjectResponse>> {
        let projects = self.project_repo.list_projects(page).await?;
        Ok(projects.into_iter().map(ProjectResponse::from).collect())
    }

    pub async fn list_projects_by_owner(&self, owner_id: Uuid, page: Page) -> Result<Vec<ProjectResponse>> {
        let projects = self.project_repo.list_projects_by_owner(owner_id, page).await?;
        Ok(projects.into_iter().map(ProjectResponse::from).collect())
    }

    pub async fn update_project(
        &self,
        caller: Uuid,
        project_id: Uuid,
        request: UpdateProjectRequest,
    ) -> Result<ProjectResponse> {
        let mut project = self.find_project(project_id).await?;
        if project.owner_id != caller {
            return Err(AppError::Forbidden("Only the owner can modify this project".to_string()));
        }

        if let Some(title) = request.title {
            project.title = validate_text("title", &title, 1, TITLE_MAX)?;
        }
        if request.description.is_some() {
            project.description = optional_text(request.description);
        }
        if request.repository_url.is_some() {
            project.repository_url = optional_text(request.repository_url);
        }
        if let Some(tags) = request.tags {
            project.tags = validate_tags(&tags)?;
        }
        project.updated_at = Utc::now();

        let updated = self.project_repo.update_project(&project).await?;
        Ok(updated.into())
    }

    pub async fn delete_project(&self, caller: Uuid, project_id: Uuid) -> Result<()> {
        let project = self.find_project(project_id).await?;
        if project.owner_id != caller {
            return Err(AppError::Forbidden("Only the owner can delete this project".to_string()));
        }

        self.project_repo.delete_project(project_id).await?;
        tracing::info!("🗑️ PROJECTS: Deleted project {}", project_id);
        Ok(())
    }

    async fn find_project(&self, project_id: Uuid) -> Result<Project> {
        self.project_repo
            .get_project_by_id(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
    }
}

fn validate_tags(tags: &[String]) -> Result<Vec<String>> {
    let tags = normalize_tags(tags);
    if tags.len() > MAX_TAGS {
        return Err(AppError::ValidationError(format!("A project can have at most {} tags", MAX_TAGS)));
    }
    Ok(tags)
}
