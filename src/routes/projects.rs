use axum::{
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use uuid::Uuid;
use crate::auth::AuthUser;
use crate::models::comment::CreateCommentRequest;
use crate::models::project::{CreateProjectRequest, UpdateProjectRequest};
use crate::models::{PaginationParams, TargetKind};
use crate::routes::comments::{create_target_comment, like_body, list_target_comments};
use crate::routes::paged;
use crate::routes::extract::{Json, Path, Query};
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/:project_id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/:project_id/like", post(like_project).delete(unlike_project))
        .route("/projects/:project_id/watch", post(watch_project).delete(unwatch_project))
        .route("/projects/:project_id/watchers", get(list_watchers))
        .route("/projects/:project_id/comments", get(list_comments).post(create_comment))
}

pub async fn create_project(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateProjectRequest>,
) -> Result<(StatusCode, ResponseJson<Value>)> {
    let project = app_state.project_service.create_project(auth.user_id, request).await?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(json!({
            "project": project,
            "message": "Project created successfully"
        })),
    ))
}

pub async fn list_projects(
    State(app_state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<ResponseJson<Value>> {
    let page = params.page();
    let projects = app_state.project_service.list_projects(page).await?;
    Ok(ResponseJson(paged("projects", projects, page)))
}

pub async fn get_project(
    State(app_state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<Value>> {
    let project = app_state.project_service.get_project(project_id).await?;
    Ok(ResponseJson(json!({ "project": project })))
}

pub async fn update_project(
    State(app_state): State<AppState>,
    Path(project_id): Path<Uuid>,
    auth: AuthUser,
    Json(request): Json<UpdateProjectRequest>,
) -> Result<ResponseJson<Value>> {
    let project = app_state
        .project_service
        .update_project(auth.user_id, project_id, request)
        .await?;

    Ok(ResponseJson(json!({
        "project": project,
        "message": "Project updated successfully"
    })))
}

pub async fn delete_project(
    State(app_state): State<AppState>,
    Path(project_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    app_state.project_service.delete_project(auth.user_id, project_id).await?;
    Ok(ResponseJson(json!({ "message": "Project deleted successfully" })))
}

pub async fn like_project(
    State(app_state): State<AppState>,
    Path(project_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    let state = app_state
        .engagement_service
        .like(auth.user_id, TargetKind::Project, project_id)
        .await?;
    Ok(like_body(state))
}

pub async fn unlike_project(
    State(app_state): State<AppState>,
    Path(project_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    let state = app_state
        .engagement_service
        .unlike(auth.user_id, TargetKind::Project, project_id)
        .await?;
    Ok(like_body(state))
}

pub async fn watch_project(
    State(app_state): State<AppState>,
    Path(project_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    let state = app_state.engagement_service.watch(auth.user_id, project_id).await?;
    Ok(ResponseJson(json!({
        "watching": state.active,
        "watch_count": state.count
    })))
}

pub async fn unwatch_project(
    State(app_state): State<AppState>,
    Path(project_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    let state = app_state.engagement_service.unwatch(auth.user_id, project_id).await?;
    Ok(ResponseJson(json!({
        "watching": state.active,
        "watch_count": state.count
    })))
}

pub async fn list_watchers(
    State(app_state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<ResponseJson<Value>> {
    let page = params.page();
    let watchers = app_state.engagement_service.list_watchers(project_id, page).await?;
    Ok(ResponseJson(paged("watchers", watchers, page)))
}

pub async fn list_comments(
    State(app_state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<ResponseJson<Value>> {
    list_target_comments(&app_state, TargetKind::Project, project_id, params).await
}

pub async fn create_comment(
    State(app_state): State<AppState>,
    Path(project_id): Path<Uuid>,
    auth: AuthUser,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, ResponseJson<Value>)> {
    create_target_comment(&app_state, auth, TargetKind::Project, project_id, request).await
}
