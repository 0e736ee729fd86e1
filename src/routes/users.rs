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
use crate::models::user::{CreateUserRequest, UpdateUserRequest};
use crate::models::PaginationParams;
use crate::routes::paged;
use crate::routes::extract::{Json, Path, Query};
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:user_id", get(get_user).put(update_user).delete(delete_user))
        .route("/users/:user_id/projects", get(list_user_projects))
        .route("/users/:user_id/articles", get(list_user_articles))
        .route("/users/:user_id/posts", get(list_user_posts))
        .route("/users/:user_id/followers", get(list_followers))
        .route("/users/:user_id/following", get(list_following))
        .route("/users/:user_id/follow", post(follow_user).delete(unfollow_user))
}

pub async fn create_user(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, ResponseJson<Value>)> {
    let user = app_state.user_service.create_user(auth.user_id, request).await?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(json!({
            "user": user,
            "message": "Profile created successfully"
        })),
    ))
}

pub async fn list_users(
    State(app_state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<ResponseJson<Value>> {
    let page = params.page();
    let users = app_state.user_service.list_users(page).await?;
    Ok(ResponseJson(paged("users", users, page)))
}

pub async fn get_user(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<Value>> {
    let user = app_state.user_service.get_user(user_id).await?;
    Ok(ResponseJson(json!({ "user": user })))
}

pub async fn update_user(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
    auth: AuthUser,
    Json(request): Json<UpdateUserRequest>,
) -> Result<ResponseJson<Value>> {
    let user = app_state.user_service.update_user(auth.user_id, user_id, request).await?;

    Ok(ResponseJson(json!({
        "user": user,
        "message": "Profile updated successfully"
    })))
}

pub async fn delete_user(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    app_state.user_service.delete_user(auth.user_id, user_id).await?;
    Ok(ResponseJson(json!({ "message": "Profile deleted successfully" })))
}

pub async fn list_user_projects(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<ResponseJson<Value>> {
    app_state.user_service.ensure_exists(user_id).await?;
    let page = params.page();
    let projects = app_state.project_service.list_projects_by_owner(user_id, page).await?;
    Ok(ResponseJson(paged("projects", projects, page)))
}

pub async fn list_user_articles(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<ResponseJson<Value>> {
    app_state.user_service.ensure_exists(user_id).await?;
    let page = params.page();
    let articles = app_state.article_service.list_articles_by_author(user_id, page).await?;
    Ok(ResponseJson(paged("articles", articles, page)))
}

pub async fn list_user_posts(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<ResponseJson<Value>> {
    app_state.user_service.ensure_exists(user_id).await?;
    let page = params.page();
    let posts = app_state.post_service.list_posts_by_author(user_id, page).await?;
    Ok(ResponseJson(paged("posts", posts, page)))
}

pub async fn list_followers(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<ResponseJson<Value>> {
    let page = params.page();
    let followers = app_state.engagement_service.list_followers(user_id, page).await?;
    Ok(ResponseJson(paged("followers", followers, page)))
}

pub async fn list_following(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<ResponseJson<Value>> {
    let page = params.page();
    let following = app_state.engagement_service.list_following(user_id, page).await?;
    Ok(ResponseJson(paged("following", following, page)))
}

pub async fn follow_user(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    let state = app_state.engagement_service.follow(auth.user_id, user_id).await?;
    Ok(ResponseJson(json!({
        "following": state.active,
        "follower_count": state.count
    })))
}

pub async fn unfollow_user(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    let state = app_state.engagement_service.unfollow(auth.user_id, user_id).await?;
    Ok(ResponseJson(json!({
        "following": state.active,
        "follower_count": state.count
    })))
}
