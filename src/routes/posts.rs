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
use crate::models::post::{CreatePostRequest, UpdatePostRequest};
use crate::models::{PaginationParams, TargetKind};
use crate::routes::comments::{create_target_comment, like_body, list_target_comments};
use crate::routes::paged;
use crate::routes::extract::{Json, Path, Query};
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(get_posts).post(create_post))
        .route("/posts/:post_id", get(get_post).put(update_post).delete(delete_post))
        .route("/posts/:post_id/like", post(like_post).delete(unlike_post))
        .route("/posts/:post_id/comments", get(list_comments).post(create_comment))
}

pub async fn create_post(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, ResponseJson<Value>)> {
    let post = app_state.post_service.create_post(auth.user_id, request).await?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(json!({
            "post": post,
            "message": "Post created successfully",
            "author": {
                "id": auth.user_id,
                "username": auth.username
            }
        })),
    ))
}

pub async fn get_posts(
    State(app_state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<ResponseJson<Value>> {
    let page = params.page();
    let posts = app_state.post_service.list_posts(page).await?;
    Ok(ResponseJson(paged("posts", posts, page)))
}

pub async fn get_post(
    State(app_state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<ResponseJson<Value>> {
    let post = app_state.post_service.get_post(post_id).await?;
    Ok(ResponseJson(json!({ "post": post })))
}

pub async fn update_post(
    State(app_state): State<AppState>,
    Path(post_id): Path<Uuid>,
    auth: AuthUser,
    Json(request): Json<UpdatePostRequest>,
) -> Result<ResponseJson<Value>> {
    let post = app_state.post_service.update_post(auth.user_id, post_id, request).await?;

    Ok(ResponseJson(json!({
        "post": post,
        "message": "Post updated successfully"
    })))
}

pub async fn delete_post(
    State(app_state): State<AppState>,
    Path(post_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    app_state.post_service.delete_post(auth.user_id, post_id).await?;
    Ok(ResponseJson(json!({ "message": "Post deleted successfully" })))
}

pub async fn like_post(
    State(app_state): State<AppState>,
    Path(post_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    let state = app_state.engagement_service.like(auth.user_id, TargetKind::Post, post_id).await?;
    Ok(like_body(state))
}

pub async fn unlike_post(
    State(app_state): State<AppState>,
    Path(post_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    let state = app_state.engagement_service.unlike(auth.user_id, TargetKind::Post, post_id).await?;
    Ok(like_body(state))
}

pub async fn list_comments(
    State(app_state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<ResponseJson<Value>> {
    list_target_comments(&app_state, TargetKind::Post, post_id, params).await
}

pub async fn create_comment(
    State(app_state): State<AppState>,
    Path(post_id): Path<Uuid>,
    auth: AuthUser,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, ResponseJson<Value>)> {
    create_target_comment(&app_state, auth, TargetKind::Post, post_id, request).await
}
