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
use crate::models::article::{CreateArticleRequest, UpdateArticleRequest};
use crate::models::comment::CreateCommentRequest;
use crate::models::{PaginationParams, TargetKind};
use crate::routes::comments::{create_target_comment, like_body, list_target_comments};
use crate::routes::paged;
use crate::routes::extract::{Json, Path, Query};
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/articles", get(list_articles).post(create_article))
        .route(
            "/articles/:article_id",
            get(get_article).put(update_article).delete(delete_article),
        )
        .route("/articles/:article_id/like", post(like_article).delete(unlike_article))
        .route("/articles/:article_id/comments", get(list_comments).post(create_comment))
}

pub async fn create_article(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateArticleRequest>,
) -> Result<(StatusCode, ResponseJson<Value>)> {
    let article = app_state.article_service.create_article(auth.user_id, request).await?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(json!({
            "article": article,
            "message": "Article published successfully"
        })),
    ))
}

pub async fn list_articles(
    State(app_state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<ResponseJson<Value>> {
    let page = params.page();
    let articles = app_state.article_service.list_articles(page).await?;
    Ok(ResponseJson(paged("articles", articles, page)))
}

pub async fn get_article(
    State(app_state): State<AppState>,
    Path(article_id): Path<Uuid>,
) -> Result<ResponseJson<Value>> {
    let article = app_state.article_service.get_article(article_id).await?;
    Ok(ResponseJson(json!({ "article": article })))
}

pub async fn update_article(
    State(app_state): State<AppState>,
    Path(article_id): Path<Uuid>,
    auth: AuthUser,
    Json(request): Json<UpdateArticleRequest>,
) -> Result<ResponseJson<Value>> {
    let article = app_state
        .article_service
        .update_article(auth.user_id, article_id, request)
        .await?;

    Ok(ResponseJson(json!({
        "article": article,
        "message": "Article updated successfully"
    })))
}

pub async fn delete_article(
    State(app_state): State<AppState>,
    Path(article_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    app_state.article_service.delete_article(auth.user_id, article_id).await?;
    Ok(ResponseJson(json!({ "message": "Article deleted successfully" })))
}

pub async fn like_article(
    State(app_state): State<AppState>,
    Path(article_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    let state = app_state
        .engagement_service
        .like(auth.user_id, TargetKind::Article, article_id)
        .await?;
    Ok(like_body(state))
}

pub async fn unlike_article(
    State(app_state): State<AppState>,
    Path(article_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    let state = app_state
        .engagement_service
        .unlike(auth.user_id, TargetKind::Article, article_id)
        .await?;
    Ok(like_body(state))
}

pub async fn list_comments(
    State(app_state): State<AppState>,
    Path(article_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<ResponseJson<Value>> {
    list_target_comments(&app_state, TargetKind::Article, article_id, params).await
}

pub async fn create_comment(
    State(app_state): State<AppState>,
    Path(article_id): Path<Uuid>,
    auth: AuthUser,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, ResponseJson<Value>)> {
    create_target_comment(&app_state, auth, TargetKind::Article, article_id, request).await
}
