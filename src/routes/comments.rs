use axum::{
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::delete,
    Router,
};
use serde_json::{json, Value};
use uuid::Uuid;
use crate::auth::AuthUser;
use crate::models::comment::CreateCommentRequest;
use crate::models::{EngagementState, PaginationParams, TargetKind};
use crate::routes::paged;
use crate::routes::extract::Path;
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new().route("/comments/:comment_id", delete(delete_comment))
}

pub async fn delete_comment(
    State(app_state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<ResponseJson<Value>> {
    app_state.comment_service.delete_comment(auth.user_id, comment_id).await?;
    Ok(ResponseJson(json!({ "message": "Comment deleted successfully" })))
}

// Shared by the project, article and post handlers

pub(crate) async fn list_target_comments(
    app_state: &AppState,
    target_kind: TargetKind,
    target_id: Uuid,
    params: PaginationParams,
) -> Result<ResponseJson<Value>> {
    let page = params.page();
    let comments = app_state.comment_service.list_comments(target_kind, target_id, page).await?;
    Ok(ResponseJson(paged("comments", comments, page)))
}

pub(crate) async fn create_target_comment(
    app_state: &AppState,
    auth: AuthUser,
    target_kind: TargetKind,
    target_id: Uuid,
    request: CreateCommentRequest,
) -> Result<(StatusCode, ResponseJson<Value>)> {
    let comment = app_state
        .comment_service
        .create_comment(auth.user_id, target_kind, target_id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(json!({
            "comment": comment,
            "message": "Comment added successfully"
        })),
    ))
}

pub(crate) fn like_body(state: EngagementState) -> ResponseJson<Value> {
    ResponseJson(json!({
        "liked": state.active,
        "like_count": state.count
    }))
}
