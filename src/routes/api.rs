use axum::{
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use crate::models::search::SearchParams;
use crate::routes::{articles, comments, posts, projects, users};
use crate::routes::extract::Query;
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .merge(users::routes())
        .merge(projects::routes())
        .merge(articles::routes())
        .merge(posts::routes())
        .merge(comments::routes())
}

pub async fn health(State(app_state): State<AppState>) -> (StatusCode, ResponseJson<Value>) {
    let storage = app_state.db.storage_name();

    match app_state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            ResponseJson(json!({
                "status": "healthy",
                "service": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "storage": storage,
            })),
        ),
        Err(e) => {
            tracing::error!("❌ HEALTH: Storage check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ResponseJson(json!({
                    "status": "unhealthy",
                    "service": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                    "storage": storage,
                })),
            )
        }
    }
}

/// GET /api/v1/search?q=&content_types=&user_types=&sort=&page=&page_size=
async fn search(
    State(app_state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<ResponseJson<Value>> {
    let (query, content_types) = params.into_query()?;
    let results = app_state.search_service.search(&query, &content_types).await;

    Ok(ResponseJson(json!({
        "query": query.text,
        "sort": query.sort,
        "results": results,
    })))
}
