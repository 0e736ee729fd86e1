pub mod api;
pub mod users;
pub mod projects;
pub mod articles;
pub mod posts;
pub mod comments;
pub mod extract;

use axum::{routing::get, Router};
use serde::Serialize;
use serde_json::{json, Value};
use crate::models::Page;
use crate::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(api::health))
        .nest("/api/v1", api::routes())
}

/// `{"<key>": items, "page": n, "page_size": n}` body shared by list endpoints
pub(crate) fn paged<T: Serialize>(key: &str, items: Vec<T>, page: Page) -> Value {
    let mut body = json!({
        "page": page.number,
        "page_size": page.size,
    });
    body[key] = json!(items);
    body
}
