use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use collab_hub::routes::create_routes;
use collab_hub::{AppConfig, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    state: AppState,
}

struct Caller {
    id: Uuid,
    token: String,
}

impl TestApp {
    fn new() -> Self {
        let state = AppState::in_memory(AppConfig::default());
        let router = create_routes().with_state(state.clone());
        Self { router, state }
    }

    fn caller(&self, username: &str) -> Caller {
        let id = Uuid::new_v4();
        let token = self
            .state
            .auth_service
            .generate_token(id, username, Duration::hours(1))
            .unwrap();
        Caller { id, token }
    }

    /// Mints a token and creates the matching profile.
    async fn signup(&self, username: &str) -> Caller {
        let caller = self.caller(username);
        let (status, _) = self
            .send(
                Method::POST,
                "/api/v1/users",
                Some(&caller),
                Some(json!({ "username": username, "email": format!("{}@example.com", username) })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        caller
    }

    async fn send(&self, method: Method, uri: &str, caller: Option<&Caller>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(caller) = caller {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", caller.token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");

    let (status, _) = app.get("/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Method::POST, "/api/v1/projects", None, Some(json!({ "title": "x" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
    assert!(body["error"].is_string());

    let forged = Caller { id: Uuid::new_v4(), token: "not.a.token".to_string() };
    let (status, _) = app
        .send(Method::POST, "/api/v1/projects", Some(&forged), Some(json!({ "title": "x" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_lifecycle() {
    let app = TestApp::new();
    let ada = app.signup("ada").await;

    let (status, body) = app.get(&format!("/api/v1/users/{}", ada.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "ada");
    assert_eq!(body["user"]["user_type"], "individual");
    assert_eq!(body["user"]["bio"], "");
    assert!(body["user"].get("email").is_none());

    // Username uniqueness ignores case
    let other = app.caller("ADA");
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/users",
            Some(&other),
            Some(json!({ "username": "ADA", "email": "other@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/users",
            Some(&other),
            Some(json!({ "username": "no spaces", "email": "x@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/users/{}", ada.id),
            Some(&other),
            Some(json!({ "bio": "hijacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/v1/users/{}", ada.id),
            Some(&ada),
            Some(json!({ "bio": "Analytical engines", "user_type": "mentor" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["user_type"], "mentor");

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/users/{}", ada.id), Some(&ada), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/api/v1/users/{}", ada.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_project_engagement_flow() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/projects",
            Some(&alice),
            Some(json!({ "title": "Rust search engine", "tags": ["Rust", "rust ", "Search"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["project"]["tags"], json!(["rust", "search"]));
    let project_id = body["project"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(Method::POST, &format!("/api/v1/projects/{}/like", project_id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], true);
    assert_eq!(body["like_count"], 1);

    // Liking twice is a no-op
    let (_, body) = app
        .send(Method::POST, &format!("/api/v1/projects/{}/like", project_id), Some(&bob), None)
        .await;
    assert_eq!(body["like_count"], 1);

    let (_, body) = app
        .send(Method::POST, &format!("/api/v1/projects/{}/watch", project_id), Some(&bob), None)
        .await;
    assert_eq!(body["watching"], true);
    assert_eq!(body["watch_count"], 1);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/v1/projects/{}/comments", project_id),
            Some(&bob),
            Some(json!({ "content": "Nice work" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.get(&format!("/api/v1/projects/{}", project_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project"]["owner_username"], "alice");
    assert_eq!(body["project"]["like_count"], 1);
    assert_eq!(body["project"]["watch_count"], 1);
    assert_eq!(body["project"]["comment_count"], 1);

    let (_, body) = app.get(&format!("/api/v1/projects/{}/watchers", project_id)).await;
    assert_eq!(body["watchers"][0]["username"], "bob");

    let (_, body) = app.get(&format!("/api/v1/projects/{}/comments", project_id)).await;
    assert_eq!(body["comments"][0]["author_username"], "bob");
    let comment_id = body["comments"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/comments/{}", comment_id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/comments/{}", comment_id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/projects/{}", project_id),
            Some(&bob),
            Some(json!({ "title": "Mine now" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.get(&format!("/api/v1/users/{}/projects", alice.id)).await;
    assert_eq!(body["projects"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_engaging_with_missing_targets() {
    let app = TestApp::new();
    let ada = app.signup("ada").await;
    let missing = Uuid::new_v4();

    let (status, _) = app
        .send(Method::POST, &format!("/api/v1/posts/{}/like", missing), Some(&ada), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/v1/articles/{}/comments", missing),
            Some(&ada),
            Some(json!({ "content": "hello?" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(Method::POST, &format!("/api/v1/users/{}/follow", ada.id), Some(&ada), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_follow_and_lists() {
    let app = TestApp::new();
    let ada = app.signup("ada").await;
    let grace = app.signup("grace").await;

    let (status, body) = app
        .send(Method::POST, &format!("/api/v1/users/{}/follow", grace.id), Some(&ada), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["following"], true);
    assert_eq!(body["follower_count"], 1);

    let (_, body) = app.get(&format!("/api/v1/users/{}/followers", grace.id)).await;
    assert_eq!(body["followers"][0]["username"], "ada");

    let (_, body) = app.get(&format!("/api/v1/users/{}/following", ada.id)).await;
    assert_eq!(body["following"][0]["username"], "grace");

    let (_, body) = app
        .send(Method::DELETE, &format!("/api/v1/users/{}/follow", grace.id), Some(&ada), None)
        .await;
    assert_eq!(body["following"], false);
    assert_eq!(body["follower_count"], 0);
}

#[tokio::test]
async fn test_search_across_content_types() {
    let app = TestApp::new();
    let ada = app.signup("rust_ada").await;
    app.signup("gopher").await;

    app.send(
        Method::POST,
        "/api/v1/projects",
        Some(&ada),
        Some(json!({ "title": "Rust parser", "description": "100% safe" })),
    )
    .await;
    app.send(
        Method::POST,
        "/api/v1/articles",
        Some(&ada),
        Some(json!({ "title": "Why Rust", "body": "Ownership", "summary": "An intro" })),
    )
    .await;
    app.send(
        Method::POST,
        "/api/v1/posts",
        Some(&ada),
        Some(json!({ "content": "Shipping a rust crate today" })),
    )
    .await;

    let (status, body) = app.get("/api/v1/search?q=RUST").await;
    assert_eq!(status, StatusCode::OK);
    let results = &body["results"];
    assert_eq!(results["users"].as_array().unwrap().len(), 1);
    assert_eq!(results["projects"].as_array().unwrap().len(), 1);
    assert_eq!(results["articles"].as_array().unwrap().len(), 1);
    assert_eq!(results["posts"].as_array().unwrap().len(), 1);
    assert_eq!(results["failed"], json!([]));
    assert_eq!(body["sort"], "newest");

    // Wildcards in the query text are literal
    let (_, body) = app.get("/api/v1/search?q=%25&content_types=projects").await;
    assert_eq!(body["results"]["projects"].as_array().unwrap().len(), 1);
    assert_eq!(body["results"]["users"].as_array().unwrap().len(), 0);

    let (_, body) = app.get("/api/v1/search?content_types=users&user_types=individual&sort=alphabetical").await;
    let names: Vec<&str> = body["results"]["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["gopher", "rust_ada"]);

    let (_, body) = app.get("/api/v1/search?q=rust&page=9&page_size=500").await;
    assert_eq!(body["results"]["page"], 9);
    assert_eq!(body["results"]["page_size"], 50);
    assert_eq!(body["results"]["projects"], json!([]));

    // Unknown sort keys fall back to newest
    let (status, body) = app.get("/api/v1/search?q=rust&sort=drop_table").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sort"], "newest");

    let (status, body) = app.get("/api/v1/search?content_types=users,widgets").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_malformed_requests_return_json_errors() {
    let app = TestApp::new();
    let caller = app.signup("ada").await;

    for uri in [
        "/api/v1/projects/not-a-uuid",
        "/api/v1/users/12345/followers",
        "/api/v1/search?page=-1",
        "/api/v1/projects?page_size=abc",
    ] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["status"], 400, "{}", uri);
        assert!(body["error"].is_string(), "{}", uri);
    }

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/projects")
        .header(header::AUTHORIZATION, format!("Bearer {}", caller.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], 400);
    assert!(body["error"].is_string());

    // A body of the wrong shape is rejected the same way
    let (status, body) = app
        .send(Method::POST, "/api/v1/projects", Some(&caller), Some(json!({ "title": 42 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}
