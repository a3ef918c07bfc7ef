use blogify::{
    AppConfig, AppState, InMemoryRepository, MockCredentialVerifier, create_router,
    repository::RepositoryState,
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new()) as RepositoryState;
    let state = AppState {
        repo,
        credentials: Arc::new(MockCredentialVerifier::new()),
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

impl TestApp {
    /// Registers `username` and returns the issued token.
    async fn register(&self, client: &reqwest::Client, username: &str) -> String {
        let response = client
            .post(format!("{}/users", self.address))
            .json(&json!({ "username": username, "password": "secret" }))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::CREATED);

        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_article(&self, client: &reqwest::Client, token: &str, tags: Value) -> Value {
        let response = client
            .post(format!("{}/articles", self.address))
            .bearer_auth(token)
            .json(&json!({
                "title": "Hello",
                "description": "An article",
                "body": "Body text",
                "tagList": tags
            }))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = spawn_app().await;
    let response = reqwest::get(format!("{}/health", app.address))
        .await
        .expect("req fail");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/articles", app.address))
        .json(&json!({ "title": "t", "description": "d", "body": "b" }))
        .send()
        .await
        .expect("req fail");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "Unauthorized");
}

#[tokio::test]
async fn test_register_login_and_current_user() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    app.register(&client, "alice").await;

    let response = client
        .post(format!("{}/users/login", app.address))
        .json(&json!({ "username": "alice", "password": "secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap();

    let me: Value = client
        .get(format!("{}/user", app.address))
        .header("Authorization", format!("Token {token}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["username"], "alice");
    assert_eq!(me["displayName"], "alice");
}

#[tokio::test]
async fn test_missing_fields_are_invalid_input() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/users", app.address))
        .json(&json!({ "username": "alice" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "InvalidInput");
}

#[tokio::test]
async fn test_article_favorite_and_comment_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let alice = app.register(&client, "alice").await;
    let bob = app.register(&client, "bob").await;

    let article = app.create_article(&client, &alice, json!(["rust", "go"])).await;
    let id = article["id"].as_str().unwrap().to_string();
    assert_eq!(article["author"]["username"], "alice");
    assert_eq!(article["favoritesCount"], 0);

    // Favorite toggles on, then off
    let favorited: Value = client
        .post(format!("{}/articles/{id}/favorite", app.address))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(favorited["favorited"], true);
    assert_eq!(favorited["favoritesCount"], 1);

    let unfavorited: Value = client
        .post(format!("{}/articles/{id}/favorite", app.address))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unfavorited["favorited"], false);
    assert_eq!(unfavorited["favoritesCount"], 0);

    // Bob comments; Alice (article author) may not delete it
    let response = client
        .post(format!("{}/articles/{id}/comments", app.address))
        .bearer_auth(&bob)
        .json(&json!({ "body": "nice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let comment: Value = response.json().await.unwrap();
    let comment_id = comment["id"].as_str().unwrap();

    let response = client
        .delete(format!("{}/comments/{comment_id}", app.address))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let comments: Value = client
        .get(format!("{}/articles/{id}/comments", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(comments.as_array().unwrap().len(), 1);

    let response = client
        .delete(format!("{}/comments/{comment_id}", app.address))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Tags come back deduplicated and sorted
    let tags: Value = client
        .get(format!("{}/tags", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tags["tags"], json!(["go", "rust"]));

    // Only the author may delete the article
    let response = client
        .delete(format!("{}/articles/{id}", app.address))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .delete(format!("{}/articles/{id}", app.address))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{}/articles/{id}", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_feed_route_is_not_shadowed_by_article_id() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let alice = app.register(&client, "alice").await;
    let bob = app.register(&client, "bob").await;
    app.create_article(&client, &bob, json!([])).await;

    let response = client
        .post(format!("{}/profiles/bob/follow", app.address))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile: Value = response.json().await.unwrap();
    assert_eq!(profile["following"], true);

    let feed: Value = client
        .get(format!("{}/articles/feed", app.address))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed.as_array().unwrap().len(), 1);

    // Self-follow is an invalid operation
    let response = client
        .post(format!("{}/profiles/alice/follow", app.address))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
