use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use social_api::auth::AppStateInner;
use social_api::router::router;
use social_api::token::TokenService;
use social_db::Database;

struct TestApp {
    app: Router,
    db: Database,
    _dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("social.db")).unwrap();
        let tokens = TokenService::new("integration-secret").unwrap();
        let app = router(AppStateInner::new(db.clone(), tokens));
        Self { app, db, _dir: dir }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Register and log in; returns (user id, token).
    async fn register(&self, name: &str, nick: &str, email: &str, password: &str) -> (i64, String) {
        let (status, user) = self
            .send(
                Method::POST,
                "/users",
                None,
                Some(json!({ "name": name, "nick": nick, "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{user}");

        let (status, login) = self
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{login}");
        assert_eq!(login["user_id"], user["id"]);

        (
            user["id"].as_i64().unwrap(),
            login["token"].as_str().unwrap().to_string(),
        )
    }
}

#[tokio::test]
async fn post_lifecycle_and_ownership() {
    let t = TestApp::new();
    let (ana, ana_token) = t.register("Ana", "ana1", "a@x.com", "secret1").await;

    let (status, post) = t
        .send(
            Method::POST,
            "/posts",
            Some(&ana_token),
            Some(json!({ "title": "Hi", "content": "World" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_uri = format!("/posts/{}", post["id"]);

    let (status, fetched) = t.send(Method::GET, &post_uri, Some(&ana_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["author_id"], json!(ana));
    assert_eq!(fetched["author_nick"], "ana1");
    assert_eq!(fetched["likes"], 0);

    let (status, _) = t
        .send(Method::POST, &format!("{post_uri}/like"), Some(&ana_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, fetched) = t.send(Method::GET, &post_uri, Some(&ana_token), None).await;
    assert_eq!(fetched["likes"], 1);

    let (_, bob_token) = t.register("Bob", "bob", "b@x.com", "secret2").await;
    let (status, body) = t
        .send(
            Method::PUT,
            &post_uri,
            Some(&bob_token),
            Some(json!({ "title": "Hacked", "content": "!" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let (status, _) = t.send(Method::DELETE, &post_uri, Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, fetched) = t.send(Method::GET, &post_uri, Some(&ana_token), None).await;
    assert_eq!(fetched["title"], "Hi");
    assert_eq!(fetched["content"], "World");

    let (status, _) = t
        .send(
            Method::PUT,
            &post_uri,
            Some(&ana_token),
            Some(json!({ "title": "Hello", "content": "again" })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, fetched) = t.send(Method::GET, &post_uri, Some(&ana_token), None).await;
    assert_eq!(fetched["title"], "Hello");

    let (status, _) = t.send(Method::DELETE, &post_uri, Some(&ana_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = t.send(Method::GET, &post_uri, Some(&ana_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unlike_stops_at_zero() {
    let t = TestApp::new();
    let (_, token) = t.register("Ana", "ana1", "a@x.com", "secret1").await;
    let (_, post) = t
        .send(
            Method::POST,
            "/posts",
            Some(&token),
            Some(json!({ "title": "Hi", "content": "World" })),
        )
        .await;
    let post_uri = format!("/posts/{}", post["id"]);

    let (status, _) = t
        .send(Method::POST, &format!("{post_uri}/unlike"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, fetched) = t.send(Method::GET, &post_uri, Some(&token), None).await;
    assert_eq!(fetched["likes"], 0);
}

#[tokio::test]
async fn stored_password_is_hashed() {
    let t = TestApp::new();
    let (id, _) = t.register("Ana", "ana1", "a@x.com", "secret1").await;

    let stored = t.db.get_password_hash(id).unwrap().unwrap();
    assert_ne!(stored, "secret1");
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let t = TestApp::new();

    let (status, body) = t.send(Method::GET, "/posts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "malformed token");

    let (status, _) = t.send(Method::GET, "/users", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = TokenService::new("another-secret").unwrap().issue(1).unwrap();
    let (status, body) = t.send(Method::GET, "/posts", Some(&foreign), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token signature mismatch");
}

#[tokio::test]
async fn login_failures() {
    let t = TestApp::new();
    t.register("Ana", "ana1", "a@x.com", "secret1").await;

    let (status, _) = t
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "nobody@x.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = t
        .send(Method::POST, "/login", None, Some(json!({ "email": "a@x.com" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn registration_validation_and_duplicates() {
    let t = TestApp::new();
    t.register("Ana", "ana1", "a@x.com", "secret1").await;

    let (status, body) = t
        .send(
            Method::POST,
            "/users",
            None,
            Some(json!({ "name": "X", "nick": "x", "email": "not-an-email", "password": "p" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "e-mail invalid");

    let (status, _) = t
        .send(
            Method::POST,
            "/users",
            None,
            Some(json!({ "name": "Other", "nick": "ana1", "email": "o@x.com", "password": "p" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn follow_is_idempotent_and_feeds_posts() {
    let t = TestApp::new();
    let (ana, ana_token) = t.register("Ana", "ana1", "a@x.com", "secret1").await;
    let (bob, bob_token) = t.register("Bob", "bob", "b@x.com", "secret2").await;

    let follow_uri = format!("/users/{bob}/follow");
    for _ in 0..2 {
        let (status, _) = t.send(Method::POST, &follow_uri, Some(&ana_token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (_, followers) = t
        .send(Method::GET, &format!("/users/{bob}/followers"), Some(&ana_token), None)
        .await;
    assert_eq!(followers.as_array().unwrap().len(), 1);
    assert_eq!(followers[0]["id"], json!(ana));
    assert!(followers[0].get("password").is_none());

    let (_, following) = t
        .send(Method::GET, &format!("/users/{ana}/following"), Some(&ana_token), None)
        .await;
    assert_eq!(following[0]["id"], json!(bob));

    t.send(
        Method::POST,
        "/posts",
        Some(&bob_token),
        Some(json!({ "title": "From Bob", "content": "..." })),
    )
    .await;
    let (_, feed) = t.send(Method::GET, "/posts", Some(&ana_token), None).await;
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["author_id"], json!(bob));

    let (status, _) = t
        .send(Method::POST, &format!("/users/{ana}/follow"), Some(&ana_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let unfollow_uri = format!("/users/{bob}/unfollow");
    for _ in 0..2 {
        let (status, _) = t.send(Method::POST, &unfollow_uri, Some(&ana_token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    let (_, feed) = t.send(Method::GET, "/posts", Some(&ana_token), None).await;
    assert!(feed.as_array().unwrap().is_empty());

    let (status, _) = t
        .send(Method::POST, "/users/9999/follow", Some(&ana_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_changes_only_by_owner() {
    let t = TestApp::new();
    let (ana, ana_token) = t.register("Ana", "ana1", "a@x.com", "secret1").await;
    let (bob, bob_token) = t.register("Bob", "bob", "b@x.com", "secret2").await;

    let (status, _) = t
        .send(
            Method::PUT,
            &format!("/users/{ana}"),
            Some(&bob_token),
            Some(json!({ "name": "Mallory", "nick": "m", "email": "m@x.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .send(Method::DELETE, &format!("/users/{ana}"), Some(&bob_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .send(
            Method::PUT,
            &format!("/users/{ana}"),
            Some(&ana_token),
            Some(json!({ "name": " Ana Maria ", "nick": "ana1", "email": "a@x.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, found) = t.send(Method::GET, "/users?user=MARIA", Some(&bob_token), None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["name"], "Ana Maria");

    let (_, everyone) = t.send(Method::GET, "/users", Some(&bob_token), None).await;
    assert_eq!(everyone.as_array().unwrap().len(), 2);

    let (status, _) = t
        .send(Method::DELETE, &format!("/users/{bob}"), Some(&bob_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = t
        .send(Method::GET, &format!("/users/{bob}"), Some(&ana_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t.send(Method::GET, "/users/abc", Some(&ana_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_path_and_query_answer_with_json_errors() {
    let t = TestApp::new();
    let (_, token) = t.register("Ana", "ana1", "a@x.com", "secret1").await;

    for uri in [
        "/users/abc",
        "/posts/1.5",
        "/users/abc/followers",
        "/users?user=a&user=b",
    ] {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = t.app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json",
            "{uri}"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string(), "{uri}: {body}");
    }
}

#[tokio::test]
async fn password_change() {
    let t = TestApp::new();
    let (_, token) = t.register("Ana", "ana1", "a@x.com", "secret1").await;

    let (status, _) = t
        .send(
            Method::POST,
            "/users/update-password",
            Some(&token),
            Some(json!({ "current_password": "nope", "new_password": "secret9" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t
        .send(
            Method::POST,
            "/users/update-password",
            Some(&token),
            Some(json!({ "current_password": "secret1", "new_password": "secret9" })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = t
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "secret9" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn password_change_for_a_deleted_account_is_not_found() {
    let t = TestApp::new();
    let (id, token) = t.register("Ana", "ana1", "a@x.com", "secret1").await;

    let (status, _) = t
        .send(Method::DELETE, &format!("/users/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The token is still within its window; the account behind it is gone.
    let (status, body) = t
        .send(
            Method::POST,
            "/users/update-password",
            Some(&token),
            Some(json!({ "current_password": "secret1", "new_password": "secret9" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}
