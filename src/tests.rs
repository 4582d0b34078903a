//! End-to-end tests over the router, with a real sqlite store per test.

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::commands::serve::{router, AppState};
use crate::db::Database;
use crate::models::NewPasteRecord;
use crate::test_util::{test_config, test_database};

struct TestApp {
    _dir: TempDir,
    state: AppState,
}

impl TestApp {
    async fn new() -> Self {
        let (dir, database) = test_database().await;
        TestApp {
            _dir: dir,
            state: AppState {
                config: test_config(),
                database,
            },
        }
    }

    fn app(&self) -> Router {
        router(self.state.clone())
    }

    fn db(&self) -> Database {
        self.state.database.clone()
    }

    async fn send(&self, request: Request<Body>) -> Response<axum::body::BoxBody> {
        self.app().oneshot(request).await.unwrap()
    }

    /// POST raw text to `/` and return the new paste's id.
    async fn create_text(&self, content: &str) -> String {
        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from(content.to_owned()))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let url = body_string(response).await;
        url.rsplit('/').next().unwrap().to_owned()
    }

    /// Register a user and return their bearer token.
    async fn register(&self, username: &str) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/api/v1/auth/register",
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "hunter22",
                }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        body["token"].as_str().unwrap().to_owned()
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bearer(request: Request<Body>, token: &str) -> Request<Body> {
    let (mut parts, body) = request.into_parts();
    parts.headers.insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    Request::from_parts(parts, body)
}

async fn body_string(response: Response<axum::body::BoxBody>) -> String {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<axum::body::BoxBody>) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new().await;
    let response = app.send(get("/healthz")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn index_serves_usage_text() {
    let app = TestApp::new().await;
    let response = app.send(get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("textbin"));
}

#[tokio::test]
async fn text_round_trip_via_raw() {
    let app = TestApp::new().await;
    let id = app.create_text("hello world").await;
    assert_eq!(id.len(), 6);

    let response = app.send(get(&format!("/raw/{id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(body_string(response).await, "hello world");
}

#[tokio::test]
async fn create_returns_share_url_or_json() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("plain body"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().contains_key(header::LOCATION));
    let url = body_string(response).await;
    assert!(url.starts_with("http://localhost:3010/"), "got {url}");

    let mut request = json_request("POST", "/", json!({"content": "json body"}));
    request.headers_mut().insert(
        header::ACCEPT,
        "application/json".parse().unwrap(),
    );
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["title"], "Untitled");
    assert_eq!(body["language"], "text");
    assert_eq!(body["isPublic"], true);
    assert!(body["link"].as_str().unwrap().contains(body["id"].as_str().unwrap()));
}

#[tokio::test]
async fn empty_content_is_rejected_everywhere() {
    let app = TestApp::new().await;

    // Raw empty body.
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response).await, "content is required");

    // Whitespace-only JSON content through the API; the error body is JSON.
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/pastes",
            json!({"content": "   \n\t"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "content is required");

    // Nothing got persisted.
    let response = app.send(get("/api/v1/pastes")).await;
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn binary_round_trip_via_download() {
    let app = TestApp::new().await;
    let png: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x01, 0xff];

    let boundary = "test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"files\"; \
             filename=\"shot.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(png);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let url = body_string(response).await;
    let id = url.rsplit('/').next().unwrap();

    let response = app.send(get(&format!("/download/{id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_owned();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("shot.png"));
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    assert_eq!(&bytes[..], png);

    // Raw serves the decoded bytes under the original media type too.
    let response = app.send(get(&format!("/raw/{id}"))).await;
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    assert_eq!(&bytes[..], png);
}

#[tokio::test]
async fn multipart_text_file_sets_title_and_language() {
    let app = TestApp::new().await;

    let boundary = "test-boundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"files\"; \
         filename=\"script.py\"\r\nContent-Type: text/x-python\r\n\r\n\
         print('hi')\r\n--{boundary}--\r\n"
    );

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let url = body_string(response).await;
    let id = url.rsplit('/').next().unwrap();

    let response = app.send(get(&format!("/api/v1/pastes/{id}"))).await;
    let body = body_json(response).await;
    assert_eq!(body["title"], "script.py");
    assert_eq!(body["language"], "python");
    assert_eq!(body["content"], "print('hi')");
}

#[tokio::test]
async fn raw_upload_reads_metadata_headers() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .header("x-title", "notes")
                .header("x-language", "markdown")
                .body(Body::from("# heading"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let url = body_string(response).await;
    let id = url.rsplit('/').next().unwrap();

    let response = app.send(get(&format!("/api/v1/pastes/{id}"))).await;
    let body = body_json(response).await;
    assert_eq!(body["title"], "notes");
    assert_eq!(body["language"], "markdown");
}

#[tokio::test]
async fn form_submissions_need_an_explicit_content_field() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("content=from%20a%20form&title=form-paste"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("this%20is%20not%20a%20content%20field=x"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_paste_is_gone_on_every_read_path() {
    let app = TestApp::new().await;
    let mut db = app.db();
    db.insert_paste(&NewPasteRecord {
        id: "oldone",
        title: "Untitled",
        content: "stale",
        language: "text",
        is_public: true,
        expires_at: Some(Utc::now() - Duration::minutes(5)),
        user_id: None,
    })
    .await
    .unwrap()
    .unwrap();

    for path in [
        "/oldone",
        "/raw/oldone",
        "/r/oldone",
        "/download/oldone",
        "/highlight/oldone",
        "/api/v1/pastes/oldone",
    ] {
        let response = app.send(get(path)).await;
        assert_eq!(response.status(), StatusCode::GONE, "path {path}");
    }

    // And it never shows up in the public listing.
    let response = app.send(get("/api/v1/pastes")).await;
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total"], 0);

    // Views were never counted for refused reads.
    let paste = db.get_paste("oldone").await.unwrap().unwrap();
    assert_eq!(paste.views, 0);
}

#[tokio::test]
async fn unknown_paste_is_not_found() {
    let app = TestApp::new().await;
    let response = app.send(get("/raw/zzzzzz")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "not found");
}

#[tokio::test]
async fn private_paste_access_matrix() {
    let app = TestApp::new().await;
    let token_a = app.register("alice").await;
    let token_b = app.register("bob").await;

    let request = bearer(
        json_request(
            "POST",
            "/api/v1/pastes",
            json!({"content": "secret notes", "isPublic": false}),
        ),
        &token_a,
    );
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["id"].as_str().unwrap().to_owned();

    // Anonymous and non-owner reads are forbidden, on the API and raw paths.
    for path in [format!("/api/v1/pastes/{id}"), format!("/raw/{id}")] {
        let response = app.send(get(&path)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "anon {path}");

        let response = app.send(bearer(get(&path), &token_b)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "bob {path}");

        let response = app.send(bearer(get(&path), &token_a)).await;
        assert_eq!(response.status(), StatusCode::OK, "alice {path}");
    }
}

#[tokio::test]
async fn views_count_successful_reads_exactly() {
    let app = TestApp::new().await;
    let id = app.create_text("count me").await;

    for _ in 0..3 {
        let response = app.send(get(&format!("/raw/{id}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // The API read is itself the fourth successful read.
    let response = app.send(get(&format!("/api/v1/pastes/{id}"))).await;
    let body = body_json(response).await;
    assert_eq!(body["views"], 4);
}

#[tokio::test]
async fn concurrent_reads_all_count_toward_views() {
    let app = TestApp::new().await;
    let id = app.create_text("busy paste").await;
    let uri = format!("/raw/{id}");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = app.app();
        let uri = uri.clone();
        handles.push(tokio::spawn(async move {
            let response = router.oneshot(get(&uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Eight concurrent raw reads plus this one make nine.
    let response = app.send(get(&format!("/api/v1/pastes/{id}"))).await;
    let body = body_json(response).await;
    assert_eq!(body["views"], 9);
}

#[tokio::test]
async fn bodies_over_the_upload_limit_are_rejected() {
    let (_dir, database) = test_database().await;
    let mut config = test_config();
    config.limits.max_upload_size = 1024;
    let app = TestApp {
        _dir,
        state: AppState { config, database },
    };

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/v1/pastes")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"content": "x".repeat(4096)}).to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert!(
        response.status().is_client_error(),
        "got {}",
        response.status()
    );

    let response = app.send(get("/api/v1/pastes")).await;
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn listing_is_public_newest_first_with_pagination() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;

    app.create_text("first public").await;
    app.create_text("second public").await;
    let request = bearer(
        json_request(
            "POST",
            "/api/v1/pastes",
            json!({"content": "private", "isPublic": false}),
        ),
        &token,
    );
    assert_eq!(app.send(request).await.status(), StatusCode::CREATED);

    let response = app.send(get("/api/v1/pastes?page=1&limit=1")).await;
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["pagination"]["hasNext"], true);
    assert_eq!(body["pagination"]["hasPrev"], false);
    assert_eq!(body["pastes"].as_array().unwrap().len(), 1);
    // Summaries never leak content.
    assert!(body["pastes"][0].get("content").is_none());
}

#[tokio::test]
async fn update_and_delete_are_owner_only() {
    let app = TestApp::new().await;
    let token_a = app.register("alice").await;
    let token_b = app.register("bob").await;

    let request = bearer(
        json_request("POST", "/api/v1/pastes", json!({"content": "v1"})),
        &token_a,
    );
    let response = app.send(request).await;
    let id = body_json(response).await["id"].as_str().unwrap().to_owned();
    let uri = format!("/api/v1/pastes/{id}");

    // Anonymous update is unauthorized; non-owner is forbidden.
    let response = app
        .send(json_request("PUT", &uri, json!({"content": "hax"})))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(bearer(json_request("PUT", &uri, json!({"content": "hax"})), &token_b))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The owner can update; partial updates keep other fields.
    let response = app
        .send(bearer(
            json_request("PUT", &uri, json!({"content": "v2", "title": "renamed"})),
            &token_a,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["content"], "v2");
    assert_eq!(body["title"], "renamed");
    assert_eq!(body["language"], "text");

    // Delete follows the same rules.
    let response = app
        .send(bearer(
            Request::builder().method("DELETE").uri(&uri).body(Body::empty()).unwrap(),
            &token_b,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(bearer(
            Request::builder().method("DELETE").uri(&uri).body(Body::empty()).unwrap(),
            &token_a,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(get(&uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_registration_conflicts_and_login_works() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/auth/register",
            json!({"username": "alice", "email": "other@example.com", "password": "hunter22"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/auth/login",
            json!({"username": "alice", "password": "hunter22"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"].as_str().unwrap().to_owned();

    let response = app.send(bearer(get("/api/v1/auth/me"), &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["username"], "alice");

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/auth/login",
            json!({"username": "alice", "password": "wrong"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn revoked_tokens_stop_authenticating() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;

    let response = app.send(bearer(get("/api/v1/tokens"), &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let tokens = body_json(response).await;
    let token_id = tokens[0]["id"].as_str().unwrap().to_owned();

    let response = app
        .send(bearer(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/tokens/{token_id}"))
                .body(Body::empty())
                .unwrap(),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(bearer(get("/api/v1/auth/me"), &token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_errors_are_json_even_without_accept_header() {
    let app = TestApp::new().await;
    let response = app.send(get("/api/v1/pastes/zzzzzz")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "not found");
}
