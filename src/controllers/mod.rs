use axum::body::{Bytes, HttpBody};
use axum::http::header;
use axum::routing::{delete, get, post};
use axum::{middleware, BoxError, Json, Router};

use crate::commands::serve::AppState;
use crate::error;

pub mod paste;
pub mod user;

/// Generic over the body type so the outer router can wrap requests in
/// `Limited` before nesting this one.
pub fn router<B>() -> Router<AppState, B>
where
    B: HttpBody + Send + 'static,
    B::Data: Send + Into<Bytes>,
    B::Error: Into<BoxError>,
{
    Router::new()
        .route("/", get(api_info))
        .route("/pastes", get(paste::list).post(paste::create))
        .route(
            "/pastes/:id",
            get(paste::get).put(paste::update).delete(paste::delete),
        )
        .route("/pastes/user/:user_id", get(paste::user_pastes))
        .route("/auth/register", post(user::register))
        .route("/auth/login", post(user::login))
        .route("/auth/me", get(user::me))
        .route("/tokens", get(user::list_tokens).post(user::create_token))
        .route("/tokens/:id", delete(user::revoke_token))
        .layer(middleware::from_fn(error::json_errors))
}

async fn api_info(headers: axum::http::HeaderMap) -> Json<serde_json::Value> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost:3010");

    Json(serde_json::json!({
        "name": "textbin",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "a pastebin service",
        "endpoints": {
            "pastes": {
                "list": "GET /api/v1/pastes?page&limit",
                "create": "POST /api/v1/pastes",
                "get": "GET /api/v1/pastes/:id",
                "update": "PUT /api/v1/pastes/:id",
                "delete": "DELETE /api/v1/pastes/:id",
                "mine": "GET /api/v1/pastes/user/:userId",
            },
            "auth": {
                "register": "POST /api/v1/auth/register",
                "login": "POST /api/v1/auth/login",
                "me": "GET /api/v1/auth/me",
                "tokens": "GET/POST /api/v1/tokens, DELETE /api/v1/tokens/:id",
            },
            "web": {
                "paste": "GET /:id",
                "raw": "GET /raw/:id or /r/:id",
                "download": "GET /download/:id",
                "highlight": "GET /highlight/:id",
            },
        },
        "examples": {
            "curl_text": format!("curl -X POST --data-binary @file.txt http://{host}/"),
            "curl_file": format!("curl -X POST -F \"files=@file.txt\" http://{host}/"),
            "curl_json": format!(
                "curl -X POST -H 'Content-Type: application/json' \
                 -d '{{\"content\":\"hello world\"}}' http://{host}/api/v1/pastes"
            ),
        },
    }))
}
