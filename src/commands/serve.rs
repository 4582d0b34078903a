use std::net::SocketAddr;

use axum::body::{self, Bytes};
use axum::extract::{DefaultBodyLimit, FromRef, Path, State};
use axum::http::{header, HeaderMap, Response, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{middleware, Json, Router};
use chrono::Utc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::CurrentUser;
use crate::config::Config;
use crate::content::{self, PasteBody};
use crate::controllers::{self, paste::fetch_readable};
use crate::db::Database;
use crate::error::{self, ApiResult};
use crate::ingest;
use crate::normalize::NewPaste;
use crate::types::api::{PasteCreated, PasteResponse};

/// Usage notes served at the index, curl-style.
const USAGE: &str = include_str!("../../assets/usage.txt");

#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Config,
    pub database: Database,
}

pub async fn run(config: Config, database: Database) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("listening on {addr}");

    let app = router(AppState { config, database });

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    let max_upload_size = state.config.limits.max_upload_size;

    Router::new()
        .route("/", get(index).post(create_paste))
        .route("/healthz", get(health))
        .route("/:id", get(view_paste))
        .route("/raw/:id", get(raw_paste))
        .route("/r/:id", get(raw_paste))
        .route("/download/:id", get(download_paste))
        .route("/highlight/:id", get(highlight_paste))
        .nest("/api/v1", controllers::router())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_size))
        .layer(middleware::from_fn(error::negotiated_errors))
        .layer(TraceLayer::new_for_http())
        .route_layer(NormalizePathLayer::trim_trailing_slash())
        .with_state(state)
}

async fn index() -> &'static str {
    USAGE
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Create a paste from whatever shape the client sent. Browser/CLI clients
/// get the share URL back as text; JSON-accepting clients get the paste
/// object.
async fn create_paste(
    State(config): State<Config>,
    State(mut db): State<Database>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    new_paste: NewPaste,
) -> ApiResult<axum::response::Response> {
    let owner = user.as_ref().map(|u| u.id.as_str());
    let paste = ingest::create_paste(&mut db, new_paste, owner).await?;

    let link = config.paste_url(&paste.id);
    let location = [(header::LOCATION, format!("/{}", paste.id))];

    if error::wants_json(&headers) {
        Ok((
            StatusCode::CREATED,
            location,
            Json(PasteCreated::new(&paste, link)),
        )
            .into_response())
    } else {
        Ok((StatusCode::CREATED, location, link).into_response())
    }
}

/// The plain view path. JSON-accepting clients get the full paste object;
/// everyone else gets the content itself.
async fn view_paste(
    State(mut db): State<Database>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<axum::response::Response> {
    let paste = fetch_readable(&mut db, &id, user.as_ref()).await?;

    if error::wants_json(&headers) {
        return Ok(Json(PasteResponse::from(paste)).into_response());
    }
    Ok(serve_content(&paste.content)?.into_response())
}

async fn raw_paste(
    State(mut db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Response<body::Full<Bytes>>> {
    let paste = fetch_readable(&mut db, &id, user.as_ref()).await?;
    serve_content(&paste.content)
}

/// Raw rendering: `data:` content is decoded and served under its embedded
/// media type, text is served as UTF-8 plain text.
fn serve_content(content: &str) -> ApiResult<Response<body::Full<Bytes>>> {
    let (mime, bytes) = match content::decode_body(content) {
        PasteBody::Binary { mime, bytes } => (mime, Bytes::from(bytes)),
        PasteBody::Text(text) => ("text/plain; charset=utf-8".to_owned(), Bytes::from(text)),
    };

    Ok(Response::builder()
        .header(header::CONTENT_TYPE, mime)
        .body(body::Full::new(bytes))?)
}

async fn download_paste(
    State(mut db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Response<body::Full<Bytes>>> {
    let paste = fetch_readable(&mut db, &id, user.as_ref()).await?;

    let (mime, file_name, bytes) = match content::decode_body(&paste.content) {
        PasteBody::Binary { mime, bytes } => {
            let extension = content::extension_for_mime(&mime);
            let file_name = content::download_filename(&paste.title, extension);
            (mime, file_name, Bytes::from(bytes))
        }
        PasteBody::Text(text) => {
            let extension = content::extension_for_language(&paste.language);
            let file_name = content::download_filename(&paste.title, extension);
            (
                content::mime_for_extension(extension),
                file_name,
                Bytes::from(text),
            )
        }
    };

    Ok(Response::builder()
        .header(header::CONTENT_TYPE, mime)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(body::Full::new(bytes))?)
}

/// Highlight view: a minimal page carrying the language tag for client-side
/// decoration. Applies the same policy and view accounting as every other
/// read path.
async fn highlight_paste(
    State(mut db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Html<String>> {
    let paste = fetch_readable(&mut db, &id, user.as_ref()).await?;

    let title = content::escape_html(&paste.title);
    let body = match content::decode_body(&paste.content) {
        PasteBody::Binary { mime, .. } => format!(
            "<p>binary paste ({mime}); <a href=\"/download/{id}\">download</a></p>",
            mime = content::escape_html(&mime),
        ),
        PasteBody::Text(text) => format!(
            "<pre><code class=\"language-{language}\">{code}</code></pre>",
            language = content::escape_html(&paste.language),
            code = content::escape_html(&text),
        ),
    };

    Ok(Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n\
         <body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n"
    )))
}
