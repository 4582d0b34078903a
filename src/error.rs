use axum::extract::multipart::MultipartError;
use axum::http::{self, header, HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("access denied")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("user already exists")]
    UserExists,
    #[error("paste has expired")]
    Expired,
    #[error("failed to allocate a unique paste id")]
    AllocationExhausted,
    #[error("error reading multipart data")]
    Multipart {
        #[from]
        source: MultipartError,
    },
    #[error("http error")]
    Http {
        #[from]
        source: http::Error,
    },
    #[error("database error")]
    Database { source: sqlx::Error },
    #[error("password hashing error")]
    PasswordHash {
        #[from]
        source: bcrypt::BcryptError,
    },
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::UserExists => StatusCode::CONFLICT,
            ApiError::Expired => StatusCode::GONE,
            ApiError::AllocationExhausted => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Multipart { .. } => StatusCode::BAD_REQUEST,
            ApiError::Http { .. } => StatusCode::BAD_REQUEST,
            ApiError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::PasswordHash { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The plain error message, stashed in response extensions so the
/// negotiation middleware can re-render it as JSON.
#[derive(Clone)]
pub struct ErrorBody(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {self:?}");
        }

        let message = self.to_string();
        let mut response = (status, message.clone()).into_response();
        response.extensions_mut().insert(ErrorBody(message));
        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            _ => ApiError::Database { source },
        }
    }
}

pub fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |accept| accept.contains("application/json"))
}

/// Re-render error bodies as `{"error": ...}` for clients that accept JSON;
/// everyone else keeps the plain-text body.
pub async fn negotiated_errors<B>(req: Request<B>, next: Next<B>) -> Response {
    let json = wants_json(req.headers());
    let response = next.run(req).await;
    if json {
        into_json_error(response)
    } else {
        response
    }
}

/// The `/api/v1` routes always answer errors in JSON, whatever the client's
/// Accept header says.
pub async fn json_errors<B>(req: Request<B>, next: Next<B>) -> Response {
    into_json_error(next.run(req).await)
}

fn into_json_error(response: Response) -> Response {
    let status = response.status();
    match response.extensions().get::<ErrorBody>() {
        Some(ErrorBody(message)) => {
            (status, Json(serde_json::json!({ "error": message }))).into_response()
        }
        None => response,
    }
}
