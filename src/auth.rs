//! Bearer-token authentication: extractors that resolve `Authorization`
//! headers against the token store, and password hashing for accounts.

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::models::User;

/// Optional authentication. Resolves to `None` for anonymous requests or
/// unknown/revoked tokens rather than rejecting, so public endpoints can
/// still personalize behavior for signed-in callers.
pub struct CurrentUser(pub Option<User>);

/// Mandatory authentication; rejects with 401 when no valid token is given.
pub struct RequireUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Database: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(CurrentUser(None));
        };
        let mut db = Database::from_ref(state);
        Ok(CurrentUser(db.find_user_by_token(&token).await?))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
    Database: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await? {
            CurrentUser(Some(user)) => Ok(RequireUser(user)),
            CurrentUser(None) => Err(ApiError::Unauthorized),
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty())
}

/// Mint an opaque bearer token string.
pub fn new_token() -> String {
    Uuid::new_v4().to_string()
}

pub fn hash_password(password: &str) -> ApiResult<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> ApiResult<bool> {
    Ok(bcrypt::verify(password, hash)?)
}
