//! Account and token management handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

use crate::auth::{self, RequireUser};
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::models::{Token, User};
use crate::types::api::{
    AuthResponse, CreateTokenRequest, LoginRequest, Message, RegisterRequest, TokenResponse,
    UserResponse,
};

const DEFAULT_TOKEN_NAME: &str = "default";

pub async fn register(
    State(mut db): State<Database>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(username), Some(email), Some(password)) = (body.username, body.email, body.password)
    else {
        return Err(ApiError::Validation(
            "username, email, and password are required".into(),
        ));
    };

    let username = username.trim();
    if username.len() < 3 || username.len() > 30 {
        return Err(ApiError::Validation(
            "username must be between 3 and 30 characters".into(),
        ));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("email is not valid".into()));
    }
    if password.len() < 6 {
        return Err(ApiError::Validation(
            "password must be at least 6 characters long".into(),
        ));
    }

    let password_hash = auth::hash_password(&password)?;
    let user = db
        .insert_user(
            &Uuid::new_v4().to_string(),
            username,
            &email.trim().to_lowercase(),
            &password_hash,
        )
        .await?
        .ok_or(ApiError::UserExists)?;

    let token = issue_token(&mut db, &user, DEFAULT_TOKEN_NAME).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserResponse::from(&user),
            token: token.token,
        }),
    ))
}

pub async fn login(
    State(mut db): State<Database>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let (Some(username), Some(password)) = (body.username, body.password) else {
        return Err(ApiError::Validation(
            "username and password are required".into(),
        ));
    };

    let user = db
        .get_user_by_username(username.trim())
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    if !auth::verify_password(&password, &user.password_hash)? {
        return Err(ApiError::InvalidCredentials);
    }

    let token = issue_token(&mut db, &user, "login").await?;
    Ok(Json(AuthResponse {
        user: UserResponse::from(&user),
        token: token.token,
    }))
}

pub async fn me(RequireUser(user): RequireUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

pub async fn list_tokens(
    State(mut db): State<Database>,
    RequireUser(user): RequireUser,
) -> ApiResult<Json<Vec<TokenResponse>>> {
    let tokens = db.list_tokens(&user.id).await?;
    Ok(Json(tokens.into_iter().map(Into::into).collect()))
}

pub async fn create_token(
    State(mut db): State<Database>,
    RequireUser(user): RequireUser,
    Json(body): Json<CreateTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = body.name.as_deref().unwrap_or(DEFAULT_TOKEN_NAME);
    let token = issue_token(&mut db, &user, name).await?;
    Ok((StatusCode::CREATED, Json(TokenResponse::from(token))))
}

pub async fn revoke_token(
    State(mut db): State<Database>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    if !db.revoke_token(&id, &user.id).await? {
        return Err(ApiError::NotFound);
    }
    Ok(Json(Message::new("token revoked")))
}

async fn issue_token(db: &mut Database, user: &User, name: &str) -> ApiResult<Token> {
    db.insert_token(
        &Uuid::new_v4().to_string(),
        name,
        &auth::new_token(),
        &user.id,
    )
    .await
}
