//! Serialized API types. The wire format is camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Paste, PasteSummary, Token, User};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteCreated {
    pub id: String,
    pub title: String,
    pub language: String,
    pub is_public: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub link: String,
}

impl PasteCreated {
    pub fn new(paste: &Paste, link: String) -> Self {
        PasteCreated {
            id: paste.id.clone(),
            title: paste.title.clone(),
            language: paste.language.clone(),
            is_public: paste.is_public,
            expires_at: paste.expires_at,
            created_at: paste.created_at,
            link,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub language: String,
    pub is_public: bool,
    pub views: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Paste> for PasteResponse {
    fn from(paste: Paste) -> Self {
        PasteResponse {
            id: paste.id,
            title: paste.title,
            content: paste.content,
            language: paste.language,
            is_public: paste.is_public,
            views: paste.views,
            expires_at: paste.expires_at,
            created_at: paste.created_at,
            updated_at: paste.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteSummaryResponse {
    pub id: String,
    pub title: String,
    pub language: String,
    pub is_public: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

impl From<PasteSummary> for PasteSummaryResponse {
    fn from(summary: PasteSummary) -> Self {
        PasteSummaryResponse {
            id: summary.id,
            title: summary.title,
            language: summary.language,
            is_public: summary.is_public,
            views: summary.views,
            created_at: summary.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
        Pagination {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PasteList {
    pub pastes: Vec<PasteSummaryResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub id: String,
    pub name: String,
    pub token: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        TokenResponse {
            id: token.id,
            name: token.name,
            token: token.token,
            is_active: token.is_active,
            created_at: token.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Message {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaste {
    pub title: Option<String>,
    pub content: Option<String>,
    pub language: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
