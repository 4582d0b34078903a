use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Paste {
    pub id: String,
    pub title: String,
    pub content: String,
    pub language: String,
    pub is_public: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row; never carries content.
#[derive(Debug, Clone, FromRow)]
pub struct PasteSummary {
    pub id: String,
    pub title: String,
    pub language: String,
    pub is_public: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields for a paste insert. Timestamps and the view counter come from
/// column defaults.
#[derive(Debug)]
pub struct NewPasteRecord<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub language: &'a str,
    pub is_public: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub user_id: Option<&'a str>,
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Token {
    pub id: String,
    pub name: String,
    pub token: String,
    pub user_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
