use chrono::{DateTime, Utc};
use sqlx::AnyPool;

use crate::models::{NewPasteRecord, Paste, PasteSummary, Token, User};
use crate::ApiResult;

const PASTE_COLUMNS: &str =
    "id, title, content, language, is_public, expires_at, user_id, views, created_at, updated_at";

const SUMMARY_COLUMNS: &str = "id, title, language, is_public, views, created_at";

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Connect to a database by URL. The URL scheme picks the engine
    /// (sqlite or postgres, depending on enabled features).
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            pool: AnyPool::connect(url).await?,
        })
    }

    /// Create the schema if it does not exist yet.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS pastes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL DEFAULT 'Untitled',
                content TEXT NOT NULL,
                language TEXT NOT NULL DEFAULT 'text',
                is_public BOOLEAN NOT NULL DEFAULT TRUE,
                expires_at TIMESTAMP,
                user_id TEXT,
                views BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            "CREATE TABLE IF NOT EXISTS tokens (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL DEFAULT 'default',
                token TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL REFERENCES users (id),
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            "CREATE INDEX IF NOT EXISTS idx_pastes_created_at ON pastes (created_at)",
            "CREATE INDEX IF NOT EXISTS idx_pastes_user_id ON pastes (user_id)",
        ];

        let mut conn = self.pool.acquire().await?;
        for statement in statements {
            sqlx::query(statement).execute(&mut conn).await?;
        }
        Ok(())
    }

    /// Insert a paste. Returns `None` when the id is already taken, which
    /// the ingestion pipeline treats as a signal to regenerate and retry.
    ///
    /// The RETURNING stream is consumed with `fetch_all` here and in the
    /// other writers: sqlite does not commit the implicit transaction until
    /// the statement is drained, and `fetch_one` stops after the first row,
    /// so an acknowledged write could otherwise still be invisible to other
    /// connections.
    pub async fn insert_paste(&mut self, record: &NewPasteRecord<'_>) -> ApiResult<Option<Paste>> {
        let mut conn = self.pool.acquire().await?;
        let query = format!(
            "INSERT INTO pastes (id, title, content, language, is_public, expires_at, user_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {PASTE_COLUMNS}"
        );
        let result = sqlx::query_as::<_, Paste>(&query)
            .bind(record.id)
            .bind(record.title)
            .bind(record.content)
            .bind(record.language)
            .bind(record.is_public)
            .bind(record.expires_at)
            .bind(record.user_id)
            .fetch_all(&mut conn)
            .await;

        match result {
            Ok(mut rows) => Ok(rows.pop()),
            Err(error) if is_unique_violation(&error) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Get a paste by id.
    pub async fn get_paste(&mut self, id: &str) -> ApiResult<Option<Paste>> {
        let mut conn = self.pool.acquire().await?;
        let query = format!("SELECT {PASTE_COLUMNS} FROM pastes WHERE id = ?");
        Ok(sqlx::query_as::<_, Paste>(&query)
            .bind(id)
            .fetch_optional(&mut conn)
            .await?)
    }

    /// Bump the view counter. A single UPDATE so concurrent reads never lose
    /// increments.
    pub async fn increment_views(&mut self, id: &str) -> ApiResult<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("UPDATE pastes SET views = views + 1 WHERE id = ?")
            .bind(id)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn update_paste(
        &mut self,
        id: &str,
        title: &str,
        content: &str,
        language: &str,
        is_public: bool,
    ) -> ApiResult<Paste> {
        let mut conn = self.pool.acquire().await?;
        let query = format!(
            "UPDATE pastes SET title = ?, content = ?, language = ?, is_public = ?, \
             updated_at = ? WHERE id = ? RETURNING {PASTE_COLUMNS}"
        );
        sqlx::query_as::<_, Paste>(&query)
            .bind(title)
            .bind(content)
            .bind(language)
            .bind(is_public)
            .bind(Utc::now())
            .bind(id)
            .fetch_all(&mut conn)
            .await?
            .pop()
            .ok_or(sqlx::Error::RowNotFound.into())
    }

    /// Delete a paste by id.
    pub async fn delete_paste(&mut self, id: &str) -> ApiResult<bool> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM pastes WHERE id = ?")
            .bind(id)
            .execute(&mut conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Public, non-expired pastes, newest first, with the total count.
    pub async fn list_public(
        &mut self,
        now: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> ApiResult<(Vec<PasteSummary>, i64)> {
        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pastes \
             WHERE is_public = TRUE AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(now)
        .fetch_one(&mut conn)
        .await?;

        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM pastes \
             WHERE is_public = TRUE AND (expires_at IS NULL OR expires_at > ?) \
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        let pastes = sqlx::query_as::<_, PasteSummary>(&query)
            .bind(now)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut conn)
            .await?;

        Ok((pastes, total))
    }

    /// All pastes owned by a user, newest first, with the total count.
    pub async fn list_by_user(
        &mut self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> ApiResult<(Vec<PasteSummary>, i64)> {
        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pastes WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&mut conn)
            .await?;

        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM pastes WHERE user_id = ? \
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        let pastes = sqlx::query_as::<_, PasteSummary>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut conn)
            .await?;

        Ok((pastes, total))
    }

    /// Insert a user. Returns `None` when the username or email is taken.
    pub async fn insert_user(
        &mut self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> ApiResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email, password_hash) VALUES (?, ?, ?, ?) \
             RETURNING id, username, email, password_hash, created_at",
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_all(&mut conn)
        .await;

        match result {
            Ok(mut rows) => Ok(rows.pop()),
            Err(error) if is_unique_violation(&error) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    pub async fn get_user_by_username(&mut self, username: &str) -> ApiResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&mut conn)
        .await?)
    }

    /// Resolve an active bearer token to its user.
    pub async fn find_user_by_token(&mut self, token: &str) -> ApiResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        Ok(sqlx::query_as::<_, User>(
            "SELECT users.id, users.username, users.email, users.password_hash, users.created_at \
             FROM tokens JOIN users ON users.id = tokens.user_id \
             WHERE tokens.token = ? AND tokens.is_active = TRUE",
        )
        .bind(token)
        .fetch_optional(&mut conn)
        .await?)
    }

    pub async fn insert_token(
        &mut self,
        id: &str,
        name: &str,
        token: &str,
        user_id: &str,
    ) -> ApiResult<Token> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query_as::<_, Token>(
            "INSERT INTO tokens (id, name, token, user_id) VALUES (?, ?, ?, ?) \
             RETURNING id, name, token, user_id, is_active, created_at",
        )
        .bind(id)
        .bind(name)
        .bind(token)
        .bind(user_id)
        .fetch_all(&mut conn)
        .await?
        .pop()
        .ok_or(sqlx::Error::RowNotFound.into())
    }

    pub async fn list_tokens(&mut self, user_id: &str) -> ApiResult<Vec<Token>> {
        let mut conn = self.pool.acquire().await?;
        Ok(sqlx::query_as::<_, Token>(
            "SELECT id, name, token, user_id, is_active, created_at FROM tokens \
             WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&mut conn)
        .await?)
    }

    /// Deactivate a token owned by `user_id`. Returns false if no such
    /// active token exists.
    pub async fn revoke_token(&mut self, id: &str, user_id: &str) -> ApiResult<bool> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            "UPDATE tokens SET is_active = FALSE \
             WHERE id = ? AND user_id = ? AND is_active = TRUE",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Unique-constraint violation, across the engines we support.
/// sqlite reports extended codes 1555 (primary key) and 2067 (unique index);
/// postgres uses SQLSTATE 23505.
fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => db
            .code()
            .map_or(false, |code| matches!(&*code, "1555" | "2067" | "23505")),
        _ => false,
    }
}
