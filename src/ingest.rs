//! The ingestion pipeline: validate a normalized payload, allocate a unique
//! identifier, and persist the paste.

use tracing::info;

use crate::content::{DEFAULT_LANGUAGE, DEFAULT_TITLE};
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::models::{NewPasteRecord, Paste};
use crate::normalize::{NewPaste, MISSING_CONTENT};
use crate::id;

/// Give up after this many id collisions. Reaching it means the store is
/// misbehaving or the id space is effectively full; either way it is a
/// server fault, not the client's.
pub const MAX_ID_ATTEMPTS: usize = 10;

const MAX_TITLE_LENGTH: usize = 200;
const MAX_LANGUAGE_LENGTH: usize = 50;

pub async fn create_paste(
    db: &mut Database,
    new: NewPaste,
    user_id: Option<&str>,
) -> ApiResult<Paste> {
    create_with(db, new, user_id, id::generate).await
}

/// Allocation works by inserting directly and treating a primary-key
/// violation as the collision signal, so concurrent creates can never race a
/// check-then-insert gap. The id source is injected so tests can force
/// collisions.
async fn create_with(
    db: &mut Database,
    new: NewPaste,
    user_id: Option<&str>,
    mut next_id: impl FnMut() -> String,
) -> ApiResult<Paste> {
    let content = new.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation(MISSING_CONTENT.into()));
    }

    let title = new.title.as_deref().unwrap_or(DEFAULT_TITLE);
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::Validation(format!(
            "title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }

    let language = new.language.as_deref().unwrap_or(DEFAULT_LANGUAGE);
    if language.chars().count() > MAX_LANGUAGE_LENGTH {
        return Err(ApiError::Validation(format!(
            "language must be at most {MAX_LANGUAGE_LENGTH} characters"
        )));
    }

    for _ in 0..MAX_ID_ATTEMPTS {
        let id = next_id();
        let record = NewPasteRecord {
            id: &id,
            title,
            content,
            language,
            is_public: new.is_public,
            expires_at: new.expires_at,
            user_id,
        };

        if let Some(paste) = db.insert_paste(&record).await? {
            info!(
                id = %paste.id,
                language = %paste.language,
                size = paste.content.len(),
                "created paste"
            );
            return Ok(paste);
        }
    }

    Err(ApiError::AllocationExhausted)
}
