//! JSON API paste handlers, plus the shared policy-gated read path used by
//! every single-paste dispatcher.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use crate::auth::{CurrentUser, RequireUser};
use crate::config::Config;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::models::{Paste, User};
use crate::normalize::{NewPaste, MISSING_CONTENT};
use crate::policy::{self, Access};
use crate::types::api::{
    ListQuery, Message, Pagination, PasteCreated, PasteList, PasteResponse, UpdatePaste,
};
use crate::ingest;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Look up a paste, apply the visibility/expiry policy for `user`, and count
/// the view. Every read dispatcher goes through here so that the same paste
/// and requester always produce the same decision.
pub async fn fetch_readable(
    db: &mut Database,
    id: &str,
    user: Option<&User>,
) -> ApiResult<Paste> {
    let Some(mut paste) = db.get_paste(id).await? else {
        return Err(ApiError::NotFound);
    };

    match policy::evaluate(&paste, user.map(|u| u.id.as_str()), Utc::now()) {
        Access::Allow => {
            db.increment_views(id).await?;
            paste.views += 1;
            Ok(paste)
        }
        Access::Expired => Err(ApiError::Expired),
        Access::Forbidden => Err(ApiError::Forbidden),
    }
}

fn page_window(query: &ListQuery) -> (i64, i64, i64) {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (page, limit, (page - 1) * limit)
}

pub async fn list(
    State(mut db): State<Database>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<PasteList>> {
    let (page, limit, offset) = page_window(&query);
    let (pastes, total) = db.list_public(Utc::now(), limit, offset).await?;

    Ok(Json(PasteList {
        pastes: pastes.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

pub async fn create(
    State(config): State<Config>,
    State(mut db): State<Database>,
    CurrentUser(user): CurrentUser,
    new_paste: NewPaste,
) -> ApiResult<impl IntoResponse> {
    let owner = user.as_ref().map(|u| u.id.as_str());
    let paste = ingest::create_paste(&mut db, new_paste, owner).await?;

    let link = config.paste_url(&paste.id);
    let location = format!("/{}", paste.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(PasteCreated::new(&paste, link)),
    ))
}

pub async fn get(
    State(mut db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<PasteResponse>> {
    let paste = fetch_readable(&mut db, &id, user.as_ref()).await?;
    Ok(Json(paste.into()))
}

pub async fn update(
    State(mut db): State<Database>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    Json(update): Json<UpdatePaste>,
) -> ApiResult<Json<PasteResponse>> {
    let Some(paste) = db.get_paste(&id).await? else {
        return Err(ApiError::NotFound);
    };
    if paste.user_id.as_deref() != Some(user.id.as_str()) {
        return Err(ApiError::Forbidden);
    }

    let content = match update.content {
        Some(content) => {
            let trimmed = content.trim().to_owned();
            if trimmed.is_empty() {
                return Err(ApiError::Validation(MISSING_CONTENT.into()));
            }
            trimmed
        }
        None => paste.content,
    };
    let title = update.title.unwrap_or(paste.title);
    let language = update.language.unwrap_or(paste.language);
    let is_public = update.is_public.unwrap_or(paste.is_public);

    let updated = db
        .update_paste(&id, &title, &content, &language, is_public)
        .await?;
    Ok(Json(updated.into()))
}

pub async fn delete(
    State(mut db): State<Database>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    let Some(paste) = db.get_paste(&id).await? else {
        return Err(ApiError::NotFound);
    };
    if paste.user_id.as_deref() != Some(user.id.as_str()) {
        return Err(ApiError::Forbidden);
    }

    db.delete_paste(&id).await?;
    Ok(Json(Message::new("paste deleted successfully")))
}

pub async fn user_pastes(
    State(mut db): State<Database>,
    RequireUser(user): RequireUser,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<PasteList>> {
    if user.id != user_id {
        return Err(ApiError::Forbidden);
    }

    let (page, limit, offset) = page_window(&query);
    let (pastes, total) = db.list_by_user(&user_id, limit, offset).await?;

    Ok(Json(PasteList {
        pastes: pastes.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}
