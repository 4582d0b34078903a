//! The content normalizer: one extractor that turns any supported inbound
//! shape (multipart file, JSON, form fields, raw body) into a canonical
//! new-paste payload.

use std::collections::HashMap;

use axum::async_trait;
use axum::body::{Bytes, HttpBody};
use axum::extract::{FromRequest, Multipart};
use axum::http::{header, HeaderMap, Request};
use axum::{BoxError, Form, Json};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::content;
use crate::error::{ApiError, ApiResult};

pub const MISSING_CONTENT: &str = "content is required";

/// Canonical new-paste payload, independent of the wire shape it arrived in.
/// Defaults for title/language are applied at ingestion.
#[derive(Debug, Clone)]
pub struct NewPaste {
    pub title: Option<String>,
    pub content: String,
    pub language: Option<String>,
    pub is_public: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// JSON create body. Field names match the public API (camelCase).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaste {
    pub content: Option<String>,
    pub title: Option<String>,
    pub language: Option<String>,
    pub is_public: Option<bool>,
    /// Minutes until expiry; converted to an absolute timestamp here.
    pub expires_in: Option<i64>,
}

#[async_trait]
impl<S, B> FromRequest<S, B> for NewPaste
where
    B: HttpBody + Send + 'static,
    B::Data: Send + Into<Bytes>,
    B::Error: Into<BoxError>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|_| ApiError::Validation("malformed multipart body".into()))?;
            from_multipart(multipart).await
        } else if content_type.starts_with("application/json") {
            let Json(body) = Json::<CreatePaste>::from_request(req, state)
                .await
                .map_err(|_| ApiError::Validation("invalid JSON body".into()))?;
            from_json(body)
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|_| ApiError::Validation("invalid form body".into()))?;
            from_form(fields)
        } else {
            // Raw upload, e.g. `curl --data-binary @file`. Metadata can ride
            // along in custom headers.
            let title = header_value(req.headers(), "x-title");
            let language = header_value(req.headers(), "x-language");
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(|_| ApiError::Validation(MISSING_CONTENT.into()))?;
            Ok(NewPaste {
                title,
                content: String::from_utf8_lossy(&bytes).into_owned(),
                language,
                is_public: true,
                expires_at: None,
            })
        }
    }
}

/// First multipart field that carries a filename becomes the paste. Media
/// uploads are stored as `data:` URIs; anything else is decoded as text.
async fn from_multipart(mut multipart: Multipart) -> ApiResult<NewPaste> {
    while let Some(field) = multipart.next_field().await? {
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let data = field.bytes().await?;

        let content = if content::is_media_mime(&mime) {
            content::to_data_uri(&mime, &data)
        } else {
            String::from_utf8_lossy(&data).into_owned()
        };

        return Ok(NewPaste {
            language: Some(content::language_for_filename(&file_name).to_owned()),
            title: Some(file_name),
            content,
            is_public: true,
            expires_at: None,
        });
    }

    Err(ApiError::Validation(MISSING_CONTENT.into()))
}

fn from_json(body: CreatePaste) -> ApiResult<NewPaste> {
    let content = body
        .content
        .ok_or_else(|| ApiError::Validation(MISSING_CONTENT.into()))?;

    Ok(NewPaste {
        title: body.title,
        content,
        language: body.language,
        is_public: body.is_public.unwrap_or(true),
        expires_at: expires_at_from_minutes(body.expires_in)?,
    })
}

/// Form submissions must name their content field explicitly. (An earlier
/// revision guessed the content from the longest form key; that heuristic
/// was dropped as unreliable.)
fn from_form(mut fields: HashMap<String, String>) -> ApiResult<NewPaste> {
    let content = fields
        .remove("content")
        .ok_or_else(|| ApiError::Validation(MISSING_CONTENT.into()))?;

    let is_public = fields
        .get("isPublic")
        .or_else(|| fields.get("is_public"))
        .map_or(true, |value| {
            !matches!(value.as_str(), "false" | "0" | "off" | "no")
        });

    let expires_in = match fields.get("expiresIn").or_else(|| fields.get("expires_in")) {
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            ApiError::Validation("expiresIn must be a number of minutes".into())
        })?),
        None => None,
    };

    Ok(NewPaste {
        title: fields.remove("title").filter(|t| !t.is_empty()),
        content,
        language: fields.remove("language").filter(|l| !l.is_empty()),
        is_public,
        expires_at: expires_at_from_minutes(expires_in)?,
    })
}

fn expires_at_from_minutes(minutes: Option<i64>) -> ApiResult<Option<DateTime<Utc>>> {
    match minutes {
        None => Ok(None),
        Some(m) if m > 0 => Ok(Some(Utc::now() + Duration::minutes(m))),
        Some(_) => Err(ApiError::Validation(
            "expiresIn must be a positive number of minutes".into(),
        )),
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .filter(|value| !value.is_empty())
}
