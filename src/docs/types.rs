//! Doc wire types
//!
//! JSON representation of a doc and the validation applied before any
//! write. Content travels as base64 text; timestamps are RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::DocRecord;
use crate::error::AppError;

/// Shortest accepted title, in characters.
pub const TITLE_MIN_LEN: usize = 2;
/// Longest accepted description, in characters.
pub const DESCRIPTION_MAX_LEN: usize = 2000;

/// A doc as it appears on the wire.
///
/// Every field is optional so that malformed payloads reach
/// [`DocDto::validate`] instead of dying inside the JSON extractor;
/// validation owns the error message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocDto {
    /// Database id; absent on create.
    pub id: Option<i64>,
    /// Display title, at least [`TITLE_MIN_LEN`] characters.
    pub title: Option<String>,
    /// Optional language tag.
    pub language: Option<String>,
    /// Optional free-text description, capped at [`DESCRIPTION_MAX_LEN`].
    pub description: Option<String>,
    /// Raw file bytes, base64 in JSON.
    #[serde(with = "base64_content")]
    pub content: Option<Vec<u8>>,
    /// MIME type of `content`.
    #[serde(rename = "contentContentType")]
    pub content_type: Option<String>,
    /// SHA-1 of `content`, assigned by the server.
    pub content_sha1: Option<String>,
    /// Page count for PDFs, absent otherwise.
    #[serde(rename = "numberOfPages")]
    pub page_count: Option<i64>,
    /// Set by the server on create.
    pub created_at: Option<DateTime<Utc>>,
    /// Set by the server on every save.
    pub updated_at: Option<DateTime<Utc>>,
}

impl DocDto {
    /// Check the payload rules shared by create and update.
    pub fn validate(&self) -> Result<(), AppError> {
        match &self.title {
            None => return Err(AppError::Validation("title is required".to_string())),
            Some(title) if title.chars().count() < TITLE_MIN_LEN => {
                return Err(AppError::Validation(format!(
                    "title must be at least {} characters",
                    TITLE_MIN_LEN
                )));
            }
            Some(_) => {}
        }

        if self.content.is_none() {
            return Err(AppError::Validation("content is required".to_string()));
        }

        match &self.content_type {
            None => {
                return Err(AppError::Validation(
                    "contentContentType is required".to_string(),
                ));
            }
            Some(ct) if ct.is_empty() => {
                return Err(AppError::Validation(
                    "contentContentType must not be empty".to_string(),
                ));
            }
            Some(_) => {}
        }

        if let Some(description) = &self.description {
            if description.chars().count() > DESCRIPTION_MAX_LEN {
                return Err(AppError::Validation(format!(
                    "description must be at most {} characters",
                    DESCRIPTION_MAX_LEN
                )));
            }
        }

        Ok(())
    }
}

impl From<DocRecord> for DocDto {
    fn from(record: DocRecord) -> Self {
        Self {
            id: Some(record.id),
            title: Some(record.title),
            language: record.language,
            description: record.description,
            content: Some(record.content),
            content_type: Some(record.content_type),
            content_sha1: record.content_sha1,
            page_count: record.page_count,
            created_at: Some(record.created_at),
            updated_at: record.updated_at,
        }
    }
}

/// Base64 codec for the optional content field.
mod base64_content {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(content: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match content {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        match encoded {
            Some(text) => STANDARD
                .decode(text.as_bytes())
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("invalid base64 content: {}", e))),
            None => Ok(None),
        }
    }
}
