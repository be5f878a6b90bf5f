//! Knowledge note models and request payloads
//!
//! These mirror the JSON documents exchanged with the notes API. Timestamps are
//! server-assigned and kept verbatim as strings.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Server-assigned note identifier
pub type NoteId = i64;

/// A persisted knowledge note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub difficulty: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

impl KnowledgeItem {
    /// Tags as a slice, empty when the note has none
    pub fn tag_list(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }

    /// Parse `updated_at` as a naive ISO-8601 date-time.
    ///
    /// Accepts the server's fractional-second form as well as a trailing `Z`
    /// or offset, which is discarded. Returns `None` for anything else.
    pub fn updated_at_naive(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.updated_at)
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Payload for creating a note
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgePayload {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<i32>,
}

impl KnowledgePayload {
    /// Payload with just the required fields
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: i32) -> Self {
        self.difficulty = Some(difficulty);
        self
    }
}

/// Partial payload for updating a note.
///
/// Only `Some` fields are sent; the server keeps every omitted field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<i32>,
}

impl KnowledgeUpdate {
    /// True when no field would be sent
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.source.is_none()
            && self.difficulty.is_none()
    }
}

impl From<KnowledgePayload> for KnowledgeUpdate {
    fn from(p: KnowledgePayload) -> Self {
        Self {
            title: Some(p.title),
            content: Some(p.content),
            tags: p.tags,
            source: p.source,
            difficulty: p.difficulty,
        }
    }
}

/// Tag name with its usage count, computed by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagStat {
    pub name: String,
    pub count: u64,
}

/// Query parameters for the list endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ListQuery {
    /// Build a query, dropping empty strings so they are never sent
    pub fn new(q: Option<&str>, tag: Option<&str>) -> Self {
        Self {
            q: q.filter(|s| !s.is_empty()).map(str::to_string),
            tag: tag.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }
}
