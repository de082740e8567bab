//! Note domain model.
//!
//! # Responsibility
//! - Define the note record and its identifier.
//! - Provide the blank / untouched-default predicates used by reconcile.
//! - Define the canonical `lastUpdated` text encoding.
//!
//! # Invariants
//! - `id` is stable and never reassigned after creation.
//! - A persisted note never has both `title` and `content` blank after trim.
//! - `lastUpdated` text is RFC 3339 UTC with millisecond precision, so
//!   lexicographic order matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Title given to freshly synthesized drafts.
pub const PLACEHOLDER_TITLE: &str = "Untitled Note";

/// Opaque, client-generated note identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps caller-provided id text.
    ///
    /// # Errors
    /// - Returns `NoteValidationError::EmptyId` when the value is blank.
    pub fn parse(value: impl Into<String>) -> Result<Self, NoteValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(NoteValidationError::EmptyId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Editable text field of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteField {
    Title,
    Content,
}

impl NoteField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Content => "content",
        }
    }
}

/// Validation errors for note write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    /// Identifier is empty after trim.
    EmptyId,
    /// Both title and content are empty after trim.
    BlankNote(NoteId),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "note id must not be empty"),
            Self::BlankNote(id) => write!(
                f,
                "note {id} has blank title and content; delete it instead of saving"
            ),
        }
    }
}

impl Error for NoteValidationError {}

/// A single short text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Time of the most recent successful persistence.
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

impl Note {
    pub fn new(
        id: NoteId,
        title: impl Into<String>,
        content: impl Into<String>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
            last_updated,
        }
    }

    /// Synthesizes the in-memory draft used when no row exists for `id`.
    ///
    /// The draft carries the placeholder title and empty content.
    pub fn placeholder(id: NoteId, now: DateTime<Utc>) -> Self {
        Self::new(id, PLACEHOLDER_TITLE, "", now)
    }

    /// Returns the value of one editable field.
    pub fn field(&self, field: NoteField) -> &str {
        match field {
            NoteField::Title => self.title.as_str(),
            NoteField::Content => self.content.as_str(),
        }
    }

    /// Replaces the value of one editable field.
    pub fn set_field(&mut self, field: NoteField, value: impl Into<String>) {
        match field {
            NoteField::Title => self.title = value.into(),
            NoteField::Content => self.content = value.into(),
        }
    }

    /// True when title and content are both empty after trim.
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }

    /// True when the note still looks like a synthesized placeholder.
    pub fn is_untouched_default(&self) -> bool {
        self.title == PLACEHOLDER_TITLE && self.content.trim().is_empty()
    }

    /// True when title and content match `other`, ignoring id and timestamp.
    pub fn same_text(&self, other: &Note) -> bool {
        self.title == other.title && self.content == other.content
    }

    /// Validates the storage-boundary invariants.
    ///
    /// # Errors
    /// - `EmptyId` when the id is blank.
    /// - `BlankNote` when title and content are both blank.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(NoteValidationError::EmptyId);
        }
        if self.is_blank() {
            return Err(NoteValidationError::BlankNote(self.id.clone()));
        }
        Ok(())
    }
}

/// Encodes a timestamp as persisted in `notes.lastUpdated`.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decodes a persisted `notes.lastUpdated` value.
///
/// Accepts any RFC 3339 offset and normalizes it to UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
