//! Note use-case service.
//!
//! # Responsibility
//! - List notes for display with derived preview projections.
//! - Delete notes from list context.
//! - Mount editors over the same store.
//!
//! # Invariants
//! - Note list is always sorted by `lastUpdated DESC, id ASC`.
//! - Deleting an unknown id succeeds.

use crate::model::note::{Note, NoteId};
use crate::repo::note_repo::{NoteStore, RepoResult};
use crate::session::clock::Clock;
use crate::session::editor::NoteEditor;
use crate::session::scheduler::AutosavePolicy;
use crate::session::SessionResult;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const PREVIEW_MAX_LINES: usize = 3;
const PREVIEW_MAX_CHARS: usize = 120;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Card projection shown in the note list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePreview {
    /// Title with whitespace collapsed to single spaces.
    pub title: String,
    /// First lines of content, whitespace collapsed, length capped.
    pub excerpt: String,
    /// `lastUpdated` calendar date, `YYYY-MM-DD`.
    pub updated_label: String,
}

/// One row of the note list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteListItem {
    pub note: Note,
    pub preview: NotePreview,
}

/// Note service facade over a store implementation.
pub struct NoteService<S: NoteStore> {
    store: S,
}

impl<S: NoteStore> NoteService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Lists all notes, most recently updated first.
    pub fn list_notes(&self) -> RepoResult<Vec<NoteListItem>> {
        let items = self
            .store
            .read_all()?
            .into_iter()
            .map(|note| NoteListItem {
                preview: derive_preview(&note),
                note,
            })
            .collect::<Vec<_>>();
        Ok(items)
    }

    pub fn get_note(&self, id: &NoteId) -> RepoResult<Option<Note>> {
        self.store.get_note(id)
    }

    /// Deletes one note; returns whether it existed.
    pub fn delete_note(&self, id: &NoteId) -> RepoResult<bool> {
        let existed = self.store.delete(id)?;
        info!(
            "event=note_delete module=service status=ok note_id={} existed={}",
            id, existed
        );
        Ok(existed)
    }

    /// Mounts an editor that borrows this service's store.
    pub fn open_editor(
        &self,
        id: Option<NoteId>,
        policy: AutosavePolicy,
        clock: Arc<dyn Clock>,
    ) -> SessionResult<NoteEditor<&S>> {
        NoteEditor::open(&self.store, id, policy, clock)
    }
}

/// Derives the list-card projection of one note.
pub fn derive_preview(note: &Note) -> NotePreview {
    let title = collapse_whitespace(&note.title);
    let leading_lines = note
        .content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(PREVIEW_MAX_LINES)
        .collect::<Vec<_>>()
        .join(" ");
    let collapsed = collapse_whitespace(&leading_lines);
    let mut excerpt: String = collapsed.chars().take(PREVIEW_MAX_CHARS).collect();
    if collapsed.chars().count() > PREVIEW_MAX_CHARS {
        excerpt.push_str("...");
    }

    NotePreview {
        title,
        excerpt,
        updated_label: note.last_updated.format("%Y-%m-%d").to_string(),
    }
}

/// Renders the message handed to the platform share sheet for one note.
pub fn share_text(note: &Note) -> String {
    format!("Title: {}\n\nContent: {}", note.title, note.content)
}

fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RE.replace_all(value.trim(), " ").into_owned()
}
