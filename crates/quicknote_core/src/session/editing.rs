//! Note editing session: draft, snapshot and the reconcile decision.
//!
//! # Responsibility
//! - Hold the in-memory draft of one note and the last state known to match
//!   durable storage.
//! - Decide, per trigger, whether to upsert, delete, or do nothing.
//!
//! # Invariants
//! - A freshly synthesized note with no edits never creates a row.
//! - Blank drafts are deleted, never written.
//! - The snapshot only moves forward after a successful upsert.
//! - `lastUpdated` of the persisted note never decreases within a session.
//! - A failed storage call leaves draft and snapshot untouched.

use crate::model::note::{Note, NoteField, NoteId};
use crate::repo::note_repo::{NoteStore, RepoResult};
use chrono::{DateTime, Utc};
use log::{info, warn};

/// What caused a reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileTrigger {
    /// Quiet period elapsed after the last edit.
    Debounce,
    /// Fallback fixed-interval autosave.
    Interval,
    /// Editing surface is being dismissed.
    Exit,
}

impl ReconcileTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debounce => "debounce",
            Self::Interval => "interval",
            Self::Exit => "exit",
        }
    }
}

/// Result of one reconcile decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Draft matches the snapshot; nothing was sent to storage.
    Unchanged,
    /// Draft was upserted; carries the persisted note.
    Saved(Note),
    /// Draft was blank; the row was deleted.
    Deleted,
    /// Exit on a never-persisted placeholder; nothing was written.
    SuppressedDefault,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Saved(_) => "saved",
            Self::Deleted => "deleted",
            Self::SuppressedDefault => "suppressed_default",
        }
    }
}

/// Whether a row is believed to exist for the session's note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowState {
    /// No row existed at load time and nothing was written yet.
    Fresh,
    /// The snapshot matches the stored row.
    Persisted,
    /// The row was deleted because the draft went blank.
    Removed,
}

/// Draft/snapshot state for one open note.
#[derive(Debug, Clone)]
pub struct EditingSession {
    draft: Note,
    snapshot: Note,
    row: RowState,
}

impl EditingSession {
    /// Builds a session from an already loaded row, or a fresh placeholder.
    ///
    /// No storage call happens here.
    pub fn initialize(id: NoteId, existing: Option<Note>, now: DateTime<Utc>) -> Self {
        match existing {
            Some(row) => Self {
                draft: row.clone(),
                snapshot: row,
                row: RowState::Persisted,
            },
            None => {
                let draft = Note::placeholder(id, now);
                Self {
                    snapshot: draft.clone(),
                    draft,
                    row: RowState::Fresh,
                }
            }
        }
    }

    /// Loads `id` from `store` and initializes a session from the result.
    ///
    /// A missing row is not an error; it starts a new note.
    pub fn load<S: NoteStore + ?Sized>(
        store: &S,
        id: NoteId,
        now: DateTime<Utc>,
    ) -> RepoResult<Self> {
        let existing = store.get_note(&id)?;
        Ok(Self::initialize(id, existing, now))
    }

    pub fn note_id(&self) -> &NoteId {
        &self.draft.id
    }

    pub fn draft(&self) -> &Note {
        &self.draft
    }

    pub fn snapshot(&self) -> &Note {
        &self.snapshot
    }

    /// True while no row is stored for this note (fresh or removed).
    pub fn is_new(&self) -> bool {
        self.row != RowState::Persisted
    }

    /// True after a blank draft caused the row to be deleted.
    pub fn is_removed(&self) -> bool {
        self.row == RowState::Removed
    }

    /// Applies one keystroke-level edit to the draft. Never persists.
    pub fn on_field_change(&mut self, field: NoteField, value: impl Into<String>) {
        self.draft.set_field(field, value);
    }

    /// True when the next reconcile would reach storage.
    pub fn has_changed(&self) -> bool {
        match self.row {
            RowState::Removed => !self.draft.is_blank(),
            RowState::Fresh | RowState::Persisted => !self.draft.same_text(&self.snapshot),
        }
    }

    /// Compares draft to snapshot and issues at most one upsert or delete.
    ///
    /// # Errors
    /// - Storage failures are returned unchanged; draft and snapshot keep
    ///   their values, so the next trigger retries the same write.
    pub fn reconcile<S: NoteStore + ?Sized>(
        &mut self,
        trigger: ReconcileTrigger,
        store: &S,
        now: DateTime<Utc>,
    ) -> RepoResult<ReconcileOutcome> {
        let result = self.decide_and_apply(trigger, store, now);
        match &result {
            Ok(outcome) => info!(
                "event=note_reconcile module=session status=ok note_id={} trigger={} outcome={}",
                self.draft.id,
                trigger.as_str(),
                outcome.as_str()
            ),
            Err(err) => warn!(
                "event=note_reconcile module=session status=error note_id={} trigger={} error={}",
                self.draft.id,
                trigger.as_str(),
                err
            ),
        }
        result
    }

    fn decide_and_apply<S: NoteStore + ?Sized>(
        &mut self,
        trigger: ReconcileTrigger,
        store: &S,
        now: DateTime<Utc>,
    ) -> RepoResult<ReconcileOutcome> {
        if !self.has_changed() {
            return Ok(ReconcileOutcome::Unchanged);
        }

        // Only guards rows that do not exist yet; edits to a stored note
        // always go through.
        if trigger == ReconcileTrigger::Exit
            && self.row != RowState::Persisted
            && self.draft.is_untouched_default()
        {
            return Ok(ReconcileOutcome::SuppressedDefault);
        }

        if self.draft.is_blank() {
            store.delete(&self.draft.id)?;
            self.row = RowState::Removed;
            return Ok(ReconcileOutcome::Deleted);
        }

        let mut candidate = self.draft.clone();
        candidate.last_updated = now.max(self.snapshot.last_updated);
        store.upsert(&candidate)?;

        self.draft.last_updated = candidate.last_updated;
        self.snapshot = candidate.clone();
        self.row = RowState::Persisted;
        Ok(ReconcileOutcome::Saved(candidate))
    }
}
