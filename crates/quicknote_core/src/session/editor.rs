//! Note editor controller used by presentation layers.
//!
//! # Responsibility
//! - Own one `EditingSession`, its `AutosaveScheduler`, a store and a clock.
//! - Expose the lifecycle points a UI calls: field change, timer tick, exit,
//!   discard.
//!
//! # Invariants
//! - `exit` must complete successfully before navigation may proceed; a
//!   failed exit leaves the editor open with the draft intact.
//! - After a successful `exit` or `discard` the editor is closed and rejects
//!   edits.
//! - Dropping an open editor still runs the exit reconcile.

use crate::model::note::{Note, NoteField, NoteId};
use crate::repo::note_repo::NoteStore;
use crate::session::clock::Clock;
use crate::session::editing::{EditingSession, ReconcileOutcome};
use crate::session::scheduler::{AutosavePolicy, AutosaveScheduler};
use crate::session::{SessionError, SessionResult};
use chrono::{DateTime, Utc};
use log::{error, info};
use std::sync::Arc;

/// Lifecycle state of an editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Open,
    Closed,
}

/// Result of an exit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exit reconcile ran; navigation may proceed.
    Reconciled(ReconcileOutcome),
    /// Editor was already closed; navigation may proceed.
    AlreadyClosed,
}

/// Editing surface controller for a single note.
pub struct NoteEditor<S: NoteStore> {
    session: EditingSession,
    scheduler: AutosaveScheduler,
    store: S,
    clock: Arc<dyn Clock>,
    state: EditorState,
}

impl<S: NoteStore> NoteEditor<S> {
    /// Mounts an editor for `id`, or for a newly generated id when `None`.
    ///
    /// # Errors
    /// - Returns `SessionError::Storage` when the initial load fails.
    pub fn open(
        store: S,
        id: Option<NoteId>,
        policy: AutosavePolicy,
        clock: Arc<dyn Clock>,
    ) -> SessionResult<Self> {
        let now = clock.now();
        let id = id.unwrap_or_else(NoteId::generate);
        let session = EditingSession::load(&store, id, now)?;
        info!(
            "event=editor_open module=session status=ok note_id={} is_new={} debounce_ms={} interval_ms={}",
            session.note_id(),
            session.is_new(),
            policy.quiet_period().as_millis(),
            policy.interval().map_or(0, |period| period.as_millis())
        );
        Ok(Self {
            session,
            scheduler: AutosaveScheduler::new(policy, now),
            store,
            clock,
            state: EditorState::Open,
        })
    }

    pub fn note_id(&self) -> &NoteId {
        self.session.note_id()
    }

    pub fn draft(&self) -> &Note {
        self.session.draft()
    }

    pub fn session(&self) -> &EditingSession {
        &self.session
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Earliest instant at which `tick` has work to do.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        match self.state {
            EditorState::Open => self.scheduler.next_deadline(),
            EditorState::Closed => None,
        }
    }

    /// Applies an edit and restarts the quiet period.
    pub fn set_field(&mut self, field: NoteField, value: impl Into<String>) -> SessionResult<()> {
        self.ensure_open()?;
        self.session.on_field_change(field, value);
        self.scheduler.note_edit(self.clock.now());
        Ok(())
    }

    pub fn set_title(&mut self, value: impl Into<String>) -> SessionResult<()> {
        self.set_field(NoteField::Title, value)
    }

    pub fn set_content(&mut self, value: impl Into<String>) -> SessionResult<()> {
        self.set_field(NoteField::Content, value)
    }

    /// Runs every autosave trigger that is due now.
    ///
    /// A closed editor has nothing scheduled and returns an empty list.
    pub fn tick(&mut self) -> SessionResult<Vec<ReconcileOutcome>> {
        if self.state == EditorState::Closed {
            return Ok(Vec::new());
        }
        let now = self.clock.now();
        let Self {
            session,
            scheduler,
            store,
            ..
        } = self;
        let outcomes = scheduler.poll(now, |trigger| session.reconcile(trigger, &*store, now))?;
        Ok(outcomes)
    }

    /// Flushes the draft before the editing surface is dismissed.
    ///
    /// # Errors
    /// - Storage failures keep the editor open so the next exit retries.
    pub fn exit(&mut self) -> SessionResult<ExitOutcome> {
        if self.state == EditorState::Closed {
            return Ok(ExitOutcome::AlreadyClosed);
        }
        let now = self.clock.now();
        let Self {
            session,
            scheduler,
            store,
            ..
        } = self;
        let outcome = scheduler.flush_exit(|trigger| session.reconcile(trigger, &*store, now))?;
        self.scheduler.cancel();
        self.state = EditorState::Closed;
        info!(
            "event=editor_exit module=session status=ok note_id={} outcome={}",
            self.session.note_id(),
            outcome.as_str()
        );
        Ok(ExitOutcome::Reconciled(outcome))
    }

    /// Deletes the note and closes the editor without an exit save.
    ///
    /// Returns whether a stored row existed.
    pub fn discard(&mut self) -> SessionResult<bool> {
        self.ensure_open()?;
        let existed = self.store.delete(self.session.note_id())?;
        self.scheduler.cancel();
        self.state = EditorState::Closed;
        info!(
            "event=editor_discard module=session status=ok note_id={} existed={}",
            self.session.note_id(),
            existed
        );
        Ok(existed)
    }

    fn ensure_open(&self) -> SessionResult<()> {
        match self.state {
            EditorState::Open => Ok(()),
            EditorState::Closed => Err(SessionError::Closed(self.session.note_id().clone())),
        }
    }
}

impl<S: NoteStore> Drop for NoteEditor<S> {
    fn drop(&mut self) {
        if self.state == EditorState::Closed {
            return;
        }
        if let Err(err) = self.exit() {
            error!(
                "event=editor_drop module=session status=error note_id={} error={}",
                self.session.note_id(),
                err
            );
        }
    }
}
