//! Note editing sessions and autosave scheduling.
//!
//! # Responsibility
//! - Hold the draft/snapshot pair for one open note (`editing`).
//! - Decide *when* to reconcile (`scheduler`) on debounce, interval and exit.
//! - Tie both to a store and a clock behind one controller (`editor`).
//!
//! # Invariants
//! - Reconcile calls for one note never overlap: every entry point takes
//!   `&mut self`, so the borrow checker serializes them.
//! - Time only enters through `Clock`, which keeps timer behavior
//!   reproducible under `ManualClock`.

pub mod clock;
pub mod editing;
pub mod editor;
pub mod scheduler;

use crate::model::note::NoteId;
use crate::repo::note_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by editing sessions and editors.
#[derive(Debug)]
pub enum SessionError {
    /// Storage gateway failed; the draft is kept for the next attempt.
    Storage(RepoError),
    /// Editor was already closed by exit or discard.
    Closed(NoteId),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Closed(id) => write!(f, "editor for note {id} is closed"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Closed(_) => None,
        }
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}
