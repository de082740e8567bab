//! Core domain logic for Quicknote.
//! This crate is the single source of truth for note persistence and
//! autosave invariants.

pub mod backup;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use backup::{
    export_backup, render_backup, share_backup, BackupError, BackupResult, ShareSink,
    BACKUP_FILE_NAME,
};
pub use config::{ConfigError, QuicknoteConfig};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::note::{Note, NoteField, NoteId, NoteValidationError, PLACEHOLDER_TITLE};
pub use repo::note_repo::{NoteStore, RepoError, RepoResult, SqliteNoteRepository};
pub use service::note_service::{
    derive_preview, share_text, NoteListItem, NotePreview, NoteService,
};
pub use session::clock::{Clock, ManualClock, SystemClock};
pub use session::editing::{EditingSession, ReconcileOutcome, ReconcileTrigger};
pub use session::editor::{EditorState, ExitOutcome, NoteEditor};
pub use session::scheduler::{AutosavePolicy, AutosaveScheduler};
pub use session::{SessionError, SessionResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
