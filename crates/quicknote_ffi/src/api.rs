//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose note listing, deletion, backup and editor lifecycle to Dart via
//!   FRB.
//! - Keep open editors alive between calls in a process-wide handle registry.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every editor call for one handle is serialized by that editor's mutex.
//! - A handle leaves the registry only after a successful exit or discard.

use log::{error, warn};
use once_cell::sync::{Lazy, OnceCell};
use quicknote_core::db::open_db;
use quicknote_core::{
    core_version as core_version_inner, export_backup, init_logging as init_logging_inner,
    ping as ping_inner, AutosavePolicy, ExitOutcome, NoteEditor, NoteId, NoteListItem,
    NoteService, QuicknoteConfig, ReconcileOutcome, SqliteNoteRepository, SystemClock,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type SharedEditor = Arc<Mutex<NoteEditor<SqliteNoteRepository>>>;

static CONFIG: OnceCell<QuicknoteConfig> = OnceCell::new();
static EDITORS: Lazy<Mutex<HashMap<u64, SharedEditor>>> = Lazy::new(|| Mutex::new(HashMap::new()));
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// One note card in the list screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteItem {
    pub note_id: String,
    pub title: String,
    pub content: String,
    /// Collapsed first lines of content for the card body.
    pub excerpt: String,
    /// `YYYY-MM-DD` of the last update.
    pub updated_label: String,
    pub last_updated_epoch_ms: i64,
}

/// List response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesListResponse {
    pub ok: bool,
    /// Notes, most recently updated first.
    pub items: Vec<NoteItem>,
    pub message: String,
}

/// Generic action response envelope for delete and backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteActionResponse {
    pub ok: bool,
    /// Backup file path for `notes_backup`.
    pub path: Option<String>,
    pub message: String,
}

impl NoteActionResponse {
    fn success(message: impl Into<String>, path: Option<String>) -> Self {
        Self {
            ok: true,
            path,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            path: None,
            message: message.into(),
        }
    }
}

/// Editor response envelope shared by every `editor_*` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorResponse {
    /// Whether the call succeeded. For `editor_exit`, navigation may proceed
    /// only when this is `true`.
    pub ok: bool,
    pub handle: Option<u64>,
    pub note_id: Option<String>,
    /// Current draft title.
    pub title: Option<String>,
    /// Current draft content.
    pub content: Option<String>,
    /// Reconcile outcomes produced by this call (`unchanged|saved|deleted|suppressed_default`).
    pub outcomes: Vec<String>,
    /// When the caller should tick next; `None` when nothing is scheduled.
    pub next_deadline_epoch_ms: Option<i64>,
    pub message: String,
}

impl EditorResponse {
    fn from_editor(
        handle: u64,
        editor: &NoteEditor<SqliteNoteRepository>,
        outcomes: Vec<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            ok: true,
            handle: Some(handle),
            note_id: Some(editor.note_id().to_string()),
            title: Some(editor.draft().title.clone()),
            content: Some(editor.draft().content.clone()),
            outcomes,
            next_deadline_epoch_ms: editor.next_deadline().map(|at| at.timestamp_millis()),
            message: message.into(),
        }
    }

    fn closed(handle: u64, outcomes: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            handle: Some(handle),
            note_id: None,
            title: None,
            content: None,
            outcomes,
            next_deadline_epoch_ms: None,
            message: message.into(),
        }
    }

    fn failure(handle: Option<u64>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            handle,
            note_id: None,
            title: None,
            content: None,
            outcomes: Vec::new(),
            next_deadline_epoch_ms: None,
            message: message.into(),
        }
    }
}

/// Lists every note, most recently updated first.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_list() -> NotesListResponse {
    match with_note_service(|service| service.list_notes().map_err(|err| err.to_string())) {
        Ok(items) => {
            let items = items.into_iter().map(to_note_item).collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No notes.".to_string()
            } else {
                format!("Found {} note(s).", items.len())
            };
            NotesListResponse {
                ok: true,
                items,
                message,
            }
        }
        Err(err) => NotesListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("notes_list failed: {err}"),
        },
    }
}

/// Deletes one note from list context. Deleting an unknown id succeeds.
#[flutter_rust_bridge::frb(sync)]
pub fn note_delete(note_id: String) -> NoteActionResponse {
    let id = match NoteId::parse(&note_id) {
        Ok(id) => id,
        Err(err) => return NoteActionResponse::failure(format!("note_delete failed: {err}")),
    };
    match with_note_service(|service| service.delete_note(&id).map_err(|err| err.to_string())) {
        Ok(true) => NoteActionResponse::success("Note deleted.", None),
        Ok(false) => NoteActionResponse::success("Note already absent.", None),
        Err(err) => NoteActionResponse::failure(format!("note_delete failed: {err}")),
    }
}

/// Writes `backup.txt` into `dir` and returns its path for the share sheet.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_backup(dir: String) -> NoteActionResponse {
    let dir = dir.trim().to_string();
    if dir.is_empty() {
        return NoteActionResponse::failure("notes_backup failed: dir cannot be empty");
    }
    let exported = with_note_service(|service| {
        export_backup(service.store(), Path::new(&dir)).map_err(|err| err.to_string())
    });
    match exported {
        Ok(path) => NoteActionResponse::success(
            "Backup written.",
            Some(path.to_string_lossy().into_owned()),
        ),
        Err(err) => NoteActionResponse::failure(format!("notes_backup failed: {err}")),
    }
}

/// Opens an editor for `note_id`, or for a new note when `None`.
///
/// `surface` selects the autosave policy: `detail` (debounce only) or
/// `composer` (debounce plus periodic autosave).
///
/// # FFI contract
/// - Returns a handle that must eventually be passed to `editor_exit` or
///   `editor_discard`.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_open(note_id: Option<String>, surface: String) -> EditorResponse {
    match open_editor(note_id, &surface) {
        Ok((handle, shared)) => {
            let editor = lock_recovering(&shared);
            EditorResponse::from_editor(handle, &editor, Vec::new(), "Editor opened.")
        }
        Err(err) => EditorResponse::failure(None, format!("editor_open failed: {err}")),
    }
}

/// Replaces the draft title and restarts the quiet period.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_set_title(handle: u64, title: String) -> EditorResponse {
    with_editor(handle, "editor_set_title", |editor| {
        editor.set_title(title).map_err(|err| err.to_string())?;
        Ok(Vec::new())
    })
}

/// Replaces the draft content and restarts the quiet period.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_set_content(handle: u64, content: String) -> EditorResponse {
    with_editor(handle, "editor_set_content", |editor| {
        editor.set_content(content).map_err(|err| err.to_string())?;
        Ok(Vec::new())
    })
}

/// Runs autosave triggers that are due now.
///
/// Callers tick at or after `next_deadline_epoch_ms`; early ticks are no-ops.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_tick(handle: u64) -> EditorResponse {
    with_editor(handle, "editor_tick", |editor| {
        let outcomes = editor.tick().map_err(|err| err.to_string())?;
        Ok(outcomes.iter().map(outcome_label).collect())
    })
}

/// Flushes the draft before leaving the editing surface.
///
/// # FFI contract
/// - `ok == false` means the save failed; the editor stays registered with
///   its draft and navigation must not proceed.
/// - Unknown or already exited handles succeed with `already_closed`.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_exit(handle: u64) -> EditorResponse {
    let Some(shared) = registered_editor(handle) else {
        return EditorResponse::closed(handle, vec!["already_closed".to_string()], "Editor closed.");
    };
    let mut editor = lock_recovering(&shared);
    match editor.exit() {
        Ok(outcome) => {
            drop(editor);
            unregister(handle);
            let label = match &outcome {
                ExitOutcome::Reconciled(reconciled) => outcome_label(reconciled),
                ExitOutcome::AlreadyClosed => "already_closed".to_string(),
            };
            EditorResponse::closed(handle, vec![label], "Editor closed.")
        }
        Err(err) => {
            warn!(
                "event=ffi_editor_exit module=ffi status=error handle={} error={}",
                handle, err
            );
            EditorResponse::failure(Some(handle), format!("editor_exit failed: {err}"))
        }
    }
}

/// Deletes the edited note and closes the editor without saving.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_discard(handle: u64) -> EditorResponse {
    let Some(shared) = registered_editor(handle) else {
        return EditorResponse::failure(Some(handle), "editor_discard failed: unknown handle");
    };
    let mut editor = lock_recovering(&shared);
    match editor.discard() {
        Ok(existed) => {
            drop(editor);
            unregister(handle);
            let message = if existed {
                "Note deleted."
            } else {
                "Draft discarded."
            };
            EditorResponse::closed(handle, vec!["deleted".to_string()], message)
        }
        Err(err) => {
            EditorResponse::failure(Some(handle), format!("editor_discard failed: {err}"))
        }
    }
}

fn resolve_config() -> Result<&'static QuicknoteConfig, String> {
    CONFIG
        .get_or_try_init(QuicknoteConfig::from_env)
        .map_err(|err| format!("config failed: {err}"))
}

fn open_repository(config: &QuicknoteConfig) -> Result<SqliteNoteRepository, String> {
    let conn = open_db(&config.db_path).map_err(|err| format!("DB open failed: {err}"))?;
    SqliteNoteRepository::try_new(conn).map_err(|err| format!("note repo init failed: {err}"))
}

fn with_note_service<T>(
    f: impl FnOnce(&NoteService<SqliteNoteRepository>) -> Result<T, String>,
) -> Result<T, String> {
    let config = resolve_config()?;
    let service = NoteService::new(open_repository(config)?);
    f(&service)
}

fn policy_for_surface(config: &QuicknoteConfig, surface: &str) -> Result<AutosavePolicy, String> {
    match surface.trim().to_ascii_lowercase().as_str() {
        "detail" => Ok(config.detail_policy()),
        "composer" => Ok(config.composer_policy()),
        other => Err(format!(
            "unsupported surface `{other}`; expected detail|composer"
        )),
    }
}

fn open_editor(note_id: Option<String>, surface: &str) -> Result<(u64, SharedEditor), String> {
    let config = resolve_config()?;
    let policy = policy_for_surface(config, surface)?;
    let id = note_id
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| NoteId::parse(&raw))
        .transpose()
        .map_err(|err| err.to_string())?;
    let editor = NoteEditor::open(open_repository(config)?, id, policy, Arc::new(SystemClock))
        .map_err(|err| err.to_string())?;

    let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
    let shared = Arc::new(Mutex::new(editor));
    lock_recovering(&EDITORS).insert(handle, Arc::clone(&shared));
    Ok((handle, shared))
}

fn with_editor(
    handle: u64,
    operation: &str,
    f: impl FnOnce(&mut NoteEditor<SqliteNoteRepository>) -> Result<Vec<String>, String>,
) -> EditorResponse {
    let Some(shared) = registered_editor(handle) else {
        return EditorResponse::failure(
            Some(handle),
            format!("{operation} failed: unknown handle"),
        );
    };
    let mut editor = lock_recovering(&shared);
    match f(&mut editor) {
        Ok(outcomes) => EditorResponse::from_editor(handle, &editor, outcomes, "OK"),
        Err(err) => {
            error!(
                "event=ffi_editor_call module=ffi status=error op={} handle={} error={}",
                operation, handle, err
            );
            EditorResponse::failure(Some(handle), format!("{operation} failed: {err}"))
        }
    }
}

fn registered_editor(handle: u64) -> Option<SharedEditor> {
    lock_recovering(&EDITORS).get(&handle).cloned()
}

fn unregister(handle: u64) {
    lock_recovering(&EDITORS).remove(&handle);
}

// A panic while holding the lock must not wedge every later FFI call.
fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn to_note_item(item: NoteListItem) -> NoteItem {
    NoteItem {
        note_id: item.note.id.to_string(),
        last_updated_epoch_ms: item.note.last_updated.timestamp_millis(),
        title: item.note.title,
        content: item.note.content,
        excerpt: item.preview.excerpt,
        updated_label: item.preview.updated_label,
    }
}

fn outcome_label(outcome: &ReconcileOutcome) -> String {
    outcome.as_str().to_string()
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, editor_discard, editor_exit, editor_open, editor_set_content,
        editor_set_title, editor_tick, init_logging, note_delete, notes_backup, notes_list, ping,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn editor_exit_persists_note_visible_in_list() {
        let token = unique_token("ffi-exit");
        let opened = editor_open(None, "detail".to_string());
        assert!(opened.ok, "{}", opened.message);
        let handle = opened.handle.expect("open should return handle");
        let note_id = opened.note_id.expect("open should return note_id");

        let edited = editor_set_content(handle, token.clone());
        assert!(edited.ok, "{}", edited.message);
        assert!(edited.next_deadline_epoch_ms.is_some());

        let exited = editor_exit(handle);
        assert!(exited.ok, "{}", exited.message);
        assert_eq!(exited.outcomes, vec!["saved".to_string()]);

        let listed = notes_list();
        assert!(listed.ok, "{}", listed.message);
        let item = listed
            .items
            .iter()
            .find(|item| item.note_id == note_id)
            .expect("saved note should be listed");
        assert_eq!(item.content, token);

        assert!(note_delete(note_id).ok);
    }

    #[test]
    fn second_exit_reports_already_closed() {
        let opened = editor_open(None, "composer".to_string());
        let handle = opened.handle.expect("open should return handle");
        assert!(editor_exit(handle).ok);

        let again = editor_exit(handle);
        assert!(again.ok);
        assert_eq!(again.outcomes, vec!["already_closed".to_string()]);
        assert!(!editor_set_title(handle, "late".to_string()).ok);
    }

    #[test]
    fn early_tick_is_a_no_op() {
        let opened = editor_open(None, "detail".to_string());
        let handle = opened.handle.expect("open should return handle");
        editor_set_title(handle, unique_token("ffi-tick"));

        let ticked = editor_tick(handle);
        assert!(ticked.ok, "{}", ticked.message);
        assert!(ticked.outcomes.is_empty());

        assert!(editor_discard(handle).ok);
    }

    #[test]
    fn discard_removes_saved_note() {
        let opened = editor_open(None, "detail".to_string());
        let handle = opened.handle.expect("open should return handle");
        let note_id = opened.note_id.expect("open should return note_id");
        editor_set_title(handle, unique_token("ffi-discard"));
        assert!(editor_exit(handle).ok);

        let reopened = editor_open(Some(note_id.clone()), "detail".to_string());
        assert!(reopened.ok, "{}", reopened.message);
        let discarded = editor_discard(reopened.handle.expect("handle"));
        assert!(discarded.ok, "{}", discarded.message);
        assert_eq!(discarded.message, "Note deleted.");

        assert!(notes_list()
            .items
            .iter()
            .all(|item| item.note_id != note_id));
    }

    #[test]
    fn editor_open_rejects_unknown_surface() {
        let response = editor_open(None, "sidebar".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("surface"));
    }

    #[test]
    fn unknown_handle_is_reported() {
        assert!(!editor_tick(u64::MAX).ok);
        assert!(!editor_discard(u64::MAX).ok);
    }

    #[test]
    fn notes_backup_writes_file_when_notes_exist() {
        let opened = editor_open(None, "detail".to_string());
        let handle = opened.handle.expect("open should return handle");
        let note_id = opened.note_id.expect("open should return note_id");
        let token = unique_token("ffi-backup");
        editor_set_title(handle, token.clone());
        assert!(editor_exit(handle).ok);

        let dir = tempfile::tempdir().expect("temp dir");
        let response = notes_backup(dir.path().to_string_lossy().into_owned());
        assert!(response.ok, "{}", response.message);
        let path = response.path.expect("backup should return path");
        let text = std::fs::read_to_string(path).expect("read backup");
        assert!(text.contains(&format!("Title: {token}")));

        assert!(note_delete(note_id).ok);
    }

    #[test]
    fn notes_backup_rejects_blank_dir() {
        assert!(!notes_backup("  ".to_string()).ok);
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
