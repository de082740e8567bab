use quicknote_core::db::{open_db_in_memory, DbError};
use quicknote_core::{
    AutosavePolicy, Clock, EditorState, ExitOutcome, ManualClock, Note, NoteEditor,
    NoteId, NoteStore, ReconcileOutcome, RepoError, RepoResult, SessionError,
    SqliteNoteRepository, PLACEHOLDER_TITLE,
};
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::Duration;

const START_MS: i64 = 1_700_000_000_000;

/// Wraps the SQLite store, records calls and can be told to fail.
struct FlakyStore {
    inner: SqliteNoteRepository,
    failing: Cell<bool>,
    calls: RefCell<Vec<String>>,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: SqliteNoteRepository::try_new(open_db_in_memory().unwrap()).unwrap(),
            failing: Cell::new(false),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn writes(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| !call.starts_with("get"))
            .cloned()
            .collect()
    }

    fn fail_if_requested(&self) -> RepoResult<()> {
        if self.failing.get() {
            return Err(RepoError::Db(DbError::Sqlite(
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                    Some("database is locked".to_string()),
                ),
            )));
        }
        Ok(())
    }
}

impl NoteStore for FlakyStore {
    fn read_all(&self) -> RepoResult<Vec<Note>> {
        self.inner.read_all()
    }

    fn get_note(&self, id: &NoteId) -> RepoResult<Option<Note>> {
        self.calls.borrow_mut().push(format!("get {id}"));
        self.inner.get_note(id)
    }

    fn upsert(&self, note: &Note) -> RepoResult<()> {
        self.calls.borrow_mut().push(format!("upsert {}", note.id));
        self.fail_if_requested()?;
        self.inner.upsert(note)
    }

    fn delete(&self, id: &NoteId) -> RepoResult<bool> {
        self.calls.borrow_mut().push(format!("delete {id}"));
        self.fail_if_requested()?;
        self.inner.delete(id)
    }
}

fn id(value: &str) -> NoteId {
    NoteId::parse(value).unwrap()
}

fn clock() -> ManualClock {
    ManualClock::at_millis(START_MS)
}

fn open<'s>(
    store: &'s FlakyStore,
    note_id: &str,
    policy: AutosavePolicy,
    clock: &ManualClock,
) -> NoteEditor<&'s FlakyStore> {
    NoteEditor::open(store, Some(id(note_id)), policy, Arc::new(clock.clone())).unwrap()
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[test]
fn untouched_new_note_never_creates_a_row() {
    let store = FlakyStore::new();
    let clock = clock();
    let mut editor = open(&store, "fresh", AutosavePolicy::composer(), &clock);
    assert_eq!(editor.draft().title, PLACEHOLDER_TITLE);

    clock.advance(Duration::from_secs(12));
    assert_eq!(
        editor.tick().unwrap(),
        vec![ReconcileOutcome::Unchanged]
    );
    assert_eq!(
        editor.exit().unwrap(),
        ExitOutcome::Reconciled(ReconcileOutcome::Unchanged)
    );

    assert!(store.writes().is_empty());
    assert!(store.get_note(&id("fresh")).unwrap().is_none());
}

#[test]
fn rapid_edits_produce_one_write_with_final_values() {
    let store = FlakyStore::new();
    let clock = clock();
    let mut editor = open(&store, "n", AutosavePolicy::detail(), &clock);

    for text in ["h", "he", "hel", "hell", "hello"] {
        editor.set_content(text).unwrap();
        clock.advance(ms(100));
        assert!(editor.tick().unwrap().is_empty());
    }
    editor.set_title("Greeting").unwrap();

    clock.advance(ms(699));
    assert!(editor.tick().unwrap().is_empty());
    clock.advance(ms(1));
    let outcomes = editor.tick().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], ReconcileOutcome::Saved(_)));

    assert_eq!(store.writes(), vec!["upsert n".to_string()]);
    let saved = store.get_note(&id("n")).unwrap().unwrap();
    assert_eq!(saved.title, "Greeting");
    assert_eq!(saved.content, "hello");
    assert_eq!(saved.last_updated, clock.now());
}

#[test]
fn exit_mid_debounce_still_persists_edit() {
    let store = FlakyStore::new();
    let clock = clock();
    let mut editor = open(&store, "n", AutosavePolicy::detail(), &clock);

    editor.set_content("typed just before leaving").unwrap();
    clock.advance(ms(10));
    let outcome = editor.exit().unwrap();

    assert!(matches!(
        outcome,
        ExitOutcome::Reconciled(ReconcileOutcome::Saved(_))
    ));
    assert_eq!(editor.state(), EditorState::Closed);
    assert_eq!(editor.next_deadline(), None);
    assert_eq!(
        store.get_note(&id("n")).unwrap().unwrap().content,
        "typed just before leaving"
    );

    // Debounce deadline passing after exit does nothing.
    clock.advance(Duration::from_secs(1));
    assert!(editor.tick().unwrap().is_empty());
    assert_eq!(store.writes().len(), 1);
}

#[test]
fn blanking_existing_note_deletes_row() {
    let store = FlakyStore::new();
    let clock = clock();
    store
        .inner
        .upsert(&Note::new(id("a"), "X", "Y", clock.now()))
        .unwrap();

    let mut editor = open(&store, "a", AutosavePolicy::detail(), &clock);
    assert!(!editor.session().is_new());
    editor.set_title("").unwrap();
    editor.set_content("").unwrap();
    clock.advance(ms(700));

    assert_eq!(editor.tick().unwrap(), vec![ReconcileOutcome::Deleted]);
    let remaining = store.read_all().unwrap();
    assert!(remaining.iter().all(|note| note.id.as_str() != "a"));

    assert_eq!(
        editor.exit().unwrap(),
        ExitOutcome::Reconciled(ReconcileOutcome::Unchanged)
    );
}

#[test]
fn storage_failure_is_surfaced_and_retried_on_next_trigger() {
    let store = FlakyStore::new();
    let clock = clock();
    let mut editor = open(&store, "n", AutosavePolicy::detail(), &clock);

    editor.set_content("keep me").unwrap();
    store.failing.set(true);
    clock.advance(ms(700));
    let err = editor.tick().unwrap_err();
    assert!(matches!(err, SessionError::Storage(RepoError::Db(_))));
    assert_eq!(editor.draft().content, "keep me");
    assert!(editor.session().has_changed());

    // Exit while storage is still failing keeps the editor open.
    assert!(editor.exit().is_err());
    assert_eq!(editor.state(), EditorState::Open);

    store.failing.set(false);
    assert!(matches!(
        editor.exit().unwrap(),
        ExitOutcome::Reconciled(ReconcileOutcome::Saved(_))
    ));
    assert_eq!(store.get_note(&id("n")).unwrap().unwrap().content, "keep me");
    assert_eq!(
        store.writes(),
        vec!["upsert n", "upsert n", "upsert n"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
}

#[test]
fn second_exit_after_success_is_already_closed() {
    let store = FlakyStore::new();
    let clock = clock();
    let mut editor = open(&store, "n", AutosavePolicy::detail(), &clock);
    editor.set_title("T").unwrap();

    assert!(matches!(editor.exit().unwrap(), ExitOutcome::Reconciled(_)));
    assert_eq!(editor.exit().unwrap(), ExitOutcome::AlreadyClosed);
    assert!(matches!(
        editor.set_title("late"),
        Err(SessionError::Closed(_))
    ));
    assert_eq!(store.writes().len(), 1);
}

#[test]
fn dropping_open_editor_flushes_pending_edit() {
    let store = FlakyStore::new();
    let clock = clock();
    {
        let mut editor = open(&store, "n", AutosavePolicy::detail(), &clock);
        editor.set_content("unsaved").unwrap();
    }
    assert_eq!(store.get_note(&id("n")).unwrap().unwrap().content, "unsaved");
}

#[test]
fn interval_autosave_runs_without_debounce_expiring() {
    let store = FlakyStore::new();
    let clock = clock();
    let policy = AutosavePolicy::new(Duration::from_secs(60), Some(Duration::from_secs(5)));
    let mut editor = open(&store, "n", policy, &clock);

    editor.set_content("draft").unwrap();
    clock.advance(Duration::from_secs(5));
    assert!(matches!(
        editor.tick().unwrap().as_slice(),
        [ReconcileOutcome::Saved(_)]
    ));
    assert_eq!(store.get_note(&id("n")).unwrap().unwrap().content, "draft");
}

#[test]
fn exit_does_not_save_untouched_placeholder_after_clearing() {
    let store = FlakyStore::new();
    let clock = clock();
    let mut editor = open(&store, "n", AutosavePolicy::composer(), &clock);

    editor.set_title("").unwrap();
    clock.advance(ms(700));
    assert_eq!(editor.tick().unwrap(), vec![ReconcileOutcome::Deleted]);
    editor.set_title(PLACEHOLDER_TITLE).unwrap();

    assert_eq!(
        editor.exit().unwrap(),
        ExitOutcome::Reconciled(ReconcileOutcome::SuppressedDefault)
    );
    assert!(store.get_note(&id("n")).unwrap().is_none());
}

#[test]
fn discard_deletes_row_and_skips_exit_save() {
    let store = FlakyStore::new();
    let clock = clock();
    store
        .inner
        .upsert(&Note::new(id("d"), "to delete", "", clock.now()))
        .unwrap();

    let mut editor = open(&store, "d", AutosavePolicy::detail(), &clock);
    editor.set_content("edit that will be thrown away").unwrap();
    assert!(editor.discard().unwrap());
    assert_eq!(editor.exit().unwrap(), ExitOutcome::AlreadyClosed);
    drop(editor);

    assert!(store.get_note(&id("d")).unwrap().is_none());
    assert_eq!(store.writes(), vec!["delete d".to_string()]);
}

#[test]
fn open_without_id_generates_one() {
    let store = FlakyStore::new();
    let clock = clock();
    let editor = NoteEditor::open(
        &store,
        None,
        AutosavePolicy::composer(),
        Arc::new(clock.clone()),
    )
    .unwrap();
    assert!(!editor.note_id().as_str().is_empty());
    assert!(editor.session().is_new());
}
