//! Note storage contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide row-level upsert, delete and full-table read keyed by `NoteId`.
//! - Decode persisted rows back into validated `Note` values.
//!
//! # Invariants
//! - At most one row exists per id (upsert semantics).
//! - Blank notes are rejected before SQL runs; the table CHECK constraint
//!   backs the same rule.
//! - Deleting an unknown id is a successful no-op.
//! - `read_all` is ordered by `lastUpdated DESC, id ASC`.

use crate::db::DbError;
use crate::model::note::{
    format_timestamp, parse_timestamp, Note, NoteId, NoteValidationError,
};
use log::{debug, error};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    lastUpdated
FROM notes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Write rejected by the blank-note or id rule.
    Validation(NoteValidationError),
    /// Transport/engine failure; retryable.
    Db(DbError),
    /// Persisted row cannot be decoded.
    InvalidData(String),
    /// Connection was not migrated.
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_)
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<NoteValidationError> for RepoError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage gateway used by editing sessions, services and backup export.
pub trait NoteStore {
    /// Returns every note ordered by `lastUpdated DESC, id ASC`.
    fn read_all(&self) -> RepoResult<Vec<Note>>;
    /// Loads one note by id.
    fn get_note(&self, id: &NoteId) -> RepoResult<Option<Note>>;
    /// Inserts or replaces the row for `note.id`.
    fn upsert(&self, note: &Note) -> RepoResult<()>;
    /// Deletes the row for `id`; returns whether a row existed.
    fn delete(&self, id: &NoteId) -> RepoResult<bool>;
}

impl<S: NoteStore + ?Sized> NoteStore for &S {
    fn read_all(&self) -> RepoResult<Vec<Note>> {
        (**self).read_all()
    }

    fn get_note(&self, id: &NoteId) -> RepoResult<Option<Note>> {
        (**self).get_note(id)
    }

    fn upsert(&self, note: &Note) -> RepoResult<()> {
        (**self).upsert(note)
    }

    fn delete(&self, id: &NoteId) -> RepoResult<bool> {
        (**self).delete(id)
    }
}

/// SQLite-backed note repository owning its connection.
pub struct SqliteNoteRepository {
    conn: Connection,
}

impl SqliteNoteRepository {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema was
    ///   not initialized through `db::open_db*`.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    /// Borrows the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Releases the underlying connection.
    pub fn into_inner(self) -> Connection {
        self.conn
    }
}

impl NoteStore for SqliteNoteRepository {
    fn read_all(&self) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL} ORDER BY lastUpdated DESC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn get_note(&self, id: &NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn upsert(&self, note: &Note) -> RepoResult<()> {
        note.validate()?;

        let result = self.conn.execute(
            "INSERT INTO notes (id, title, content, lastUpdated)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                lastUpdated = excluded.lastUpdated;",
            params![
                note.id.as_str(),
                note.title.as_str(),
                note.content.as_str(),
                format_timestamp(note.last_updated),
            ],
        );

        match result {
            Ok(_) => {
                debug!(
                    "event=note_upsert module=repo status=ok note_id={} title_len={} content_len={}",
                    note.id,
                    note.title.chars().count(),
                    note.content.chars().count()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=note_upsert module=repo status=error note_id={} error={}",
                    note.id, err
                );
                Err(err.into())
            }
        }
    }

    fn delete(&self, id: &NoteId) -> RepoResult<bool> {
        match self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [id.as_str()])
        {
            Ok(changed) => {
                debug!(
                    "event=note_delete module=repo status=ok note_id={} existed={}",
                    id,
                    changed > 0
                );
                Ok(changed > 0)
            }
            Err(err) => {
                error!(
                    "event=note_delete module=repo status=error note_id={} error={}",
                    id, err
                );
                Err(err.into())
            }
        }
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id_text: String = row.get("id")?;
    let id = NoteId::parse(id_text.as_str())
        .map_err(|_| RepoError::InvalidData("empty id value in notes.id".to_string()))?;

    let stamp_text: String = row.get("lastUpdated")?;
    let last_updated = parse_timestamp(&stamp_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid timestamp `{stamp_text}` in notes.lastUpdated for {id}"
        ))
    })?;

    Ok(Note {
        id,
        title: row.get("title")?,
        content: row.get("content")?,
        last_updated,
    })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, "notes")? {
        return Err(RepoError::MissingRequiredTable("notes"));
    }

    for column in ["id", "title", "content", "lastUpdated"] {
        if !table_has_column(conn, "notes", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "notes",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
