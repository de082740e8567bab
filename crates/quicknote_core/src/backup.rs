//! Plain-text backup export.
//!
//! # Responsibility
//! - Render every note into the human-readable backup format.
//! - Write the backup atomically into a target directory.
//! - Hand the written file to a platform share facility.
//!
//! # Invariants
//! - Export is a read-only snapshot; it never mutates the store.
//! - A backup with zero notes is refused instead of writing an empty file.
//! - The destination file is either the previous backup or the complete new
//!   one, never a partial write.

use crate::model::note::Note;
use crate::repo::note_repo::{NoteStore, RepoError};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name written inside the export directory.
pub const BACKUP_FILE_NAME: &str = "backup.txt";

pub type BackupResult<T> = Result<T, BackupError>;

/// Platform share sheet (or any consumer of the exported file).
pub trait ShareSink {
    fn share(&self, path: &Path) -> Result<(), String>;
}

#[derive(Debug)]
pub enum BackupError {
    /// Store holds no notes.
    NoNotes,
    Repo(RepoError),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Share(String),
}

impl Display for BackupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoNotes => write!(f, "no notes available to back up"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Io { path, source } => {
                write!(f, "failed to write backup `{}`: {source}", path.display())
            }
            Self::Share(message) => write!(f, "failed to share backup: {message}"),
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::NoNotes | Self::Share(_) => None,
        }
    }
}

impl From<RepoError> for BackupError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Renders notes as `Title: <t>\nContent: <c>\n---\n` blocks joined by `\n`.
pub fn render_backup(notes: &[Note]) -> String {
    notes
        .iter()
        .map(|note| format!("Title: {}\nContent: {}\n---\n", note.title, note.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes a backup of every stored note into `dir/backup.txt`.
///
/// # Errors
/// - `NoNotes` when the store is empty.
/// - `Repo` when reading notes fails.
/// - `Io` when the directory is not writable.
pub fn export_backup<S: NoteStore + ?Sized>(store: &S, dir: &Path) -> BackupResult<PathBuf> {
    let notes = store.read_all()?;
    if notes.is_empty() {
        info!("event=backup_export module=backup status=skip reason=no_notes");
        return Err(BackupError::NoNotes);
    }

    let target = dir.join(BACKUP_FILE_NAME);
    let body = render_backup(&notes);
    if let Err(err) = write_atomically(dir, &target, body.as_bytes()) {
        error!(
            "event=backup_export module=backup status=error path={} error={}",
            target.display(),
            err
        );
        return Err(err);
    }

    info!(
        "event=backup_export module=backup status=ok notes={} bytes={} path={}",
        notes.len(),
        body.len(),
        target.display()
    );
    Ok(target)
}

/// Exports a backup and hands the file to `sink`.
pub fn share_backup<S: NoteStore + ?Sized>(
    store: &S,
    dir: &Path,
    sink: &dyn ShareSink,
) -> BackupResult<PathBuf> {
    let path = export_backup(store, dir)?;
    sink.share(&path).map_err(BackupError::Share)?;
    Ok(path)
}

fn write_atomically(dir: &Path, target: &Path, bytes: &[u8]) -> BackupResult<()> {
    let io_error = |source: std::io::Error| BackupError::Io {
        path: target.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(io_error)?;
    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
    staged.write_all(bytes).map_err(io_error)?;
    staged.flush().map_err(io_error)?;
    staged
        .persist(target)
        .map_err(|err| io_error(err.error))?;
    Ok(())
}
