//! Quicknote command-line entry point.
//!
//! # Responsibility
//! - Drive `quicknote_core` use cases from a terminal: list, show, edit,
//!   delete and back up notes.
//! - Run `edit` as a full editor session that ends in an exit reconcile.
//!
//! # Invariants
//! - Configuration comes from `QUICKNOTE_*` environment variables.
//! - Failures print one line to stderr and exit non-zero.

use clap::{Parser, Subcommand};
use quicknote_core::db::open_db;
use quicknote_core::{
    core_version, export_backup, init_from_config, ping, share_text, ExitOutcome, NoteId,
    NoteService, QuicknoteConfig, ReconcileOutcome, SqliteNoteRepository, SystemClock,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "quicknote")]
#[command(about = "Quick notes with autosave", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List notes, most recently updated first
    #[command(alias = "ls")]
    List,

    /// Print one note
    Show { id: String },

    /// Create or edit a note; omitting every field leaves it untouched
    Edit {
        /// Note to edit; a new note is created when omitted
        id: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,
    },

    /// Delete a note
    #[command(alias = "rm")]
    Delete { id: String },

    /// Write backup.txt with every note
    Backup {
        /// Target directory (defaults to the current directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Print core health-check and version
    Ping,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), Box<dyn Error>> {
    if let Commands::Ping = command {
        println!("quicknote_core ping={}", ping());
        println!("quicknote_core version={}", core_version());
        return Ok(());
    }

    let config = QuicknoteConfig::from_env()?;
    if let Err(err) = init_from_config(&config) {
        eprintln!("warning: logging disabled: {err}");
    }
    let service = NoteService::new(SqliteNoteRepository::try_new(open_db(&config.db_path)?)?);

    match command {
        Commands::List => {
            let items = service.list_notes()?;
            if items.is_empty() {
                println!("No notes.");
            }
            for item in items {
                println!(
                    "{}  {}  {}",
                    item.preview.updated_label, item.note.id, item.preview.title
                );
                if !item.preview.excerpt.is_empty() {
                    println!("    {}", item.preview.excerpt);
                }
            }
        }
        Commands::Show { id } => {
            let id = NoteId::parse(id)?;
            match service.get_note(&id)? {
                Some(note) => println!("{}", share_text(&note)),
                None => return Err(format!("note {id} not found").into()),
            }
        }
        Commands::Edit { id, title, content } => {
            let id = id.map(NoteId::parse).transpose()?;
            let policy = if id.is_some() {
                config.detail_policy()
            } else {
                config.composer_policy()
            };
            let mut editor = service.open_editor(id, policy, Arc::new(SystemClock))?;
            if let Some(title) = title {
                editor.set_title(title)?;
            }
            if let Some(content) = content {
                editor.set_content(content)?;
            }
            let outcome = editor.exit()?;
            let note_id = editor.note_id().clone();
            match outcome {
                ExitOutcome::Reconciled(ReconcileOutcome::Saved(note)) => {
                    println!("Saved {} at {}", note.id, note.last_updated.to_rfc3339())
                }
                ExitOutcome::Reconciled(ReconcileOutcome::Deleted) => {
                    println!("Deleted {note_id} (empty)")
                }
                ExitOutcome::Reconciled(other) => println!("{note_id}: {}", other.as_str()),
                ExitOutcome::AlreadyClosed => println!("{note_id}: already closed"),
            }
        }
        Commands::Delete { id } => {
            let id = NoteId::parse(id)?;
            if service.delete_note(&id)? {
                println!("Deleted {id}");
            } else {
                println!("{id} not found; nothing deleted");
            }
        }
        Commands::Backup { dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            let path = export_backup(service.store(), &dir)?;
            println!("Backup written to {}", path.display());
        }
        Commands::Ping => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn edit_accepts_optional_id_and_fields() {
        let cli = Cli::try_parse_from(["quicknote", "edit", "--title", "T"]).unwrap();
        match cli.command {
            Commands::Edit { id, title, content } => {
                assert_eq!(id, None);
                assert_eq!(title.as_deref(), Some("T"));
                assert_eq!(content, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn delete_requires_id() {
        assert!(Cli::try_parse_from(["quicknote", "delete"]).is_err());
    }
}
