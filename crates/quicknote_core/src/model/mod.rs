//! Domain model for locally persisted notes.
//!
//! # Responsibility
//! - Define the single `Note` entity shared by storage, session and export.
//! - Own the blank-note rule used by both the session and the store.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod note;
