//! Repository layer: the durable-state boundary for notes.
//!
//! # Responsibility
//! - Define the `NoteStore` contract consumed by sessions and services.
//! - Isolate SQLite query details from session/business orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Note::validate()` before persistence.
//! - Upsert and delete are idempotent, so callers may retry freely.

pub mod note_repo;
