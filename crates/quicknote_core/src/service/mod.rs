//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into list/delete/open-editor use cases.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod note_service;
