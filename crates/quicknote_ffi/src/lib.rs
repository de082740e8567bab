//! Flutter bridge crate for Quicknote.
//!
//! Thin adapter over `quicknote_core`; see `api` for the exported surface.

pub mod api;
