//! Git subprocess wrappers and bare mirror management.
//!
//! All operations shell out to the system `git` binary using
//! `tokio::process::Command` for non-blocking execution.  Credential
//! injection is handled transparently through environment variables.

pub mod commands;
pub mod mirror;

pub use mirror::MirrorStore;
