//! Sage installer.
//!
//! Installs a persona document, skill scripts, an output style, and a
//! settings patch into the profile directory of one supported assistant
//! (`claude`, `codex`, `gemini`), backing up anything it would overwrite and
//! restoring it on uninstall.
//!
//! The public API is organised into layers:
//!
//! - **[`target`]** and **[`catalog`]**: what gets installed and where
//! - **[`source`]**: where artifact content comes from (local or remote)
//! - **[`backup`]** and **[`settings`]**: capture/restore and JSON key merge
//! - **[`resources`]**: idempotent `check + apply` primitives per artifact
//! - **[`commands`]**: top-level subcommand orchestration (`install`, `uninstall`, `status`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod backup;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod prompt;
pub mod resources;
pub mod settings;
pub mod source;
pub mod target;
