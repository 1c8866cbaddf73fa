//! Persisted documents for the CodaLab CLI.
//!
//! Two JSON documents live in the CodaLab home directory:
//! - `config.json` (permanent): aliases, server/auth settings, CLI defaults
//! - `state.json` (transient): per-address token cache, per-session routing
//!
//! Model and auth handler kinds are closed tagged enums, so an unknown
//! `class` is rejected when the document is loaded.

pub mod error;
pub mod paths;
pub mod store;
pub mod types;

pub use error::{ConfigError, Result};
pub use paths::{codalab_home, effective_home, expand_path, install_root};
pub use store::{CONFIG_FILE, PersistedStore, STATE_FILE, to_pretty_json};
pub use types::*;
