//! Session and client management for the CodaLab CLI.
//!
//! A [`CodaLabManager`] is built once per invocation. It resolves which
//! session the invocation belongs to, keeps one authenticated client per
//! address, and tracks each session's current worksheet.
//!
//! # Example
//!
//! ```rust,ignore
//! use codalab_session::CodaLabManager;
//!
//! let manager = CodaLabManager::new()?;
//! let (client, worksheet_uuid) = manager.get_current_worksheet_uuid()?;
//! println!("{} on {}", worksheet_uuid, client.address());
//! ```

mod error;
mod manager;
mod registry;
mod resolver;
mod worksheet;

pub use error::{ManagerError, Result};
pub use manager::{CodaLabManager, CodaLabManagerBuilder};
pub use registry::ClientRegistry;
pub use resolver::{
    MAX_DEPTH, ProcessTable, SESSION_ENV, SHELL_NAMES, SessionResolver, SysinfoProcessTable,
    TEMPORARY_SESSION, TOP_SESSION,
};
pub use worksheet::{WorksheetContextManager, split_worksheet_spec};
