//! Credential management for CodaLab bundle services.
//!
//! # Components
//!
//! - [`engine`]: cached tokens, refresh near expiry, full login as a fallback
//! - [`prompt`]: how usernames and passwords are obtained from the user

pub mod engine;
pub mod error;
pub mod prompt;

pub use engine::{AuthenticationEngine, REFRESH_THRESHOLD_SECS, TokenStatus, now_secs};
pub use error::{AuthError, Result};
pub use prompt::{CredentialPrompt, Credentials, NonInteractivePrompt, TerminalPrompt};
