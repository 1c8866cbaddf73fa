//! Error types for manager operations.

use codalab_auth::AuthError;
use codalab_config::ConfigError;

/// Error type for manager operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// Config or state document could not be loaded or saved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No token could be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The bundle service reported an error.
    #[error(transparent)]
    Client(#[from] codalab_client::Error),

    /// No alias with this name exists.
    #[error("Alias not found: {0}")]
    AliasNotFound(String),
}

impl ManagerError {
    /// Check whether this error is an authentication failure the user can fix
    /// by logging in again.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            ManagerError::Auth(e) => e.is_permission_denied(),
            ManagerError::Client(e) => e.is_auth_error(),
            _ => false,
        }
    }

    /// Check whether this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ManagerError::Config(e) if e.is_fatal())
    }
}

/// Result type for manager operations.
pub type Result<T> = std::result::Result<T, ManagerError>;
