//! Error types for authentication.

use codalab_config::ConfigError;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while obtaining a token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The service rejected the supplied credentials.
    #[error("{0}")]
    PermissionDenied(String),

    /// Reading credentials from the console failed.
    #[error("Failed to read credentials: {0}")]
    Prompt(#[from] std::io::Error),

    /// The bundle service could not be reached.
    #[error(transparent)]
    Client(#[from] codalab_client::Error),

    /// The state document could not be written.
    #[error(transparent)]
    Store(#[from] ConfigError),
}

impl AuthError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, AuthError::PermissionDenied(_))
    }
}
