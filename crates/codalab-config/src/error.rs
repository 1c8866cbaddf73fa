//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading or saving the persisted documents.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a document.
    #[error("failed to read '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write a document.
    #[error("failed to write '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// A document exists but does not parse. Never recovered locally.
    #[error("Invalid JSON in {path}: {source}")]
    Malformed {
        path: String,
        contents: String,
        source: serde_json::Error,
    },

    /// Failed to serialize a document.
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Missing required section or field.
    #[error("missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ConfigError {
    /// Whether this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConfigError::Malformed { .. })
    }

    /// Print the diagnostic and terminate the process with status 1.
    ///
    /// For a malformed document the raw contents are echoed so the user can
    /// repair the file by hand.
    pub fn exit(&self) -> ! {
        match self {
            ConfigError::Malformed {
                path,
                contents,
                source,
            } => {
                eprintln!("Invalid JSON in {}:\n{}", path, contents);
                eprintln!("{}", source);
            }
            other => eprintln!("{}", other),
        }
        std::process::exit(1)
    }
}
