//! Obtaining credentials from the user.

use std::io::{self, BufRead, Write};

use crate::error::{AuthError, Result};

/// A username and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Source of credentials for a full login.
pub trait CredentialPrompt: Send + Sync {
    /// Ask for credentials to access `address`.
    fn request_credentials(&self, address: &str) -> Result<Credentials>;
}

/// Reads the username from stdin and the password with echo disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn request_credentials(&self, address: &str) -> Result<Credentials> {
        println!("Requesting access at {}", address);
        print!("Username: ");
        io::stdout().flush()?;

        let mut username = String::new();
        io::stdin().lock().read_line(&mut username)?;
        let username = username.trim_end_matches(['\r', '\n']).to_string();

        let password = rpassword::prompt_password("Password: ")?;
        Ok(Credentials { username, password })
    }
}

/// Refuses to prompt. Used when stdin is not a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractivePrompt;

impl CredentialPrompt for NonInteractivePrompt {
    fn request_credentials(&self, address: &str) -> Result<Credentials> {
        Err(AuthError::PermissionDenied(format!(
            "Credentials required for {} but no terminal is available",
            address
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_interactive_prompt_denies() {
        let err = NonInteractivePrompt
            .request_credentials("https://codalab.org/bundleservice")
            .unwrap_err();
        assert!(err.is_permission_denied());
        assert!(err.to_string().contains("https://codalab.org/bundleservice"));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}
