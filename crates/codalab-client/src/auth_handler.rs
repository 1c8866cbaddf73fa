//! Server-side auth handlers used by the local client.
//!
//! The handler kind comes from `server.auth.class`:
//! - [`MockAuthHandler`]: a fixed token for the root user
//! - [`OAuthHandler`]: delegates to an OAuth provider over HTTP

use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;

use codalab_config::AuthHandlerConfig;

use crate::error::{Error, Result};
use crate::types::{GrantKind, IssuedToken, User};

/// Token handed out by the mock handler.
pub const MOCK_TOKEN: &str = "__mock_token__";

/// Lifetime of a mock token (one year).
const MOCK_TOKEN_LIFETIME_SECS: f64 = 365.0 * 24.0 * 3600.0;

const OAUTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Auth handler selected by kind.
#[derive(Debug)]
pub enum AuthHandler {
    Mock(MockAuthHandler),
    OAuth(OAuthHandler),
}

impl AuthHandler {
    /// Build the handler named by `config`.
    pub fn from_config(config: &AuthHandlerConfig, root: User) -> Result<Self> {
        match config {
            AuthHandlerConfig::Mock => Ok(Self::Mock(MockAuthHandler::new(vec![root]))),
            AuthHandlerConfig::OAuth {
                address,
                app_id,
                app_key,
            } => Ok(Self::OAuth(OAuthHandler::new(address, app_id, app_key)?)),
        }
    }

    /// Issue a token for `username` using `grant`.
    pub fn generate_token(
        &self,
        grant: GrantKind,
        username: &str,
        key: &str,
    ) -> Result<Option<IssuedToken>> {
        match self {
            Self::Mock(h) => Ok(h.generate_token(grant, username, key)),
            Self::OAuth(h) => h.generate_token(grant, username, key),
        }
    }

    /// Accept `token` and make its owner the current user.
    pub fn validate_token(&self, token: &str) -> Result<bool> {
        match self {
            Self::Mock(h) => Ok(h.validate_token(token)),
            Self::OAuth(h) => h.validate_token(token),
        }
    }

    /// The user whose token was last validated.
    pub fn current_user(&self) -> Option<User> {
        match self {
            Self::Mock(h) => h.current_user(),
            Self::OAuth(h) => h.current_user(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock
// ─────────────────────────────────────────────────────────────────────────────

/// Accepts any password for a known user.
#[derive(Debug)]
pub struct MockAuthHandler {
    users: Vec<User>,
    current: Mutex<Option<User>>,
}

impl MockAuthHandler {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users,
            current: Mutex::new(None),
        }
    }

    pub fn generate_token(&self, grant: GrantKind, username: &str, key: &str) -> Option<IssuedToken> {
        if !self.users.iter().any(|u| u.name == username) {
            return None;
        }
        if grant == GrantKind::RefreshToken && key != MOCK_TOKEN {
            return None;
        }
        Some(IssuedToken {
            access_token: MOCK_TOKEN.to_string(),
            refresh_token: MOCK_TOKEN.to_string(),
            expires_in: MOCK_TOKEN_LIFETIME_SECS,
            token_type: Some("Bearer".to_string()),
            scope: None,
        })
    }

    pub fn validate_token(&self, token: &str) -> bool {
        if token != MOCK_TOKEN {
            return false;
        }
        *self.current.lock() = self.users.first().cloned();
        true
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.lock().clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OAuth
// ─────────────────────────────────────────────────────────────────────────────

/// Delegates token issue and validation to an OAuth provider.
///
/// Requests authenticate with HTTP basic auth using the app id and key.
#[derive(Debug)]
pub struct OAuthHandler {
    address: String,
    app_id: String,
    app_key: String,
    http: reqwest::blocking::Client,
    current: Mutex<Option<User>>,
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    user_id: String,
    user_name: String,
}

impl OAuthHandler {
    pub fn new(address: &str, app_id: &str, app_key: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(OAUTH_TIMEOUT)
            .user_agent(format!("codalab-cli/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            address: address.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            app_key: app_key.to_string(),
            http,
            current: Mutex::new(None),
        })
    }

    pub fn token_url(&self) -> String {
        format!("{}/clients/token/", self.address)
    }

    pub fn validation_url(&self) -> String {
        format!("{}/clients/validation/", self.address)
    }

    pub fn generate_token(
        &self,
        grant: GrantKind,
        username: &str,
        key: &str,
    ) -> Result<Option<IssuedToken>> {
        let form = token_form(grant, username, key);
        let response = self
            .http
            .post(self.token_url())
            .basic_auth(&self.app_id, Some(&self.app_key))
            .form(&form)
            .send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(Some(response.json()?));
        }
        if matches!(status.as_u16(), 400 | 401 | 403) {
            tracing::debug!(status = status.as_u16(), "OAuth provider rejected grant");
            return Ok(None);
        }
        Err(Error::Api {
            status: status.as_u16(),
            message: response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string()),
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<bool> {
        let response = self
            .http
            .post(self.validation_url())
            .basic_auth(&self.app_id, Some(&self.app_key))
            .form(&[("token", token)])
            .send()?;

        let status = response.status();
        if matches!(status.as_u16(), 401 | 403) {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: format!("token validation failed: HTTP {}", status.as_u16()),
            });
        }

        let body: ValidationResponse = response.json()?;
        *self.current.lock() = Some(User::new(body.user_name, body.user_id));
        Ok(true)
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.lock().clone()
    }
}

/// Form fields for the token endpoint.
fn token_form<'a>(grant: GrantKind, username: &'a str, key: &'a str) -> Vec<(&'static str, &'a str)> {
    match grant {
        GrantKind::Credentials => vec![
            ("grant_type", "password"),
            ("username", username),
            ("password", key),
        ],
        GrantKind::RefreshToken => vec![
            ("grant_type", "refresh_token"),
            ("username", username),
            ("refresh_token", key),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> User {
        User::new("codalab", "0")
    }

    #[test]
    fn test_mock_issues_token_for_known_user() {
        let handler = MockAuthHandler::new(vec![root()]);
        let token = handler
            .generate_token(GrantKind::Credentials, "codalab", "")
            .unwrap();
        assert_eq!(token.access_token, MOCK_TOKEN);
        assert_eq!(token.expires_in, MOCK_TOKEN_LIFETIME_SECS);

        assert!(handler
            .generate_token(GrantKind::Credentials, "mallory", "")
            .is_none());
    }

    #[test]
    fn test_mock_refresh_requires_mock_token() {
        let handler = MockAuthHandler::new(vec![root()]);
        assert!(handler
            .generate_token(GrantKind::RefreshToken, "codalab", MOCK_TOKEN)
            .is_some());
        assert!(handler
            .generate_token(GrantKind::RefreshToken, "codalab", "stale")
            .is_none());
    }

    #[test]
    fn test_mock_validate_sets_current_user() {
        let handler = AuthHandler::from_config(&AuthHandlerConfig::Mock, root()).unwrap();
        assert!(handler.current_user().is_none());

        assert!(!handler.validate_token("bogus").unwrap());
        assert!(handler.current_user().is_none());

        assert!(handler.validate_token(MOCK_TOKEN).unwrap());
        assert_eq!(handler.current_user(), Some(root()));
    }

    #[test]
    fn test_oauth_endpoints() {
        let config = AuthHandlerConfig::OAuth {
            address: "https://auth.example.org/".to_string(),
            app_id: "app".to_string(),
            app_key: "secret".to_string(),
        };
        let handler = AuthHandler::from_config(&config, root()).unwrap();
        match handler {
            AuthHandler::OAuth(h) => {
                assert_eq!(h.token_url(), "https://auth.example.org/clients/token/");
                assert_eq!(
                    h.validation_url(),
                    "https://auth.example.org/clients/validation/"
                );
            }
            other => panic!("Expected OAuth handler, got {:?}", other),
        }
    }

    #[test]
    fn test_token_form() {
        let form = token_form(GrantKind::Credentials, "alice", "pw");
        assert_eq!(form[0], ("grant_type", "password"));
        assert_eq!(form[2], ("password", "pw"));

        let form = token_form(GrantKind::RefreshToken, "alice", "r1");
        assert_eq!(form[0], ("grant_type", "refresh_token"));
        assert_eq!(form[2], ("refresh_token", "r1"));
    }
}
