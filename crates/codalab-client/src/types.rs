//! Types shared by clients and auth handlers.

use serde::{Deserialize, Serialize};

/// Grant used when asking a service for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    /// Username and password.
    Credentials,
    /// Username and a previously issued refresh token.
    RefreshToken,
}

impl GrantKind {
    /// Name sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantKind::Credentials => "credentials",
            GrantKind::RefreshToken => "refresh_token",
        }
    }
}

/// Token as issued by a service, with a relative lifetime.
///
/// Converted to an absolute expiry exactly once, when it is cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: String,

    /// Lifetime in seconds from the moment of issue.
    pub expires_in: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub id: String,
}

impl User {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Generate a bundle-service uuid (`0x` followed by 32 hex digits).
pub fn generate_uuid() -> String {
    format!("0x{}", uuid::Uuid::new_v4().simple())
}

/// Check whether a string is a full bundle-service uuid.
pub fn is_uuid(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 32 && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')))
}
