//! Types for the two persisted documents.
//!
//! `config.json` (permanent):
//! ```json
//! {
//!     "aliases": {"main": "https://codalab.org/bundleservice"},
//!     "cli": {"verbose": 1},
//!     "server": {"class": "SQLiteModel", "host": "localhost", "port": 2800,
//!                "auth": {"class": "MockAuthHandler"}, "verbose": 1},
//!     "workers": {"q": {"dispatch_command": "...", "verbose": 1}}
//! }
//! ```
//!
//! `state.json` (transient):
//! ```json
//! {
//!     "auth": {"<address>": {"token_info": {...}, "username": "..."}},
//!     "sessions": {"<name>": {"address": "local", "worksheet_uuid": "0x..."}}
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Root user name used when the server section does not set one.
pub const DEFAULT_ROOT_USER_NAME: &str = "codalab";

/// Root user id used when the server section does not set one.
pub const DEFAULT_ROOT_USER_ID: &str = "0";

/// Address used by new sessions when `cli.default_address` is unset.
pub const DEFAULT_ADDRESS: &str = "local";

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration document.
///
/// A config for a remote-only client does not need a `server` section; it is
/// only consulted when a local client is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Short name → service address.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,

    /// CLI settings.
    #[serde(default)]
    pub cli: CliConfig,

    /// Local server settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Per-queue dispatch settings.
    #[serde(default)]
    pub workers: BTreeMap<String, WorkerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let aliases = [
            ("localhost", "http://localhost:2800"),
            ("main", "https://codalab.org/bundleservice"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut workers = BTreeMap::new();
        workers.insert(
            "q".to_string(),
            WorkerConfig {
                verbose: Some(1),
                dispatch_command: Some("python $CODALAB_CLI/scripts/dispatch-q.py".to_string()),
                extra: BTreeMap::new(),
            },
        );

        Self {
            aliases,
            cli: CliConfig {
                verbose: Some(1),
                ..Default::default()
            },
            server: Some(ServerConfig::default()),
            workers,
        }
    }
}

impl Config {
    /// Resolve an alias, returning the key itself when no alias matches.
    pub fn apply_alias<'a>(&'a self, key: &'a str) -> &'a str {
        self.aliases.get(key).map(String::as_str).unwrap_or(key)
    }

    /// Root user name for local logins.
    pub fn root_user_name(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.root_user_name.as_deref())
            .unwrap_or(DEFAULT_ROOT_USER_NAME)
    }

    /// Root user id handed to the local model.
    pub fn root_user_id(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.root_user_id.as_deref())
            .unwrap_or(DEFAULT_ROOT_USER_ID)
    }
}

/// `cli` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<u8>,

    /// Address new sessions start on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_address: Option<String>,

    /// Worksheet new sessions start on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_worksheet_uuid: Option<String>,
}

/// `server` section: how to build the local model and auth handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Model kind, selected by the `class` tag.
    #[serde(flatten)]
    pub model: ModelConfig,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Server-side auth handler, selected by `auth.class`.
    #[serde(default)]
    pub auth: AuthHandlerConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_user_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_user_id: Option<String>,

    /// Paths bundles may be uploaded from without copying.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub direct_upload_paths: Vec<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    2800
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::Sqlite,
            host: default_host(),
            port: default_port(),
            auth: AuthHandlerConfig::default(),
            verbose: Some(1),
            root_user_name: None,
            root_user_id: None,
            direct_upload_paths: Vec::new(),
        }
    }
}

/// Model kinds. An unknown `class` fails deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum ModelConfig {
    /// SQLite database inside the CodaLab home directory.
    #[serde(rename = "SQLiteModel")]
    Sqlite,

    /// MySQL database reached through an engine URL.
    #[serde(rename = "MySQLModel")]
    MySql { engine_url: String },
}

/// Auth handler kinds. An unknown `class` fails deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum AuthHandlerConfig {
    /// Single root user, no network.
    #[default]
    #[serde(rename = "MockAuthHandler")]
    Mock,

    /// Delegates to an OAuth provider.
    #[serde(rename = "OAuthHandler")]
    OAuth {
        address: String,
        app_id: String,
        app_key: String,
    },
}

/// Dispatch settings for one worker queue. Unknown keys are carried through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_command: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Root state document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Address → cached credentials.
    #[serde(default)]
    pub auth: BTreeMap<String, AuthEntry>,

    /// Session name → routing.
    #[serde(default)]
    pub sessions: BTreeMap<String, SessionEntry>,
}

/// Cached credentials for one address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_info: Option<TokenInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Access/refresh pair with an absolute expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: String,

    /// Absolute expiry, seconds since the Unix epoch.
    #[serde(default)]
    pub expires_at: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Routing for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub address: String,

    /// `None` means "not yet resolved, ask the client".
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub worksheet_uuid: Option<String>,
}

impl SessionEntry {
    pub fn new(address: impl Into<String>, worksheet_uuid: Option<String>) -> Self {
        Self {
            address: address.into(),
            worksheet_uuid: worksheet_uuid.filter(|uuid| !uuid.is_empty()),
        }
    }
}

// Older state files stored "" for an unset worksheet.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
