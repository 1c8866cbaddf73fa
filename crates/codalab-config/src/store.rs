//! Loading and saving of `config.json` and `state.json`.
//!
//! Both documents live in the CodaLab home directory. A missing document is
//! created with its default structure and read back; a document that exists
//! but does not parse is a fatal error (see [`ConfigError::exit`]).
//! Saves always write the whole document with sorted keys.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::paths::{install_root, substitute_install_root};
use crate::types::{Config, State};
use crate::{ConfigError, Result};

/// Config filename inside the home directory.
pub const CONFIG_FILE: &str = "config.json";

/// State filename inside the home directory.
pub const STATE_FILE: &str = "state.json";

/// File-backed store for the config and state documents.
///
/// In temporary mode nothing is read from or written to disk: loads return
/// defaults and saves are no-ops.
#[derive(Debug, Clone)]
pub struct PersistedStore {
    home: PathBuf,
    install_root: PathBuf,
    temporary: bool,
}

impl PersistedStore {
    /// Create a store rooted at `home`.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            install_root: install_root(),
            temporary: false,
        }
    }

    /// Create a store that never touches the disk.
    pub fn temporary(home: impl Into<PathBuf>) -> Self {
        Self {
            temporary: true,
            ..Self::new(home)
        }
    }

    /// Override the directory `$CODALAB_CLI` expands to.
    pub fn with_install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.install_root = root.into();
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join(CONFIG_FILE)
    }

    pub fn state_path(&self) -> PathBuf {
        self.home.join(STATE_FILE)
    }

    /// Load the config document, creating it with defaults if absent.
    ///
    /// `$CODALAB_CLI` inside string values is replaced by the install root.
    pub fn load_config(&self) -> Result<Config> {
        if self.temporary {
            return Ok(Config::default());
        }
        let path = self.config_path();
        let (raw, contents) = read_json_or_create(&path, Config::default)?;
        let raw = substitute_install_root(raw, &self.install_root);
        serde_json::from_value(raw).map_err(|source| ConfigError::Malformed {
            path: path.display().to_string(),
            contents,
            source,
        })
    }

    /// Load the state document, creating an empty one if absent.
    pub fn load_state(&self) -> Result<State> {
        if self.temporary {
            return Ok(State::default());
        }
        let path = self.state_path();
        let (raw, contents) = read_json_or_create(&path, State::default)?;
        serde_json::from_value(raw).map_err(|source| ConfigError::Malformed {
            path: path.display().to_string(),
            contents,
            source,
        })
    }

    pub fn save_config(&self, config: &Config) -> Result<()> {
        if self.temporary {
            return Ok(());
        }
        write_pretty_json(config, &self.config_path())
    }

    pub fn save_state(&self, state: &State) -> Result<()> {
        if self.temporary {
            return Ok(());
        }
        write_pretty_json(state, &self.state_path())
    }
}

/// Read a JSON document, writing `default()` first if the file is missing.
///
/// Returns the parsed value together with the raw text for diagnostics.
fn read_json_or_create<T, F>(path: &Path, default: F) -> Result<(Value, String)>
where
    T: Serialize,
    F: FnOnce() -> T,
{
    if !path.exists() {
        tracing::debug!("creating {}", path.display());
        write_pretty_json(&default(), path)?;
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;

    match serde_json::from_str(&contents) {
        Ok(value) => Ok((value, contents)),
        Err(source) => Err(ConfigError::Malformed {
            path: path.display().to_string(),
            contents,
            source,
        }),
    }
}

/// Serialize with sorted keys and 4-space indentation.
pub fn to_pretty_json<T: Serialize>(data: &T) -> Result<String> {
    let value = sort_keys(serde_json::to_value(data)?);

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');

    String::from_utf8(buf).map_err(|e| ConfigError::Other(e.to_string()))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Write the full document next to `path`, then rename it into place.
fn write_pretty_json<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = to_pretty_json(data)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, contents).map_err(|e| ConfigError::WriteFile {
        path: tmp.display().to_string(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthEntry, SessionEntry, TokenInfo};
    use tempfile::tempdir;

    fn store(dir: &Path) -> PersistedStore {
        PersistedStore::new(dir).with_install_root("/opt/codalab")
    }

    #[test]
    fn test_missing_documents_created_with_defaults() {
        let temp = tempdir().unwrap();
        let store = store(temp.path());

        let config = store.load_config().unwrap();
        assert!(store.config_path().exists());
        assert_eq!(config.aliases["localhost"], "http://localhost:2800");

        let state = store.load_state().unwrap();
        assert!(store.state_path().exists());
        assert!(state.auth.is_empty());
        assert!(state.sessions.is_empty());
    }

    #[test]
    fn test_install_root_substituted_on_load() {
        let temp = tempdir().unwrap();
        let config = store(temp.path()).load_config().unwrap();
        assert_eq!(
            config.workers["q"].dispatch_command.as_deref(),
            Some("python /opt/codalab/scripts/dispatch-q.py")
        );

        // The file on disk keeps the token.
        let raw = std::fs::read_to_string(temp.path().join(CONFIG_FILE)).unwrap();
        assert!(raw.contains("$CODALAB_CLI"));
    }

    #[test]
    fn test_state_roundtrip() {
        let temp = tempdir().unwrap();
        let store = store(temp.path());

        let mut state = State::default();
        state.auth.insert(
            "https://worksheets.example.org".to_string(),
            AuthEntry {
                token_info: Some(TokenInfo {
                    access_token: "access".to_string(),
                    refresh_token: "refresh".to_string(),
                    expires_at: 1_700_000_123.456,
                    token_type: Some("Bearer".to_string()),
                    scope: None,
                }),
                username: Some("alice".to_string()),
            },
        );
        state.sessions.insert(
            "4242".to_string(),
            SessionEntry::new("local", Some("0x1234".to_string())),
        );
        state
            .sessions
            .insert("top".to_string(), SessionEntry::new("main", None));

        store.save_state(&state).unwrap();
        assert_eq!(store.load_state().unwrap(), state);
    }

    #[test]
    fn test_malformed_state_is_fatal() {
        let temp = tempdir().unwrap();
        let store = store(temp.path());
        std::fs::write(store.state_path(), "{\"auth\": {").unwrap();

        let err = store.load_state().unwrap_err();
        assert!(err.is_fatal());
        match err {
            ConfigError::Malformed { contents, .. } => assert_eq!(contents, "{\"auth\": {"),
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_tag_is_fatal() {
        let temp = tempdir().unwrap();
        let store = store(temp.path());
        std::fs::write(
            store.config_path(),
            r#"{"server": {"class": "SQLiteModel", "auth": {"class": "KerberosHandler"}}}"#,
        )
        .unwrap();

        assert!(store.load_config().unwrap_err().is_fatal());
    }

    #[test]
    fn test_save_sorts_keys() {
        let temp = tempdir().unwrap();
        let store = store(temp.path());
        store.save_config(&Config::default()).unwrap();

        let raw = std::fs::read_to_string(store.config_path()).unwrap();
        let aliases = raw.find("\"aliases\"").unwrap();
        let cli = raw.find("\"cli\"").unwrap();
        let server = raw.find("\"server\"").unwrap();
        let workers = raw.find("\"workers\"").unwrap();
        assert!(aliases < cli && cli < server && server < workers);
        assert!(raw.contains("\n    \"aliases\""));
    }

    #[test]
    fn test_temporary_store_never_writes() {
        let temp = tempdir().unwrap();
        let store = PersistedStore::temporary(temp.path());

        let mut state = store.load_state().unwrap();
        state
            .sessions
            .insert("temporary".to_string(), SessionEntry::new("local", None));
        store.save_state(&state).unwrap();
        store.save_config(&Config::default()).unwrap();

        assert!(!store.state_path().exists());
        assert!(!store.config_path().exists());
    }
}
