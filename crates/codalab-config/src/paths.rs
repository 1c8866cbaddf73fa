//! Home directory and install root resolution.
//!
//! # Environment Variables
//!
//! - `CODALAB_HOME` - Override the home directory (default `~/.codalab`)
//! - `CODALAB_CLI` - Override the install root substituted into config strings

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::{ConfigError, Result};

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "CODALAB_HOME";

/// Environment variable overriding the install root.
pub const INSTALL_ROOT_ENV: &str = "CODALAB_CLI";

/// Token replaced by the install root inside config string values.
pub const INSTALL_ROOT_TOKEN: &str = "$CODALAB_CLI";

const DEFAULT_HOME: &str = "~/.codalab";

/// Get the effective home directory without touching the filesystem.
///
/// Resolution order:
/// 1. `CODALAB_HOME` environment variable
/// 2. Default: `~/.codalab`
pub fn effective_home() -> PathBuf {
    let raw = std::env::var(HOME_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_HOME.to_string());
    expand_path(Path::new(&raw))
}

/// Resolve the home directory, creating it if it does not exist.
pub fn codalab_home() -> Result<PathBuf> {
    let home = effective_home();
    std::fs::create_dir_all(&home).map_err(|e| ConfigError::WriteFile {
        path: home.display().to_string(),
        source: e,
    })?;
    Ok(home)
}

/// The directory `$CODALAB_CLI` expands to.
///
/// Uses `CODALAB_CLI` when set, else the directory holding the running
/// executable.
pub fn install_root() -> PathBuf {
    if let Ok(root) = std::env::var(INSTALL_ROOT_ENV)
        && !root.is_empty()
    {
        return PathBuf::from(root);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Replace `$CODALAB_CLI` in every string of a JSON tree.
pub fn substitute_install_root(value: Value, root: &Path) -> Value {
    let root = root.display().to_string();
    substitute(value, &root)
}

fn substitute(value: Value, root: &str) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace(INSTALL_ROOT_TOKEN, root)),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, substitute(v, root)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| substitute(v, root)).collect())
        }
        other => other,
    }
}

/// Expand ~ to home directory in paths.
pub fn expand_path(path: &Path) -> PathBuf {
    if let Some(s) = path.to_str() {
        if s == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
        if let Some(rest) = s.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_substitute_nested_strings() {
        let value = json!({
            "workers": {"q": {"dispatch_command": "python $CODALAB_CLI/scripts/dispatch-q.py", "verbose": 1}},
            "paths": ["$CODALAB_CLI/a", 3]
        });
        let out = substitute_install_root(value, Path::new("/opt/codalab"));
        assert_eq!(
            out["workers"]["q"]["dispatch_command"],
            "python /opt/codalab/scripts/dispatch-q.py"
        );
        assert_eq!(out["workers"]["q"]["verbose"], 1);
        assert_eq!(out["paths"][0], "/opt/codalab/a");
        assert_eq!(out["paths"][1], 3);
    }

    #[test]
    fn test_expand_path() {
        let path = PathBuf::from("~/test/.codalab");
        let expanded = expand_path(&path);
        if dirs::home_dir().is_some() {
            assert!(!expanded.to_str().unwrap().starts_with("~/"));
        }

        let path2 = PathBuf::from("/absolute/path");
        assert_eq!(expand_path(&path2), path2);
    }

    #[test]
    fn test_effective_home_env_override() {
        // SAFETY: Test-specific env var, restored below
        unsafe { std::env::set_var(HOME_ENV, "/from/env/.codalab") };
        assert_eq!(effective_home(), PathBuf::from("/from/env/.codalab"));
        unsafe { std::env::remove_var(HOME_ENV) };

        assert!(effective_home().ends_with(".codalab"));
    }
}
