//! Local bundle model, selected by `server.class`.
//!
//! Only worksheet resolution is exposed here; the full storage layer lives in
//! the bundle server.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use codalab_config::ModelConfig;

use crate::error::{Error, Result};
use crate::types::{User, generate_uuid, is_uuid};

/// SQLite database filename inside the home directory.
pub const SQLITE_DB_FILE: &str = "bundle.db";

/// Model selected by kind.
#[derive(Debug)]
pub enum Model {
    Sqlite(SqliteModel),
    MySql(MySqlModel),
}

impl Model {
    /// Build the model named by `config`.
    pub fn from_config(config: &ModelConfig, home: &Path, root_user_id: &str) -> Result<Self> {
        match config {
            ModelConfig::Sqlite => Ok(Self::Sqlite(SqliteModel::open(
                home.join(SQLITE_DB_FILE),
                root_user_id,
            )?)),
            ModelConfig::MySql { engine_url } => {
                Ok(Self::MySql(MySqlModel::new(engine_url, root_user_id)))
            }
        }
    }

    pub fn root_user_id(&self) -> &str {
        match self {
            Self::Sqlite(m) => &m.root_user_id,
            Self::MySql(m) => &m.root_user_id,
        }
    }

    /// Resolve a worksheet for `owner`. An empty `name` is the home worksheet.
    pub fn get_worksheet_uuid(
        &self,
        owner: &User,
        parent_uuid: Option<&str>,
        name: &str,
    ) -> Result<String> {
        match self {
            Self::Sqlite(m) => m.get_worksheet_uuid(owner, parent_uuid, name),
            Self::MySql(m) => Err(Error::Unsupported(format!(
                "MySQL model at {} is only reachable through the bundle server",
                m.engine_url
            ))),
        }
    }
}

/// Name of a user's home worksheet.
pub fn home_worksheet_name(user: &User) -> String {
    format!("home-{}", user.name)
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite
// ─────────────────────────────────────────────────────────────────────────────

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS worksheet (
    uuid        TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    owner_id    TEXT NOT NULL,
    parent_uuid TEXT
);
CREATE INDEX IF NOT EXISTS worksheet_name ON worksheet(name);
";

/// Worksheet table in a SQLite file.
#[derive(Debug)]
pub struct SqliteModel {
    path: PathBuf,
    root_user_id: String,
    conn: Mutex<Connection>,
}

impl SqliteModel {
    pub fn open(path: PathBuf, root_user_id: &str) -> Result<Self> {
        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            path,
            root_user_id: root_user_id.to_string(),
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve `name` (a uuid or a worksheet name).
    ///
    /// The home worksheet is created on first use. Names are matched across
    /// all worksheets; when several share a name the newest row wins.
    pub fn get_worksheet_uuid(
        &self,
        owner: &User,
        parent_uuid: Option<&str>,
        name: &str,
    ) -> Result<String> {
        let conn = self.conn.lock();

        if name.is_empty() {
            let home = home_worksheet_name(owner);
            if let Some(uuid) = find_by_name(&conn, &home)? {
                return Ok(uuid);
            }
            let uuid = generate_uuid();
            conn.execute(
                "INSERT INTO worksheet (uuid, name, owner_id, parent_uuid) VALUES (?1, ?2, ?3, ?4)",
                params![uuid, home, owner.id, parent_uuid],
            )?;
            tracing::info!(worksheet = %home, %uuid, "created home worksheet");
            return Ok(uuid);
        }

        if is_uuid(name) {
            let found: Option<String> = conn
                .query_row(
                    "SELECT uuid FROM worksheet WHERE uuid = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;
            return found.ok_or_else(|| Error::NotFound(format!("worksheet {}", name)));
        }

        find_by_name(&conn, name)?.ok_or_else(|| Error::NotFound(format!("worksheet {}", name)))
    }
}

fn find_by_name(conn: &Connection, name: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT uuid FROM worksheet WHERE name = ?1 ORDER BY rowid DESC LIMIT 1",
            params![name],
            |row| row.get(0),
        )
        .optional()?)
}

// ─────────────────────────────────────────────────────────────────────────────
// MySQL
// ─────────────────────────────────────────────────────────────────────────────

/// Connection parameters for a MySQL-backed server.
#[derive(Debug, Clone)]
pub struct MySqlModel {
    engine_url: String,
    root_user_id: String,
}

impl MySqlModel {
    pub fn new(engine_url: &str, root_user_id: &str) -> Self {
        Self {
            engine_url: engine_url.to_string(),
            root_user_id: root_user_id.to_string(),
        }
    }

    pub fn engine_url(&self) -> &str {
        &self.engine_url
    }
}
