//! SQLite storage backend.
//!
//! Stores each project as a JSON document in a single table, keyed by id.

use super::backend::{BackendType, ProjectBackend};
use crate::Result;
use crate::models::Project;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::{Path, PathBuf};

/// Database file name inside the data directory.
pub const DB_FILE: &str = "bddtrack.db";

/// SQLite-backed project storage.
pub struct SqliteBackend {
    path: PathBuf,
    conn: Connection,
}

impl SqliteBackend {
    /// Open (creating if needed) the database in `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(DB_FILE);
        let conn = Connection::open(&path)?;
        Self::init_schema(&conn)?;
        Ok(Self { path, conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_projects_name ON projects(name);
            "#,
        )?;
        Ok(())
    }
}

impl ProjectBackend for SqliteBackend {
    fn list(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM projects ORDER BY name ASC, id ASC")?;
        let rows: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;

        let mut projects = Vec::with_capacity(rows.len());
        for data in rows {
            projects.push(serde_json::from_str(&data)?);
        }
        Ok(projects)
    }

    fn get(&self, id: &str) -> Result<Option<Project>> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM projects WHERE id = ?", [id], |row| {
                row.get(0)
            })
            .optional()?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    fn put(&mut self, project: &Project) -> Result<()> {
        let data = serde_json::to_string(project)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO projects (id, name, data, updated_at) VALUES (?, ?, ?, ?)",
            params![project.id, project.name, data, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM projects WHERE id = ?", [id])?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Sqlite
    }
}
