//! SQLite-backed picker database facade.
//!
//! This module is the only component that knows the picker storage schema.
//! The controller writes through scoped [`WriteOperation`] handles: a handle
//! opens a transaction, `execute` applies rows, `set_success` commits, and
//! dropping the handle without success rolls the transaction back.
//!
//! # Database Schema
//!
//! - `media`: synced media items per provider
//! - `album_media`: synced album contents per provider
//! - `picker_state`: single row holding the active cloud authority
//! - `schema_version`: migration tracking

use anyhow::Context;
use picker_provider_core::MediaRow;
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised by the facade.
#[derive(Debug, Error)]
pub enum DbError {
    /// The facade refused to open a write operation for these arguments.
    #[error("invalid write operation: {0}")]
    InvalidOperation(String),

    /// The handle was used after commit or rollback.
    #[error("write operation already completed")]
    Completed,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// A scoped, transactional write handle.
///
/// `set_success` commits. A handle dropped without `set_success` rolls back
/// everything it executed.
pub trait WriteOperation: Send {
    /// Apply one page of rows. Returns the number of rows affected.
    fn execute(&mut self, rows: &[MediaRow]) -> Result<usize, DbError>;

    /// Commit the operation.
    fn set_success(&mut self) -> Result<(), DbError>;
}

/// Transactional writer and cloud-authority switch on the picker database.
pub trait PickerDb: Send + Sync {
    /// Atomically switch which cloud provider's rows are visible to
    /// queries. `None` disables cloud queries entirely.
    fn set_cloud_authority(&self, authority: Option<&str>) -> Result<(), DbError>;

    /// The currently visible cloud authority, if any.
    fn cloud_authority(&self) -> Result<Option<String>, DbError>;

    fn begin_add_media(&self, authority: &str) -> Result<Box<dyn WriteOperation>, DbError>;

    fn begin_add_album_media(
        &self,
        authority: &str,
        album_id: &str,
    ) -> Result<Box<dyn WriteOperation>, DbError>;

    fn begin_remove_media(&self, authority: &str) -> Result<Box<dyn WriteOperation>, DbError>;

    /// Reset media rows. `None` resets every cloud provider's rows.
    fn begin_reset_media(&self, authority: Option<&str>)
        -> Result<Box<dyn WriteOperation>, DbError>;

    /// Reset album-media rows; `album_id` of `None` resets every album.
    /// `authority` of `None` resets every cloud provider's albums.
    fn begin_reset_album_media(
        &self,
        authority: Option<&str>,
        album_id: Option<&str>,
    ) -> Result<Box<dyn WriteOperation>, DbError>;

    /// Number of media rows synced for an authority.
    fn count_media(&self, authority: &str) -> Result<u64, DbError>;

    /// Number of album-media rows synced for an authority.
    fn count_album_media(&self, authority: &str, album_id: Option<&str>) -> Result<u64, DbError>;
}

// ============================================================================
// SqlitePickerDb
// ============================================================================

/// SQLite implementation of the picker database.
///
/// The connection is wrapped in a `Mutex` for interior mutability and to
/// satisfy `Sync`. Write operations open a real transaction on the shared
/// connection; callers are expected to serialize operations, and a second
/// concurrent open fails rather than deadlocks.
pub struct SqlitePickerDb {
    conn: Arc<Mutex<Connection>>,
    local_authority: String,
}

impl SqlitePickerDb {
    /// Open the picker database at the default XDG location.
    pub fn open(local_authority: &str) -> anyhow::Result<Self> {
        let dirs = directories::ProjectDirs::from("", "soluna-labs", "picker-sync")
            .context("Failed to determine project directories")?;
        let path = dirs.data_dir().join("picker.db");
        Self::open_at(&path, local_authority)
    }

    /// Open the picker database at a specific path, creating it if needed.
    pub fn open_at(path: &PathBuf, local_authority: &str) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        info!("Opening picker database at: {:?}", path);

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            local_authority: local_authority.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Run database migrations to set up the schema.
    fn run_migrations(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )
        .context("Failed to create schema_version table")?;

        let current_version: i32 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        debug!("Current schema version: {}", current_version);

        if current_version < 1 {
            drop(conn);
            self.migrate_to_v1()?;
        }

        Ok(())
    }

    /// Migration to version 1: Initial schema.
    fn migrate_to_v1(&self) -> anyhow::Result<()> {
        info!("Running migration to schema version 1");

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "CREATE TABLE IF NOT EXISTS media (
                authority TEXT NOT NULL,
                is_local INTEGER NOT NULL,
                id TEXT NOT NULL,
                date_taken_ms INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL,
                mime_type TEXT NOT NULL,
                PRIMARY KEY (authority, id)
            )",
            [],
        )
        .context("Failed to create media table")?;

        tx.execute(
            "CREATE TABLE IF NOT EXISTS album_media (
                authority TEXT NOT NULL,
                is_local INTEGER NOT NULL,
                album_id TEXT NOT NULL,
                media_id TEXT NOT NULL,
                date_taken_ms INTEGER NOT NULL,
                PRIMARY KEY (authority, album_id, media_id)
            )",
            [],
        )
        .context("Failed to create album_media table")?;

        tx.execute(
            "CREATE TABLE IF NOT EXISTS picker_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                cloud_authority TEXT
            )",
            [],
        )
        .context("Failed to create picker_state table")?;

        tx.execute(
            "INSERT OR IGNORE INTO picker_state (id, cloud_authority) VALUES (1, NULL)",
            [],
        )?;

        tx.execute(
            "CREATE INDEX IF NOT EXISTS idx_media_date_taken
             ON media(date_taken_ms DESC)",
            [],
        )?;

        tx.execute(
            "CREATE INDEX IF NOT EXISTS idx_album_media_album
             ON album_media(album_id)",
            [],
        )?;

        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])
            .context("Failed to update schema version")?;

        tx.commit()?;

        info!("Successfully migrated to schema version 1");
        Ok(())
    }

    fn is_local(&self, authority: &str) -> bool {
        authority == self.local_authority
    }

    fn begin(&self, kind: OpKind) -> Result<Box<dyn WriteOperation>, DbError> {
        kind.validate()?;

        {
            let conn = self.conn.lock().unwrap();
            conn.execute_batch("BEGIN IMMEDIATE")?;
        }

        Ok(Box::new(SqliteWriteOp {
            conn: Arc::clone(&self.conn),
            kind,
            state: OpState::Open,
        }))
    }
}

impl PickerDb for SqlitePickerDb {
    fn set_cloud_authority(&self, authority: Option<&str>) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE picker_state SET cloud_authority = ? WHERE id = 1",
            params![authority],
        )?;
        debug!("Picker db cloud authority set to {:?}", authority);
        Ok(())
    }

    fn cloud_authority(&self) -> Result<Option<String>, DbError> {
        let conn = self.conn.lock().unwrap();
        let authority: Option<String> = conn.query_row(
            "SELECT cloud_authority FROM picker_state WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(authority)
    }

    fn begin_add_media(&self, authority: &str) -> Result<Box<dyn WriteOperation>, DbError> {
        self.begin(OpKind::AddMedia {
            authority: authority.to_string(),
            is_local: self.is_local(authority),
        })
    }

    fn begin_add_album_media(
        &self,
        authority: &str,
        album_id: &str,
    ) -> Result<Box<dyn WriteOperation>, DbError> {
        self.begin(OpKind::AddAlbumMedia {
            authority: authority.to_string(),
            is_local: self.is_local(authority),
            album_id: album_id.to_string(),
        })
    }

    fn begin_remove_media(&self, authority: &str) -> Result<Box<dyn WriteOperation>, DbError> {
        self.begin(OpKind::RemoveMedia {
            authority: authority.to_string(),
        })
    }

    fn begin_reset_media(
        &self,
        authority: Option<&str>,
    ) -> Result<Box<dyn WriteOperation>, DbError> {
        self.begin(OpKind::ResetMedia {
            authority: authority.map(|a| a.to_string()),
        })
    }

    fn begin_reset_album_media(
        &self,
        authority: Option<&str>,
        album_id: Option<&str>,
    ) -> Result<Box<dyn WriteOperation>, DbError> {
        self.begin(OpKind::ResetAlbumMedia {
            authority: authority.map(|a| a.to_string()),
            album_id: album_id.map(|a| a.to_string()),
        })
    }

    fn count_media(&self, authority: &str) -> Result<u64, DbError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM media WHERE authority = ?",
            params![authority],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_album_media(&self, authority: &str, album_id: Option<&str>) -> Result<u64, DbError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = match album_id {
            Some(album) => conn.query_row(
                "SELECT COUNT(*) FROM album_media WHERE authority = ? AND album_id = ?",
                params![authority, album],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM album_media WHERE authority = ?",
                params![authority],
                |row| row.get(0),
            )?,
        };
        Ok(count as u64)
    }
}

// ============================================================================
// Write operations
// ============================================================================

#[derive(Debug, Clone)]
enum OpKind {
    AddMedia { authority: String, is_local: bool },
    AddAlbumMedia { authority: String, is_local: bool, album_id: String },
    RemoveMedia { authority: String },
    ResetMedia { authority: Option<String> },
    ResetAlbumMedia { authority: Option<String>, album_id: Option<String> },
}

impl OpKind {
    fn validate(&self) -> Result<(), DbError> {
        let authority_ok = match self {
            OpKind::AddMedia { authority, .. }
            | OpKind::AddAlbumMedia { authority, .. }
            | OpKind::RemoveMedia { authority } => !authority.is_empty(),
            OpKind::ResetMedia { authority }
            | OpKind::ResetAlbumMedia { authority, .. } => {
                authority.as_deref() != Some("")
            }
        };
        if !authority_ok {
            return Err(DbError::InvalidOperation("empty authority".to_string()));
        }

        if let OpKind::AddAlbumMedia { album_id, .. } = self {
            if album_id.is_empty() {
                return Err(DbError::InvalidOperation("empty album id".to_string()));
            }
        }

        Ok(())
    }

    fn label(&self) -> &'static str {
        match self {
            OpKind::AddMedia { .. } => "add_media",
            OpKind::AddAlbumMedia { .. } => "add_album_media",
            OpKind::RemoveMedia { .. } => "remove_media",
            OpKind::ResetMedia { .. } => "reset_media",
            OpKind::ResetAlbumMedia { .. } => "reset_album_media",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum OpState {
    Open,
    Committed,
    RolledBack,
}

struct SqliteWriteOp {
    conn: Arc<Mutex<Connection>>,
    kind: OpKind,
    state: OpState,
}

impl WriteOperation for SqliteWriteOp {
    fn execute(&mut self, rows: &[MediaRow]) -> Result<usize, DbError> {
        if self.state != OpState::Open {
            return Err(DbError::Completed);
        }

        let conn = self.conn.lock().unwrap();
        let affected = match &self.kind {
            OpKind::AddMedia { authority, is_local } => {
                let mut stmt = conn.prepare_cached(
                    "INSERT OR REPLACE INTO media
                        (authority, is_local, id, date_taken_ms, size_bytes, mime_type)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                let mut written = 0;
                for row in rows {
                    written += stmt.execute(params![
                        authority,
                        *is_local as i32,
                        row.id,
                        row.date_taken_ms,
                        row.size_bytes,
                        row.mime_type,
                    ])?;
                }
                written
            }
            OpKind::AddAlbumMedia { authority, is_local, album_id } => {
                let mut stmt = conn.prepare_cached(
                    "INSERT OR REPLACE INTO album_media
                        (authority, is_local, album_id, media_id, date_taken_ms)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                let mut written = 0;
                for row in rows {
                    written += stmt.execute(params![
                        authority,
                        *is_local as i32,
                        album_id,
                        row.id,
                        row.date_taken_ms,
                    ])?;
                }
                written
            }
            OpKind::RemoveMedia { authority } => {
                let mut stmt =
                    conn.prepare_cached("DELETE FROM media WHERE authority = ? AND id = ?")?;
                let mut removed = 0;
                for row in rows {
                    removed += stmt.execute(params![authority, row.id])?;
                }
                removed
            }
            OpKind::ResetMedia { authority } => match authority {
                Some(a) => {
                    conn.execute("DELETE FROM media WHERE authority = ?", params![a])?
                }
                None => conn.execute("DELETE FROM media WHERE is_local = 0", [])?,
            },
            OpKind::ResetAlbumMedia { authority, album_id } => {
                match (authority, album_id) {
                    (Some(a), Some(album)) => conn.execute(
                        "DELETE FROM album_media WHERE authority = ? AND album_id = ?",
                        params![a, album],
                    )?,
                    (Some(a), None) => conn.execute(
                        "DELETE FROM album_media WHERE authority = ?",
                        params![a],
                    )?,
                    (None, Some(album)) => conn.execute(
                        "DELETE FROM album_media WHERE is_local = 0 AND album_id = ?",
                        params![album],
                    )?,
                    (None, None) => {
                        conn.execute("DELETE FROM album_media WHERE is_local = 0", [])?
                    }
                }
            }
        };

        debug!("{}: {} row(s) affected", self.kind.label(), affected);
        Ok(affected)
    }

    fn set_success(&mut self) -> Result<(), DbError> {
        if self.state != OpState::Open {
            return Err(DbError::Completed);
        }

        let conn = self.conn.lock().unwrap();
        conn.execute_batch("COMMIT")?;
        drop(conn);

        self.state = OpState::Committed;
        Ok(())
    }
}

impl Drop for SqliteWriteOp {
    fn drop(&mut self) {
        if self.state != OpState::Open {
            return;
        }
        self.state = OpState::RolledBack;

        if let Ok(conn) = self.conn.lock() {
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                warn!("Failed to roll back {} operation: {}", self.kind.label(), e);
            } else {
                debug!("Rolled back {} operation", self.kind.label());
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
