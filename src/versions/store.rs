//! SQLite-backed version store.

use super::schema;
use crate::error::{Result, StoreError};
use crate::types::{CommitMark, FileId, TrackedFile, Version, VersionId, VersionNumber};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const FILE_COLUMNS: &str = "id, file_path, current_version_id";
const VERSION_COLUMNS: &str = "id, file_id, content, timestamp, version_number, label";

/// What happened while opening a store.
#[derive(Clone, Debug, Default)]
pub struct OpenReport {
    /// Where a corrupt database was moved before a fresh one was created.
    pub quarantined: Option<PathBuf>,
}

/// CRUD over files and versions.
///
/// Every call runs to completion under the connection lock, so reads
/// always observe earlier writes and version numbering is serialized.
pub struct VersionStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    report: OpenReport,
}

impl VersionStore {
    /// Open (or create) the database file at `path`.
    ///
    /// A file that SQLite reports as corrupt or not a database is renamed
    /// to `<name>.corrupt-<unix-seconds>` and replaced by an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut report = OpenReport::default();
        let conn = match Self::connect(&path) {
            Ok(conn) => conn,
            Err(e) if schema::is_corruption(&e) => {
                let backup = Self::quarantine(&path)?;
                warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "version store is corrupt, starting with an empty store"
                );
                report.quarantined = Some(backup);
                Self::connect(&path)?
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
            report,
        })
    }

    /// Create a non-persistent store (for tests and previews).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn, false)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
            report: OpenReport::default(),
        })
    }

    fn connect(path: &Path) -> Result<Connection> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn, true)?;
        Ok(conn)
    }

    /// Move the database and its journal siblings out of the way.
    fn quarantine(path: &Path) -> Result<PathBuf> {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StoreError::Corruption(format!("bad store path {}", path.display())))?;
        let backup = path.with_file_name(format!("{}.corrupt-{}", file_name, secs));

        fs::rename(path, &backup).map_err(|e| {
            StoreError::Corruption(format!("cannot quarantine {}: {}", path.display(), e))
        })?;
        for suffix in ["-wal", "-shm"] {
            let sibling = path.with_file_name(format!("{}{}", file_name, suffix));
            if sibling.exists() {
                let target = backup.with_file_name(format!(
                    "{}{}",
                    backup.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
                    suffix
                ));
                fs::rename(&sibling, target)?;
            }
        }
        Ok(backup)
    }

    /// Database file path (None for in-memory stores).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Outcome of opening the store.
    pub fn open_report(&self) -> &OpenReport {
        &self.report
    }

    // --- Files ---

    /// Insert a new file with no versions.
    ///
    /// Fails with `FileExists` if the path is already tracked.
    pub fn create_file(&self, path: &str) -> Result<TrackedFile> {
        let conn = self.conn.lock();
        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM files WHERE file_path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StoreError::FileExists(path.to_string()));
        }

        conn.execute("INSERT INTO files (file_path) VALUES (?1)", params![path])?;
        let id = FileId(conn.last_insert_rowid());
        debug!(path, file_id = %id, "tracking new file");

        Ok(TrackedFile {
            id,
            file_path: path.to_string(),
            current_version_id: None,
        })
    }

    /// Look up a file, creating it if it is not tracked yet.
    pub fn get_or_create_file(&self, path: &str) -> Result<TrackedFile> {
        match self.get_file(path)? {
            Some(file) => Ok(file),
            None => self.create_file(path),
        }
    }

    pub fn get_file(&self, path: &str) -> Result<Option<TrackedFile>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM files WHERE file_path = ?1", FILE_COLUMNS);
        Ok(conn.query_row(&sql, params![path], file_from_row).optional()?)
    }

    pub fn get_file_by_id(&self, id: FileId) -> Result<Option<TrackedFile>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM files WHERE id = ?1", FILE_COLUMNS);
        Ok(conn.query_row(&sql, params![id.0], file_from_row).optional()?)
    }

    /// All tracked files, ordered by id.
    pub fn get_all_files(&self) -> Result<Vec<TrackedFile>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM files ORDER BY id ASC", FILE_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let files = stmt
            .query_map([], file_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    pub fn file_count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // --- Versions ---

    /// Versions of a file, newest first. `limit` caps the result length.
    pub fn get_file_versions(&self, file_id: FileId, limit: Option<usize>) -> Result<Vec<Version>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM versions WHERE file_id = ?1 ORDER BY version_number DESC LIMIT ?2",
            VERSION_COLUMNS
        );
        // SQLite treats a negative limit as "no limit".
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(&sql)?;
        let versions = stmt
            .query_map(params![file_id.0, limit], version_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(versions)
    }

    /// Ids of a file's versions, newest first.
    pub fn version_ids(&self, file_id: FileId) -> Result<Vec<VersionId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id FROM versions WHERE file_id = ?1 ORDER BY version_number DESC",
        )?;
        let ids = stmt
            .query_map(params![file_id.0], |row| row.get(0).map(VersionId))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Newest version of a file, if any.
    pub fn latest_version(&self, file_id: FileId) -> Result<Option<Version>> {
        Ok(self.get_file_versions(file_id, Some(1))?.into_iter().next())
    }

    pub fn get_version(&self, id: VersionId) -> Result<Option<Version>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM versions WHERE id = ?1", VERSION_COLUMNS);
        Ok(conn.query_row(&sql, params![id.0], version_from_row).optional()?)
    }

    pub fn version_count(&self, file_id: FileId) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM versions WHERE file_id = ?1",
            params![file_id.0],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Number of versions across all files.
    pub fn total_version_count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM versions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Append a version to a file and make it the current one.
    ///
    /// The number is `max + 1` (or 1), computed and inserted in one
    /// transaction.
    pub fn create_version(
        &self,
        file_id: FileId,
        content: &str,
        label: Option<&str>,
    ) -> Result<Version> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row("SELECT id FROM files WHERE id = ?1", params![file_id.0], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::FileIdNotFound(file_id));
        }

        let max: Option<i64> = tx.query_row(
            "SELECT MAX(version_number) FROM versions WHERE file_id = ?1",
            params![file_id.0],
            |row| row.get(0),
        )?;
        let version_number = max
            .map(|n| VersionNumber(n).next())
            .unwrap_or(VersionNumber::FIRST);
        let timestamp = Utc::now().naive_utc();

        tx.execute(
            "INSERT INTO versions (file_id, content, timestamp, version_number, label)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![file_id.0, content, timestamp, version_number.0, label],
        )?;
        let id = VersionId(tx.last_insert_rowid());
        tx.execute(
            "UPDATE files SET current_version_id = ?1 WHERE id = ?2",
            params![id.0, file_id.0],
        )?;
        tx.commit()?;

        debug!(file_id = %file_id, version = %version_number, "created version");

        Ok(Version {
            id,
            file_id,
            content: content.to_string(),
            timestamp,
            version_number,
            label: label.map(str::to_string),
        })
    }

    /// Replace a version's label. Content is never modified.
    pub fn set_label(&self, id: VersionId, label: Option<&str>) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE versions SET label = ?1 WHERE id = ?2",
            params![label, id.0],
        )?;
        if changed == 0 {
            return Err(StoreError::VersionNotFound(id));
        }
        Ok(())
    }

    /// Delete a version, moving the owning file's pointer if needed.
    ///
    /// Fails with `VersionNotFound` if the id does not exist.
    pub fn delete_version(&self, id: VersionId) -> Result<()> {
        if self.delete_version_if_exists(id)? {
            Ok(())
        } else {
            Err(StoreError::VersionNotFound(id))
        }
    }

    /// Best-effort variant of [`delete_version`](Self::delete_version):
    /// returns `false` instead of failing when the id does not exist.
    pub fn delete_version_if_exists(&self, id: VersionId) -> Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let file_id: Option<i64> = tx
            .query_row("SELECT file_id FROM versions WHERE id = ?1", params![id.0], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(file_id) = file_id else {
            return Ok(false);
        };
        let file_id = FileId(file_id);

        let current: Option<i64> = tx.query_row(
            "SELECT current_version_id FROM files WHERE id = ?1",
            params![file_id.0],
            |row| row.get(0),
        )?;
        // The pointer moves before the delete so the foreign key never dangles.
        if current == Some(id.0) {
            repoint_excluding(&tx, file_id, id)?;
        }
        tx.execute("DELETE FROM versions WHERE id = ?1", params![id.0])?;
        tx.commit()?;

        debug!(file_id = %file_id, version_id = %id, "deleted version");
        Ok(true)
    }

    /// Delete every version of a file except `keep`, which becomes current.
    /// Returns the number of versions deleted.
    pub fn retain_only(&self, file_id: FileId, keep: VersionId) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let owner: Option<i64> = tx
            .query_row("SELECT file_id FROM versions WHERE id = ?1", params![keep.0], |row| {
                row.get(0)
            })
            .optional()?;
        if owner != Some(file_id.0) {
            return Err(StoreError::VersionNotFound(keep));
        }

        tx.execute(
            "UPDATE files SET current_version_id = ?1 WHERE id = ?2",
            params![keep.0, file_id.0],
        )?;
        let deleted = tx.execute(
            "DELETE FROM versions WHERE file_id = ?1 AND id != ?2",
            params![file_id.0, keep.0],
        )?;
        tx.commit()?;

        debug!(file_id = %file_id, kept = %keep, deleted, "collapsed history");
        Ok(deleted)
    }

    /// Delete every version of a file. The file itself stays tracked.
    pub fn delete_all_versions(&self, file_id: FileId) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let changed = tx.execute(
            "UPDATE files SET current_version_id = NULL WHERE id = ?1",
            params![file_id.0],
        )?;
        if changed == 0 {
            return Err(StoreError::FileIdNotFound(file_id));
        }
        let deleted = tx.execute("DELETE FROM versions WHERE file_id = ?1", params![file_id.0])?;
        tx.commit()?;

        debug!(file_id = %file_id, deleted, "cleared history");
        Ok(deleted)
    }

    // --- Repository commit marks ---

    pub fn commit_mark(&self, repo_path: &str) -> Result<Option<CommitMark>> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                "SELECT repo_path, commit_hash, timestamp FROM repository_commits WHERE repo_path = ?1",
                params![repo_path],
                |row| {
                    Ok(CommitMark {
                        repo_path: row.get(0)?,
                        commit_hash: row.get(1)?,
                        timestamp: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn record_commit_mark(&self, repo_path: &str, commit_hash: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO repository_commits (repo_path, commit_hash, timestamp)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(repo_path) DO UPDATE SET
               commit_hash = excluded.commit_hash,
               timestamp = excluded.timestamp",
            params![repo_path, commit_hash, Utc::now().naive_utc()],
        )?;
        Ok(())
    }
}

/// Point a file at its newest version other than `excluded`, or at nothing.
fn repoint_excluding(tx: &Transaction<'_>, file_id: FileId, excluded: VersionId) -> Result<()> {
    tx.execute(
        "UPDATE files SET current_version_id = (
           SELECT id FROM versions
           WHERE file_id = ?1 AND id != ?2
           ORDER BY version_number DESC
           LIMIT 1
         )
         WHERE id = ?1",
        params![file_id.0, excluded.0],
    )?;
    Ok(())
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<TrackedFile> {
    Ok(TrackedFile {
        id: FileId(row.get(0)?),
        file_path: row.get(1)?,
        current_version_id: row.get::<_, Option<i64>>(2)?.map(VersionId),
    })
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<Version> {
    Ok(Version {
        id: VersionId(row.get(0)?),
        file_id: FileId(row.get(1)?),
        content: row.get(2)?,
        timestamp: row.get(3)?,
        version_number: VersionNumber(row.get(4)?),
        label: row.get(5)?,
    })
}
