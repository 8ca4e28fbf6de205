//! Database schema and connection setup.

use crate::error::{Result, StoreError};
use rusqlite::{Connection, ErrorCode};

/// Current schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

/// Table definitions. `files.current_version_id` and `versions.file_id`
/// reference each other; SQLite resolves the forward reference lazily.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  file_path TEXT UNIQUE NOT NULL,
  current_version_id INTEGER,
  FOREIGN KEY (current_version_id) REFERENCES versions(id)
);

CREATE TABLE IF NOT EXISTS versions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  file_id INTEGER NOT NULL,
  content TEXT NOT NULL,
  timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
  version_number INTEGER NOT NULL,
  label TEXT,
  FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE,
  UNIQUE(file_id, version_number)
);

CREATE TABLE IF NOT EXISTS repository_commits (
  repo_path TEXT PRIMARY KEY,
  commit_hash TEXT NOT NULL,
  timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_versions_file_id ON versions(file_id);
CREATE INDEX IF NOT EXISTS idx_repository_commits_hash ON repository_commits(commit_hash);
"#;

/// Apply pragmas, verify integrity and create the tables.
pub(crate) fn initialize(conn: &Connection, durable: bool) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    if durable {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
    }

    let check: String = conn.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
    if check != "ok" {
        return Err(StoreError::Corruption(check));
    }

    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchema {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    conn.execute_batch(SCHEMA)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Whether an open/initialize failure means the file is unusable and
/// should be quarantined.
pub(crate) fn is_corruption(err: &StoreError) -> bool {
    match err {
        StoreError::Corruption(_) => true,
        StoreError::Sql(rusqlite::Error::SqliteFailure(e, _)) => {
            matches!(e.code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn, false).unwrap();
        initialize(&conn, false).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(tables, vec!["files", "repository_commits", "versions"]);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        let err = initialize(&conn, false).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnsupportedSchema { found, supported }
                if found == SCHEMA_VERSION + 1 && supported == SCHEMA_VERSION
        ));
        assert!(!is_corruption(&err));
    }

    #[test]
    fn test_io_error_is_not_corruption() {
        let err = StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!is_corruption(&err));
    }
}
