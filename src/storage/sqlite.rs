//! SQLite file registry
//!
//! Records every report saved to disk, keyed by source URL, so successive
//! runs can tell new files from refreshed ones.

use crate::crawler::HarvestReport;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// A registry row for one downloaded report.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub url: String,
    pub company: String,
    pub label: String,
    pub path: String,
    pub first_seen_at: String,
    pub last_saved_at: String,
}

/// SQLite-backed registry of downloaded files.
pub struct FileRegistry {
    conn: Connection,
}

impl FileRegistry {
    /// Opens (and if needed creates) the registry database.
    pub fn new(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        Self::initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory registry (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS files (
                url TEXT PRIMARY KEY,
                company TEXT NOT NULL,
                label TEXT NOT NULL,
                path TEXT NOT NULL,
                first_seen_at TEXT NOT NULL,
                last_saved_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_files_company ON files(company);
        ",
        )
    }

    /// Upserts one file keyed by its source URL.
    ///
    /// A re-download of a known URL refreshes `last_saved_at` (and the path
    /// and label, which can drift) but keeps `first_seen_at`.
    pub fn record_file(
        &mut self,
        url: &str,
        company: &str,
        label: &str,
        path: &str,
    ) -> Result<(), rusqlite::Error> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO files (url, company, label, path, first_seen_at, last_saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(url) DO UPDATE SET
                 company = excluded.company,
                 label = excluded.label,
                 path = excluded.path,
                 last_saved_at = excluded.last_saved_at",
            params![url, company, label, path, now],
        )?;
        Ok(())
    }

    /// Records every file saved in `report`.
    pub fn record_report(&mut self, report: &HarvestReport) -> Result<usize, rusqlite::Error> {
        let mut count = 0;
        for (company, file) in report.downloaded() {
            self.record_file(
                file.url.as_str(),
                company,
                &file.label,
                &file.path.to_string_lossy(),
            )?;
            count += 1;
        }
        Ok(count)
    }

    /// Looks up one file by source URL.
    pub fn get_file(&self, url: &str) -> Result<Option<FileRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT url, company, label, path, first_seen_at, last_saved_at
                 FROM files WHERE url = ?1",
                params![url],
                |row| {
                    Ok(FileRecord {
                        url: row.get(0)?,
                        company: row.get(1)?,
                        label: row.get(2)?,
                        path: row.get(3)?,
                        first_seen_at: row.get(4)?,
                        last_saved_at: row.get(5)?,
                    })
                },
            )
            .optional()
    }

    /// Number of registered files.
    pub fn file_count(&self) -> Result<i64, rusqlite::Error> {
        self.conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
    }
}
