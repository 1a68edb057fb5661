//! Schema migrations for the library database.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::Result;

pub const SCHEMA_VERSION: u32 = 1;

const MIGRATIONS: &[&str] = &[SCHEMA_V1];

const SCHEMA_V1: &str = r"
CREATE TABLE IF NOT EXISTS references_ (
    rec_number INTEGER PRIMARY KEY,
    ref_type TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL DEFAULT '',
    authors TEXT NOT NULL DEFAULT '[]',
    year TEXT NOT NULL DEFAULT '',
    journal TEXT NOT NULL DEFAULT '',
    volume TEXT NOT NULL DEFAULT '',
    issue TEXT NOT NULL DEFAULT '',
    pages TEXT NOT NULL DEFAULT '',
    abstract TEXT NOT NULL DEFAULT '',
    keywords TEXT NOT NULL DEFAULT '[]',
    doi TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL DEFAULT '',
    publisher TEXT NOT NULL DEFAULT '',
    place_published TEXT NOT NULL DEFAULT '',
    edition TEXT NOT NULL DEFAULT '',
    isbn TEXT NOT NULL DEFAULT '',
    label TEXT NOT NULL DEFAULT '',
    notes TEXT NOT NULL DEFAULT '',
    pdf_path TEXT
);

CREATE TABLE IF NOT EXISTS pdf_pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rec_number INTEGER NOT NULL REFERENCES references_(rec_number) ON DELETE CASCADE,
    page_number INTEGER NOT NULL CHECK (page_number >= 1),
    text_content TEXT NOT NULL DEFAULT '',
    UNIQUE(rec_number, page_number)
);

CREATE INDEX IF NOT EXISTS idx_pdf_pages_rec ON pdf_pages(rec_number);

CREATE TABLE IF NOT EXISTS reference_embeddings (
    rec_number INTEGER PRIMARY KEY REFERENCES references_(rec_number) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    dims INTEGER NOT NULL,
    model_name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE VIRTUAL TABLE IF NOT EXISTS references_fts USING fts5(
    title,
    authors,
    abstract,
    keywords,
    journal,
    tokenize = 'porter unicode61'
);

CREATE VIRTUAL TABLE IF NOT EXISTS pages_fts USING fts5(
    text_content,
    tokenize = 'porter unicode61'
);
";

/// Bring the schema up to [`SCHEMA_VERSION`], returning the resulting version.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    let mut version = current_version(conn)?;
    for (idx, sql) in MIGRATIONS.iter().enumerate() {
        let target = u32::try_from(idx + 1).unwrap_or(u32::MAX);
        if target <= version {
            continue;
        }
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [target.to_string()],
        )?;
        tx.commit()?;
        info!(version = target, "applied schema migration");
        version = target;
    }
    Ok(version)
}

fn current_version(conn: &Connection) -> Result<u32> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(raw.and_then(|v| v.parse().ok()).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), SCHEMA_VERSION);
        assert_eq!(run_migrations(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_version_recorded_in_meta() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
