//! SQLite database layer
//!
//! Every mutation touches base rows and the matching FTS5 rows inside one
//! transaction, so the lexical indexes never drift from the stored records.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::error::{Result, ShelfError};
use crate::model::{DocumentPage, LibraryStats, Reference, parse_string_list};
use crate::search::vector::{decode_vector, encode_vector, l2_normalize};
use crate::storage::migrations;

/// Column list shared by every query that materializes a [`Reference`].
/// Callers alias `references_` as `r`.
pub(crate) const REFERENCE_COLUMNS: &str = "r.rec_number, r.ref_type, r.title, r.authors, r.year, \
     r.journal, r.volume, r.issue, r.pages, r.abstract, r.keywords, r.doi, r.url, r.publisher, \
     r.place_published, r.edition, r.isbn, r.label, r.notes, r.pdf_path";

/// SQLite database wrapper for the reference library
pub struct Database {
    conn: Connection,
    schema_version: u32,
}

impl Database {
    /// Open database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened library database");
        Self::init(conn)
    }

    /// Private database that disappears with the connection.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        Self::configure_pragmas(&conn)?;
        let schema_version = migrations::run_migrations(&conn)?;
        Ok(Self {
            conn,
            schema_version,
        })
    }

    /// Get a reference to the connection
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Current schema version after migrations.
    #[must_use]
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        // In-memory databases answer "memory" here; that is fine.
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }

    // ---- references ----------------------------------------------------

    /// Insert or replace a reference by `rec_number`. Pages and embedding
    /// already stored for it are kept.
    pub fn upsert_reference(&self, reference: &Reference) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        write_reference(&tx, reference)?;
        tx.commit()?;
        debug!(rec_number = reference.rec_number, "upserted reference");
        Ok(())
    }

    /// Batch upsert in a single transaction.
    pub fn upsert_references(&self, references: &[Reference]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for reference in references {
            write_reference(&tx, reference)?;
        }
        tx.commit()?;
        info!(count = references.len(), "upserted references");
        Ok(references.len())
    }

    pub fn get_reference(&self, rec_number: i64) -> Result<Option<Reference>> {
        let sql = format!("SELECT {REFERENCE_COLUMNS} FROM references_ r WHERE r.rec_number = ?1");
        Ok(self
            .conn
            .query_row(&sql, [rec_number], reference_from_row)
            .optional()?)
    }

    pub fn reference_exists(&self, rec_number: i64) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM references_ WHERE rec_number = ?1",
                [rec_number],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// All references ordered by `rec_number`.
    pub fn all_references(&self) -> Result<Vec<Reference>> {
        let sql = format!("SELECT {REFERENCE_COLUMNS} FROM references_ r ORDER BY r.rec_number");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], reference_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// References that have no stored embedding yet.
    pub fn references_without_embeddings(&self) -> Result<Vec<Reference>> {
        let sql = format!(
            "SELECT {REFERENCE_COLUMNS} FROM references_ r
             LEFT JOIN reference_embeddings e ON e.rec_number = r.rec_number
             WHERE e.rec_number IS NULL
             ORDER BY r.rec_number"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], reference_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Remove a reference together with its pages, embedding and index
    /// entries. Returns whether anything was deleted.
    pub fn delete_reference(&self, rec_number: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM pages_fts WHERE rowid IN
                (SELECT id FROM pdf_pages WHERE rec_number = ?1)",
            [rec_number],
        )?;
        tx.execute("DELETE FROM references_fts WHERE rowid = ?1", [rec_number])?;
        let deleted = tx.execute("DELETE FROM references_ WHERE rec_number = ?1", [rec_number])?;
        tx.commit()?;
        if deleted > 0 {
            info!(rec_number, "deleted reference");
        }
        Ok(deleted > 0)
    }

    /// Empty the whole library.
    pub fn clear_all(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM pages_fts;
             DELETE FROM references_fts;
             DELETE FROM reference_embeddings;
             DELETE FROM pdf_pages;
             DELETE FROM references_;",
        )?;
        tx.commit()?;
        info!("cleared library");
        Ok(())
    }

    // ---- pages ---------------------------------------------------------

    /// Replace every stored page of `rec_number` with `pages`.
    pub fn replace_pages(&self, rec_number: i64, pages: &[DocumentPage]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM pages_fts WHERE rowid IN
                (SELECT id FROM pdf_pages WHERE rec_number = ?1)",
            [rec_number],
        )?;
        tx.execute("DELETE FROM pdf_pages WHERE rec_number = ?1", [rec_number])?;
        for page in pages {
            if page.rec_number != rec_number {
                return Err(ShelfError::MalformedInput(format!(
                    "page {} belongs to reference {}, not {rec_number}",
                    page.page_number, page.rec_number
                )));
            }
            write_page(&tx, page)?;
        }
        tx.commit()?;
        debug!(rec_number, pages = pages.len(), "replaced pages");
        Ok(pages.len())
    }

    /// Insert or overwrite a single page.
    pub fn upsert_page(&self, page: &DocumentPage) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        write_page(&tx, page)?;
        tx.commit()?;
        Ok(())
    }

    /// Pages of one reference within an inclusive range, in page order.
    pub fn get_pages(&self, rec_number: i64, start: u32, end: u32) -> Result<Vec<DocumentPage>> {
        let mut stmt = self.conn.prepare(
            "SELECT rec_number, page_number, text_content FROM pdf_pages
             WHERE rec_number = ?1 AND page_number BETWEEN ?2 AND ?3
             ORDER BY page_number",
        )?;
        let rows = stmt.query_map(params![rec_number, start, end], |row| {
            Ok(DocumentPage {
                rec_number: row.get(0)?,
                page_number: row.get(1)?,
                text: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn page_count(&self, rec_number: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pdf_pages WHERE rec_number = ?1",
            [rec_number],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // ---- embeddings ----------------------------------------------------

    /// Store the embedding for a reference, normalized to unit length.
    pub fn upsert_embedding(&self, rec_number: i64, vector: &[f32], model_name: &str) -> Result<()> {
        let mut normalized = vector.to_vec();
        if !l2_normalize(&mut normalized) {
            return Err(ShelfError::MalformedInput(format!(
                "embedding for reference {rec_number} is empty or zero-length"
            )));
        }
        let dims = i64::try_from(normalized.len()).map_err(|_| {
            ShelfError::MalformedInput(format!(
                "embedding for reference {rec_number} has too many dimensions"
            ))
        })?;
        self.conn.execute(
            "INSERT INTO reference_embeddings (rec_number, embedding, dims, model_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(rec_number) DO UPDATE SET
                embedding = excluded.embedding,
                dims = excluded.dims,
                model_name = excluded.model_name,
                created_at = excluded.created_at",
            params![
                rec_number,
                encode_vector(&normalized),
                dims,
                model_name,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_embedding(&self, rec_number: i64) -> Result<Option<Vec<f32>>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT embedding FROM reference_embeddings WHERE rec_number = ?1",
                [rec_number],
                |row| row.get(0),
            )
            .optional()?;
        blob.map(|bytes| decode_vector(&bytes)).transpose()
    }

    /// Every stored embedding as `(rec_number, vector)`, by `rec_number`.
    pub fn all_embeddings(&self) -> Result<Vec<(i64, Vec<f32>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT rec_number, embedding FROM reference_embeddings ORDER BY rec_number")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (rec_number, bytes) = row?;
            out.push((rec_number, decode_vector(&bytes)?));
        }
        Ok(out)
    }

    pub fn has_embeddings(&self) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM reference_embeddings LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    pub fn clear_embeddings(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM reference_embeddings", [])?;
        info!(removed, "cleared embeddings");
        Ok(removed)
    }

    // ---- maintenance ---------------------------------------------------

    /// Rebuild both lexical indexes from base rows.
    pub fn rebuild_indexes(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch("DELETE FROM references_fts; DELETE FROM pages_fts;")?;

        let sql = format!("SELECT {REFERENCE_COLUMNS} FROM references_ r");
        let references = {
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt.query_map([], reference_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        for reference in &references {
            index_reference(&tx, reference)?;
        }

        let pages = {
            let mut stmt = tx.prepare("SELECT id, text_content FROM pdf_pages")?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        for (id, text) in &pages {
            tx.execute(
                "INSERT INTO pages_fts (rowid, text_content) VALUES (?1, ?2)",
                params![id, text],
            )?;
        }
        tx.commit()?;
        info!(
            references = references.len(),
            pages = pages.len(),
            "rebuilt lexical indexes"
        );
        Ok(())
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or(0))
        };
        Ok(LibraryStats {
            total_references: count("SELECT COUNT(*) FROM references_")?,
            total_pages: count("SELECT COUNT(*) FROM pdf_pages")?,
            references_with_pages: count("SELECT COUNT(DISTINCT rec_number) FROM pdf_pages")?,
            references_with_embeddings: count("SELECT COUNT(*) FROM reference_embeddings")?,
        })
    }
}

fn write_reference(conn: &Connection, reference: &Reference) -> Result<()> {
    let authors = serde_json::to_string(&reference.authors)?;
    let keywords = serde_json::to_string(&reference.keywords)?;
    conn.execute(
        "INSERT INTO references_ (
            rec_number, ref_type, title, authors, year, journal, volume, issue, pages,
            abstract, keywords, doi, url, publisher, place_published, edition, isbn,
            label, notes, pdf_path
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
         ON CONFLICT(rec_number) DO UPDATE SET
            ref_type = excluded.ref_type,
            title = excluded.title,
            authors = excluded.authors,
            year = excluded.year,
            journal = excluded.journal,
            volume = excluded.volume,
            issue = excluded.issue,
            pages = excluded.pages,
            abstract = excluded.abstract,
            keywords = excluded.keywords,
            doi = excluded.doi,
            url = excluded.url,
            publisher = excluded.publisher,
            place_published = excluded.place_published,
            edition = excluded.edition,
            isbn = excluded.isbn,
            label = excluded.label,
            notes = excluded.notes,
            pdf_path = excluded.pdf_path",
        params![
            reference.rec_number,
            reference.ref_type,
            reference.title,
            authors,
            reference.year,
            reference.journal,
            reference.volume,
            reference.issue,
            reference.pages,
            reference.abstract_text,
            keywords,
            reference.doi,
            reference.url,
            reference.publisher,
            reference.place_published,
            reference.edition,
            reference.isbn,
            reference.label,
            reference.notes,
            reference.pdf_path,
        ],
    )?;
    conn.execute(
        "DELETE FROM references_fts WHERE rowid = ?1",
        [reference.rec_number],
    )?;
    index_reference(conn, reference)
}

/// Project a reference into `references_fts`. Column order fixes the BM25
/// weight positions used by metadata search.
fn index_reference(conn: &Connection, reference: &Reference) -> Result<()> {
    conn.execute(
        "INSERT INTO references_fts (rowid, title, authors, abstract, keywords, journal)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            reference.rec_number,
            reference.title,
            reference.authors.join("; "),
            reference.abstract_text,
            reference.keywords.join("; "),
            reference.journal,
        ],
    )?;
    Ok(())
}

fn write_page(conn: &Connection, page: &DocumentPage) -> Result<()> {
    if page.page_number == 0 {
        return Err(ShelfError::MalformedInput(format!(
            "page numbers start at 1 (reference {})",
            page.rec_number
        )));
    }
    let id: i64 = conn.query_row(
        "INSERT INTO pdf_pages (rec_number, page_number, text_content) VALUES (?1, ?2, ?3)
         ON CONFLICT(rec_number, page_number) DO UPDATE SET text_content = excluded.text_content
         RETURNING id",
        params![page.rec_number, page.page_number, page.text],
        |row| row.get(0),
    )?;
    conn.execute("DELETE FROM pages_fts WHERE rowid = ?1", [id])?;
    conn.execute(
        "INSERT INTO pages_fts (rowid, text_content) VALUES (?1, ?2)",
        params![id, page.text],
    )?;
    Ok(())
}

/// Map a row selected with [`REFERENCE_COLUMNS`].
pub(crate) fn reference_from_row(row: &Row<'_>) -> rusqlite::Result<Reference> {
    Ok(Reference {
        rec_number: row.get(0)?,
        ref_type: row.get(1)?,
        title: row.get(2)?,
        authors: parse_string_list(&row.get::<_, String>(3)?),
        year: row.get(4)?,
        journal: row.get(5)?,
        volume: row.get(6)?,
        issue: row.get(7)?,
        pages: row.get(8)?,
        abstract_text: row.get(9)?,
        keywords: parse_string_list(&row.get::<_, String>(10)?),
        doi: row.get(11)?,
        url: row.get(12)?,
        publisher: row.get(13)?,
        place_published: row.get(14)?,
        edition: row.get(15)?,
        isbn: row.get(16)?,
        label: row.get(17)?,
        notes: row.get(18)?,
        pdf_path: row.get(19)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(rec_number: i64, title: &str) -> Reference {
        let mut reference = Reference::new(rec_number, title);
        reference.authors = vec!["Bourdieu, P.".to_string()];
        reference.keywords = vec!["capital".to_string()];
        reference.year = "1986".to_string();
        reference
    }

    fn fts_rows(db: &Database, table: &str) -> i64 {
        db.conn()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_database_creation_and_schema_version() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("library.db");
        let db = Database::open(&db_path).unwrap();
        assert!(db_path.exists());
        assert_eq!(db.schema_version(), migrations::SCHEMA_VERSION);
    }

    #[test]
    fn test_wal_mode_enabled() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("library.db")).unwrap();
        let mode: String = db
            .conn()
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_all_tables_created() {
        let db = Database::open_in_memory().unwrap();
        for table in [
            "references_",
            "pdf_pages",
            "reference_embeddings",
            "references_fts",
            "pages_fts",
            "meta",
        ] {
            let exists: i32 = db
                .conn()
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {table} should exist");
        }
    }

    #[test]
    fn test_upsert_and_get_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let mut reference = sample(7, "The Forms of Capital");
        reference.pdf_path = Some("/pdfs/forms.pdf".to_string());
        db.upsert_reference(&reference).unwrap();

        let loaded = db.get_reference(7).unwrap().unwrap();
        assert_eq!(loaded, reference);
        assert!(db.get_reference(8).unwrap().is_none());
    }

    #[test]
    fn test_upsert_keeps_single_index_row() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_reference(&sample(1, "First title")).unwrap();
        db.upsert_reference(&sample(1, "Second title")).unwrap();
        assert_eq!(fts_rows(&db, "references_fts"), 1);
        assert_eq!(db.get_reference(1).unwrap().unwrap().title, "Second title");
    }

    #[test]
    fn test_upsert_keeps_pages_and_embedding() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_reference(&sample(1, "Title")).unwrap();
        db.upsert_page(&DocumentPage::new(1, 1, "page one")).unwrap();
        db.upsert_embedding(1, &[1.0, 0.0], "test").unwrap();

        db.upsert_reference(&sample(1, "Title revised")).unwrap();
        assert_eq!(db.page_count(1).unwrap(), 1);
        assert!(db.get_embedding(1).unwrap().is_some());
    }

    #[test]
    fn test_replace_pages_swaps_index_rows() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_reference(&sample(1, "Title")).unwrap();
        db.replace_pages(
            1,
            &[DocumentPage::new(1, 1, "alpha"), DocumentPage::new(1, 2, "beta")],
        )
        .unwrap();
        db.replace_pages(1, &[DocumentPage::new(1, 1, "gamma")]).unwrap();

        assert_eq!(db.page_count(1).unwrap(), 1);
        assert_eq!(fts_rows(&db, "pages_fts"), 1);
        let pages = db.get_pages(1, 1, 10).unwrap();
        assert_eq!(pages[0].text, "gamma");
    }

    #[test]
    fn test_replace_pages_rejects_foreign_page() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_reference(&sample(1, "Title")).unwrap();
        let err = db
            .replace_pages(1, &[DocumentPage::new(2, 1, "x")])
            .unwrap_err();
        assert!(matches!(err, ShelfError::MalformedInput(_)));
    }

    #[test]
    fn test_page_zero_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_reference(&sample(1, "Title")).unwrap();
        let err = db.upsert_page(&DocumentPage::new(1, 0, "x")).unwrap_err();
        assert!(matches!(err, ShelfError::MalformedInput(_)));
    }

    #[test]
    fn test_delete_cascades() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_reference(&sample(1, "Title")).unwrap();
        db.upsert_page(&DocumentPage::new(1, 1, "text")).unwrap();
        db.upsert_embedding(1, &[0.5, 0.5], "test").unwrap();

        assert!(db.delete_reference(1).unwrap());
        assert!(!db.delete_reference(1).unwrap());
        assert_eq!(db.stats().unwrap(), LibraryStats::default());
        assert_eq!(fts_rows(&db, "references_fts"), 0);
        assert_eq!(fts_rows(&db, "pages_fts"), 0);
    }

    #[test]
    fn test_embedding_normalized_on_write() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_reference(&sample(1, "Title")).unwrap();
        db.upsert_embedding(1, &[3.0, 4.0], "test").unwrap();
        let stored = db.get_embedding(1).unwrap().unwrap();
        assert!((stored[0] - 0.6).abs() < 1e-6);
        assert!((stored[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_embedding_records_dimensions() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_reference(&sample(1, "Title")).unwrap();
        db.upsert_embedding(1, &[1.0, 2.0, 2.0], "test").unwrap();
        let dims: i64 = db
            .conn()
            .query_row(
                "SELECT dims FROM reference_embeddings WHERE rec_number = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(dims, 3);
    }

    #[test]
    fn test_zero_embedding_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_reference(&sample(1, "Title")).unwrap();
        assert!(matches!(
            db.upsert_embedding(1, &[0.0, 0.0], "test"),
            Err(ShelfError::MalformedInput(_))
        ));
        assert!(matches!(
            db.upsert_embedding(1, &[], "test"),
            Err(ShelfError::MalformedInput(_))
        ));
        assert!(!db.has_embeddings().unwrap());
    }

    #[test]
    fn test_stats_and_clear_all() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_references(&[sample(1, "A"), sample(2, "B")]).unwrap();
        db.replace_pages(1, &[DocumentPage::new(1, 1, "x"), DocumentPage::new(1, 2, "y")])
            .unwrap();
        db.upsert_embedding(2, &[1.0], "test").unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_references, 2);
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.references_with_pages, 1);
        assert_eq!(stats.references_with_embeddings, 1);
        assert_eq!(db.references_without_embeddings().unwrap().len(), 1);

        db.clear_all().unwrap();
        assert_eq!(db.stats().unwrap(), LibraryStats::default());
    }

    #[test]
    fn test_rebuild_indexes_restores_search_results() {
        use crate::model::SearchFilters;
        use crate::search::lexical::{search_fulltext, search_metadata};

        let db = crate::test_utils::fixtures::sample_library();
        let filters = SearchFilters::default();
        let metadata = |db: &Database| {
            (
                search_metadata(db, "capital", &filters, 10).unwrap(),
                search_metadata(db, "habitus", &filters, 10).unwrap(),
            )
        };
        let fulltext = |db: &Database| {
            (
                search_fulltext(db, "grounded theory", 10, 3).unwrap(),
                search_fulltext(db, "habitus", 10, 3).unwrap(),
            )
        };
        let metadata_before = metadata(&db);
        let fulltext_before = fulltext(&db);
        assert!(!metadata_before.0.is_empty() && !metadata_before.1.is_empty());
        assert!(!fulltext_before.0.is_empty() && !fulltext_before.1.is_empty());

        db.conn()
            .execute_batch("DELETE FROM references_fts; DELETE FROM pages_fts;")
            .unwrap();
        let (capital, habitus) = metadata(&db);
        assert!(capital.is_empty() && habitus.is_empty());
        let (grounded, habitus_pages) = fulltext(&db);
        assert!(grounded.is_empty() && habitus_pages.is_empty());

        db.rebuild_indexes().unwrap();
        assert_eq!(metadata(&db), metadata_before);
        assert_eq!(fulltext(&db), fulltext_before);
    }
}
