//! Loading references and page text into the store, and computing
//! embeddings for them.
//!
//! XML and PDF parsing happen upstream; this module consumes their output as
//! a JSON document of references and pages.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ShelfError};
use crate::model::{DocumentPage, Reference};
use crate::search::embeddings::{Embedder, build_search_text};
use crate::storage::Database;

/// Interchange format produced by the extraction step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportDocument {
    pub references: Vec<Reference>,
    pub pages: Vec<DocumentPage>,
}

impl ImportDocument {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|err| {
            ShelfError::MalformedInput(format!("{}: {err}", path.display()))
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub references: usize,
    pub pages: usize,
    pub references_with_pages: usize,
    /// Pages naming a reference that is neither imported nor stored.
    pub skipped_pages: usize,
}

/// Upsert every reference, then replace the stored pages of each reference
/// that has pages in the document. With `replace`, the library is emptied
/// first.
pub fn import_document(db: &Database, doc: &ImportDocument, replace: bool) -> Result<ImportReport> {
    if replace {
        db.clear_all()?;
    }

    let mut report = ImportReport {
        references: db.upsert_references(&doc.references)?,
        ..ImportReport::default()
    };

    let mut by_reference: BTreeMap<i64, Vec<DocumentPage>> = BTreeMap::new();
    for page in &doc.pages {
        by_reference
            .entry(page.rec_number)
            .or_default()
            .push(page.clone());
    }

    for (rec_number, mut pages) in by_reference {
        if !db.reference_exists(rec_number)? {
            warn!(
                rec_number,
                pages = pages.len(),
                "skipping pages for unknown reference"
            );
            report.skipped_pages += pages.len();
            continue;
        }
        pages.sort_by_key(|page| page.page_number);
        pages.dedup_by_key(|page| page.page_number);
        report.pages += db.replace_pages(rec_number, &pages)?;
        report.references_with_pages += 1;
    }

    info!(
        references = report.references,
        pages = report.pages,
        skipped_pages = report.skipped_pages,
        "import finished"
    );
    Ok(report)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmbedReport {
    pub model_name: String,
    pub embedded: usize,
    /// References with no embeddable text.
    pub skipped: usize,
}

/// Embed references that have no vector yet, or every reference with
/// `force` (stale vectors are cleared first).
pub fn embed_references(db: &Database, embedder: &dyn Embedder, force: bool) -> Result<EmbedReport> {
    let pending = if force {
        db.clear_embeddings()?;
        db.all_references()?
    } else {
        db.references_without_embeddings()?
    };

    let mut report = EmbedReport {
        model_name: embedder.model_name().to_string(),
        ..EmbedReport::default()
    };
    for reference in &pending {
        let vector = embedder.embed(&build_search_text(reference))?;
        if vector.iter().all(|x| *x == 0.0) {
            report.skipped += 1;
            continue;
        }
        db.upsert_embedding(reference.rec_number, &vector, embedder.model_name())?;
        report.embedded += 1;
    }

    info!(
        model = %report.model_name,
        embedded = report.embedded,
        skipped = report.skipped,
        "embedding pass finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::embeddings::HashEmbedder;

    fn doc() -> ImportDocument {
        serde_json::from_str(
            r#"{
                "references": [
                    {"rec_number": 1, "title": "Outline of a Theory of Practice", "authors": ["Bourdieu, P."]},
                    {"rec_number": 2, "title": "", "authors": "[]"}
                ],
                "pages": [
                    {"rec_number": 1, "page_number": 2, "text": "second"},
                    {"rec_number": 1, "page_number": 1, "text_content": "first"},
                    {"rec_number": 9, "page_number": 1, "text": "orphan"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_import_document() {
        let db = Database::open_in_memory().unwrap();
        let report = import_document(&db, &doc(), false).unwrap();
        assert_eq!(
            report,
            ImportReport {
                references: 2,
                pages: 2,
                references_with_pages: 1,
                skipped_pages: 1,
            }
        );
        let pages = db.get_pages(1, 1, 10).unwrap();
        assert_eq!(pages[0].text, "first");
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        import_document(&db, &doc(), false).unwrap();
        import_document(&db, &doc(), false).unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.total_references, 2);
        assert_eq!(stats.total_pages, 2);
    }

    #[test]
    fn test_replace_clears_first() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_reference(&Reference::new(50, "Old")).unwrap();
        import_document(&db, &doc(), true).unwrap();
        assert!(db.get_reference(50).unwrap().is_none());
    }

    #[test]
    fn test_embed_references_skips_empty_text() {
        let db = Database::open_in_memory().unwrap();
        import_document(&db, &doc(), false).unwrap();
        let embedder = HashEmbedder::new(32);

        let report = embed_references(&db, &embedder, false).unwrap();
        assert_eq!(report.embedded, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.model_name, "hash-fnv1a-32");

        let again = embed_references(&db, &embedder, false).unwrap();
        assert_eq!(again.embedded, 0);
        assert_eq!(again.skipped, 1);

        let forced = embed_references(&db, &embedder, true).unwrap();
        assert_eq!(forced.embedded, 1);
    }
}
