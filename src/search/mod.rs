//! Search engine for the reference library
//!
//! Weighted BM25 over metadata, BM25 over page text, bucketed fusion of the
//! two, dense vector similarity, and a keyword fallback for relatedness.
//! [`Library`] is the entry point callers use.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::config::SearchConfig;
use crate::error::{Result, ShelfError};
use crate::model::{
    DocumentPage, FulltextHit, LibraryHit, LibraryStats, ReferenceDetail, ReferenceSummary,
    SearchFilters, SemanticHit,
};
use crate::storage::Database;

pub mod embeddings;
pub mod fusion;
pub mod lexical;
pub mod query;
pub mod related;
pub mod snippet;
pub mod vector;

use embeddings::Embedder;
use vector::VectorIndex;

/// Which strategy produced a relatedness result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedVia {
    Embeddings,
    Keywords,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedHit {
    #[serde(flatten)]
    pub summary: ReferenceSummary,
    /// Present only for embedding-based results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedResults {
    pub via: RelatedVia,
    pub hits: Vec<RelatedHit>,
}

/// Pages returned by [`Library::read_pages`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRead {
    pub rec_number: i64,
    pub start: u32,
    /// Last page requested after capping.
    pub end: u32,
    /// True when the requested range exceeded the per-read cap.
    pub capped: bool,
    pub pages: Vec<DocumentPage>,
}

/// Query facade over one open database.
pub struct Library<'a> {
    db: &'a Database,
    settings: &'a SearchConfig,
    max_pages_per_read: u32,
    embedder: Option<&'a dyn Embedder>,
}

impl<'a> Library<'a> {
    #[must_use]
    pub const fn new(
        db: &'a Database,
        settings: &'a SearchConfig,
        max_pages_per_read: u32,
        embedder: Option<&'a dyn Embedder>,
    ) -> Self {
        Self {
            db,
            settings,
            max_pages_per_read,
            embedder,
        }
    }

    #[must_use]
    pub const fn db(&self) -> &'a Database {
        self.db
    }

    #[must_use]
    pub const fn settings(&self) -> &'a SearchConfig {
        self.settings
    }

    #[must_use]
    pub const fn vectors(&self) -> VectorIndex<'a> {
        VectorIndex::new(self.db)
    }

    /// Whether an encoder is configured for query-time embedding.
    #[must_use]
    pub const fn embeddings_available(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn search_metadata(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<ReferenceSummary>> {
        lexical::search_metadata(self.db, query, filters, limit)
    }

    pub fn search_fulltext(
        &self,
        query: &str,
        limit: usize,
        max_snippets_per_reference: usize,
    ) -> Result<Vec<FulltextHit>> {
        lexical::search_fulltext(self.db, query, limit, max_snippets_per_reference)
    }

    /// Metadata and fulltext combined: both, then metadata-only, then
    /// fulltext-only. A failure in either domain fails the whole call.
    pub fn search_library(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<LibraryHit>> {
        let metadata = self.search_metadata(query, filters, limit)?;
        let fulltext =
            self.search_fulltext(query, limit, self.settings.max_snippets_per_reference)?;
        debug!(
            metadata = metadata.len(),
            fulltext = fulltext.len(),
            "fusing library results"
        );
        Ok(fusion::merge(metadata, fulltext, limit))
    }

    /// Topic browsing over the metadata domain.
    pub fn list_by_topic(
        &self,
        topic: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<ReferenceSummary>> {
        self.search_metadata(topic, filters, limit)
    }

    /// Embed `text` with the configured encoder and search the vector index.
    /// Empty when no encoder is configured or nothing is embedded yet.
    pub fn search_semantic(&self, text: &str, limit: usize) -> Result<Vec<SemanticHit>> {
        let Some(embedder) = self.embedder else {
            debug!("semantic search requested without an encoder");
            return Ok(Vec::new());
        };
        if text.trim().is_empty() || !self.db.has_embeddings()? {
            return Ok(Vec::new());
        }
        let query = embedder.embed(text)?;
        if query.iter().all(|x| *x == 0.0) {
            return Ok(Vec::new());
        }
        self.vectors().search(&query, limit)
    }

    pub fn find_related_by_keywords(
        &self,
        rec_number: i64,
        limit: usize,
    ) -> Result<Vec<ReferenceSummary>> {
        related::find_related_by_keywords(self.db, rec_number, limit)
    }

    /// Vector neighbours when the seed is embedded, keyword overlap otherwise.
    pub fn find_related(&self, rec_number: i64, limit: usize) -> Result<RelatedResults> {
        if self.db.get_embedding(rec_number)?.is_some() {
            let hits = self
                .vectors()
                .find_related(rec_number, limit)?
                .into_iter()
                .map(|hit| RelatedHit {
                    summary: hit.summary,
                    similarity: Some(hit.similarity),
                })
                .collect();
            return Ok(RelatedResults {
                via: RelatedVia::Embeddings,
                hits,
            });
        }
        let hits = self
            .find_related_by_keywords(rec_number, limit)?
            .into_iter()
            .map(|summary| RelatedHit {
                summary,
                similarity: None,
            })
            .collect();
        Ok(RelatedResults {
            via: RelatedVia::Keywords,
            hits,
        })
    }

    pub fn get_reference(&self, rec_number: i64) -> Result<Option<ReferenceDetail>> {
        let Some(reference) = self.db.get_reference(rec_number)? else {
            return Ok(None);
        };
        let indexed_pages = self.db.page_count(rec_number)?;
        Ok(Some(ReferenceDetail {
            reference,
            indexed_pages,
        }))
    }

    /// Details in caller order. Unknown identifiers are dropped and repeats
    /// collapse to their first occurrence.
    pub fn get_references(&self, rec_numbers: &[i64]) -> Result<Vec<ReferenceDetail>> {
        let mut seen = HashSet::with_capacity(rec_numbers.len());
        let mut out = Vec::with_capacity(rec_numbers.len());
        for &rec_number in rec_numbers {
            if !seen.insert(rec_number) {
                continue;
            }
            if let Some(detail) = self.get_reference(rec_number)? {
                out.push(detail);
            }
        }
        Ok(out)
    }

    /// Stored text for pages `start..=end` (1-based). `end` defaults to the
    /// per-read cap and is clamped to it.
    pub fn read_pages(&self, rec_number: i64, start: u32, end: Option<u32>) -> Result<PageRead> {
        if start == 0 {
            return Err(ShelfError::MalformedInput(
                "page numbers start at 1".to_string(),
            ));
        }
        let cap = self.max_pages_per_read.max(1);
        let last_allowed = start.saturating_add(cap - 1);
        let requested_end = end.unwrap_or(last_allowed);
        if requested_end < start {
            return Err(ShelfError::MalformedInput(format!(
                "end page {requested_end} is before start page {start}"
            )));
        }
        let end = requested_end.min(last_allowed);
        let pages = self.db.get_pages(rec_number, start, end)?;
        Ok(PageRead {
            rec_number,
            start,
            end,
            capped: requested_end > end,
            pages,
        })
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        self.db.stats()
    }
}
