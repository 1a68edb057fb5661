//! BM25 search over the two FTS5 domains.
//!
//! Metadata: `references_fts` columns are weighted title 10, authors 5,
//! abstract 3, keywords 8, journal 2. SQLite's `bm25()` is lower-is-better,
//! so results sort ascending.
//!
//! Fulltext: one `pages_fts` row per stored page; matches are grouped back
//! into references.

use std::collections::HashMap;
use std::time::Instant;

use rusqlite::types::Value;
use rusqlite::params_from_iter;
use tracing::debug;

use crate::error::Result;
use crate::model::{FulltextHit, ReferenceSummary, SearchFilters, Snippet};
use crate::search::query;
use crate::search::snippet::{self, HIGHLIGHT_CLOSE, HIGHLIGHT_OPEN};
use crate::storage::Database;
use crate::storage::sqlite::{REFERENCE_COLUMNS, reference_from_row};

const METADATA_RANK: &str = "bm25(references_fts, 10.0, 5.0, 3.0, 8.0, 2.0)";

/// Minimum number of raw page matches pulled before grouping.
const MIN_PAGE_FETCH: usize = 200;

/// Ranked metadata search. Blank queries return nothing.
pub fn search_metadata(
    db: &Database,
    query_text: &str,
    filters: &SearchFilters,
    limit: usize,
) -> Result<Vec<ReferenceSummary>> {
    let Some(expr) = query::match_all(query_text) else {
        return Ok(Vec::new());
    };
    rank_references(db, &expr, filters, None, limit)
}

/// Run a compiled MATCH expression against the metadata domain.
pub(crate) fn rank_references(
    db: &Database,
    match_expr: &str,
    filters: &SearchFilters,
    exclude: Option<i64>,
    limit: usize,
) -> Result<Vec<ReferenceSummary>> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let started = Instant::now();

    let mut sql = format!(
        "SELECT {REFERENCE_COLUMNS}
         FROM references_fts
         JOIN references_ r ON r.rec_number = references_fts.rowid
         WHERE references_fts MATCH ?"
    );
    let mut args: Vec<Value> = vec![Value::Text(match_expr.to_string())];

    if let Some(from) = filters.year_from {
        sql.push_str(" AND trim(r.year) GLOB '[0-9]*' AND CAST(trim(r.year) AS INTEGER) >= ?");
        args.push(Value::Integer(i64::from(from)));
    }
    if let Some(to) = filters.year_to {
        sql.push_str(" AND trim(r.year) GLOB '[0-9]*' AND CAST(trim(r.year) AS INTEGER) <= ?");
        args.push(Value::Integer(i64::from(to)));
    }
    if let Some(author) = non_blank(filters.author.as_deref()) {
        sql.push_str(" AND r.authors LIKE ? ESCAPE '\\'");
        args.push(Value::Text(like_pattern(author)));
    }
    if let Some(ref_type) = non_blank(filters.ref_type.as_deref()) {
        sql.push_str(" AND r.ref_type LIKE ? ESCAPE '\\'");
        args.push(Value::Text(like_pattern(ref_type)));
    }
    if let Some(rec_number) = exclude {
        sql.push_str(" AND r.rec_number != ?");
        args.push(Value::Integer(rec_number));
    }
    sql.push_str(&format!(" ORDER BY {METADATA_RANK}, r.rec_number LIMIT ?"));
    args.push(Value::Integer(clamp_limit(limit)));

    let mut stmt = db.conn().prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args), reference_from_row)?;
    let hits = rows
        .map(|row| row.map(|reference| reference.summary()))
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(
        query = match_expr,
        hits = hits.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "metadata search"
    );
    Ok(hits)
}

/// One page-level match, best first in the order SQLite returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMatch {
    pub rec_number: i64,
    pub page_number: u32,
    pub snippet: String,
}

/// Ranked page-text search grouped by reference.
pub fn search_fulltext(
    db: &Database,
    query_text: &str,
    limit: usize,
    max_snippets: usize,
) -> Result<Vec<FulltextHit>> {
    let Some(expr) = query::match_all(query_text) else {
        return Ok(Vec::new());
    };
    if limit == 0 {
        return Ok(Vec::new());
    }
    let started = Instant::now();
    let fetch = limit.saturating_mul(10).max(MIN_PAGE_FETCH);

    let raw = {
        let mut stmt = db.conn().prepare(
            "SELECT p.rec_number, p.page_number, highlight(pages_fts, 0, ?1, ?2)
             FROM pages_fts
             JOIN pdf_pages p ON p.id = pages_fts.rowid
             WHERE pages_fts MATCH ?3
             ORDER BY bm25(pages_fts), p.rec_number, p.page_number
             LIMIT ?4",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![HIGHLIGHT_OPEN, HIGHLIGHT_CLOSE, expr, clamp_limit(fetch)],
            |row| {
                Ok(PageMatch {
                    rec_number: row.get(0)?,
                    page_number: row.get(1)?,
                    snippet: snippet::excerpt(&row.get::<_, String>(2)?, snippet::DEFAULT_WINDOW),
                })
            },
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };
    let raw_count = raw.len();

    let mut hits = Vec::new();
    for (rec_number, snippets) in group_page_hits(raw, limit, max_snippets) {
        if let Some(reference) = db.get_reference(rec_number)? {
            hits.push(FulltextHit {
                summary: reference.summary(),
                snippets,
            });
        }
    }

    debug!(
        query = %expr,
        raw_pages = raw_count,
        hits = hits.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "fulltext search"
    );
    Ok(hits)
}

/// Group best-first page matches by reference, preserving first-seen order.
/// Each reference keeps at most `max_snippets` snippets in raw order.
#[must_use]
pub fn group_page_hits(
    raw: Vec<PageMatch>,
    limit: usize,
    max_snippets: usize,
) -> Vec<(i64, Vec<Snippet>)> {
    let mut groups: Vec<(i64, Vec<Snippet>)> = Vec::new();
    let mut positions: HashMap<i64, usize> = HashMap::new();

    for hit in raw {
        let idx = *positions.entry(hit.rec_number).or_insert_with(|| {
            groups.push((hit.rec_number, Vec::new()));
            groups.len() - 1
        });
        let snippets = &mut groups[idx].1;
        if snippets.len() < max_snippets {
            snippets.push(Snippet {
                page: hit.page_number,
                snippet: hit.snippet,
            });
        }
    }

    groups.truncate(limit);
    groups
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `%value%` with LIKE wildcards in `value` escaped.
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn clamp_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentPage, Reference};

    fn page(rec_number: i64, page_number: u32) -> PageMatch {
        PageMatch {
            rec_number,
            page_number,
            snippet: format!("p{page_number}"),
        }
    }

    #[test]
    fn test_group_page_hits_first_seen_order_and_cap() {
        let raw = vec![page(2, 5), page(1, 1), page(2, 1), page(2, 9), page(3, 4), page(1, 2)];
        let grouped = group_page_hits(raw, 10, 2);

        let order: Vec<i64> = grouped.iter().map(|(rec, _)| *rec).collect();
        assert_eq!(order, vec![2, 1, 3]);
        let pages: Vec<u32> = grouped[0].1.iter().map(|s| s.page).collect();
        assert_eq!(pages, vec![5, 1]);
        assert_eq!(grouped[1].1.len(), 2);
    }

    #[test]
    fn test_group_page_hits_truncates() {
        let raw = vec![page(1, 1), page(2, 1), page(3, 1)];
        assert_eq!(group_page_hits(raw, 2, 3).len(), 2);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_a\\b"), "%50\\%\\_a\\\\b%");
    }

    fn library() -> Database {
        let db = Database::open_in_memory().unwrap();
        let mut habitus = Reference::new(1, "Distinction and the habitus");
        habitus.authors = vec!["Bourdieu, P.".to_string()];
        habitus.year = "1984".to_string();
        habitus.ref_type = "Book".to_string();
        let mut capital = Reference::new(2, "Capital in the field");
        capital.keywords = vec!["habitus".to_string()];
        capital.year = "2001".to_string();
        capital.ref_type = "Journal Article".to_string();
        let mut abstract_only = Reference::new(3, "Something else");
        abstract_only.abstract_text = "Mentions habitus once.".to_string();
        abstract_only.year = "in press".to_string();
        db.upsert_references(&[habitus, capital, abstract_only]).unwrap();
        db.upsert_page(&DocumentPage::new(3, 1, "The habitus appears here.")).unwrap();
        db
    }

    #[test]
    fn test_metadata_weighting_orders_title_first() {
        let db = library();
        let hits = search_metadata(&db, "habitus", &SearchFilters::default(), 10).unwrap();
        let order: Vec<i64> = hits.iter().map(|h| h.rec_number).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_metadata_filters() {
        let db = library();
        let recent = SearchFilters::default().years(Some(2000), None);
        let hits = search_metadata(&db, "habitus", &recent, 10).unwrap();
        assert_eq!(hits.iter().map(|h| h.rec_number).collect::<Vec<_>>(), vec![2]);

        let by_author = SearchFilters::default().author("bourdieu");
        let hits = search_metadata(&db, "habitus", &by_author, 10).unwrap();
        assert_eq!(hits.iter().map(|h| h.rec_number).collect::<Vec<_>>(), vec![1]);

        let by_type = SearchFilters::default().ref_type("journal");
        let hits = search_metadata(&db, "habitus", &by_type, 10).unwrap();
        assert_eq!(hits.iter().map(|h| h.rec_number).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_blank_and_hostile_queries() {
        let db = library();
        let filters = SearchFilters::default();
        assert!(search_metadata(&db, "   ", &filters, 10).unwrap().is_empty());
        assert!(search_metadata(&db, "\"unbalanced", &filters, 10).is_ok());
        assert!(search_metadata(&db, "NEAR( AND OR", &filters, 10).is_ok());
        assert!(search_fulltext(&db, "", 10, 3).unwrap().is_empty());
    }

    #[test]
    fn test_fulltext_highlights() {
        let db = library();
        let hits = search_fulltext(&db, "habitus", 10, 3).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].summary.rec_number, 3);
        assert_eq!(hits[0].snippets[0].page, 1);
        assert!(hits[0].snippets[0].snippet.contains(">>>habitus<<<"));
    }

    #[test]
    fn test_year_bounds_are_inclusive_and_trimmed() {
        let db = library();
        let mut padded = Reference::new(4, "Habitus revisited");
        padded.year = " 1984 ".to_string();
        db.upsert_references(&[padded]).unwrap();

        let exact = SearchFilters::default().years(Some(1984), Some(1984));
        let hits = search_metadata(&db, "habitus", &exact, 10).unwrap();
        let mut order: Vec<i64> = hits.iter().map(|h| h.rec_number).collect();
        order.sort_unstable();
        assert_eq!(order, vec![1, 4]);

        let span = SearchFilters::default().years(Some(1984), Some(2001));
        let hits = search_metadata(&db, "habitus", &span, 10).unwrap();
        let mut order: Vec<i64> = hits.iter().map(|h| h.rec_number).collect();
        order.sort_unstable();
        assert_eq!(order, vec![1, 2, 4]);
    }

    #[test]
    fn test_fulltext_ignores_literal_arrows_in_page_text() {
        let db = library();
        db.upsert_page(&DocumentPage::new(
            2,
            4,
            "Scores >>> rise <<< sharply, see the doxa discussion.",
        ))
        .unwrap();
        let hits = search_fulltext(&db, "doxa", 10, 3).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].snippets[0].snippet,
            "Scores >>> rise <<< sharply, see the >>>doxa<<< discussion."
        );
    }
}
