//! Keyword-derived relatedness for libraries without embeddings.
//!
//! The seed's keywords and the first few meaningful title words become an OR
//! query against the metadata domain. A heuristic, not a relevance model.

use tracing::debug;

use crate::error::Result;
use crate::model::{Reference, ReferenceSummary, SearchFilters};
use crate::search::{lexical, query};
use crate::storage::Database;

/// Title words taken after stop-word filtering.
pub const MAX_TITLE_TERMS: usize = 8;

/// Function words plus academic filler that says nothing about topic.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "again", "against", "all", "also", "among", "an", "and", "any",
    "are", "as", "at", "be", "been", "before", "being", "between", "both", "but", "by",
    "can", "could", "did", "do", "does", "during", "each", "few", "for", "from", "had",
    "has", "have", "how", "if", "in", "into", "is", "it", "its", "more", "most", "new",
    "not", "of", "on", "or", "other", "our", "over", "should", "some", "such", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "those",
    "through", "to", "under", "using", "via", "was", "we", "were", "what", "when", "where",
    "which", "while", "who", "why", "will", "with", "within", "without", "would",
    // academic filler
    "analysis", "approach", "approaches", "case", "evidence", "review", "study", "studies",
    "toward", "towards", "understanding",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Title words worth searching for, in title order, at most
/// [`MAX_TITLE_TERMS`]. Surrounding punctuation is trimmed; the original
/// casing is kept.
#[must_use]
pub fn meaningful_title_words(title: &str) -> Vec<String> {
    title
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| word.chars().count() > 2 && !is_stop_word(&word.to_lowercase()))
        .take(MAX_TITLE_TERMS)
        .map(ToString::to_string)
        .collect()
}

/// Keywords verbatim, then meaningful title words.
#[must_use]
pub fn related_terms(seed: &Reference) -> Vec<String> {
    seed.keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .chain(meaningful_title_words(&seed.title))
        .collect()
}

/// References sharing vocabulary with the seed, best first, seed excluded.
/// Unknown seeds and seeds with nothing to search for give no results.
pub fn find_related_by_keywords(
    db: &Database,
    rec_number: i64,
    limit: usize,
) -> Result<Vec<ReferenceSummary>> {
    let Some(seed) = db.get_reference(rec_number)? else {
        return Ok(Vec::new());
    };
    let terms = related_terms(&seed);
    let Some(expr) = query::match_any(&terms) else {
        debug!(rec_number, "no usable terms for keyword relatedness");
        return Ok(Vec::new());
    };
    debug!(rec_number, terms = terms.len(), "keyword relatedness query");
    lexical::rank_references(db, &expr, &SearchFilters::default(), Some(rec_number), limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meaningful_title_words() {
        assert_eq!(
            meaningful_title_words("A Study of the Habitus: Analysis, Field and Capital"),
            vec!["Habitus", "Field", "Capital"]
        );
        assert!(meaningful_title_words("An analysis of it").is_empty());
    }

    #[test]
    fn test_title_words_capped() {
        let title = "alpha bravo charlie delta echo foxtrot golf hotel india juliet";
        let words = meaningful_title_words(title);
        assert_eq!(words.len(), MAX_TITLE_TERMS);
        assert_eq!(words[0], "alpha");
        assert_eq!(words[7], "hotel");
    }

    #[test]
    fn test_related_terms_keywords_first() {
        let mut seed = Reference::new(1, "Reproduction in education");
        seed.keywords = vec!["cultural capital".to_string(), " ".to_string()];
        assert_eq!(
            related_terms(&seed),
            vec!["cultural capital", "Reproduction", "education"]
        );
    }

    #[test]
    fn test_generic_seed_returns_empty() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_reference(&Reference::new(1, "A study of it")).unwrap();
        db.upsert_reference(&Reference::new(2, "A study of that")).unwrap();
        assert!(find_related_by_keywords(&db, 1, 5).unwrap().is_empty());
        assert!(find_related_by_keywords(&db, 42, 5).unwrap().is_empty());
    }

    #[test]
    fn test_excludes_seed() {
        let db = Database::open_in_memory().unwrap();
        let mut seed = Reference::new(1, "Supply chain resilience");
        seed.keywords = vec!["logistics".to_string()];
        db.upsert_reference(&seed).unwrap();
        db.upsert_reference(&Reference::new(2, "Global supply networks")).unwrap();
        db.upsert_reference(&Reference::new(3, "Bird migration")).unwrap();

        let hits = find_related_by_keywords(&db, 1, 10).unwrap();
        let recs: Vec<i64> = hits.iter().map(|h| h.rec_number).collect();
        assert_eq!(recs, vec![2]);
    }
}
