//! Combine metadata and fulltext results into one list.
//!
//! References matched in both domains rank first, then metadata-only
//! matches, then fulltext-only matches. Within a bucket the original
//! domain order is kept. Scores from the two domains are never compared.

use std::collections::HashMap;

use crate::model::{FulltextHit, LibraryHit, MatchSource, ReferenceSummary};

#[must_use]
pub fn merge(
    metadata: Vec<ReferenceSummary>,
    fulltext: Vec<FulltextHit>,
    limit: usize,
) -> Vec<LibraryHit> {
    let mut by_rec: HashMap<i64, usize> = fulltext
        .iter()
        .enumerate()
        .map(|(idx, hit)| (hit.summary.rec_number, idx))
        .collect();
    let mut fulltext: Vec<Option<FulltextHit>> = fulltext.into_iter().map(Some).collect();

    let mut both = Vec::new();
    let mut metadata_only = Vec::new();
    for summary in metadata {
        let matched = by_rec
            .remove(&summary.rec_number)
            .and_then(|idx| fulltext[idx].take());
        match matched {
            Some(hit) => both.push(LibraryHit {
                summary,
                snippets: hit.snippets,
                source: MatchSource::Both,
            }),
            None => metadata_only.push(LibraryHit {
                summary,
                snippets: Vec::new(),
                source: MatchSource::Metadata,
            }),
        }
    }

    let fulltext_only = fulltext.into_iter().flatten().map(|hit| LibraryHit {
        summary: hit.summary,
        snippets: hit.snippets,
        source: MatchSource::Fulltext,
    });

    both.into_iter()
        .chain(metadata_only)
        .chain(fulltext_only)
        .take(limit)
        .collect()
}
