use refshelf::config::SearchConfig;
use refshelf::ingest::embed_references;
use refshelf::model::{MatchSource, SearchFilters};
use refshelf::search::embeddings::HashEmbedder;
use refshelf::search::{Library, RelatedVia};
use refshelf::test_utils::fixtures::sample_library;
use refshelf::test_utils::{TestCase, run_table_tests};

fn recs<T>(hits: &[T], rec: impl Fn(&T) -> i64) -> Vec<i64> {
    hits.iter().map(rec).collect()
}

#[test]
fn test_metadata_search_with_filters() {
    let db = sample_library();
    let settings = SearchConfig::default();
    let library = Library::new(&db, &settings, 30, None);

    let cases = vec![
        TestCase {
            name: "keyword only in metadata",
            input: ("habitus", SearchFilters::default()),
            expected: vec![5],
        },
        TestCase {
            name: "author filter",
            input: ("capital", SearchFilters::default().author("bourdieu")),
            expected: vec![5],
        },
        TestCase {
            name: "year range",
            input: ("capital", SearchFilters::default().years(Some(1980), Some(1985))),
            expected: vec![1],
        },
        TestCase {
            name: "year bounds inclusive at both ends",
            input: ("capital", SearchFilters::default().years(Some(1982), Some(1986))),
            expected: vec![1, 5],
        },
        TestCase {
            name: "single year",
            input: ("capital", SearchFilters::default().years(Some(1986), Some(1986))),
            expected: vec![5],
        },
        TestCase {
            name: "lower bound only",
            input: ("capital", SearchFilters::default().years(Some(1988), None)),
            expected: vec![4],
        },
        TestCase {
            name: "upper bound only",
            input: ("capital", SearchFilters::default().years(None, Some(1982))),
            expected: vec![1],
        },
        TestCase {
            name: "reference type",
            input: ("capital", SearchFilters::default().ref_type("journal")),
            expected: vec![1, 4],
        },
        TestCase {
            name: "no match",
            input: ("photosynthesis", SearchFilters::default()),
            expected: vec![],
        },
        TestCase {
            name: "blank query",
            input: ("   ", SearchFilters::default()),
            expected: vec![],
        },
    ];

    run_table_tests(cases, |(query, filters)| {
        let mut found = recs(
            &library.search_metadata(query, &filters, 10).unwrap(),
            |s| s.rec_number,
        );
        found.sort_unstable();
        found
    })
    .unwrap();
}

#[test]
fn test_title_outranks_journal_match() {
    let db = sample_library();
    let settings = SearchConfig::default();
    let library = Library::new(&db, &settings, 30, None);

    // Title plus keyword beats abstract plus keyword.
    let hits = library
        .search_metadata("qualitative", &SearchFilters::default(), 10)
        .unwrap();
    assert_eq!(recs(&hits, |s| s.rec_number), vec![3, 2]);

    // Journal names are searchable too.
    let hits = library
        .search_metadata("review", &SearchFilters::default(), 10)
        .unwrap();
    assert_eq!(recs(&hits, |s| s.rec_number), vec![1]);
}

#[test]
fn test_fulltext_groups_pages_by_reference() {
    let db = sample_library();
    let settings = SearchConfig::default();
    let library = Library::new(&db, &settings, 30, None);

    let hits = library.search_fulltext("grounded theory", 10, 3).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].summary.rec_number, 2);
    assert_eq!(hits[0].snippets.len(), 2);
    assert!(hits[0].snippets.iter().all(|s| s.snippet.contains(">>>")));

    let capped = library.search_fulltext("grounded theory", 10, 1).unwrap();
    assert_eq!(capped[0].snippets.len(), 1);

    let habitus = library.search_fulltext("habitus", 10, 3).unwrap();
    assert_eq!(habitus.len(), 1);
    assert_eq!(habitus[0].summary.rec_number, 1);
    assert_eq!(habitus[0].snippets[0].page, 2);
    assert!(habitus[0].snippets[0].snippet.contains(">>>habitus<<<"));
}

#[test]
fn test_library_search_orders_by_match_source() {
    let db = sample_library();
    let settings = SearchConfig::default();
    let library = Library::new(&db, &settings, 30, None);

    let hits = library
        .search_library("habitus", &SearchFilters::default(), 10)
        .unwrap();
    let order: Vec<(i64, MatchSource)> = hits
        .iter()
        .map(|h| (h.summary.rec_number, h.source))
        .collect();
    assert_eq!(
        order,
        vec![(5, MatchSource::Metadata), (1, MatchSource::Fulltext)]
    );
    assert!(hits[0].snippets.is_empty());
    assert!(!hits[1].snippets.is_empty());

    let hits = library
        .search_library("cultural capital", &SearchFilters::default(), 10)
        .unwrap();
    assert_eq!(hits[0].summary.rec_number, 1);
    assert_eq!(hits[0].source, MatchSource::Both);
    assert!(hits.iter().all(|h| h.summary.rec_number != 1 || h.source == MatchSource::Both));

    let limited = library
        .search_library("habitus", &SearchFilters::default(), 1)
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn test_related_falls_back_to_keywords_then_uses_embeddings() {
    let db = sample_library();
    let settings = SearchConfig::default();
    let embedder = HashEmbedder::default();
    let library = Library::new(&db, &settings, 30, Some(&embedder));

    let related = library.find_related(2, 5).unwrap();
    assert_eq!(related.via, RelatedVia::Keywords);
    let found = recs(&related.hits, |h| h.summary.rec_number);
    assert!(found.contains(&3));
    assert!(!found.contains(&2));

    let report = embed_references(&db, &embedder, false).unwrap();
    assert_eq!(report.embedded, 5);

    let related = library.find_related(2, 5).unwrap();
    assert_eq!(related.via, RelatedVia::Embeddings);
    assert!(related.hits.iter().all(|h| h.summary.rec_number != 2));
    assert!(related.hits.iter().all(|h| h.similarity.is_some()));
}

#[test]
fn test_semantic_search_after_embedding() {
    let db = sample_library();
    let settings = SearchConfig::default();
    let embedder = HashEmbedder::default();
    let library = Library::new(&db, &settings, 30, Some(&embedder));

    assert!(library.search_semantic("grounded theory", 5).unwrap().is_empty());

    embed_references(&db, &embedder, false).unwrap();
    let hits = library.search_semantic("grounded theory", 5).unwrap();
    assert_eq!(hits[0].summary.rec_number, 2);
    assert!(
        hits.windows(2)
            .all(|pair| pair[0].similarity >= pair[1].similarity)
    );
}
