//! Human-readable rendering of search results and reference details.

use console::style;

use crate::cli::output::HumanLayout;
use crate::model::{
    FulltextHit, LibraryHit, LibraryStats, MatchSource, ReferenceDetail, ReferenceSummary,
    SemanticHit, Snippet,
};
use crate::search::snippet::{MATCH_END, MATCH_START};
use crate::search::{PageRead, RelatedResults, RelatedVia};

/// `[12] Title (Smith & Jones, 2001) | Journal`
#[must_use]
pub fn summary_line(summary: &ReferenceSummary) -> String {
    let year = if summary.year.is_empty() {
        "n.d."
    } else {
        summary.year.as_str()
    };
    let mut line = format!(
        "[{}] {} ({}, {year})",
        summary.rec_number,
        style(&summary.title).bold(),
        summary.authors
    );
    if !summary.journal.is_empty() {
        line.push_str(" | ");
        line.push_str(&summary.journal);
    }
    line
}

/// Replace match delimiters with terminal emphasis.
#[must_use]
pub fn styled_snippet(snippet: &str) -> String {
    let mut out = String::with_capacity(snippet.len());
    let mut rest = snippet;
    while let Some(start) = rest.find(MATCH_START) {
        out.push_str(&rest[..start]);
        let after = &rest[start + MATCH_START.len()..];
        match after.find(MATCH_END) {
            Some(end) => {
                out.push_str(&style(&after[..end]).yellow().bold().to_string());
                rest = &after[end + MATCH_END.len()..];
            }
            None => {
                out.push_str(after);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn render_snippets(layout: &mut HumanLayout, snippets: &[Snippet]) {
    for snippet in snippets {
        layout.push_line(format!(
            "    p.{}: {}",
            snippet.page,
            styled_snippet(&snippet.snippet)
        ));
    }
}

fn empty(layout: &mut HumanLayout, what: &str) {
    layout.push_line(style(format!("No {what} found.")).dim().to_string());
}

pub fn render_summaries(layout: &mut HumanLayout, heading: &str, hits: &[ReferenceSummary]) {
    layout.section(heading);
    if hits.is_empty() {
        empty(layout, "references");
        return;
    }
    for hit in hits {
        layout.bullet(&summary_line(hit));
    }
}

pub fn render_fulltext(layout: &mut HumanLayout, heading: &str, hits: &[FulltextHit]) {
    layout.section(heading);
    if hits.is_empty() {
        empty(layout, "matching pages");
        return;
    }
    for hit in hits {
        layout.bullet(&summary_line(&hit.summary));
        render_snippets(layout, &hit.snippets);
    }
}

pub fn render_library(layout: &mut HumanLayout, heading: &str, hits: &[LibraryHit]) {
    layout.section(heading);
    if hits.is_empty() {
        empty(layout, "references");
        return;
    }
    for hit in hits {
        let tag = match hit.source {
            MatchSource::Both => "metadata+text",
            MatchSource::Metadata => "metadata",
            MatchSource::Fulltext => "text",
        };
        layout.bullet(&format!(
            "{} {}",
            summary_line(&hit.summary),
            style(format!("[{tag}]")).dim()
        ));
        render_snippets(layout, &hit.snippets);
    }
}

pub fn render_semantic(layout: &mut HumanLayout, heading: &str, hits: &[SemanticHit]) {
    layout.section(heading);
    if hits.is_empty() {
        empty(layout, "similar references");
        return;
    }
    for hit in hits {
        layout.bullet(&format!(
            "{} {}",
            summary_line(&hit.summary),
            style(format!("({:.3})", hit.similarity)).dim()
        ));
    }
}

pub fn render_related(layout: &mut HumanLayout, rec_number: i64, related: &RelatedResults) {
    let via = match related.via {
        RelatedVia::Embeddings => "embeddings",
        RelatedVia::Keywords => "shared keywords",
    };
    layout.section(&format!("Related to [{rec_number}] (via {via})"));
    if related.hits.is_empty() {
        empty(layout, "related references");
        return;
    }
    for hit in &related.hits {
        let line = match hit.similarity {
            Some(similarity) => format!(
                "{} {}",
                summary_line(&hit.summary),
                style(format!("({similarity:.3})")).dim()
            ),
            None => summary_line(&hit.summary),
        };
        layout.bullet(&line);
    }
}

pub fn render_detail(layout: &mut HumanLayout, detail: &ReferenceDetail) {
    let reference = &detail.reference;
    layout.section(&format!("[{}] {}", reference.rec_number, reference.title));
    let fields: [(&str, String); 12] = [
        ("type", reference.ref_type.clone()),
        ("authors", reference.authors.join("; ")),
        ("year", reference.year.clone()),
        ("journal", reference.journal.clone()),
        ("volume/issue", join_nonempty(&[&reference.volume, &reference.issue], "/")),
        ("pages", reference.pages.clone()),
        ("publisher", join_nonempty(&[&reference.publisher, &reference.place_published], ", ")),
        ("doi", reference.doi.clone()),
        ("url", reference.url.clone()),
        ("isbn", reference.isbn.clone()),
        ("keywords", reference.keywords.join(", ")),
        ("indexed pages", detail.indexed_pages.to_string()),
    ];
    for (key, value) in &fields {
        if !value.is_empty() {
            layout.kv(key, value);
        }
    }
    if !reference.abstract_text.is_empty() {
        layout.blank().push_line(reference.abstract_text.clone());
    }
    layout.blank();
}

pub fn render_pages(layout: &mut HumanLayout, read: &PageRead) {
    layout.section(&format!(
        "Reference [{}], pages {}-{}",
        read.rec_number, read.start, read.end
    ));
    if read.pages.is_empty() {
        empty(layout, "stored pages in this range");
        return;
    }
    for page in &read.pages {
        layout
            .push_line(style(format!("--- page {} ---", page.page_number)).dim().to_string())
            .push_line(page.text.clone())
            .blank();
    }
    if read.capped {
        layout.push_line(
            style("Range capped; request the following pages separately.")
                .dim()
                .to_string(),
        );
    }
}

pub fn render_stats(layout: &mut HumanLayout, stats: &LibraryStats) {
    layout
        .section("Library")
        .kv("references", &stats.total_references.to_string())
        .kv("pages", &stats.total_pages.to_string())
        .kv("with pages", &stats.references_with_pages.to_string())
        .kv("with embeddings", &stats.references_with_embeddings.to_string());
}

fn join_nonempty(parts: &[&String], sep: &str) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(sep)
}
