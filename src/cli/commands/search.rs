//! refshelf search - Ranked metadata search

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::formatters::results::render_summaries;
use crate::cli::output::emit;
use crate::error::Result;
use crate::model::{ReferenceSummary, SearchFilters};

/// Filters shared by the metadata-backed commands.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Earliest publication year (inclusive)
    #[arg(long)]
    pub year_from: Option<i32>,

    /// Latest publication year (inclusive)
    #[arg(long)]
    pub year_to: Option<i32>,

    /// Author name substring (case-insensitive)
    #[arg(long)]
    pub author: Option<String>,

    /// Reference type substring, e.g. "Journal Article" or "book"
    #[arg(long)]
    pub ref_type: Option<String>,
}

impl FilterArgs {
    #[must_use]
    pub fn to_filters(&self) -> SearchFilters {
        SearchFilters {
            year_from: self.year_from,
            year_to: self.year_to,
            author: self.author.clone(),
            ref_type: self.ref_type.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Maximum number of results (defaults to search.default_limit)
    #[arg(long, short)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    count: usize,
    results: Vec<ReferenceSummary>,
}

pub fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let limit = args.limit.unwrap_or(ctx.config.search.default_limit);
    let results = ctx
        .library()
        .search_metadata(&args.query, &args.filters.to_filters(), limit)?;

    let output = SearchOutput {
        query: &args.query,
        count: results.len(),
        results,
    };
    emit(ctx.output_mode, &output, |layout| {
        render_summaries(
            layout,
            &format!("{} result(s) for \"{}\"", output.count, output.query),
            &output.results,
        );
    })
}
