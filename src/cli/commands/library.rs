//! refshelf library - Combined metadata and page-text search

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::commands::search::FilterArgs;
use crate::cli::formatters::results::render_library;
use crate::cli::output::emit;
use crate::error::Result;
use crate::model::LibraryHit;

#[derive(Args, Debug)]
pub struct LibraryArgs {
    /// Search query
    pub query: String,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Maximum number of results (defaults to search.library_limit)
    #[arg(long, short)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct LibraryOutput<'a> {
    query: &'a str,
    count: usize,
    results: Vec<LibraryHit>,
}

pub fn run(ctx: &AppContext, args: &LibraryArgs) -> Result<()> {
    let limit = args.limit.unwrap_or(ctx.config.search.library_limit);
    let results = ctx
        .library()
        .search_library(&args.query, &args.filters.to_filters(), limit)?;

    let output = LibraryOutput {
        query: &args.query,
        count: results.len(),
        results,
    };
    emit(ctx.output_mode, &output, |layout| {
        render_library(
            layout,
            &format!("{} result(s) for \"{}\"", output.count, output.query),
            &output.results,
        );
    })
}
