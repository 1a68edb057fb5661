//! refshelf fulltext - Search extracted page text

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::formatters::results::render_fulltext;
use crate::cli::output::emit;
use crate::error::Result;
use crate::model::FulltextHit;

#[derive(Args, Debug)]
pub struct FulltextArgs {
    /// Search query
    pub query: String,

    /// Maximum number of references (defaults to search.default_limit)
    #[arg(long, short)]
    pub limit: Option<usize>,

    /// Snippets shown per reference (defaults to search.max_snippets_per_reference)
    #[arg(long)]
    pub snippets: Option<usize>,
}

#[derive(Serialize)]
struct FulltextOutput<'a> {
    query: &'a str,
    count: usize,
    results: Vec<FulltextHit>,
}

pub fn run(ctx: &AppContext, args: &FulltextArgs) -> Result<()> {
    let search = &ctx.config.search;
    let results = ctx.library().search_fulltext(
        &args.query,
        args.limit.unwrap_or(search.default_limit),
        args.snippets.unwrap_or(search.max_snippets_per_reference),
    )?;

    let output = FulltextOutput {
        query: &args.query,
        count: results.len(),
        results,
    };
    emit(ctx.output_mode, &output, |layout| {
        render_fulltext(
            layout,
            &format!("{} document(s) mention \"{}\"", output.count, output.query),
            &output.results,
        );
    })
}
