//! refshelf semantic - Embedding similarity search

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::formatters::results::render_semantic;
use crate::cli::output::{HumanLayout, OutputMode, emit_human, emit_robot, robot_ok};
use crate::error::Result;
use crate::model::SemanticHit;

#[derive(Args, Debug)]
pub struct SemanticArgs {
    /// Natural-language description of what to find
    pub query: String,

    /// Maximum number of results (defaults to search.related_limit)
    #[arg(long, short)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct SemanticOutput<'a> {
    query: &'a str,
    available: bool,
    count: usize,
    results: Vec<SemanticHit>,
}

pub fn run(ctx: &AppContext, args: &SemanticArgs) -> Result<()> {
    let library = ctx.library();
    let limit = args.limit.unwrap_or(ctx.config.search.related_limit);
    let available = library.embeddings_available() && ctx.db.has_embeddings()?;
    let results = library.search_semantic(&args.query, limit)?;

    let output = SemanticOutput {
        query: &args.query,
        available,
        count: results.len(),
        results,
    };

    let mut warnings = Vec::new();
    if !available {
        warnings.push(
            "semantic search unavailable: enable search.use_embeddings and run `refshelf embed`"
                .to_string(),
        );
    }

    match ctx.output_mode {
        OutputMode::Robot => emit_robot(&robot_ok(&output).with_warnings(warnings)),
        OutputMode::Human => {
            let mut layout = HumanLayout::new();
            for warning in &warnings {
                layout.push_line(format!("warning: {warning}"));
            }
            render_semantic(
                &mut layout,
                &format!("{} result(s) similar to \"{}\"", output.count, output.query),
                &output.results,
            );
            emit_human(layout);
            Ok(())
        }
    }
}
