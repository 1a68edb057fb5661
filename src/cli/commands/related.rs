//! refshelf related - References similar to a given one

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::formatters::results::render_related;
use crate::cli::output::emit;
use crate::error::{Result, ShelfError};
use crate::search::RelatedResults;

#[derive(Args, Debug)]
pub struct RelatedArgs {
    /// Record number of the seed reference
    pub rec_number: i64,

    /// Maximum number of results (defaults to search.related_limit)
    #[arg(long, short)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct RelatedOutput {
    rec_number: i64,
    #[serde(flatten)]
    related: RelatedResults,
}

pub fn run(ctx: &AppContext, args: &RelatedArgs) -> Result<()> {
    let library = ctx.library();
    if library.get_reference(args.rec_number)?.is_none() {
        return Err(ShelfError::NotFound(format!(
            "reference {} is not in the library",
            args.rec_number
        )));
    }
    let limit = args.limit.unwrap_or(ctx.config.search.related_limit);
    let related = library.find_related(args.rec_number, limit)?;

    let output = RelatedOutput {
        rec_number: args.rec_number,
        related,
    };
    emit(ctx.output_mode, &output, |layout| {
        render_related(layout, output.rec_number, &output.related);
    })
}
