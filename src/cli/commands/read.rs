//! refshelf read - Stored page text of a reference's document

use clap::Args;

use crate::app::AppContext;
use crate::cli::formatters::results::render_pages;
use crate::cli::output::emit;
use crate::error::{Result, ShelfError};

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Record number of the reference
    pub rec_number: i64,

    /// First page (1-based)
    #[arg(long, default_value_t = 1)]
    pub start: u32,

    /// Last page, inclusive (capped by library.max_pages_per_read)
    #[arg(long)]
    pub end: Option<u32>,
}

pub fn run(ctx: &AppContext, args: &ReadArgs) -> Result<()> {
    let library = ctx.library();
    if library.get_reference(args.rec_number)?.is_none() {
        return Err(ShelfError::NotFound(format!(
            "reference {} is not in the library",
            args.rec_number
        )));
    }
    let read = library.read_pages(args.rec_number, args.start, args.end)?;
    emit(ctx.output_mode, &read, |layout| render_pages(layout, &read))
}
