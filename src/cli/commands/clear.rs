//! refshelf clear - Empty the library

use clap::Args;
use serde_json::json;

use crate::app::AppContext;
use crate::cli::output::emit;
use crate::error::{Result, ShelfError};

#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Confirm deletion of every reference, page and embedding
    #[arg(long)]
    pub yes: bool,
}

pub fn run(ctx: &AppContext, args: &ClearArgs) -> Result<()> {
    if !args.yes {
        return Err(ShelfError::ValidationFailed(
            "refusing to clear the library without --yes".to_string(),
        ));
    }
    let before = ctx.db.stats()?;
    ctx.db.clear_all()?;

    let output = json!({
        "cleared": true,
        "references": before.total_references,
        "pages": before.total_pages,
        "embeddings": before.references_with_embeddings,
    });
    emit(ctx.output_mode, &output, |layout| {
        layout
            .section("Library cleared")
            .kv("references", &before.total_references.to_string())
            .kv("pages", &before.total_pages.to_string())
            .kv("embeddings", &before.references_with_embeddings.to_string());
    })
}
