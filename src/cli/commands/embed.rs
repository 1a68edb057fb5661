//! refshelf embed - Compute reference embeddings

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::emit;
use crate::error::{Result, ShelfError};
use crate::ingest::embed_references;

#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Re-embed every reference, replacing stored vectors
    #[arg(long)]
    pub force: bool,
}

pub fn run(ctx: &AppContext, args: &EmbedArgs) -> Result<()> {
    let embedder = ctx.embedder.as_deref().ok_or_else(|| {
        ShelfError::Config(format!(
            "no embedding encoder available (search.use_embeddings = {}, backend = {:?})",
            ctx.config.search.use_embeddings, ctx.config.search.embedding_backend
        ))
    })?;
    let report = embed_references(&ctx.db, embedder, args.force)?;

    emit(ctx.output_mode, &report, |layout| {
        layout
            .section("Embeddings updated")
            .kv("model", &report.model_name)
            .kv("embedded", &report.embedded.to_string())
            .kv("skipped", &report.skipped.to_string());
    })
}
