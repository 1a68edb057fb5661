//! refshelf stats - Library statistics

use serde::Serialize;

use crate::app::AppContext;
use crate::cli::formatters::results::render_stats;
use crate::cli::output::emit;
use crate::error::Result;
use crate::model::LibraryStats;

#[derive(Serialize)]
struct StatsOutput {
    #[serde(flatten)]
    stats: LibraryStats,
    db_path: String,
    schema_version: u32,
    embedding_model: Option<String>,
}

pub fn run(ctx: &AppContext) -> Result<()> {
    let output = StatsOutput {
        stats: ctx.library().stats()?,
        db_path: ctx.db_path().display().to_string(),
        schema_version: ctx.db.schema_version(),
        embedding_model: ctx.embedder.as_ref().map(|e| e.model_name().to_string()),
    };
    emit(ctx.output_mode, &output, |layout| {
        render_stats(layout, &output.stats);
        layout
            .kv("database", &output.db_path)
            .kv("schema version", &output.schema_version.to_string())
            .kv(
                "encoder",
                output.embedding_model.as_deref().unwrap_or("disabled"),
            );
    })
}
