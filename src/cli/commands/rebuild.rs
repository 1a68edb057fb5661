//! refshelf rebuild - Regenerate the lexical indexes

use std::time::Instant;

use serde_json::json;

use crate::app::AppContext;
use crate::cli::output::emit;
use crate::error::Result;

pub fn run(ctx: &AppContext) -> Result<()> {
    let started = Instant::now();
    ctx.db.rebuild_indexes()?;
    let stats = ctx.db.stats()?;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let output = json!({
        "rebuilt": true,
        "references": stats.total_references,
        "pages": stats.total_pages,
        "elapsed_ms": elapsed_ms,
    });
    emit(ctx.output_mode, &output, |layout| {
        layout
            .section("Indexes rebuilt")
            .kv("references", &stats.total_references.to_string())
            .kv("pages", &stats.total_pages.to_string())
            .kv("elapsed", &format!("{elapsed_ms} ms"));
    })
}
