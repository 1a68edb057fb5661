//! refshelf import - Load references and page text from a JSON export
//!
//! Expected shape:
//!
//! ```json
//! {
//!   "references": [{"rec_number": 1, "title": "...", "authors": ["..."]}],
//!   "pages": [{"rec_number": 1, "page_number": 1, "text": "..."}]
//! }
//! ```

use std::path::PathBuf;

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::emit;
use crate::error::Result;
use crate::ingest::{ImportDocument, import_document};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON file produced by the extraction step
    pub path: PathBuf,

    /// Clear the library before importing
    #[arg(long)]
    pub replace: bool,
}

pub fn run(ctx: &AppContext, args: &ImportArgs) -> Result<()> {
    let doc = ImportDocument::from_path(&args.path)?;
    let report = import_document(&ctx.db, &doc, args.replace)?;

    emit(ctx.output_mode, &report, |layout| {
        layout
            .section("Import complete")
            .kv("references", &report.references.to_string())
            .kv("pages", &report.pages.to_string())
            .kv("with pages", &report.references_with_pages.to_string());
        if report.skipped_pages > 0 {
            layout.kv(
                "skipped pages",
                &format!("{} (unknown reference)", report.skipped_pages),
            );
        }
    })
}
