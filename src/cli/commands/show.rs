//! refshelf show - Full details for one or more references

use clap::Args;
use serde::Serialize;
use tracing::debug;

use crate::app::AppContext;
use crate::cli::formatters::results::render_detail;
use crate::cli::output::emit;
use crate::error::Result;
use crate::model::{ReferenceDetail, parse_rec_numbers};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Comma-separated record numbers, e.g. 12,45,78
    pub rec_numbers: String,
}

#[derive(Serialize)]
struct ShowOutput {
    count: usize,
    references: Vec<ReferenceDetail>,
    missing: Vec<i64>,
}

pub fn run(ctx: &AppContext, args: &ShowArgs) -> Result<()> {
    let requested = parse_rec_numbers(&args.rec_numbers)?;
    let references = ctx.library().get_references(&requested)?;
    let missing = missing_ids(&requested, &references);
    debug!(requested = requested.len(), missing = missing.len(), "detail lookup");

    let output = ShowOutput {
        count: references.len(),
        references,
        missing,
    };
    emit(ctx.output_mode, &output, |layout| {
        for detail in &output.references {
            render_detail(layout, detail);
        }
        if !output.missing.is_empty() {
            let ids: Vec<String> = output.missing.iter().map(ToString::to_string).collect();
            layout.push_line(format!("Not in library: {}", ids.join(", ")));
        }
    })
}

/// Requested identifiers with no detail record, in request order, once each.
pub(crate) fn missing_ids(requested: &[i64], found: &[ReferenceDetail]) -> Vec<i64> {
    let mut missing = Vec::new();
    for rec in requested {
        let present = found.iter().any(|d| d.reference.rec_number == *rec);
        if !present && !missing.contains(rec) {
            missing.push(*rec);
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Reference;

    #[test]
    fn test_missing_ids() {
        let found = vec![ReferenceDetail {
            reference: Reference::new(2, "x"),
            indexed_pages: 0,
        }];
        assert_eq!(missing_ids(&[1, 2, 3, 1], &found), vec![1, 3]);
    }
}
