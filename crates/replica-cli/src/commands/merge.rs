//! Merge command implementation

use std::path::Path;

use replica_merge::{Granularity, MergeOutcome, merge_bytes};

use crate::error::{CliError, Result};

/// Run the merge command
///
/// Prints the merged text, or writes it to `output`. Overlapping edits
/// surface as [`CliError::Conflict`].
pub fn run_merge(
    ancestor: &Path,
    ours: &Path,
    theirs: &Path,
    lines: bool,
    output: Option<&Path>,
) -> Result<()> {
    let granularity = if lines {
        Granularity::Lines
    } else {
        Granularity::Chars
    };
    let merged = merge_files(ancestor, ours, theirs, granularity)?;

    match output {
        Some(path) => std::fs::write(path, merged)?,
        None => print!("{merged}"),
    }
    Ok(())
}

fn merge_files(ancestor: &Path, ours: &Path, theirs: &Path, granularity: Granularity) -> Result<String> {
    let ancestor = std::fs::read(ancestor)?;
    let ours = std::fs::read(ours)?;
    let theirs = std::fs::read(theirs)?;

    match merge_bytes(&ancestor, &ours, &theirs, granularity)? {
        MergeOutcome::Merged(text) => Ok(text),
        MergeOutcome::Conflict { ours, theirs } => {
            tracing::debug!(?ours, ?theirs, "Overlapping edits");
            Err(CliError::Conflict { ours, theirs })
        }
    }
}
