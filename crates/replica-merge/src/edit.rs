//! Edit scripts anchored to the ancestor

use similar::{Algorithm, DiffTag, capture_diff_slices_deadline};
use std::time::{Duration, Instant};

/// Upper bound on time spent finding a minimal diff; past it the diff is
/// still correct, just coarser.
const DIFF_DEADLINE: Duration = Duration::from_secs(2);

/// Replacement of the ancestor tokens `start..end` with `new_text`.
///
/// `start == end` is a pure insertion before token `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
    pub start: usize,
    pub end: usize,
    pub new_text: String,
}

impl Edit {
    /// Whether two edits touch the same part of the ancestor.
    ///
    /// Edits starting at the same token always overlap, as does an edit
    /// starting strictly inside the other's range.
    pub fn overlaps(&self, other: &Edit) -> bool {
        let (first, second) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        first.start == second.start || second.start < first.end
    }
}

/// Ordered, non-overlapping edits turning `base` into `other`.
///
/// Edits are the gaps between the matched runs of the diff, so they are
/// sorted by ancestor position and separated by at least one kept token.
/// A matched run out of step with the runs before it is treated as changed.
pub(crate) fn edit_script(base: &[&str], other: &[&str]) -> Vec<Edit> {
    let ops = capture_diff_slices_deadline(
        Algorithm::Myers,
        base,
        other,
        Some(Instant::now() + DIFF_DEADLINE),
    );

    let matched = ops
        .iter()
        .filter(|op| op.tag() == DiffTag::Equal)
        .map(|op| (op.old_range(), op.new_range()));
    let end = (base.len()..base.len(), other.len()..other.len());

    let mut edits = Vec::new();
    let (mut old_pos, mut new_pos) = (0, 0);
    for (old, new) in matched.chain(std::iter::once(end)) {
        if old.start < old_pos || new.start < new_pos {
            continue;
        }
        if old.start > old_pos || new.start > new_pos {
            edits.push(Edit {
                start: old_pos,
                end: old.start,
                new_text: other[new_pos..new.start].concat(),
            });
        }
        old_pos = old.end;
        new_pos = new.end;
    }
    edits
}
