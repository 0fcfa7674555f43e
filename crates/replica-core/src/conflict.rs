//! Per-path conflict handling
//!
//! A conflicted path has three possible versions: the ancestor at the
//! checkpoint revision, ours from the local replica and theirs from the
//! remote head. Any of them may be missing. Deciding what to do is pure;
//! the reconciler performs the resulting writes.

use chrono::{DateTime, Utc};

use replica_merge::{Granularity, MergeOutcome, merge_bytes};

/// Timestamp format embedded in conflict artifact names.
const ARTIFACT_STAMP: &str = "%Y%m%dT%H%M%S";

/// Outcome for one conflicted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Both edits combined; write locally and upload.
    Merged(Vec<u8>),
    /// Keep ours in place and upload it; theirs goes next to it.
    SideBySide {
        artifact_path: String,
        theirs: Vec<u8>,
    },
    /// Ours is gone; take theirs.
    TakeTheirs(Vec<u8>),
    /// Theirs is gone; keep ours and upload it.
    KeepOurs,
    /// Deleted on both sides.
    BothRemoved,
}

/// Where theirs is written when a path cannot be merged.
///
/// `notes/plan.md` at 2024-05-01 12:30:00 becomes
/// `notes/plan.conflict-20240501T123000.md`. A leading dot does not start
/// an extension, so `.env` becomes `.env.conflict-20240501T123000`.
pub fn artifact_path(path: &str, at: DateTime<Utc>) -> String {
    let stamp = at.format(ARTIFACT_STAMP);
    let (dir, name) = match path.rfind('/') {
        Some(idx) => (&path[..=idx], &path[idx + 1..]),
        None => ("", path),
    };

    match name.rfind('.') {
        Some(dot) if dot > 0 => {
            let (stem, ext) = (&name[..dot], &name[dot + 1..]);
            format!("{dir}{stem}.conflict-{stamp}.{ext}")
        }
        _ => format!("{dir}{name}.conflict-{stamp}"),
    }
}

/// Decide the outcome for a conflicted path.
///
/// A missing ancestor, undecodable content or overlapping edits all end in
/// [`ConflictResolution::SideBySide`].
pub fn resolve_conflict(
    path: &str,
    ancestor: Option<&[u8]>,
    ours: Option<&[u8]>,
    theirs: Option<&[u8]>,
    granularity: Granularity,
    now: DateTime<Utc>,
) -> ConflictResolution {
    let (ours, theirs) = match (ours, theirs) {
        (None, None) => return ConflictResolution::BothRemoved,
        (None, Some(theirs)) => return ConflictResolution::TakeTheirs(theirs.to_vec()),
        (Some(_), None) => return ConflictResolution::KeepOurs,
        (Some(ours), Some(theirs)) => (ours, theirs),
    };

    if ours == theirs {
        return ConflictResolution::Merged(ours.to_vec());
    }

    let side_by_side = || ConflictResolution::SideBySide {
        artifact_path: artifact_path(path, now),
        theirs: theirs.to_vec(),
    };

    let Some(ancestor) = ancestor else {
        tracing::debug!(path, "No common ancestor");
        return side_by_side();
    };

    match merge_bytes(ancestor, ours, theirs, granularity) {
        Ok(MergeOutcome::Merged(text)) => ConflictResolution::Merged(text.into_bytes()),
        Ok(MergeOutcome::Conflict { .. }) => side_by_side(),
        Err(e) => {
            tracing::debug!(path, error = %e, "Content is not mergeable");
            side_by_side()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[rstest]
    #[case("plan.md", "plan.conflict-20240501T123000.md")]
    #[case("notes/plan.md", "notes/plan.conflict-20240501T123000.md")]
    #[case("archive.tar.gz", "archive.tar.conflict-20240501T123000.gz")]
    #[case("Makefile", "Makefile.conflict-20240501T123000")]
    #[case("dir.v2/README", "dir.v2/README.conflict-20240501T123000")]
    #[case(".env", ".env.conflict-20240501T123000")]
    fn artifact_names(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(artifact_path(path, at()), expected);
    }

    fn decide(ancestor: Option<&str>, ours: Option<&str>, theirs: Option<&str>) -> ConflictResolution {
        resolve_conflict(
            "a.md",
            ancestor.map(str::as_bytes),
            ours.map(str::as_bytes),
            theirs.map(str::as_bytes),
            Granularity::Chars,
            at(),
        )
    }

    #[test]
    fn disjoint_edits_merge() {
        assert_eq!(
            decide(Some("abc"), Some("Xbc"), Some("abY")),
            ConflictResolution::Merged(b"XbY".to_vec())
        );
    }

    #[test]
    fn overlapping_edits_go_side_by_side() {
        assert_eq!(
            decide(Some("abc"), Some("Xbc"), Some("Ybc")),
            ConflictResolution::SideBySide {
                artifact_path: "a.conflict-20240501T123000.md".into(),
                theirs: b"Ybc".to_vec(),
            }
        );
    }

    #[test]
    fn missing_ancestor_is_not_mergeable() {
        assert!(matches!(
            decide(None, Some("ours"), Some("theirs")),
            ConflictResolution::SideBySide { .. }
        ));
    }

    #[test]
    fn identical_versions_need_no_merge() {
        assert_eq!(
            decide(None, Some("same"), Some("same")),
            ConflictResolution::Merged(b"same".to_vec())
        );
    }

    #[test]
    fn binary_content_is_not_mergeable() {
        let outcome = resolve_conflict(
            "img.png",
            Some(&b"\x89PNG\0a"[..]),
            Some(&b"\x89PNG\0b"[..]),
            Some(&b"\x89PNG\0c"[..]),
            Granularity::Chars,
            at(),
        );
        assert!(matches!(outcome, ConflictResolution::SideBySide { .. }));
    }

    #[rstest]
    #[case::ours_removed(None, Some("theirs"), ConflictResolution::TakeTheirs(b"theirs".to_vec()))]
    #[case::theirs_removed(Some("ours"), None, ConflictResolution::KeepOurs)]
    #[case::both_removed(None, None, ConflictResolution::BothRemoved)]
    fn removals(
        #[case] ours: Option<&str>,
        #[case] theirs: Option<&str>,
        #[case] expected: ConflictResolution,
    ) {
        assert_eq!(decide(Some("base"), ours, theirs), expected);
    }
}
