//! Merge laws and realistic document merges

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use replica_merge::{Granularity, MergeOutcome, merge, merge_with};
use rstest::rstest;

proptest! {
    #[test]
    fn both_sides_agree(x in ".{0,24}", y in ".{0,24}") {
        prop_assert_eq!(merge(&x, &y, &y), MergeOutcome::Merged(y.clone()));
    }

    #[test]
    fn only_theirs_changed(x in ".{0,24}", y in ".{0,24}") {
        prop_assert_eq!(merge(&x, &x, &y), MergeOutcome::Merged(y.clone()));
    }

    #[test]
    fn only_ours_changed(x in ".{0,24}", y in ".{0,24}") {
        prop_assert_eq!(merge(&x, &y, &x), MergeOutcome::Merged(y.clone()));
    }

    #[test]
    fn merging_arbitrary_edits_is_total_and_deterministic(
        ancestor in "[ab\n]{0,8}",
        ours in "[ab\n]{0,8}",
        theirs in "[ab\n]{0,8}",
    ) {
        for granularity in [Granularity::Chars, Granularity::Lines] {
            let first = merge_with(&ancestor, &ours, &theirs, granularity);
            let second = merge_with(&ancestor, &ours, &theirs, granularity);
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn head_and_tail_edits_both_survive(
        head in "[a-h]{1,8}",
        mid in "[i-p]{1,8}",
        tail in "[q-z]{1,8}",
        ours_head in "[A-M]{1,8}",
        theirs_tail in "[N-Z]{1,8}",
    ) {
        let ancestor = format!("{head}\n{mid}\n{tail}");
        let ours = format!("{ours_head}\n{mid}\n{tail}");
        let theirs = format!("{head}\n{mid}\n{theirs_tail}");

        for granularity in [Granularity::Chars, Granularity::Lines] {
            prop_assert_eq!(
                merge_with(&ancestor, &ours, &theirs, granularity),
                MergeOutcome::Merged(format!("{ours_head}\n{mid}\n{theirs_tail}"))
            );
        }
    }

    #[test]
    fn line_merge_is_symmetric_when_clean(
        head in "[a-h]{1,8}",
        mid in "[i-p]{1,8}",
        tail in "[q-z]{1,8}",
        ours_head in "[A-Z]{1,8}",
        theirs_tail in "[A-Z]{1,8}",
    ) {
        let ancestor = format!("{head}\n{mid}\n{tail}\n");
        let ours = format!("{ours_head}\n{mid}\n{tail}\n");
        let theirs = format!("{head}\n{mid}\n{theirs_tail}\n");

        let forward = merge_with(&ancestor, &ours, &theirs, Granularity::Lines);
        let backward = merge_with(&ancestor, &theirs, &ours, Granularity::Lines);
        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(
            forward,
            MergeOutcome::Merged(format!("{ours_head}\n{mid}\n{theirs_tail}\n"))
        );
    }
}

#[rstest]
#[case::appended_on_both_ends("middle", "start middle", "middle end", "start middle end")]
#[case::deletion_and_edit("keep drop keep", "keep  keep", "KEEP drop keep", "KEEP  keep")]
#[case::empty_ancestor_one_side("", "", "fresh", "fresh")]
fn clean_character_merges(
    #[case] ancestor: &str,
    #[case] ours: &str,
    #[case] theirs: &str,
    #[case] expected: &str,
) {
    assert_eq!(merge(ancestor, ours, theirs), MergeOutcome::Merged(expected.into()));
}

#[rstest]
#[case::same_char_replaced("abc", "Xbc", "Ybc")]
#[case::both_inserted_at_start("abc", "Xabc", "Yabc")]
#[case::delete_versus_edit("abc", "ac", "aYc")]
fn character_conflicts(#[case] ancestor: &str, #[case] ours: &str, #[case] theirs: &str) {
    assert!(merge(ancestor, ours, theirs).is_conflict());
}

#[test]
fn markdown_note_edited_in_two_places() {
    let ancestor = "# Groceries\n\n- milk\n- bread\n- eggs\n";
    let ours = "# Groceries\n\n- oat milk\n- bread\n- eggs\n";
    let theirs = "# Groceries\n\n- milk\n- bread\n- eggs\n- coffee\n";

    let merged = merge_with(ancestor, ours, theirs, Granularity::Lines);
    assert_eq!(
        merged.merged(),
        Some("# Groceries\n\n- oat milk\n- bread\n- eggs\n- coffee\n")
    );
}

#[test]
fn conflict_reports_ancestor_ranges() {
    let ancestor = "one\ntwo\nthree\n";
    let outcome = merge_with(
        ancestor,
        "one\n2\nthree\n",
        "one\nzwei\nthree\n",
        Granularity::Lines,
    );
    match outcome {
        MergeOutcome::Conflict { ours, theirs } => {
            assert_eq!(ours, 1..2);
            assert_eq!(theirs, 1..2);
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}
