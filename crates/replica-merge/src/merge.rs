//! Three-way merge

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::decode::decode_text;
use crate::edit::{Edit, edit_script};
use crate::Result;

/// Unit the edit scripts are computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Individual characters
    #[default]
    Chars,
    /// Whole lines, including their terminator
    Lines,
}

/// Result of a three-way merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Both sides' changes combined without overlap.
    Merged(String),
    /// The two sides changed the same region of the ancestor differently.
    ///
    /// Ranges are in ancestor tokens (characters or lines).
    Conflict {
        ours: Range<usize>,
        theirs: Range<usize>,
    },
}

impl MergeOutcome {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// The merged text, if there was no conflict.
    pub fn merged(&self) -> Option<&str> {
        match self {
            Self::Merged(text) => Some(text),
            Self::Conflict { .. } => None,
        }
    }
}

/// Merge character by character.
pub fn merge(ancestor: &str, ours: &str, theirs: &str) -> MergeOutcome {
    merge_with(ancestor, ours, theirs, Granularity::Chars)
}

/// Merge at the given granularity.
pub fn merge_with(
    ancestor: &str,
    ours: &str,
    theirs: &str,
    granularity: Granularity,
) -> MergeOutcome {
    if ours == theirs || theirs == ancestor {
        return MergeOutcome::Merged(ours.to_string());
    }
    if ours == ancestor {
        return MergeOutcome::Merged(theirs.to_string());
    }

    let base = tokenize(ancestor, granularity);
    let our_edits = edit_script(&base, &tokenize(ours, granularity));
    let their_edits = edit_script(&base, &tokenize(theirs, granularity));

    let outcome = apply_both(&base, &our_edits, &their_edits);
    if let MergeOutcome::Conflict { ours, theirs } = &outcome {
        tracing::debug!(?ours, ?theirs, ?granularity, "Overlapping edits");
    }
    outcome
}

/// Decode three byte versions and merge them.
///
/// # Errors
///
/// Returns [`crate::Error::Decode`] when any version is binary or not UTF-8.
pub fn merge_bytes(
    ancestor: &[u8],
    ours: &[u8],
    theirs: &[u8],
    granularity: Granularity,
) -> Result<MergeOutcome> {
    let ancestor = decode_text(ancestor, "ancestor")?;
    let ours = decode_text(ours, "ours")?;
    let theirs = decode_text(theirs, "theirs")?;
    Ok(merge_with(ancestor, ours, theirs, granularity))
}

fn tokenize(text: &str, granularity: Granularity) -> Vec<&str> {
    match granularity {
        Granularity::Chars => text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect(),
        Granularity::Lines => text.split_inclusive('\n').collect(),
    }
}

/// Walk both edit lists in start order, applying each edit once.
///
/// An edit reaching back into ancestor text already consumed conflicts with
/// the last edit applied from the other side.
fn apply_both(base: &[&str], ours: &[Edit], theirs: &[Edit]) -> MergeOutcome {
    let mut out = String::new();
    let mut pos = 0;
    let (mut i, mut j) = (0, 0);
    let (mut last_ours, mut last_theirs) = (0..0, 0..0);

    loop {
        let (next, from_ours) = match (ours.get(i), theirs.get(j)) {
            (None, None) => break,
            (Some(a), None) => {
                i += 1;
                (a, true)
            }
            (None, Some(b)) => {
                j += 1;
                (b, false)
            }
            (Some(a), Some(b)) if a.start == b.start && a == b => {
                // Convergent edit
                i += 1;
                j += 1;
                last_theirs = b.start..b.end;
                (a, true)
            }
            (Some(a), Some(b)) if a.overlaps(b) => {
                return MergeOutcome::Conflict {
                    ours: a.start..a.end,
                    theirs: b.start..b.end,
                };
            }
            (Some(a), Some(b)) => {
                if a.start < b.start {
                    i += 1;
                    (a, true)
                } else {
                    j += 1;
                    (b, false)
                }
            }
        };

        let range = next.start..next.end;
        if next.start < pos {
            let (ours, theirs) = if from_ours {
                (range, last_theirs)
            } else {
                (last_ours, range)
            };
            return MergeOutcome::Conflict { ours, theirs };
        }

        out.push_str(&base[pos..next.start].concat());
        out.push_str(&next.new_text);
        pos = next.end;
        if from_ours {
            last_ours = range;
        } else {
            last_theirs = range;
        }
    }

    out.push_str(&base[pos..].concat());
    MergeOutcome::Merged(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::same_both_sides("base", "new", "new", "new")]
    #[case::only_theirs_changed("base", "base", "new", "new")]
    #[case::only_ours_changed("base", "new", "base", "new")]
    fn fast_paths(
        #[case] ancestor: &str,
        #[case] ours: &str,
        #[case] theirs: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(merge(ancestor, ours, theirs), MergeOutcome::Merged(expected.into()));
    }

    #[test]
    fn disjoint_edits_compose() {
        assert_eq!(merge("abc", "Xbc", "abY"), MergeOutcome::Merged("XbY".into()));
    }

    #[test]
    fn same_position_different_text_conflicts() {
        let outcome = merge("abc", "Xbc", "Ybc");
        assert!(outcome.is_conflict());
        assert_eq!(outcome.merged(), None);
    }

    #[test]
    fn convergent_edits_apply_once() {
        assert_eq!(
            merge("hello world", "hello brave world", "hello brave world!"),
            MergeOutcome::Merged("hello brave world!".into())
        );
    }

    #[test]
    fn insertion_inside_replaced_range_conflicts() {
        // Ours rewrites the middle, theirs inserts inside it
        let outcome = merge("one two three", "one 2 three", "one tw-o three");
        assert!(outcome.is_conflict());
    }

    #[test]
    fn adjacent_edits_do_not_conflict() {
        assert_eq!(merge("abcd", "Xbcd", "aYcd"), MergeOutcome::Merged("XYcd".into()));
    }

    #[test]
    fn line_granularity_merges_separate_lines() {
        let ancestor = "alpha\nbeta\ngamma\n";
        let ours = "ALPHA\nbeta\ngamma\n";
        let theirs = "alpha\nbeta\ngamma\ndelta\n";
        assert_eq!(
            merge_with(ancestor, ours, theirs, Granularity::Lines),
            MergeOutcome::Merged("ALPHA\nbeta\ngamma\ndelta\n".into())
        );
    }

    #[test]
    fn line_granularity_conflicts_on_same_line() {
        let ancestor = "alpha\nbeta\n";
        let outcome = merge_with(ancestor, "alpha\nBETA\n", "alpha\nbeta!\n", Granularity::Lines);
        assert!(outcome.is_conflict());
    }

    #[test]
    fn multibyte_characters_are_single_tokens() {
        assert_eq!(
            merge("äbc", "äbcé", "Äbc"),
            MergeOutcome::Merged("Äbcé".into())
        );
    }

    #[test]
    fn interleaved_char_edits_do_not_panic() {
        let outcome = merge("bba", "a\naa\n", "a\n");
        assert_eq!(merge("bba", "a\naa\n", "a\n"), outcome);
        assert_eq!(
            merge_with("bba", "a\naa\n", "a\n", Granularity::Lines),
            merge_with("bba", "a\naa\n", "a\n", Granularity::Lines)
        );
    }

    #[test]
    fn edit_behind_the_cursor_conflicts() {
        let base = ["a", "b", "c", "d"];
        let edit = |start, end, text: &str| Edit {
            start,
            end,
            new_text: text.into(),
        };
        let ours = [edit(0, 2, ""), edit(1, 1, "x")];

        assert_eq!(
            apply_both(&base, &ours, &[]),
            MergeOutcome::Conflict {
                ours: 1..1,
                theirs: 0..0
            }
        );
    }

    #[test]
    fn merge_bytes_rejects_binary() {
        let err = merge_bytes(b"a", b"a\0b", b"c", Granularity::Chars).unwrap_err();
        assert!(err.to_string().contains("ours"));
    }

    #[test]
    fn merge_bytes_decodes_and_merges() {
        let outcome = merge_bytes(b"abc", b"Xbc", b"abY", Granularity::Chars).unwrap();
        assert_eq!(outcome.merged(), Some("XbY"));
    }
}
