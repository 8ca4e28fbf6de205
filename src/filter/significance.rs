//! The persist/skip decision.

use super::diff;

/// Edits touching at most this many `+`/`-` lines are treated as noise.
pub const NOISE_THRESHOLD: usize = 2;

/// Why a save was not persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// First snapshot of a file with a single line of content.
    TooShort,
    /// Identical to the latest version.
    Duplicate,
    /// Too few changed lines.
    BelowThreshold { changed: usize },
}

/// Outcome of [`evaluate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Persist,
    Skip(SkipReason),
}

impl Decision {
    pub fn should_persist(&self) -> bool {
        matches!(self, Decision::Persist)
    }
}

/// Decide whether `candidate` deserves a new version.
///
/// `previous` is the content of the file's newest version, if it has one.
/// Duplicates are skipped even when `save_all_changes` is set.
pub fn evaluate(previous: Option<&str>, candidate: &str, save_all_changes: bool) -> Decision {
    let Some(previous) = previous else {
        if save_all_changes || candidate.contains('\n') {
            return Decision::Persist;
        }
        return Decision::Skip(SkipReason::TooShort);
    };

    if previous == candidate {
        return Decision::Skip(SkipReason::Duplicate);
    }

    if save_all_changes {
        return Decision::Persist;
    }

    let changed = diff::stats(previous, candidate).changed();
    if changed <= NOISE_THRESHOLD {
        Decision::Skip(SkipReason::BelowThreshold { changed })
    } else {
        Decision::Persist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_save_single_line_skipped() {
        assert_eq!(
            evaluate(None, "just one line", false),
            Decision::Skip(SkipReason::TooShort)
        );
    }

    #[test]
    fn test_first_save_single_line_with_save_all() {
        assert_eq!(evaluate(None, "just one line", true), Decision::Persist);
    }

    #[test]
    fn test_first_save_two_lines_persisted() {
        assert_eq!(evaluate(None, "a\nb", false), Decision::Persist);
        assert_eq!(evaluate(None, "a\nb", true), Decision::Persist);
    }

    #[test]
    fn test_duplicate_always_skipped() {
        let content = "line 1\nline 2\n";
        assert_eq!(
            evaluate(Some(content), content, false),
            Decision::Skip(SkipReason::Duplicate)
        );
        assert_eq!(
            evaluate(Some(content), content, true),
            Decision::Skip(SkipReason::Duplicate)
        );
    }

    #[test]
    fn test_one_changed_line_is_noise() {
        assert_eq!(
            evaluate(Some("a\nb\nc"), "a\nx\nc", false),
            Decision::Skip(SkipReason::BelowThreshold { changed: 2 })
        );
        assert_eq!(evaluate(Some("a\nb\nc"), "a\nx\nc", true), Decision::Persist);
    }

    #[test]
    fn test_two_changed_lines_persisted() {
        assert_eq!(evaluate(Some("a\nb\nc"), "a\nx\ny", false), Decision::Persist);
    }

    #[test]
    fn test_appending_a_line_is_noise() {
        assert!(!evaluate(Some("a\nb"), "a\nb\nc", false).should_persist());
    }

    proptest! {
        #[test]
        fn prop_identical_never_persisted(content in ".*", save_all in any::<bool>()) {
            prop_assert!(!evaluate(Some(&content), &content, save_all).should_persist());
        }

        #[test]
        fn prop_save_all_persists_any_difference(
            previous in "[a-c\n]{0,20}",
            candidate in "[a-c\n]{0,20}",
        ) {
            prop_assume!(previous != candidate);
            prop_assert!(evaluate(Some(&previous), &candidate, true).should_persist());
        }

        #[test]
        fn prop_three_new_lines_always_significant(
            lines in proptest::collection::vec("[a-z]{1,8}", 1..10),
        ) {
            let previous = lines.join("\n");
            let candidate = format!("{}\n#1\n#2\n#3", previous);
            prop_assert!(evaluate(Some(&previous), &candidate, false).should_persist());
        }
    }
}
