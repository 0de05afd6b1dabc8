//! Edit-distance string similarity and the fixed match thresholds.
//!
//! The score of two strings is `(max_len - levenshtein(a, b)) / max_len`
//! over character counts, which is the normalized Levenshtein similarity
//! from the `strsim` crate. The function is symmetric and case-sensitive;
//! callers are expected to normalize case first (see [`crate::normalize`]).

/// Email similarity above this value marks a candidate as interesting.
pub const EMAIL_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Name similarity above this value marks a candidate as interesting.
///
/// Deliberately aggressive: common names will cross it with dissimilar
/// emails. Treat as a deployment tunable rather than business truth.
pub const NAME_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Score assigned to an exact normalized-phone match.
pub const PHONE_MATCH_SCORE: f64 = 0.95;

/// Score reserved for exact case-insensitive email equality.
pub const EXACT_EMAIL_SCORE: f64 = 1.0;

/// Overall score above which the best candidate is flagged as a duplicate.
pub const DUPLICATE_SCORE_CUTOFF: f64 = 0.8;

/// Normalized Levenshtein similarity in `[0, 1]`.
///
/// Two empty strings are identical by definition and score `1.0`.
///
/// ```
/// use stagelink_core::similarity::similarity;
///
/// assert!((similarity("alice", "alice") - 1.0).abs() < f64::EPSILON);
/// assert!(similarity("alice@test.com", "alice@test.co") > 0.9);
/// assert!(similarity("alice", "bob") < 0.3);
/// ```
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Raw Levenshtein edit distance, exposed for diagnostics.
#[must_use]
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_scores_one() {
        for s in ["", "a", "alice@test.com", "Ünïcödé"] {
            assert!((similarity(s, s) - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_symmetry() {
        let pairs = [
            ("alice@test.com", "alice@test.co"),
            ("kitten", "sitting"),
            ("", "abc"),
        ];
        for (a, b) in pairs {
            assert!((similarity(a, b) - similarity(b, a)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_both_empty_is_one() {
        assert!((similarity("", "") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_vs_nonempty_is_zero() {
        assert!(similarity("", "abc").abs() < f64::EPSILON);
    }

    #[test]
    fn test_matches_definition() {
        // kitten -> sitting: distance 3, max_len 7
        let expected = (7.0 - 3.0) / 7.0;
        assert!((similarity("kitten", "sitting") - expected).abs() < 1e-9);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_case_sensitive_by_contract() {
        assert!(similarity("ALICE", "alice") < 1.0);
    }

    #[test]
    fn test_typo_crosses_email_threshold() {
        let score = similarity("alice@test.com", "alice@test.co");
        assert!(score > EMAIL_SIMILARITY_THRESHOLD);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        // One substitution over five characters, regardless of byte width.
        let expected = (5.0 - 1.0) / 5.0;
        assert!((similarity("héllo", "hallo") - expected).abs() < 1e-9);
    }
}
