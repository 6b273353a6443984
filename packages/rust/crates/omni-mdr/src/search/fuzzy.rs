//! Pluggable approximate matching.

use std::fmt;

/// Scores one pattern against one field.
///
/// Scores live in `0.0..=1.0`, `0.0` being a perfect match. `None` means
/// the pattern does not occur in the text within the scorer's tolerance.
pub trait FuzzyScorer: Send + Sync + fmt::Debug {
    /// Score lowercased `pattern` against lowercased `text`.
    fn score(&self, pattern: &[char], text: &[char]) -> Option<f64>;
}

/// Best substring edit distance, normalized by pattern length.
///
/// A field matches when some substring of it is within
/// `floor(threshold * pattern_len)` edits of the pattern. Match position
/// inside the field does not affect the score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproximateScorer {
    threshold: f64,
}

impl ApproximateScorer {
    /// Scorer accepting up to `threshold` errors per pattern character.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn max_errors(&self, pattern_len: usize) -> usize {
        (self.threshold * pattern_len as f64).floor() as usize
    }
}

impl Default for ApproximateScorer {
    fn default() -> Self {
        Self::new(0.3)
    }
}

impl FuzzyScorer for ApproximateScorer {
    #[allow(clippy::cast_precision_loss)]
    fn score(&self, pattern: &[char], text: &[char]) -> Option<f64> {
        let m = pattern.len();
        if m == 0 {
            return None;
        }
        if m <= text.len() && text.windows(m).any(|window| window == pattern) {
            return Some(0.0);
        }
        let k = self.max_errors(m).min(m - 1);
        if k == 0 {
            return None;
        }
        let errors = min_substring_distance(pattern, text, k)?;
        Some(errors as f64 / m as f64)
    }
}

/// Smallest edit distance between `pattern` and any substring of `text`,
/// if it is at most `k`. Column-wise dynamic programming with a cutoff on
/// the last row that can still be within `k`.
fn min_substring_distance(pattern: &[char], text: &[char], k: usize) -> Option<usize> {
    let m = pattern.len();
    let mut column: Vec<usize> = (0..=m).collect();
    let mut last_active = (k + 1).min(m);
    let mut best: Option<usize> = None;

    for &ch in text {
        let mut diagonal = 0usize;
        let mut left = 0usize;
        for i in 1..=last_active {
            let up = column[i];
            let value = if pattern[i - 1] == ch {
                diagonal
            } else {
                1 + diagonal.min(left).min(up)
            };
            diagonal = up;
            column[i] = value;
            left = value;
        }
        while column[last_active] > k {
            last_active -= 1;
        }
        if last_active == m {
            let errors = column[m];
            best = Some(best.map_or(errors, |current: usize| current.min(errors)));
            if errors == 0 {
                break;
            }
        } else {
            last_active += 1;
            column[last_active] = column[last_active].max(k + 1);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn exact_substring_scores_zero() {
        let scorer = ApproximateScorer::default();
        assert_eq!(scorer.score(&chars("welcome"), &chars("# welcome home")), Some(0.0));
    }

    #[test]
    fn one_typo_in_long_word_is_tolerated() {
        let scorer = ApproximateScorer::default();
        let score = scorer.score(&chars("welcme"), &chars("say welcome to all"));
        assert!(matches!(score, Some(s) if s > 0.0 && s <= 0.3));
    }

    #[test]
    fn unrelated_text_does_not_match() {
        let scorer = ApproximateScorer::default();
        assert_eq!(scorer.score(&chars("zebra"), &chars("welcome home")), None);
    }

    #[test]
    fn distance_matches_brute_force_on_small_cases() {
        assert_eq!(min_substring_distance(&chars("abcd"), &chars("xxabxdxx"), 2), Some(1));
        assert_eq!(min_substring_distance(&chars("abcd"), &chars("xxxx"), 1), None);
        assert_eq!(min_substring_distance(&chars("abc"), &chars("ab"), 1), Some(1));
    }
}
