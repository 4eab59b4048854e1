//! City-name similarity: scored (0..=100) and prefix matching.

use serde::{Deserialize, Serialize};

/// String similarity metric used by ratio matching. All scores are 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// Indel ratio: `(|a| + |b| - indel_distance) / (|a| + |b|)`.
    #[default]
    Indel,
    JaroWinkler,
    /// Normalized Levenshtein (substitution cost 1).
    Levenshtein,
}

impl Scorer {
    /// Score two strings. Empty input always scores 0.
    pub fn score(&self, a: &str, b: &str) -> u8 {
        if a.is_empty() || b.is_empty() {
            return 0;
        }
        match self {
            Self::Indel => indel_ratio(a, b),
            Self::JaroWinkler => scale(strsim::jaro_winkler(a, b)),
            Self::Levenshtein => scale(strsim::normalized_levenshtein(a, b)),
        }
    }
}

impl std::fmt::Display for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indel => write!(f, "indel"),
            Self::JaroWinkler => write!(f, "jaro_winkler"),
            Self::Levenshtein => write!(f, "levenshtein"),
        }
    }
}

fn scale(ratio: f64) -> u8 {
    (ratio * 100.0).round_ties_even().clamp(0.0, 100.0) as u8
}

/// Edit-based ratio (insertions/deletions only), rounded half-to-even.
/// `indel_ratio("a", "ab") == 67`.
pub fn indel_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 0;
    }
    let lcs = lcs_len(&a, &b);
    scale((2 * lcs) as f64 / total as f64)
}

/// Longest common subsequence length, two-row DP.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Best candidate by score. A candidate wins only with a score strictly above
/// `min_score` and strictly above the best so far, so ties keep the earlier one.
pub fn best_ratio_match<S: AsRef<str>>(
    name: &str,
    candidates: &[S],
    scorer: Scorer,
    min_score: u8,
) -> Option<(usize, u8)> {
    let mut best: Option<(usize, u8)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let score = scorer.score(name, candidate.as_ref());
        log::trace!("ratio {name:?} vs {:?}: {score}", candidate.as_ref());
        if score > min_score && best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    best
}

/// Closest candidate by indel ratio, with any positive score accepted.
pub fn fuzzy_match<'a, S: AsRef<str>>(name: &str, candidates: &'a [S]) -> Option<(&'a str, u8)> {
    best_ratio_match(name, candidates, Scorer::Indel, 0).map(|(i, score)| (candidates[i].as_ref(), score))
}

/// First candidate where either string is a prefix of the other.
pub fn find_prefix<S: AsRef<str>>(name: &str, candidates: &[S]) -> Option<usize> {
    if name.is_empty() {
        return None;
    }
    candidates.iter().position(|c| {
        let c = c.as_ref();
        !c.is_empty() && (name.starts_with(c) || c.starts_with(name))
    })
}

pub fn prefix_match<'a, S: AsRef<str>>(name: &str, candidates: &'a [S]) -> Option<&'a str> {
    find_prefix(name, candidates).map(|i| candidates[i].as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_match_is_order_sensitive_on_ties() {
        let mut names = vec!["ab", "ba"];
        assert_eq!(fuzzy_match("a", &names), Some(("ab", 67)));
        names.reverse();
        assert_eq!(fuzzy_match("a", &names), Some(("ba", 67)));
    }

    #[test]
    fn prefix_match_either_direction() {
        let mut names = vec!["ab", "ba"];
        assert_eq!(prefix_match("a", &names), Some("ab"));
        names.reverse();
        assert_eq!(prefix_match("a", &names), Some("ab"));
        assert_eq!(prefix_match("sunnyvale city", &["sunnyvale"]), Some("sunnyvale"));
        assert_eq!(prefix_match("x", &["ab"]), None);
    }

    #[test]
    fn empty_strings_never_match() {
        assert_eq!(prefix_match("", &["abc"]), None);
        assert_eq!(prefix_match("abc", &[""]), None);
        assert_eq!(fuzzy_match("", &["abc"]), None);
        assert_eq!(Scorer::JaroWinkler.score("", ""), 0);
    }

    #[test]
    fn indel_ratio_values() {
        assert_eq!(indel_ratio("abc", "abc"), 100);
        assert_eq!(indel_ratio("abc", "xyz"), 0);
        assert_eq!(indel_ratio("4", "4."), 67);
        // 2 * 3 / 8 = 0.75
        assert_eq!(indel_ratio("abcd", "abce"), 75);
        // 2 * 1 / 16 = 12.5 -> rounds to even
        assert_eq!(indel_ratio("axxxxxxx", "abbbbbbb"), 12);
    }

    #[test]
    fn min_score_is_exclusive() {
        assert_eq!(best_ratio_match("a", &["ab"], Scorer::Indel, 67), None);
        assert_eq!(best_ratio_match("a", &["ab"], Scorer::Indel, 66), Some((0, 67)));
    }

    #[test]
    fn strsim_scorers_are_scaled() {
        assert_eq!(Scorer::Levenshtein.score("kitten", "sitting"), 57);
        assert_eq!(Scorer::JaroWinkler.score("martha", "martha"), 100);
        assert!(Scorer::JaroWinkler.score("dallas", "dalas") > 90);
    }
}
