use crate::model::{fold_for_match, ApplicationEntry, RankedMatch};
use crate::registry::Snapshot;

pub const MAX_MATCHES: usize = 20;
pub const MATCH_THRESHOLD: u8 = 50;

pub fn find_matches(snapshot: &Snapshot, query: &str) -> Vec<RankedMatch> {
    find_matches_with(snapshot, query, MAX_MATCHES, MATCH_THRESHOLD)
}

/// Empty queries list the registry alphabetically without scoring. Otherwise
/// only scores strictly above `threshold` survive, best first, with ties kept
/// in snapshot order.
pub fn find_matches_with(
    snapshot: &Snapshot,
    query: &str,
    limit: usize,
    threshold: u8,
) -> Vec<RankedMatch> {
    if limit == 0 {
        return Vec::new();
    }

    let trimmed = query.trim();
    if trimmed.is_empty() {
        return snapshot
            .entries()
            .take(limit)
            .map(|entry| RankedMatch {
                entry: entry.clone(),
                score: 100,
            })
            .collect();
    }

    let folded_query = fold_for_match(trimmed);
    let mut scored: Vec<(u8, usize, &ApplicationEntry)> = snapshot
        .entries()
        .enumerate()
        .filter_map(|(index, entry)| {
            let score = partial_ratio_folded(&folded_query, entry.folded_name());
            (score > threshold).then_some((score, index, entry))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    scored
        .into_iter()
        .take(limit)
        .map(|(score, _, entry)| RankedMatch {
            entry: entry.clone(),
            score,
        })
        .collect()
}

pub fn best_match(snapshot: &Snapshot, query: &str, threshold: u8) -> Option<RankedMatch> {
    find_matches_with(snapshot, query, 1, threshold).into_iter().next()
}

/// Case-insensitive partial similarity in `0..=100`.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    partial_ratio_folded(&fold_for_match(a), &fold_for_match(b))
}

fn partial_ratio_folded(a: &[char], b: &[char]) -> u8 {
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if shorter.is_empty() {
        return 0;
    }

    let width = shorter.len();
    let mut best = 0;
    let mut scratch = LcsScratch::with_width(width);
    for window in longer.windows(width) {
        if window == shorter {
            return 100;
        }
        let score = indel_ratio(shorter, window, &mut scratch);
        if score > best {
            best = score;
        }
    }
    best
}

/// Full-string similarity in `0..=100`, `round(200 * lcs / (|a| + |b|))`.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a = fold_for_match(a);
    let b = fold_for_match(b);
    let mut scratch = LcsScratch::with_width(b.len());
    indel_ratio(&a, &b, &mut scratch)
}

fn indel_ratio(a: &[char], b: &[char], scratch: &mut LcsScratch) -> u8 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    let lcs = scratch.lcs_len(a, b);
    ((200 * lcs + total / 2) / total) as u8
}

struct LcsScratch {
    prev: Vec<usize>,
    curr: Vec<usize>,
}

impl LcsScratch {
    fn with_width(width: usize) -> Self {
        Self {
            prev: Vec::with_capacity(width + 1),
            curr: Vec::with_capacity(width + 1),
        }
    }

    fn lcs_len(&mut self, a: &[char], b: &[char]) -> usize {
        self.prev.clear();
        self.prev.resize(b.len() + 1, 0);
        self.curr.clear();
        self.curr.resize(b.len() + 1, 0);

        for &ca in a {
            for (j, &cb) in b.iter().enumerate() {
                self.curr[j + 1] = if ca == cb {
                    self.prev[j] + 1
                } else {
                    self.prev[j + 1].max(self.curr[j])
                };
            }
            std::mem::swap(&mut self.prev, &mut self.curr);
        }
        self.prev[b.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::{partial_ratio, ratio};

    #[test]
    fn substring_scores_full_marks() {
        assert_eq!(partial_ratio("edi", "Editor"), 100);
        assert_eq!(partial_ratio("FIRE", "firefox"), 100);
    }

    #[test]
    fn partial_ratio_is_symmetric_in_length() {
        assert_eq!(partial_ratio("terminal", "term"), partial_ratio("term", "terminal"));
    }

    #[test]
    fn unrelated_strings_score_low() {
        assert!(partial_ratio("edi", "Video Player") <= 50);
    }

    #[test]
    fn empty_side_scores_zero() {
        assert_eq!(partial_ratio("", "Editor"), 0);
        assert_eq!(partial_ratio("Editor", ""), 0);
    }

    #[test]
    fn ratio_rounds_half_up() {
        assert_eq!(ratio("abc", "abc"), 100);
        assert_eq!(ratio("abcd", "abxy"), 50);
        assert_eq!(ratio("ab", "abc"), 80);
    }
}
