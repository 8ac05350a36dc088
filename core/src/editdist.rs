//! Weighted edit distance between byte strings.
//!
//! `edit_distance` is a plain dynamic program over substitution,
//! insertion, deletion and adjacent transposition with per-operation
//! weights (scaled by 100). The `limit` variants bail out as soon as the
//! minimum cost in a row exceeds the threshold and report how many bytes
//! of the first argument had been consumed at that point; the soundslike
//! scan uses that value to skip whole jump-table buckets.

/// Scores at or above this value mean "no match within the limit".
pub const LARGE_NUM: i32 = i32::MAX / 4;

#[derive(Debug, Clone, Copy)]
pub struct EditDistanceWeights {
    /// deleting a byte of the first string
    pub del1: i32,
    /// deleting a byte of the second string (an insertion)
    pub del2: i32,
    pub swap: i32,
    pub sub: i32,
    pub min: i32,
    pub max: i32,
}

impl Default for EditDistanceWeights {
    fn default() -> Self {
        EditDistanceWeights {
            del1: 95,
            del2: 95,
            swap: 90,
            sub: 100,
            min: 90,
            max: 100,
        }
    }
}

/// Result of a limited edit distance computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditDist {
    pub score: i32,
    /// Bytes of the first argument consumed before the computation gave
    /// up (its full length on success).
    pub stopped_at: usize,
}

impl EditDist {
    pub fn within_limit(&self) -> bool {
        self.score < LARGE_NUM
    }
}

/// Full weighted Levenshtein distance with adjacent transposition.
pub fn edit_distance(a: &[u8], b: &[u8], w: &EditDistanceWeights) -> i32 {
    let (m, n) = (a.len(), b.len());
    let idx = |i: usize, j: usize| i * (n + 1) + j;
    let mut e = vec![0i32; (m + 1) * (n + 1)];
    for j in 1..=n {
        e[idx(0, j)] = e[idx(0, j - 1)] + w.del2;
    }
    for i in 1..=m {
        e[idx(i, 0)] = e[idx(i - 1, 0)] + w.del1;
        for j in 1..=n {
            let mut best = if a[i - 1] == b[j - 1] {
                e[idx(i - 1, j - 1)]
            } else {
                e[idx(i - 1, j - 1)] + w.sub
            };
            best = best.min(e[idx(i - 1, j)] + w.del1);
            best = best.min(e[idx(i, j - 1)] + w.del2);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(e[idx(i - 2, j - 2)] + w.swap);
            }
            e[idx(i, j)] = best;
        }
    }
    e[idx(m, n)]
}

/// Full distance, mapped to [`LARGE_NUM`] when it exceeds
/// `max_level * w.max`.
pub fn bounded_edit_distance(
    a: &[u8],
    b: &[u8],
    max_level: i32,
    w: &EditDistanceWeights,
) -> i32 {
    let d = edit_distance(a, b, w);
    if d <= max_level * w.max {
        d
    } else {
        LARGE_NUM
    }
}

fn limit_edit_distance(a: &[u8], b: &[u8], k: i32, w: &EditDistanceWeights) -> EditDist {
    let limit = k * w.max;
    let (m, n) = (a.len(), b.len());
    let idx = |i: usize, j: usize| i * (n + 1) + j;
    let mut e = vec![0i32; (m + 1) * (n + 1)];
    for j in 1..=n {
        e[idx(0, j)] = e[idx(0, j - 1)] + w.del2;
    }
    for i in 1..=m {
        e[idx(i, 0)] = e[idx(i - 1, 0)] + w.del1;
        let mut row_min = e[idx(i, 0)];
        for j in 1..=n {
            let mut best = if a[i - 1] == b[j - 1] {
                e[idx(i - 1, j - 1)]
            } else {
                e[idx(i - 1, j - 1)] + w.sub
            };
            best = best.min(e[idx(i - 1, j)] + w.del1);
            best = best.min(e[idx(i, j - 1)] + w.del2);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(e[idx(i - 2, j - 2)] + w.swap);
            }
            e[idx(i, j)] = best;
            row_min = row_min.min(best);
        }
        if row_min > limit {
            // the prefix a[..i] is already over budget; report the
            // 0-based index of the failing byte for bucket skipping
            return EditDist {
                score: LARGE_NUM,
                stopped_at: i - 1,
            };
        }
    }
    let score = e[idx(m, n)];
    EditDist {
        score: if score <= limit { score } else { LARGE_NUM },
        stopped_at: m,
    }
}

/// Distance if within one edit, [`LARGE_NUM`] otherwise.
pub fn limit1_edit_distance(a: &[u8], b: &[u8], w: &EditDistanceWeights) -> EditDist {
    limit_edit_distance(a, b, 1, w)
}

/// Distance if within two edits, [`LARGE_NUM`] otherwise.
pub fn limit2_edit_distance(a: &[u8], b: &[u8], w: &EditDistanceWeights) -> EditDist {
    limit_edit_distance(a, b, 2, w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w() -> EditDistanceWeights {
        EditDistanceWeights::default()
    }

    #[test]
    fn equal_strings_cost_nothing() {
        assert_eq!(edit_distance(b"hello", b"hello", &w()), 0);
    }

    #[test]
    fn single_operations() {
        let w = w();
        assert_eq!(edit_distance(b"hello", b"hallo", &w), w.sub);
        assert_eq!(edit_distance(b"hello", b"helllo", &w), w.del2);
        assert_eq!(edit_distance(b"helllo", b"hello", &w), w.del1);
        assert_eq!(edit_distance(b"hello", b"hlelo", &w), w.swap);
    }

    #[test]
    fn symmetric_for_default_weights() {
        let w = w();
        assert_eq!(
            edit_distance(b"kitten", b"sitting", &w),
            edit_distance(b"sitting", b"kitten", &w)
        );
    }

    #[test]
    fn limit1_accepts_one_edit() {
        let w = w();
        let d = limit1_edit_distance(b"hallo", b"hello", &w);
        assert!(d.within_limit());
        assert_eq!(d.score, w.sub);
        assert_eq!(d.stopped_at, 5);
    }

    #[test]
    fn limit1_rejects_two_edits() {
        let w = w();
        let d = limit1_edit_distance(b"haxxo", b"hello", &w);
        assert!(!d.within_limit());
    }

    #[test]
    fn limit2_accepts_two_edits() {
        let w = w();
        let d = limit2_edit_distance(b"haxxo", b"hello", &w);
        assert!(d.within_limit());
        assert_eq!(d.score, 2 * w.sub);
    }

    #[test]
    fn stopped_at_reports_early_bail() {
        let w = w();
        // Completely disjoint strings fail within a few rows; the scan
        // uses stopped_at to skip everything sharing that prefix.
        let d = limit1_edit_distance(b"zzzzzzzz", b"aaaaaaaa", &w);
        assert!(!d.within_limit());
        assert!(d.stopped_at < 8);
    }

    #[test]
    fn bounded_maps_to_large() {
        let w = w();
        assert_eq!(bounded_edit_distance(b"abcd", b"wxyz", 1, &w), LARGE_NUM);
        assert_eq!(bounded_edit_distance(b"abcd", b"abcx", 1, &w), w.sub);
    }
}
