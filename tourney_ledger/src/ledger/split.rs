//! Integer point splitting.

use std::cmp::Ordering;

/// Split `points` into `n` parts that sum exactly to `points`.
///
/// Uses truncating division, so the remainder carries the sign of `points`.
/// The first `|remainder|` parts absorb one extra unit each (`q + 1` for a
/// positive remainder, `q - 1` for a negative one); the rest receive `q`.
///
/// When `n == 0` the result is empty and the points are not distributed.
///
/// ```
/// use tourney_ledger::ledger::split_points;
///
/// assert_eq!(split_points(100, 3), vec![34, 33, 33]);
/// assert_eq!(split_points(-3, 2), vec![-2, -1]);
/// assert!(split_points(5, 0).is_empty());
/// ```
pub fn split_points(points: i64, n: usize) -> Vec<i64> {
    if n == 0 {
        return Vec::new();
    }

    // Participant lists are slices, so `n` never exceeds isize::MAX.
    let parts = n as i64;
    let quotient = points / parts;
    let mut remainder = points % parts;

    (0..n)
        .map(|_| match remainder.cmp(&0) {
            Ordering::Greater => {
                remainder -= 1;
                quotient + 1
            }
            Ordering::Less => {
                remainder += 1;
                quotient - 1
            }
            Ordering::Equal => quotient,
        })
        .collect()
}
