//! Article selection

use std::collections::HashSet;

/// Highest candidate not already in `known`.
///
/// Single pass over `candidates`; input order and duplicates do not affect
/// the result. Returns `None` when every candidate is known.
///
/// ```
/// use contract_slices::engine::selection::highest_new;
/// use std::collections::HashSet;
///
/// let known: HashSet<i64> = [9].into_iter().collect();
/// assert_eq!(highest_new(&[5, 3, 9], &known), Some(5));
/// assert_eq!(highest_new(&[9, 9], &known), None);
/// ```
pub fn highest_new(candidates: &[i64], known: &HashSet<i64>) -> Option<i64> {
    candidates
        .iter()
        .copied()
        .filter(|id| !known.contains(id))
        .max()
}
