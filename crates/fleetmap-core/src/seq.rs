//! # Sorted Identifier Sequences
//!
//! Set operations over node-identifier sequences.
//!
//! Every sequence held by a bucket is strictly sorted ascending with no
//! duplicates; these operations preserve that invariant and are fully
//! deterministic.

use std::collections::HashSet;

use crate::NodeIndex;

/// Sorted set-union of two sorted sequences. Duplicates collapse to one
/// element. Linear in `|a| + |b|`.
#[must_use]
pub fn merge(a: &[NodeIndex], b: &[NodeIndex]) -> Vec<NodeIndex> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);

    while i < a.len() || j < b.len() {
        if i == a.len() {
            out.extend_from_slice(&b[j..]);
            break;
        }
        if j == b.len() {
            out.extend_from_slice(&a[i..]);
            break;
        }
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }

    out
}

/// Sorted intersection of two sorted sequences.
#[must_use]
pub fn intersect(a: &[NodeIndex], b: &[NodeIndex]) -> Vec<NodeIndex> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }

    out
}

/// `a` minus the elements of a forbidden set; order of `a` is preserved.
#[must_use]
pub fn diff(a: &[NodeIndex], forbidden: &HashSet<NodeIndex>) -> Vec<NodeIndex> {
    a.iter()
        .copied()
        .filter(|id| !forbidden.contains(id))
        .collect()
}

/// Set-union over possibly unsorted input; output is sorted and
/// deduplicated.
#[must_use]
pub fn union(a: &[NodeIndex], b: &[NodeIndex]) -> Vec<NodeIndex> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out.sort_unstable();
    out.dedup();
    out
}

/// Membership in a sorted sequence.
#[must_use]
pub fn contains(a: &[NodeIndex], x: NodeIndex) -> bool {
    a.binary_search(&x).is_ok()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[i32]) -> Vec<NodeIndex> {
        raw.iter().copied().map(NodeIndex).collect()
    }

    #[test]
    fn merge_collapses_duplicates() {
        assert_eq!(merge(&ids(&[1, 3, 5]), &ids(&[2, 3, 6])), ids(&[1, 2, 3, 5, 6]));
    }

    #[test]
    fn merge_handles_empty_sides() {
        assert_eq!(merge(&[], &ids(&[1, 2])), ids(&[1, 2]));
        assert_eq!(merge(&ids(&[1, 2]), &[]), ids(&[1, 2]));
        assert_eq!(merge(&[], &[]), Vec::<NodeIndex>::new());
    }

    #[test]
    fn intersect_keeps_common_elements() {
        assert_eq!(intersect(&ids(&[1, 2, 4, 7]), &ids(&[2, 3, 7])), ids(&[2, 7]));
        assert_eq!(intersect(&ids(&[1, 2]), &ids(&[3, 4])), Vec::<NodeIndex>::new());
    }

    #[test]
    fn diff_preserves_order() {
        let forbidden: HashSet<NodeIndex> = ids(&[2, 4]).into_iter().collect();
        assert_eq!(diff(&ids(&[1, 2, 3, 4, 5]), &forbidden), ids(&[1, 3, 5]));
    }

    #[test]
    fn union_sorts_unsorted_input() {
        assert_eq!(union(&ids(&[5, 1]), &ids(&[3, 1])), ids(&[1, 3, 5]));
    }

    #[test]
    fn contains_uses_sorted_order() {
        let a = ids(&[1, 4, 9]);
        assert!(contains(&a, NodeIndex(4)));
        assert!(!contains(&a, NodeIndex(5)));
    }
}
