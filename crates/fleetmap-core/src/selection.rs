//! # Selection Engine
//!
//! Placement queries over the bucket tree.
//!
//! A query runs in two phases:
//! 1. **Maximal selection** -- prune everything the filters forbid and keep
//!    the smallest subtree that still contains every feasible selection.
//! 2. **Random selection** -- sample the requested counts per level from
//!    the maximal subtree, using an injected random source.
//!
//! Infeasibility is signalled with `None`, never an error; callers
//! distinguish "unsatisfiable" (`None`) from "malformed" (an error at
//! construction time).

use std::collections::HashSet;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bucket::Bucket;
use crate::primitives::NODES_LABEL;
use crate::seq;
use crate::NodeIndex;

// =============================================================================
// QUERY TYPES
// =============================================================================

/// One descent step of a selection: pick `count` distinct children whose
/// key equals `key`, or -- with the reserved empty key -- `count` nodes
/// from this subtree's leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Select {
    /// Attribute key this step descends over.
    pub key: String,
    /// How many distinct matches the step requires.
    pub count: usize,
}

impl Select {
    /// Create a bucket-level step.
    #[must_use]
    pub fn new(key: impl Into<String>, count: usize) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }

    /// Create the node-level step. Must be the last step when present.
    #[must_use]
    pub fn nodes(count: usize) -> Self {
        Self::new(NODES_LABEL, count)
    }
}

/// A predicate over buckets whose key matches.
///
/// A bucket failing its filter forbids the entire node set underneath it.
pub struct Filter {
    /// Attribute key the predicate applies to.
    pub key: String,
    check: Box<dyn Fn(&Bucket) -> bool + Send + Sync>,
}

impl Filter {
    /// Create a filter from a key and a predicate.
    pub fn new(
        key: impl Into<String>,
        check: impl Fn(&Bucket) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            check: Box::new(check),
        }
    }

    /// Evaluate the predicate on a bucket.
    #[must_use]
    pub fn check(&self, b: &Bucket) -> bool {
        (self.check)(b)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("key", &self.key).finish()
    }
}

/// One placement query: an ordered descent specification plus filters.
#[derive(Debug, Default)]
pub struct Selector {
    /// Descent steps, outermost first.
    pub selects: Vec<Select>,
    /// Bucket-level exclusion predicates, unordered.
    pub filters: Vec<Filter>,
}

impl Selector {
    /// Create a selector from its parts.
    #[must_use]
    pub fn new(selects: Vec<Select>, filters: Vec<Filter>) -> Self {
        Self { selects, filters }
    }
}

// =============================================================================
// DRIVERS
// =============================================================================

impl Bucket {
    /// Answer a list of placement queries with a result tree.
    ///
    /// Each selector is resolved to a maximal subtree and then sampled; the
    /// per-selector results are merged into one tree carrying this bucket's
    /// label. Returns `None` as soon as any selector is unsatisfiable.
    pub fn find_graph<R: Rng + ?Sized>(
        &self,
        mut rng: Option<&mut R>,
        selectors: &[Selector],
    ) -> Option<Bucket> {
        let mut result = Bucket::new(self.key.clone(), self.value.clone());
        for (i, s) in selectors.iter().enumerate() {
            let Some(g) = self.select_graph(rng.as_deref_mut(), &s.selects, &s.filters) else {
                debug!(selector = i, "selection unsatisfiable");
                return None;
            };
            result.merge(g);
        }
        Some(result)
    }

    /// Answer a list of placement queries with a flat node list.
    ///
    /// The union of the leaf lists of every satisfiable selector; selectors
    /// that cannot be satisfied contribute nothing.
    pub fn find_nodes<R: Rng + ?Sized>(
        &self,
        mut rng: Option<&mut R>,
        selectors: &[Selector],
    ) -> Vec<NodeIndex> {
        let mut nodes = Vec::new();
        for s in selectors {
            if let Some(c) = self.select_graph(rng.as_deref_mut(), &s.selects, &s.filters) {
                nodes = seq::merge(&nodes, &c.nodelist());
            }
        }
        nodes
    }

    fn select_graph<R: Rng + ?Sized>(
        &self,
        rng: Option<&mut R>,
        selects: &[Select],
        filters: &[Filter],
    ) -> Option<Bucket> {
        let max = self.get_max_selection(selects, filters)?;
        max.get_selection(selects, rng)
    }

    // =========================================================================
    // FORBIDDEN SETS
    // =========================================================================

    /// Collect every identifier excluded by at least one filter.
    ///
    /// At each bucket whose key matches a filter the predicate runs; on
    /// failure the bucket's whole node set is forbidden and that subtree is
    /// not descended further.
    #[must_use]
    pub fn find_forbidden(&self, filters: &[Filter]) -> Vec<NodeIndex> {
        // a root failing any filter forbids everything underneath it
        for f in filters {
            if self.key == f.key && !f.check(self) {
                return self.nodes.clone();
            }
        }

        let mut forbidden = Vec::new();
        for c in &self.children {
            forbidden = seq::union(&forbidden, &c.find_forbidden(filters));
        }
        forbidden
    }

    /// Copy of the subtree with forbidden identifiers removed from every
    /// leaf and interior lists recomputed bottom-up. A bucket left with no
    /// identifiers is pruned; `None` when nothing survives.
    fn filter_subtree(&self, forbidden: &HashSet<NodeIndex>) -> Option<Bucket> {
        let mut root = Bucket::new(self.key.clone(), self.value.clone());

        if self.children.is_empty() {
            root.nodes = seq::diff(&self.nodes, forbidden);
            if root.nodes.is_empty() {
                return None;
            }
            return Some(root);
        }

        for c in &self.children {
            if let Some(r) = c.filter_subtree(forbidden) {
                root.nodes = seq::merge(&root.nodes, &r.nodes);
                root.children.push(r);
            }
        }
        if root.nodes.is_empty() {
            None
        } else {
            Some(root)
        }
    }

    // =========================================================================
    // MAXIMAL SELECTION
    // =========================================================================

    /// The maximal container: the smallest subtree containing every
    /// selection satisfying `selects` and `filters`, or `None` when no
    /// selection is possible.
    ///
    /// The result is hierarchical, keeps `(key, value)` labels, carries
    /// sorted identifier lists at every level, and is the expected input of
    /// [`Bucket::get_selection`].
    #[must_use]
    pub fn get_max_selection(&self, selects: &[Select], filters: &[Filter]) -> Option<Bucket> {
        let forbidden: HashSet<NodeIndex> = self.find_forbidden(filters).into_iter().collect();
        debug!(
            forbidden = forbidden.len(),
            selects = selects.len(),
            "computing maximal selection"
        );
        self.max_selection(selects, &forbidden, true).map(|(r, _)| r)
    }

    /// Recursive engine behind [`Bucket::get_max_selection`].
    ///
    /// `cut` records whether this level was reached by consuming the head
    /// select. A child that consumes contributes one matched entry to its
    /// parent's count; a pass-through child contributes its own count. A
    /// pass-through level survives on any non-zero count; a consuming level
    /// must reach the head count.
    fn max_selection(
        &self,
        selects: &[Select],
        forbidden: &HashSet<NodeIndex>,
        cut: bool,
    ) -> Option<(Bucket, usize)> {
        if selects.is_empty() || selects[0].key == NODES_LABEL {
            let r = self.filter_subtree(forbidden)?;
            let count = r.nodes.len();
            if selects.is_empty() || selects[0].count <= count {
                return Some((r, count));
            }
            return None;
        }

        let mut root = Bucket::new(self.key.clone(), self.value.clone());
        let mut count = 0usize;

        for c in &self.children {
            let cutc = c.key == selects[0].key;
            let sel = if cutc { &selects[1..] } else { selects };
            if let Some((r, n)) = c.max_selection(sel, forbidden, cutc) {
                let picked = r.nodelist();
                root.nodes = seq::merge(&root.nodes, &picked);
                root.children.push(r);
                count += if cutc { 1 } else { n };
            }
        }

        if (!cut && count != 0) || count >= selects[0].count {
            Some((root, count))
        } else {
            None
        }
    }

    // =========================================================================
    // RANDOM SELECTION
    // =========================================================================

    /// Sample the maximal subtree down to the requested counts.
    ///
    /// With no steps the subtree is returned as-is. The node-level step
    /// shuffles this bucket's identifiers and truncates to its count. A
    /// bucket-level step collects matching descendants, shuffles them, and
    /// recurses with the remaining steps, lifting each success back onto
    /// its ancestor chain until the count is reached; fewer successes
    /// yield `None`.
    ///
    /// With `rng` `None` no shuffle happens and results follow child
    /// iteration order; callers relying on uniformity must supply a source.
    #[must_use]
    pub fn get_selection<R: Rng + ?Sized>(
        &self,
        selects: &[Select],
        mut rng: Option<&mut R>,
    ) -> Option<Bucket> {
        let mut root = Bucket::new(self.key.clone(), self.value.clone());

        if selects.is_empty() {
            root.nodes = self.nodes.clone();
            root.children = self.children.clone();
            return Some(root);
        }

        let count = selects[0].count;
        if selects[0].key == NODES_LABEL {
            let mut nodes = self.nodes.clone();
            if let Some(r) = rng.as_deref_mut() {
                nodes.shuffle(r);
            }
            nodes.truncate(count);
            root.nodes = nodes;
            return Some(root);
        }

        let mut candidates = self.children_by_key(&selects[0].key);
        if let Some(r) = rng.as_deref_mut() {
            candidates.shuffle(r);
        }

        let mut picked = 0usize;
        for c in &candidates {
            if let Some(r) = c.get_selection(&selects[1..], rng.as_deref_mut()) {
                root.merge(self.combine(&r)?);
                picked += 1;
                if picked == count {
                    return Some(root);
                }
            }
        }
        None
    }

    /// Rebuild the unique label path from this bucket down to `picked`,
    /// re-embedding a sampled descendant at its original depth. `None` when
    /// the label is not present; ambiguity is excluded by the
    /// distinct-sibling-label invariant.
    pub(crate) fn combine(&self, picked: &Bucket) -> Option<Bucket> {
        if self.label_eq(picked) {
            return Some(picked.clone());
        }

        for c in &self.children {
            if let Some(r) = c.combine(picked) {
                let nodes = r.nodes.clone();
                return Some(Bucket {
                    key: self.key.clone(),
                    value: self.value.clone(),
                    nodes,
                    children: vec![r],
                });
            }
        }
        None
    }

    /// Depth-first collection of descendants matching a select key; a
    /// matched child is not descended further.
    fn children_by_key(&self, key: &str) -> Vec<Bucket> {
        let mut out = Vec::new();
        for c in &self.children {
            if c.key == key {
                out.push(c.clone());
            } else {
                out.extend(c.children_by_key(key));
            }
        }
        out
    }
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

    /// root -> host:h1{1}, host:h2{2}, host:h3{3}
    fn flat_hosts() -> Bucket {
        let mut root = Bucket::default();
        for (i, h) in ["h1", "h2", "h3"].iter().enumerate() {
            root.add_bucket(&format!("/host:{h}"), &ids(&[i as i32 + 1]))
                .expect("add");
        }
        root
    }

    #[test]
    fn find_forbidden_collects_failing_subtrees() {
        let root = flat_hosts();
        let filters = vec![Filter::new("host", |b: &Bucket| b.value != "h2")];
        assert_eq!(root.find_forbidden(&filters), ids(&[2]));
    }

    #[test]
    fn find_forbidden_empty_without_filters() {
        let root = flat_hosts();
        assert_eq!(root.find_forbidden(&[]), Vec::<NodeIndex>::new());
    }

    #[test]
    fn max_selection_prunes_forbidden_nodes() {
        let root = flat_hosts();
        let selects = vec![Select::new("host", 2)];
        let filters = vec![Filter::new("host", |b: &Bucket| b.value != "h2")];

        let max = root.get_max_selection(&selects, &filters).expect("feasible");
        assert_eq!(max.nodelist(), ids(&[1, 3]));
        assert_eq!(max.children().len(), 2);
        assert!(max.is_valid());
    }

    #[test]
    fn max_selection_rejects_unsatisfiable_count() {
        let root = flat_hosts();
        let selects = vec![Select::new("host", 3)];
        let filters = vec![Filter::new("host", |b: &Bucket| b.value != "h2")];

        assert!(root.get_max_selection(&selects, &filters).is_none());
    }

    #[test]
    fn max_selection_handles_node_level_step() {
        let root = flat_hosts();
        let selects = vec![Select::nodes(2)];
        let max = root.get_max_selection(&selects, &[]).expect("feasible");
        assert_eq!(max.nodelist(), ids(&[1, 2, 3]));

        let selects = vec![Select::nodes(4)];
        assert!(root.get_max_selection(&selects, &[]).is_none());
    }

    #[test]
    fn selection_without_rng_follows_child_order() {
        let root = flat_hosts();
        let selects = vec![Select::new("host", 2)];

        let max = root.get_max_selection(&selects, &[]).expect("feasible");
        let got = max.get_selection::<rand::rngs::ThreadRng>(&selects, None).expect("select");

        assert_eq!(got.nodelist(), ids(&[1, 2]));
        assert_eq!(got.children().len(), 2);
        assert_eq!(got.children()[0].name(), "host:h1");
        assert_eq!(got.children()[1].name(), "host:h2");
    }

    #[test]
    fn selection_with_empty_selects_copies_subtree() {
        let root = flat_hosts();
        let got = root.get_selection::<rand::rngs::ThreadRng>(&[], None).expect("select");
        assert_eq!(got.nodelist(), root.nodelist());
        assert_eq!(got.children().len(), root.children().len());
    }

    #[test]
    fn combine_rebuilds_ancestor_chain() {
        let mut root = Bucket::default();
        root.add_bucket("/r:eu/h:h1", &ids(&[1])).expect("add");
        root.add_bucket("/r:eu/h:h2", &ids(&[2])).expect("add");

        let picked = root.children()[0].children()[0].clone();
        let lifted = root.combine(&picked).expect("present");

        assert_eq!(lifted.nodelist(), ids(&[1]));
        assert_eq!(lifted.children().len(), 1);
        assert_eq!(lifted.children()[0].name(), "r:eu");
        assert_eq!(lifted.children()[0].children()[0].name(), "h:h1");

        let absent = Bucket::new("h", "h9");
        assert!(root.combine(&absent).is_none());
    }

    #[test]
    fn children_by_key_skips_matched_subtrees() {
        let mut root = Bucket::default();
        root.add_bucket("/r:eu/h:h1", &ids(&[1])).expect("add");
        root.add_bucket("/r:us/h:h2", &ids(&[2])).expect("add");

        let hosts = root.children_by_key("h");
        assert_eq!(hosts.len(), 2);
        let regions = root.children_by_key("r");
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn filter_on_missing_key_matches_nothing() {
        let root = flat_hosts();
        let filters = vec![Filter::new("rack", |_: &Bucket| false)];
        assert_eq!(root.find_forbidden(&filters), Vec::<NodeIndex>::new());
    }
}
