//! # Bucket Tree
//!
//! The hierarchical, attribute-addressed container.
//!
//! A bucket carries a `key:value` label, a strictly-sorted list of node
//! identifiers, and an insertion-ordered list of child buckets. For a leaf
//! the identifier list is the explicit membership; for an interior bucket it
//! is the union of its descendants' lists. The pair `("", "")` is reserved
//! for the root.
//!
//! Buckets own their children directly; there are no back-pointers and no
//! cycles. Copying is by deep clone.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::primitives::{KV_SEPARATOR, SEPARATOR};
use crate::seq;
use crate::{FleetMapError, NodeIndex};

/// A labelled node of the fleet tree.
///
/// Equality (`PartialEq`) is structural: equal labels, equal node sets, same
/// child order. Label-only equality is [`Bucket::label_eq`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Bucket {
    /// Attribute key, e.g. `country`. Empty only at the root.
    pub key: String,
    /// Attribute value, e.g. `DE`. Empty only at the root.
    pub value: String,
    pub(crate) nodes: Vec<NodeIndex>,
    pub(crate) children: Vec<Bucket>,
}

impl Bucket {
    /// Create an empty bucket with the given label.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            nodes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// The `key:value` form of the label, as used in paths and on the wire.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}{}{}", self.key, KV_SEPARATOR, self.value)
    }

    /// Label equality: same `(key, value)`, structure ignored.
    #[must_use]
    pub fn label_eq(&self, other: &Bucket) -> bool {
        self.key == other.key && self.value == other.value
    }

    /// The sorted identifier list of this subtree.
    ///
    /// Interior buckets materialize their list eagerly; a bucket carrying no
    /// list of its own falls back to the union of its children.
    #[must_use]
    pub fn nodelist(&self) -> Vec<NodeIndex> {
        if !self.nodes.is_empty() || self.children.is_empty() {
            return self.nodes.clone();
        }

        let mut out = Vec::new();
        for c in &self.children {
            out = seq::merge(&out, &c.nodelist());
        }
        out
    }

    /// Child buckets in insertion order.
    #[must_use]
    pub fn children(&self) -> &[Bucket] {
        &self.children
    }

    // =========================================================================
    // CONSTRUCTION
    // =========================================================================

    /// Add identifiers under a slash-delimited attribute path.
    ///
    /// The path has the form `/k1:v1/k2:v2/.../kn:vn`; the chain of buckets
    /// it names is walked or created, every bucket on the chain absorbs
    /// `ids`, and the leaf at the end holds them as membership. The bare
    /// path `/` addresses the root itself.
    ///
    /// # Errors
    ///
    /// [`FleetMapError::MalformedPath`] when the path does not start with
    /// `/` or ends with `/`; [`FleetMapError::MalformedSegment`] when a
    /// segment lacks `:`. The path is parsed in full before any mutation,
    /// so nothing is partially applied on error.
    pub fn add_bucket(&mut self, path: &str, ids: &[NodeIndex]) -> Result<(), FleetMapError> {
        let chain = split_path(path)?;

        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        self.add_chain(&chain, &ids);
        Ok(())
    }

    /// Add a single node under each of the given paths.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed path; chains added for earlier paths
    /// remain in place.
    pub fn add_node(&mut self, id: NodeIndex, paths: &[&str]) -> Result<(), FleetMapError> {
        for path in paths {
            self.add_bucket(path, &[id])?;
        }
        Ok(())
    }

    /// Append a child directly, merging its identifiers into this bucket.
    ///
    /// No uniqueness or conflict check is performed; callers that may hold
    /// overlapping identifier sets must run [`Bucket::check_conflicts`]
    /// first.
    pub fn add_child(&mut self, child: Bucket) {
        self.nodes = seq::merge(&self.nodes, &child.nodes);
        self.children.push(child);
    }

    fn add_chain(&mut self, chain: &[(String, String)], ids: &[NodeIndex]) {
        self.nodes = seq::merge(&self.nodes, ids);

        let Some((label, rest)) = chain.split_first() else {
            return;
        };

        match self
            .children
            .iter_mut()
            .find(|c| c.key == label.0 && c.value == label.1)
        {
            Some(child) => child.add_chain(rest, ids),
            None => self.children.push(make_chain(chain, ids)),
        }
    }

    // =========================================================================
    // INVARIANTS
    // =========================================================================

    /// Check that the bucket is well-formed:
    /// - identifier lists are strictly sorted ascending
    /// - every identifier in a child appears in this bucket's list
    /// - no identifier belongs to two children
    /// - sibling labels are pairwise distinct
    /// - children are recursively valid
    ///
    /// This is a diagnostic, not an error source.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if !strictly_sorted(&self.nodes) {
            return false;
        }

        let mut labels = HashSet::with_capacity(self.children.len());
        let mut seen = HashSet::new();
        for c in &self.children {
            if !labels.insert((c.key.as_str(), c.value.as_str())) {
                return false;
            }
            if !c.is_valid() {
                return false;
            }
            for &id in &c.nodes {
                if !seen.insert(id) || !seq::contains(&self.nodes, id) {
                    return false;
                }
            }
        }
        true
    }

    // =========================================================================
    // STRUCTURE MAINTENANCE
    // =========================================================================

    /// Merge another tree into this one.
    ///
    /// Identifier lists are unioned; children of `other` matching a local
    /// child by label merge recursively, the rest are appended in their
    /// original order. Children with differing labels are never coalesced.
    /// Commutative and associative on conflict-free trees.
    pub fn merge(&mut self, other: Bucket) {
        self.nodes = seq::merge(&self.nodes, &other.nodes);

        for c1 in other.children {
            match self.children.iter_mut().find(|c| c.label_eq(&c1)) {
                Some(c) => c.merge(c1),
                None => self.children.push(c1),
            }
        }
    }

    /// Check whether two trees disagree on the placement of a shared
    /// identifier: the identifier sits under differently-labelled children,
    /// or equally-labelled children conflict recursively.
    #[must_use]
    pub fn check_conflicts(&self, other: &Bucket) -> bool {
        for &n in &other.nodes {
            if !seq::contains(&self.nodes, n) {
                continue;
            }
            for c in &self.children {
                if !seq::contains(&c.nodes, n) {
                    continue;
                }
                let mut checked = false;
                for c1 in &other.children {
                    if seq::contains(&c1.nodes, n) && !c.label_eq(c1) {
                        return true;
                    }
                    if c.label_eq(c1) && !checked && c.check_conflicts(c1) {
                        return true;
                    }
                    checked = true;
                }
            }
        }
        false
    }

    /// Produce a copy with identifiers renamed through `map`.
    ///
    /// Identifiers missing from the map keep their old value, so the result
    /// is always a relabelling of the input rather than a collapse onto a
    /// default index. Lists are re-sorted.
    #[must_use]
    pub fn update_indices(&self, map: &HashMap<NodeIndex, NodeIndex>) -> Bucket {
        let children = self
            .children
            .iter()
            .map(|c| c.update_indices(map))
            .collect();

        let mut nodes: Vec<NodeIndex> = self
            .nodes
            .iter()
            .map(|n| map.get(n).copied().unwrap_or(*n))
            .collect();
        nodes.sort_unstable();
        nodes.dedup();

        Bucket {
            key: self.key.clone(),
            value: self.value.clone(),
            nodes,
            children,
        }
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Intersection of the identifier lists addressed by the given paths.
    ///
    /// A path that does not resolve to a bucket contributes the empty set.
    ///
    /// # Errors
    ///
    /// Propagates path syntax errors; see [`Bucket::add_bucket`].
    pub fn get_nodes_by_path(&self, paths: &[&str]) -> Result<Vec<NodeIndex>, FleetMapError> {
        let mut acc: Option<Vec<NodeIndex>> = None;
        for path in paths {
            let chain = split_path(path)?;
            let found = self.nodes_at(&chain);
            acc = Some(match acc {
                Some(prev) => seq::intersect(&prev, &found),
                None => found,
            });
        }
        Ok(acc.unwrap_or_default())
    }

    fn nodes_at(&self, chain: &[(String, String)]) -> Vec<NodeIndex> {
        let Some((label, rest)) = chain.split_first() else {
            return self.nodes.clone();
        };
        self.children
            .iter()
            .find(|c| c.key == label.0 && c.value == label.1)
            .map(|c| c.nodes_at(rest))
            .unwrap_or_default()
    }
}

// =============================================================================
// PATH PARSING
// =============================================================================

/// Split a `key:value` segment on its first separator.
pub(crate) fn split_kv(s: &str) -> Result<(String, String), FleetMapError> {
    s.split_once(KV_SEPARATOR)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| FleetMapError::MalformedSegment(s.to_string()))
}

/// Parse a slash-delimited path into its label chain.
///
/// The bare path `/` yields the empty chain (the root itself).
fn split_path(path: &str) -> Result<Vec<(String, String)>, FleetMapError> {
    if path.len() == 1 && path.starts_with(SEPARATOR) {
        return Ok(Vec::new());
    }
    if !path.starts_with(SEPARATOR) || path.ends_with(SEPARATOR) {
        return Err(FleetMapError::MalformedPath(path.to_string()));
    }
    path[1..].split(SEPARATOR).map(split_kv).collect()
}

/// Build the bucket chain for a freshly created path suffix.
///
/// Every bucket on the chain holds the same identifier list: the leaf as
/// membership, its ancestors as the union over their single descendant.
fn make_chain(chain: &[(String, String)], ids: &[NodeIndex]) -> Bucket {
    let (key, value) = &chain[0];
    let mut b = Bucket::new(key.clone(), value.clone());
    b.nodes = ids.to_vec();
    if chain.len() > 1 {
        b.children.push(make_chain(&chain[1..], ids));
    }
    b
}

fn strictly_sorted(ids: &[NodeIndex]) -> bool {
    ids.windows(2).all(|w| w[0] < w[1])
}

// =============================================================================
// TESTS
// =============================================================================
