//! # Core Type Definitions
//!
//! This module contains the value types shared across the selection core:
//! - Node identifiers (`NodeIndex`) and node attributes (`NodeInfo`)
//! - The placement policy carried at the boundary (`Policy`)
//! - Error types (`FleetMapError`)
//!
//! ## Determinism Guarantees
//!
//! All types implement `Ord` where ordering matters, so sorted identifier
//! sequences and tree traversals are reproducible across runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS & ATTRIBUTES
// =============================================================================

/// Index of a node in the externally owned node table.
///
/// The tree stores only indices; attribute storage and index allocation
/// belong to the caller. Any `i32` appearing in a bucket is assumed valid
/// against that table -- no validation is performed here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct NodeIndex(pub i32);

impl NodeIndex {
    /// Create a new node index from its raw value.
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Get the raw index value.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }
}

/// The node attributes consumed by the selection core.
///
/// Additional attributes may exist in the node table but are not read here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeInfo {
    /// Storage capacity of the node.
    pub capacity: u64,
    /// Advertised price of the node. Zero means "unset".
    pub price: u64,
}

impl NodeInfo {
    /// Create a new node attribute record.
    #[must_use]
    pub const fn new(capacity: u64, price: u64) -> Self {
        Self { capacity, price }
    }
}

// =============================================================================
// POLICY
// =============================================================================

/// Placement policy carried at the boundary.
///
/// The policy layer that builds selector lists consumes this; the selection
/// core itself does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Policy {
    /// Requested object size.
    pub size: i64,
    /// Replication factor.
    pub repl_factor: usize,
    /// Number of nodes to place on.
    pub node_count: usize,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors produced by the selection core.
///
/// Construction errors are returned before anything is applied to the tree;
/// an unsatisfiable selection is signalled with `None`, never an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FleetMapError {
    /// A bucket path does not start with `/`, or ends with `/`.
    #[error("malformed path {0:?}: must start and not end with '/'")]
    MalformedPath(String),

    /// A path segment or serialized label is missing the `:` separator.
    #[error("malformed segment {0:?}: missing ':' separator")]
    MalformedSegment(String),

    /// The serialized form advertised more bytes than the input holds.
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
}

// =============================================================================
// TESTS
// =============================================================================
