//! # fleetmap-core
//!
//! The deterministic selection core for a decentralized storage fleet.
//!
//! The fleet is modelled as a labelled tree of *buckets*: each bucket carries
//! a `key:value` attribute label (e.g. `country:DE`) and a sorted list of
//! node identifiers; leaves hold explicit membership, interior buckets hold
//! the union of their descendants. Placement queries of the form "give me N
//! subtrees rooted at key K, restricted to nodes satisfying filters F" are
//! answered in two phases: a *maximal selection* prunes everything a filter
//! forbids and keeps only subtrees that can still satisfy the query, then a
//! *random selection* samples the requested counts from the maximal subtree.
//!
//! ## Architectural Constraints
//!
//! - Purely synchronous and CPU-bound; no async, no network, no global state
//! - Selection never mutates its input; mutating operations require
//!   external exclusion, published trees are logically immutable
//! - The random source is an injected capability (`rand::Rng`); with no
//!   source supplied, child iteration order makes results fully
//!   deterministic
//! - Node attributes live in an externally owned node table; the tree
//!   stores only identifiers

// =============================================================================
// MODULES
// =============================================================================

pub mod bucket;
pub mod formats;
pub mod primitives;
pub mod selection;
pub mod seq;
pub mod types;
pub mod weights;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{FleetMapError, NodeIndex, NodeInfo, Policy};

// =============================================================================
// RE-EXPORTS: Bucket Tree & Selection
// =============================================================================

pub use bucket::Bucket;
pub use selection::{Filter, Select, Selector};

// =============================================================================
// RE-EXPORTS: Weights
// =============================================================================

pub use weights::{
    Aggregator, ConstNorm, MeanCapAgg, MeanCapSumAgg, MinPriceAgg, Normalizer, ReverseMinNorm,
    SigmoidNorm, WeightFunc, cap_weight_func, default_weight_func, new_weight_func,
};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{bucket_from_bytes, bucket_to_bytes};
