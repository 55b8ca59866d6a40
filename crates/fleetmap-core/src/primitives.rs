//! # Innate Primitives
//!
//! Hardcoded constants of the selection core.
//!
//! The tree starts empty but its addressing scheme is fixed: buckets are
//! addressed by slash-delimited `key:value` paths, and the empty key is
//! reserved for node-level selection.

/// Separator between path segments in `add_bucket` paths.
pub const SEPARATOR: char = '/';

/// Separator between key and value inside a path segment or wire label.
pub const KV_SEPARATOR: char = ':';

/// The reserved select key addressing leaf nodes instead of child buckets.
///
/// A `Select` carrying this key means "pick `count` nodes from this
/// subtree's leaves". It may appear at most once in a select list, and must
/// be last when present.
pub const NODES_LABEL: &str = "";

/// Minimum serialized size of a bucket in bytes.
///
/// Three `i32` length prefixes (name, node count, child count) with all
/// counts zero. Used to bound advertised child counts against remaining
/// input before allocating.
pub const MIN_WIRE_BUCKET_SIZE: usize = 12;
