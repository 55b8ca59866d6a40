//! # Formats
//!
//! Serialized representations of the bucket tree.

pub mod wire;

pub use wire::{bucket_from_bytes, bucket_to_bytes};
