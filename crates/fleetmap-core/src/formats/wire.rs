//! # Wire Format
//!
//! Length-prefixed big-endian serialization of the bucket tree.
//!
//! A bucket is written recursively as:
//!
//! ```text
//! [i32 name_len]["key:value" bytes]
//! [i32 node_count][node_count x i32 identifiers, stored order]
//! [i32 child_count][child 0]...[child N-1]
//! ```
//!
//! `name_len` covers key, value, and the single `:` separator. The stream
//! is not framed; the outer length is implied by the top-level child count
//! being consumed to zero. End-of-input at a bucket boundary is a clean
//! terminator; any other short read is an error.
//!
//! Advertised lengths are validated against the remaining input before any
//! allocation, so corrupted counts cannot trigger outsized allocations.

use crate::bucket::{split_kv, Bucket};
use crate::primitives::MIN_WIRE_BUCKET_SIZE;
use crate::{FleetMapError, NodeIndex};

// =============================================================================
// ENCODING
// =============================================================================

/// Serialize a bucket tree to bytes. This is a pure transformation.
#[must_use]
pub fn bucket_to_bytes(b: &Bucket) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(b, &mut out);
    out
}

fn encode_into(b: &Bucket, out: &mut Vec<u8>) {
    let name = b.name();
    out.extend_from_slice(&(name.len() as i32).to_be_bytes());
    out.extend_from_slice(name.as_bytes());

    out.extend_from_slice(&(b.nodes.len() as i32).to_be_bytes());
    for id in &b.nodes {
        out.extend_from_slice(&id.0.to_be_bytes());
    }

    out.extend_from_slice(&(b.children.len() as i32).to_be_bytes());
    for c in &b.children {
        encode_into(c, out);
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Deserialize a bucket tree from bytes. This is a pure transformation.
///
/// Empty input is a clean terminator and yields the empty root; trailing
/// bytes after the top-level bucket are ignored.
///
/// # Errors
///
/// [`FleetMapError::ShortRead`] when a length prefix advertises more bytes
/// than the input holds (a negative prefix counts as a short read);
/// [`FleetMapError::MalformedSegment`] when a serialized label is not valid
/// UTF-8 or lacks the `:` separator.
pub fn bucket_from_bytes(data: &[u8]) -> Result<Bucket, FleetMapError> {
    let mut cur = Cursor { data, pos: 0 };
    decode_bucket(&mut cur)
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_i32(&mut self) -> Result<i32, FleetMapError> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], FleetMapError> {
        if self.remaining() < len {
            return Err(FleetMapError::ShortRead {
                expected: len,
                got: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Read an element count and bound it by the remaining input, given the
    /// minimum serialized size per element (zero disables the bound).
    /// Negative counts can never be satisfied and are reported as short
    /// reads.
    fn read_count(&mut self, min_size: usize) -> Result<usize, FleetMapError> {
        let raw = self.read_i32()?;
        let expected = match usize::try_from(raw) {
            Ok(count) => count.saturating_mul(min_size),
            Err(_) => usize::MAX,
        };
        if raw < 0 || expected > self.remaining() {
            return Err(FleetMapError::ShortRead {
                expected,
                got: self.remaining(),
            });
        }
        Ok(raw as usize)
    }
}

fn decode_bucket(cur: &mut Cursor<'_>) -> Result<Bucket, FleetMapError> {
    // end-of-input at a bucket boundary is a clean terminator
    if cur.remaining() == 0 {
        return Ok(Bucket::default());
    }

    let name_len = cur.read_count(1)?;
    let raw_name = cur.read_bytes(name_len)?;
    let name = std::str::from_utf8(raw_name).map_err(|_| {
        FleetMapError::MalformedSegment(String::from_utf8_lossy(raw_name).into_owned())
    })?;
    let (key, value) = split_kv(name)?;

    let node_count = cur.read_count(4)?;
    let mut nodes = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        nodes.push(NodeIndex(cur.read_i32()?));
    }

    // children may be legally truncated at a bucket boundary, so the count
    // is not bounded by the remaining input; only the preallocation is
    let child_count = cur.read_count(0)?;
    let mut children = Vec::with_capacity(child_count.min(cur.remaining() / MIN_WIRE_BUCKET_SIZE));
    for _ in 0..child_count {
        children.push(decode_bucket(cur)?);
    }

    Ok(Bucket {
        key,
        value,
        nodes,
        children,
    })
}

// =============================================================================
// BUCKET CONVENIENCE
// =============================================================================

impl Bucket {
    /// Serialize this tree with the wire format.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        bucket_to_bytes(self)
    }

    /// Deserialize a tree from the wire format.
    ///
    /// # Errors
    ///
    /// See [`bucket_from_bytes`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, FleetMapError> {
        bucket_from_bytes(data)
    }
}

// =============================================================================
// TESTS
// =============================================================================
