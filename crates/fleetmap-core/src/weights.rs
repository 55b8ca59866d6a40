//! # Weights
//!
//! Aggregators and normalizers used to bias node sampling.
//!
//! An [`Aggregator`] folds node attributes into a scalar (mean capacity,
//! minimum price); a [`Normalizer`] rescales a raw weight. Weight functions
//! compose normalizers into a per-node score.

use crate::bucket::Bucket;
use crate::types::NodeInfo;

// =============================================================================
// CAPABILITY TRAITS
// =============================================================================

/// Fold over node attributes producing a scalar.
pub trait Aggregator {
    /// Feed one node's attributes into the fold.
    fn add(&mut self, n: &NodeInfo);

    /// The folded value. An aggregator that saw no nodes computes `0.0`.
    fn compute(&self) -> f64;
}

/// Unary rescaling of a raw weight.
pub trait Normalizer {
    /// Map a raw weight to its normalized value.
    fn normalize(&self, w: f64) -> f64;
}

/// Per-node weight used to bias sampling.
pub type WeightFunc = Box<dyn Fn(&NodeInfo) -> f64 + Send + Sync>;

// =============================================================================
// AGGREGATORS
// =============================================================================

/// Mean capacity, sum form: `sum(capacity) / count`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanCapSumAgg {
    sum: u64,
    count: usize,
}

impl Aggregator for MeanCapSumAgg {
    fn add(&mut self, n: &NodeInfo) {
        self.sum += n.capacity;
        self.count += 1;
    }

    fn compute(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum as f64 / self.count as f64
    }
}

/// Mean capacity, streaming form.
///
/// Keeps a running mean instead of a sum, so large fleets cannot overflow
/// the accumulator: `mean <- mean * (count / (count + 1)) + capacity / (count + 1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanCapAgg {
    mean: f64,
    count: usize,
}

impl Aggregator for MeanCapAgg {
    fn add(&mut self, n: &NodeInfo) {
        let c = self.count + 1;
        self.mean = self.mean * (self.count as f64 / c as f64) + n.capacity as f64 / c as f64;
        self.count = c;
    }

    fn compute(&self) -> f64 {
        self.mean
    }
}

/// Smallest non-zero price seen. A price of zero means "unset" and is
/// skipped; an aggregator that saw only unset prices computes `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinPriceAgg {
    min: u64,
}

impl Aggregator for MinPriceAgg {
    fn add(&mut self, n: &NodeInfo) {
        if n.price != 0 && (self.min == 0 || n.price < self.min) {
            self.min = n.price;
        }
    }

    fn compute(&self) -> f64 {
        self.min as f64
    }
}

// =============================================================================
// NORMALIZERS
// =============================================================================

/// `min / w`, with `0` for a zero weight.
#[derive(Debug, Clone, Copy)]
pub struct ReverseMinNorm {
    /// The minimum the weights are related to.
    pub min: f64,
}

impl Normalizer for ReverseMinNorm {
    fn normalize(&self, w: f64) -> f64 {
        if w == 0.0 {
            return 0.0;
        }
        self.min / w
    }
}

/// `x / (1 + x)` with `x = w / scale`, mapping weights into `[0, 1)`.
#[derive(Debug, Clone, Copy)]
pub struct SigmoidNorm {
    /// Scale at which the output reaches `0.5`. Must be positive; a zero
    /// scale normalizes everything to `0`.
    pub scale: f64,
}

impl Normalizer for SigmoidNorm {
    fn normalize(&self, w: f64) -> f64 {
        if self.scale == 0.0 {
            return 0.0;
        }
        let x = w / self.scale;
        x / (1.0 + x)
    }
}

/// Constant weight regardless of input.
#[derive(Debug, Clone, Copy)]
pub struct ConstNorm {
    /// The constant.
    pub value: f64,
}

impl Normalizer for ConstNorm {
    fn normalize(&self, _w: f64) -> f64 {
        self.value
    }
}

// =============================================================================
// WEIGHT FUNCTIONS
// =============================================================================

/// Weight equal to raw capacity.
#[must_use]
pub fn cap_weight_func(n: &NodeInfo) -> f64 {
    n.capacity as f64
}

/// Weight as the product of normalized capacity and normalized price.
pub fn new_weight_func<C, P>(cap_norm: C, price_norm: P) -> WeightFunc
where
    C: Normalizer + Send + Sync + 'static,
    P: Normalizer + Send + Sync + 'static,
{
    Box::new(move |n: &NodeInfo| {
        cap_norm.normalize(n.capacity as f64) * price_norm.normalize(n.price as f64)
    })
}

/// The default weight function over a node table: capacity through a
/// sigmoid scaled by the fleet's mean capacity, price flat at `1`.
///
/// TODO apply `MinPriceAgg` with `ReverseMinNorm` to the price factor once
/// price data is populated fleet-wide.
#[must_use]
pub fn default_weight_func(nodes: &[NodeInfo]) -> WeightFunc {
    let mut agg = MeanCapAgg::default();
    for n in nodes {
        agg.add(n);
    }
    new_weight_func(SigmoidNorm { scale: agg.compute() }, ConstNorm { value: 1.0 })
}

// =============================================================================
// TREE TRAVERSAL
// =============================================================================

impl Bucket {
    /// Feed every node under this bucket to an aggregator and return it.
    ///
    /// `table` is the externally owned node table the tree's identifiers
    /// point into; identifiers outside the table are skipped.
    pub fn traverse<'a, A: Aggregator>(&self, table: &[NodeInfo], agg: &'a mut A) -> &'a mut A {
        for id in &self.nodes {
            if let Some(n) = table.get(id.0 as usize) {
                agg.add(n);
            }
        }
        agg
    }
}

// =============================================================================
// TESTS
// =============================================================================
