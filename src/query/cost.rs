//! Selectivity estimation and access-path cost model.

use crate::query::predicate::{CompOp, Predicate};

/// Tunable thresholds and default selectivities for the cost model.
/// Exposed so tests can exercise indexed paths over small fixtures
/// without waiting for a 1000-row table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexConfig {
    /// Minimum branching factor `t` for new B-trees.
    pub branching_factor: usize,
    /// Minimum table size before the planner will consider an index.
    pub min_table_size: usize,
    /// Combined selectivity must be below this for a single predicate's
    /// indexed path to be preferred (composite indexes ignore this).
    pub selectivity_threshold: f64,
    /// Minimum estimated speedup required to prefer an indexed path.
    pub min_speedup: f64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { branching_factor: 4, min_table_size: 1000, selectivity_threshold: 0.5, min_speedup: 1.3 }
    }
}

impl IndexConfig {
    /// A config tuned so small in-memory fixtures exercise indexed
    /// strategies (no production table has 2 rows).
    pub fn for_testing() -> Self {
        Self { min_table_size: 2, ..Self::default() }
    }

    /// A config tuned for very large tables, where even modest
    /// selectivity gains pay off the index-lookup overhead.
    pub fn for_large_tables() -> Self {
        Self { min_table_size: 10_000, selectivity_threshold: 0.3, min_speedup: 2.0, ..Self::default() }
    }
}

/// Default per-operator selectivity used by the rewriter's reordering
/// step and as the cost model's estimate absent real statistics.
pub fn default_selectivity(op: CompOp) -> f64 {
    match op {
        CompOp::Eq => 0.01,
        CompOp::Lt | CompOp::Gt => 0.25,
        CompOp::Le | CompOp::Ge => 0.30,
        CompOp::In => 0.10,
        CompOp::Ne | CompOp::NotIn => 0.80,
    }
}

pub fn predicate_selectivity(predicate: &Predicate) -> f64 {
    default_selectivity(predicate.operator)
}

/// Combined selectivity of an AND chain, assuming independence: the
/// product of per-predicate selectivities.
pub fn combined_selectivity_and(selectivities: &[f64]) -> f64 {
    selectivities.iter().product()
}

/// Combined selectivity of an OR chain, assuming independence:
/// `1 - product(1 - s_i)`.
pub fn combined_selectivity_or(selectivities: &[f64]) -> f64 {
    1.0 - selectivities.iter().fold(1.0, |acc, s| acc * (1.0 - s))
}

/// Relative-unit cost formulas, one row's worth of work per unit.
pub struct CostModel;

impl CostModel {
    pub fn full_scan(rows: usize) -> f64 {
        rows as f64
    }

    pub fn index_single(rows: usize, estimated_matches: usize) -> f64 {
        (rows as f64).max(1.0).log2() + estimated_matches as f64
    }

    pub fn index_range(rows: usize, selectivity: f64) -> f64 {
        (rows as f64).max(1.0).log2() + selectivity * rows as f64
    }

    pub fn index_composite(rows: usize, estimated_matches: usize) -> f64 {
        Self::index_single(rows, estimated_matches)
    }

    /// Intersection cost over `m` per-predicate range/point lookups plus
    /// the cost of materializing the output.
    pub fn index_intersection(rows: usize, selectivities: &[f64], output_size: usize) -> f64 {
        let leaves: f64 =
            selectivities.iter().map(|s| (rows as f64).max(1.0).log2() + s * rows as f64).sum();
        leaves + output_size as f64
    }

    pub fn index_union(rows: usize, selectivities: &[f64], output_size: usize) -> f64 {
        Self::index_intersection(rows, selectivities, output_size)
    }

    /// Speedup of `chosen` over a full scan of `rows`, floored at 1.0
    /// (an indexed path is never reported as slower than a scan).
    pub fn speedup(rows: usize, chosen_cost: f64) -> f64 {
        if chosen_cost <= 0.0 {
            return 1.0;
        }
        (Self::full_scan(rows) / chosen_cost).max(1.0)
    }
}
