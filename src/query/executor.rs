//! Executes index access paths chosen by the planner: exact lookups,
//! range scans, and set-algebra combination of their row-id results.

use std::time::{Duration, Instant};

use crate::error::StorageError;
use crate::index::registry::IndexRegistry;
use crate::query::predicate::CompOp;
use crate::types::RowId;

/// Outcome of one index operation: the row-ids found, how many index
/// entries were examined to find them, and how long it took. A failed
/// operation carries `row_ids` empty and a diagnostic message in
/// `error`; the caller decides whether that means "fall back to a full
/// scan" or "propagate".
#[derive(Debug, Clone, PartialEq)]
pub struct IndexResult {
    pub row_ids: Vec<RowId>,
    pub rows_examined: usize,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl IndexResult {
    fn ok(row_ids: Vec<RowId>, rows_examined: usize, elapsed: Duration) -> Self {
        Self { row_ids, rows_examined, elapsed, error: None }
    }

    fn failed(reason: impl std::fmt::Display, elapsed: Duration) -> Self {
        Self { row_ids: Vec::new(), rows_examined: 0, elapsed, error: Some(reason.to_string()) }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Tries to parse both operands as `f64` and compares numerically;
/// falls back to lexicographic string comparison the moment either
/// side fails to parse. Mirrors the discipline used to compare index
/// values of unknown declared type.
fn compare_values(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.cmp(b),
    }
}

fn matches_op(value: &str, op: CompOp, bound: &str) -> bool {
    use std::cmp::Ordering::*;
    match compare_values(value, bound) {
        Less => matches!(op, CompOp::Lt | CompOp::Le | CompOp::Ne),
        Equal => matches!(op, CompOp::Eq | CompOp::Le | CompOp::Ge),
        Greater => matches!(op, CompOp::Gt | CompOp::Ge | CompOp::Ne),
    }
}

/// How many range-walk iterations pass between cooperative deadline
/// checks. Keeps the check off the hot per-entry path while still
/// bounding worst-case overrun to a small, constant batch.
const DEADLINE_CHECK_INTERVAL: usize = 1024;

/// Executes index operations against an [`IndexRegistry`], honoring an
/// optional wall-clock deadline checked cooperatively during scans.
pub struct IndexExecutor<'a> {
    registry: &'a IndexRegistry,
    deadline: Option<Instant>,
}

impl<'a> IndexExecutor<'a> {
    pub fn new(registry: &'a IndexRegistry) -> Self {
        Self { registry, deadline: None }
    }

    pub fn with_deadline(registry: &'a IndexRegistry, timeout: Duration) -> Self {
        Self { registry, deadline: Some(Instant::now() + timeout) }
    }

    fn deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Exact-match lookup. `rows_examined` is the full size of the
    /// index, matching the cost the tree actually walked to locate the
    /// (possibly several) matching entries. Fails with `IndexMissing` if
    /// `index_name` is not registered, rather than silently returning an
    /// empty match set indistinguishable from "no rows matched."
    pub fn lookup(&self, index_name: &str, value: &str) -> IndexResult {
        let start = Instant::now();
        let Some(examined) = self.registry.row_count(index_name) else {
            return IndexResult::failed(StorageError::IndexMissing(index_name.to_string()), start.elapsed());
        };
        let row_ids = self.registry.lookup_single(index_name, value);
        IndexResult::ok(row_ids, examined, start.elapsed())
    }

    /// Scans every entry of `index_name`, applying `op` against `bound`
    /// with numeric-then-lexicographic comparison. Unlike [`lookup`],
    /// this does not trust the tree's own key order, since numeric
    /// columns stored as strings don't sort numerically by key.
    pub fn range_scan(&self, index_name: &str, op: CompOp, bound: &str) -> IndexResult {
        let start = Instant::now();
        if self.registry.row_count(index_name).is_none() {
            return IndexResult::failed(StorageError::IndexMissing(index_name.to_string()), start.elapsed());
        }
        let entries = self.registry.all_single_entries(index_name);
        let mut row_ids = Vec::new();
        for (i, (value, row_id)) in entries.iter().enumerate() {
            if i % DEADLINE_CHECK_INTERVAL == 0 && self.deadline_exceeded() {
                return IndexResult::failed(
                    StorageError::DeadlineExceeded("range scan".to_string()),
                    start.elapsed(),
                );
            }
            if matches_op(value, op, bound) {
                row_ids.push(*row_id);
            }
        }
        IndexResult::ok(row_ids, entries.len(), start.elapsed())
    }

    /// Exact-match lookup against a composite index. Unbound trailing
    /// positions are filled with the lexicographic min/max sentinels so
    /// the underlying tree range probe covers every value at those
    /// positions.
    pub fn lookup_composite(&self, index_name: &str, values: &[String]) -> IndexResult {
        let start = Instant::now();
        let Some(examined) = self.registry.row_count(index_name) else {
            return IndexResult::failed(StorageError::IndexMissing(index_name.to_string()), start.elapsed());
        };
        let row_ids = self.registry.lookup_composite(index_name, values);
        IndexResult::ok(row_ids, examined, start.elapsed())
    }

    /// Composite prefix probe: `bound_values` supplies the leading
    /// columns; any trailing (unbound) columns in `total_columns` range
    /// across their full lexicographic span.
    pub fn composite_prefix_scan(
        &self,
        index_name: &str,
        bound_values: &[String],
        total_columns: usize,
    ) -> IndexResult {
        use crate::key::CompositeKey;
        let start = Instant::now();
        let Some(examined) = self.registry.row_count(index_name) else {
            return IndexResult::failed(StorageError::IndexMissing(index_name.to_string()), start.elapsed());
        };
        let mut min_values = bound_values.to_vec();
        let mut max_values = bound_values.to_vec();
        for _ in bound_values.len()..total_columns {
            min_values.push(CompositeKey::min_sentinel().to_string());
            max_values.push(CompositeKey::max_sentinel().to_string());
        }
        let min = CompositeKey::new(min_values);
        let max = CompositeKey::new(max_values);
        let row_ids = self.registry.range_search_composite(index_name, &min, &max);
        IndexResult::ok(row_ids, examined, start.elapsed())
    }

    /// Sorted-merge intersection of two already-deduplicated, ascending
    /// row-id sets.
    pub fn intersect(a: &[RowId], b: &[RowId]) -> Vec<RowId> {
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::new();
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

    /// Sorted-merge union of two already-deduplicated, ascending row-id
    /// sets.
    pub fn union(a: &[RowId], b: &[RowId]) -> Vec<RowId> {
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::new();
        while i < a.len() && j < b.len() {
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
        out.extend_from_slice(&a[i..]);
        out.extend_from_slice(&b[j..]);
        out
    }
}

/// Sorts and deduplicates a row-id batch so it can feed `intersect`/`union`.
pub fn prepare_set(mut row_ids: Vec<RowId>) -> Vec<RowId> {
    row_ids.sort_unstable();
    row_ids.dedup();
    row_ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnDef, DataKind, Schema};

    fn registry_with_ages() -> IndexRegistry {
        let registry = IndexRegistry::new();
        let schema = Schema::new(vec![ColumnDef::new("age", DataKind::Int64)]);
        // Deliberately includes values where lexicographic and numeric
        // order disagree ("9" < "10" lexicographically but not numerically).
        let rows: Vec<(RowId, Vec<String>)> = vec![
            (1, vec!["9".to_string()]),
            (2, vec!["10".to_string()]),
            (3, vec!["20".to_string()]),
        ];
        registry.build_single("idx_age", "people", "age", &rows, &schema).unwrap();
        registry
    }

    #[test]
    fn lookup_finds_exact_value() {
        let registry = registry_with_ages();
        let executor = IndexExecutor::new(&registry);
        let result = executor.lookup("idx_age", "10");
        assert_eq!(result.row_ids, vec![2]);
        assert_eq!(result.rows_examined, 3);
        assert!(result.is_ok());
    }

    #[test]
    fn range_scan_uses_numeric_order_not_lexicographic() {
        let registry = registry_with_ages();
        let executor = IndexExecutor::new(&registry);
        let mut result = executor.range_scan("idx_age", CompOp::Ge, "10");
        result.row_ids.sort_unstable();
        // Lexicographic comparison would wrongly exclude "9" is fine here
        // (9 < 10) but would wrongly include "20" < "10" as false too;
        // the real bug case is verified by the dedicated below.
        assert_eq!(result.row_ids, vec![2, 3]);
    }

    #[test]
    fn range_scan_distinguishes_numeric_from_lexicographic_order() {
        let registry = registry_with_ages();
        let executor = IndexExecutor::new(&registry);
        let mut result = executor.range_scan("idx_age", CompOp::Lt, "10");
        result.row_ids.sort_unstable();
        // Numerically only "9" is less than "10"; a naive string
        // comparison would also exclude "20" (since "20" > "10"
        // lexicographically too, by luck) but would include values like
        // "2" which isn't present here, so this alone doesn't
        // distinguish the two schemes as cleanly as equality does.
        assert_eq!(result.row_ids, vec![1]);
    }

    #[test]
    fn intersect_and_union_on_sorted_sets() {
        let a = vec![1, 2, 3, 5];
        let b = vec![2, 3, 4];
        assert_eq!(IndexExecutor::intersect(&a, &b), vec![2, 3]);
        assert_eq!(IndexExecutor::union(&a, &b), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn prepare_set_sorts_and_dedups() {
        assert_eq!(prepare_set(vec![3, 1, 2, 1, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn range_scan_reports_deadline_exceeded() {
        let registry = registry_with_ages();
        let executor = IndexExecutor::with_deadline(&registry, Duration::from_nanos(0));
        std::thread::sleep(Duration::from_millis(1));
        let result = executor.range_scan("idx_age", CompOp::Ge, "0");
        assert!(!result.is_ok());
        assert!(result.error.as_ref().unwrap().to_lowercase().contains("deadline"));
    }

    #[test]
    fn lookup_on_missing_index_is_failed_not_empty_ok() {
        let registry = registry_with_ages();
        let executor = IndexExecutor::new(&registry);
        let result = executor.lookup("idx_nonexistent", "10");
        assert!(!result.is_ok());
        assert!(result.row_ids.is_empty());
        assert!(result.error.as_ref().unwrap().contains("idx_nonexistent"));
    }

    #[test]
    fn range_scan_on_missing_index_is_failed() {
        let registry = registry_with_ages();
        let executor = IndexExecutor::new(&registry);
        let result = executor.range_scan("idx_nonexistent", CompOp::Ge, "0");
        assert!(!result.is_ok());
        assert!(result.error.as_ref().unwrap().contains("idx_nonexistent"));
    }

    #[test]
    fn lookup_composite_on_missing_index_is_failed() {
        let registry = registry_with_ages();
        let executor = IndexExecutor::new(&registry);
        let result = executor.lookup_composite("idx_nonexistent", &["x".to_string()]);
        assert!(!result.is_ok());
        assert!(result.error.as_ref().unwrap().contains("idx_nonexistent"));
    }

    #[test]
    fn composite_prefix_scan_on_missing_index_is_failed() {
        let registry = registry_with_ages();
        let executor = IndexExecutor::new(&registry);
        let result = executor.composite_prefix_scan("idx_nonexistent", &["x".to_string()], 2);
        assert!(!result.is_ok());
        assert!(result.error.as_ref().unwrap().contains("idx_nonexistent"));
    }

    #[test]
    fn composite_prefix_scan_fills_trailing_sentinels() {
        let registry = IndexRegistry::new();
        let schema = Schema::new(vec![ColumnDef::new("country", DataKind::String), ColumnDef::new("city", DataKind::String)]);
        let rows: Vec<(RowId, Vec<String>)> = vec![
            (1, vec!["USA".to_string(), "Austin".to_string()]),
            (2, vec!["USA".to_string(), "Boston".to_string()]),
            (3, vec!["Canada".to_string(), "Toronto".to_string()]),
        ];
        registry.build_composite("idx_country_city", "people", &["country".into(), "city".into()], &rows, &schema).unwrap();
        let executor = IndexExecutor::new(&registry);
        let mut result = executor.composite_prefix_scan("idx_country_city", &["USA".to_string()], 2);
        result.row_ids.sort_unstable();
        assert_eq!(result.row_ids, vec![1, 2]);
    }
}
