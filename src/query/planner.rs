//! Chooses an access strategy for a normalized WHERE expression given
//! the available indexes and table size.

use crate::index::registry::IndexRegistry;
use crate::query::cost::{combined_selectivity_and, combined_selectivity_or, predicate_selectivity, CostModel, IndexConfig};
use crate::query::predicate::{CompOp, Expression, Predicate};
use crate::query::rewriter;

/// The chosen access path for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    FullScan,
    IndexSingle,
    IndexRange,
    IndexComposite,
    IndexIntersection,
    IndexUnion,
    Hybrid,
}

/// A column lacking a covering index, surfaced as advice rather than
/// acted upon by the planner itself.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecommendation {
    pub index_name: String,
    pub columns: Vec<String>,
    pub reason: String,
    pub estimated_improvement: f64,
}

/// The planner's output: chosen strategy, the indexes it will use,
/// estimated cost/row metrics, and a human-readable explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationPlan {
    pub strategy: Strategy,
    pub indexes_used: Vec<String>,
    pub estimated_speedup: f64,
    pub estimated_rows: usize,
    pub execution_plan_text: String,
    pub cost_breakdown: String,
    pub index_recommendations: Vec<IndexRecommendation>,
}

impl OptimizationPlan {
    fn full_scan(table_rows: usize, reason: &str) -> Self {
        Self {
            strategy: Strategy::FullScan,
            indexes_used: Vec::new(),
            estimated_speedup: 1.0,
            estimated_rows: table_rows,
            execution_plan_text: format!("Execution Plan:\n  1. FullScan: {reason}"),
            cost_breakdown: format!("full_scan_cost = {table_rows} rows"),
            index_recommendations: Vec::new(),
        }
    }
}

fn recommend(column: &str) -> IndexRecommendation {
    IndexRecommendation {
        index_name: format!("idx_{column}"),
        columns: vec![column.to_string()],
        reason: format!("no index covers column `{column}`"),
        estimated_improvement: 50.0,
    }
}

/// Plans a single-column predicate (exact match or range).
fn plan_single(table: &str, p: &Predicate, table_rows: usize, registry: &IndexRegistry, cfg: &IndexConfig) -> OptimizationPlan {
    let Some(index_name) = registry.find_single(table, &p.column) else {
        let mut plan = OptimizationPlan::full_scan(table_rows, &format!("{} {} {}", p.column, p.operator, p.value));
        plan.index_recommendations.push(recommend(&p.column));
        return plan;
    };

    let selectivity = predicate_selectivity(p);
    let estimated_rows = ((table_rows as f64) * selectivity).round() as usize;

    let (strategy, cost, step) = if p.operator == CompOp::Eq {
        (Strategy::IndexSingle, CostModel::index_single(table_rows, estimated_rows), "IndexSingleLookup")
    } else if p.operator.is_range() {
        (Strategy::IndexRange, CostModel::index_range(table_rows, selectivity), "IndexRangeScan")
    } else {
        let mut plan = OptimizationPlan::full_scan(table_rows, &format!("{} {} {}", p.column, p.operator, p.value));
        plan.index_recommendations.push(recommend(&p.column));
        return plan;
    };

    let speedup = CostModel::speedup(table_rows, cost);
    if speedup < cfg.min_speedup {
        return OptimizationPlan::full_scan(table_rows, "below minimum speedup threshold");
    }

    OptimizationPlan {
        strategy,
        indexes_used: vec![index_name.clone()],
        estimated_speedup: speedup,
        estimated_rows,
        execution_plan_text: format!(
            "Execution Plan:\n  1. {step}: {} {} {} using {index_name}",
            p.column, p.operator, p.value
        ),
        cost_breakdown: format!("index_lookup_cost + rows*memory_read_cost = {cost:.4}"),
        index_recommendations: Vec::new(),
    }
}

/// Plans a pure-AND multi-predicate chain: composite index, else
/// intersection of single indexes, else full scan.
fn plan_and(table: &str, predicates: &[Predicate], table_rows: usize, registry: &IndexRegistry, cfg: &IndexConfig) -> OptimizationPlan {
    let columns: Vec<String> = predicates.iter().map(|p| p.column.clone()).collect();
    let selectivities: Vec<f64> = predicates.iter().map(predicate_selectivity).collect();
    let combined = combined_selectivity_and(&selectivities);
    let estimated_rows = ((table_rows as f64) * combined).round() as usize;

    if let Some((index_name, _matched)) = registry.find_composite_prefix(table, &columns) {
        let cost = CostModel::index_composite(table_rows, estimated_rows);
        let speedup = CostModel::speedup(table_rows, cost);
        if speedup >= cfg.min_speedup {
            let desc = predicates
                .iter()
                .map(|p| format!("{} {} {}", p.column, p.operator, p.value))
                .collect::<Vec<_>>()
                .join(" AND ");
            return OptimizationPlan {
                strategy: Strategy::IndexComposite,
                indexes_used: vec![index_name.clone()],
                estimated_speedup: speedup,
                estimated_rows,
                execution_plan_text: format!("Execution Plan:\n  1. CompositeIndexLookup: {desc}"),
                cost_breakdown: format!("composite_probe_cost = {cost:.4}"),
                index_recommendations: Vec::new(),
            };
        }
    }

    let indexes: Option<Vec<String>> = predicates.iter().map(|p| registry.find_single(table, &p.column)).collect();
    match indexes {
        Some(indexes) => {
            let cost = CostModel::index_intersection(table_rows, &selectivities, estimated_rows);
            let speedup = CostModel::speedup(table_rows, cost);
            if speedup < cfg.min_speedup {
                return OptimizationPlan::full_scan(table_rows, "intersection below minimum speedup threshold");
            }
            let steps: Vec<String> = predicates
                .iter()
                .zip(&indexes)
                .enumerate()
                .map(|(i, (p, idx))| format!("  {}. IndexLookup: {} {} {} using {idx}", i + 1, p.column, p.operator, p.value))
                .collect();
            OptimizationPlan {
                strategy: Strategy::IndexIntersection,
                indexes_used: indexes,
                estimated_speedup: speedup,
                estimated_rows,
                execution_plan_text: format!(
                    "Execution Plan:\n{}\n  {}. Intersect results",
                    steps.join("\n"),
                    steps.len() + 1
                ),
                cost_breakdown: format!("intersection_cost = {cost:.4}"),
                index_recommendations: Vec::new(),
            }
        }
        None => {
            let mut plan = OptimizationPlan::full_scan(table_rows, "not every AND column has a covering index");
            for p in predicates {
                if registry.find_single(table, &p.column).is_none() {
                    plan.index_recommendations.push(recommend(&p.column));
                }
            }
            plan
        }
    }
}

/// Plans a pure-OR multi-predicate chain: union of single indexes if
/// every column is covered, else full scan (any missing index forces a
/// scan since correctness requires evaluating every branch).
fn plan_or(table: &str, predicates: &[Predicate], table_rows: usize, registry: &IndexRegistry, cfg: &IndexConfig) -> OptimizationPlan {
    let selectivities: Vec<f64> = predicates.iter().map(predicate_selectivity).collect();
    let combined = combined_selectivity_or(&selectivities);
    let estimated_rows = ((table_rows as f64) * combined).round() as usize;

    let indexes: Option<Vec<String>> = predicates.iter().map(|p| registry.find_single(table, &p.column)).collect();
    match indexes {
        Some(indexes) => {
            let cost = CostModel::index_union(table_rows, &selectivities, estimated_rows);
            let speedup = CostModel::speedup(table_rows, cost);
            if speedup < cfg.min_speedup {
                return OptimizationPlan::full_scan(table_rows, "union below minimum speedup threshold");
            }
            let steps: Vec<String> = predicates
                .iter()
                .zip(&indexes)
                .enumerate()
                .map(|(i, (p, idx))| format!("  {}. IndexLookup: {} {} {} using {idx}", i + 1, p.column, p.operator, p.value))
                .collect();
            OptimizationPlan {
                strategy: Strategy::IndexUnion,
                indexes_used: indexes,
                estimated_speedup: speedup,
                estimated_rows,
                execution_plan_text: format!(
                    "Execution Plan:\n{}\n  {}. Union results",
                    steps.join("\n"),
                    steps.len() + 1
                ),
                cost_breakdown: format!("union_cost = {cost:.4}"),
                index_recommendations: Vec::new(),
            }
        }
        None => {
            let mut plan = OptimizationPlan::full_scan(table_rows, "not every OR branch has a covering index");
            for p in predicates {
                if registry.find_single(table, &p.column).is_none() {
                    plan.index_recommendations.push(recommend(&p.column));
                }
            }
            plan
        }
    }
}

/// Produces an `OptimizationPlan` for `expr` (already normalized by
/// [`rewriter::normalize`], or `None` meaning "no predicate") against
/// `table`, which has `table_rows` rows.
pub fn plan(table: &str, expr: Option<&Expression>, table_rows: usize, registry: &IndexRegistry, cfg: &IndexConfig) -> OptimizationPlan {
    let Some(expr) = expr else { return OptimizationPlan::full_scan(table_rows, "empty predicate") };
    if table_rows < cfg.min_table_size {
        return OptimizationPlan::full_scan(table_rows, "table below minimum indexable size");
    }

    if let Some(leaves) = expr.flatten_and() {
        if leaves.len() == 1 {
            return plan_single(table, &leaves[0], table_rows, registry, cfg);
        }
        return plan_and(table, &leaves, table_rows, registry, cfg);
    }

    if let Some(leaves) = expr.flatten_or() {
        if leaves.len() == 1 {
            return plan_single(table, &leaves[0], table_rows, registry, cfg);
        }
        return plan_or(table, &leaves, table_rows, registry, cfg);
    }

    // Mixed AND/OR: normalize to DNF, plan each disjunct independently
    // as its own AND block (or single predicate), then union the
    // disjuncts. A disjunct with no covering index forces the whole
    // query to a full scan: disjuncts aren't independently skippable,
    // every row must still be checked against the others.
    let dnf = rewriter::to_dnf(expr);
    let disjuncts = dnf.or_disjuncts();
    let mut sub_plans = Vec::new();
    for d in &disjuncts {
        let sub = plan_disjunct(table, d, table_rows, registry, cfg);
        if sub.strategy == Strategy::FullScan {
            return OptimizationPlan::full_scan(table_rows, "mixed expression has a disjunct with no covering index");
        }
        sub_plans.push(sub);
    }

    let indexes_used: Vec<String> = sub_plans.iter().flat_map(|p| p.indexes_used.clone()).collect();
    let estimated_rows: usize = sub_plans.iter().map(|p| p.estimated_rows).sum();
    let avg_speedup = sub_plans.iter().map(|p| p.estimated_speedup).sum::<f64>() / sub_plans.len() as f64;
    let steps: Vec<String> = sub_plans
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let body = p.execution_plan_text.strip_prefix("Execution Plan:\n").unwrap_or(&p.execution_plan_text);
            format!("  {}. Disjunct ({:?}):\n{}", i + 1, p.strategy, indent_block(body, "     "))
        })
        .collect();
    OptimizationPlan {
        strategy: Strategy::Hybrid,
        indexes_used,
        estimated_speedup: avg_speedup,
        estimated_rows,
        execution_plan_text: format!("Execution Plan:\n{}\n  {}. Union disjunct results", steps.join("\n"), steps.len() + 1),
        cost_breakdown: "hybrid_cost = sum(disjunct costs)".to_string(),
        index_recommendations: Vec::new(),
    }
}

/// Plans a single DNF disjunct, which is either a lone predicate or a
/// conjunction of predicates (never itself an `Or` — `or_disjuncts`
/// already split those out).
fn plan_disjunct(table: &str, d: &Expression, table_rows: usize, registry: &IndexRegistry, cfg: &IndexConfig) -> OptimizationPlan {
    match d.flatten_and() {
        Some(leaves) if leaves.len() == 1 => plan_single(table, &leaves[0], table_rows, registry, cfg),
        Some(leaves) => plan_and(table, &leaves, table_rows, registry, cfg),
        None => OptimizationPlan::full_scan(table_rows, "disjunct is not a pure AND block of leaves"),
    }
}

fn indent_block(body: &str, prefix: &str) -> String {
    body.lines().map(|l| format!("{prefix}{l}")).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnDef, DataKind, RowId, Schema};

    fn users_schema() -> Schema {
        Schema::new(vec![
            ColumnDef::new("id", DataKind::Int64),
            ColumnDef::new("age", DataKind::Int64),
            ColumnDef::new("country", DataKind::String),
        ])
    }

    fn leaf(col: &str, op: CompOp, val: &str) -> Expression {
        Expression::leaf(Predicate::new(col, op, val))
    }

    #[test]
    fn s1_point_lookup_with_index() {
        let registry = IndexRegistry::new();
        let schema = users_schema();
        let rows: Vec<(RowId, Vec<String>)> =
            (1..=2000).map(|i| (i, vec![i.to_string(), "30".to_string(), "USA".to_string()])).collect();
        registry.build_single("idx_id", "users", "id", &rows, &schema).unwrap();
        let cfg = IndexConfig::default();
        let expr = leaf("id", CompOp::Eq, "42");
        let result = plan("users", Some(&expr), 2000, &registry, &cfg);
        assert_eq!(result.strategy, Strategy::IndexSingle);
        assert_eq!(result.indexes_used, vec!["idx_id".to_string()]);
    }

    #[test]
    fn s2_range_scan() {
        let registry = IndexRegistry::new();
        let schema = users_schema();
        let rows: Vec<(RowId, Vec<String>)> =
            (1..=2000).map(|i| (i, vec![i.to_string(), "30".to_string(), "USA".to_string()])).collect();
        registry.build_single("idx_id", "users", "id", &rows, &schema).unwrap();
        let cfg = IndexConfig::default();
        let expr = leaf("id", CompOp::Ge, "1900");
        let result = plan("users", Some(&expr), 2000, &registry, &cfg);
        assert_eq!(result.strategy, Strategy::IndexRange);
    }

    #[test]
    fn s3_and_with_composite_index() {
        let registry = IndexRegistry::new();
        let schema = users_schema();
        let rows: Vec<(RowId, Vec<String>)> =
            (1..=2000).map(|i| (i, vec![i.to_string(), "30".to_string(), "USA".to_string()])).collect();
        registry.build_composite("idx_age_country", "users", &["age".into(), "country".into()], &rows, &schema).unwrap();
        let cfg = IndexConfig::default();
        let expr = Expression::and(leaf("age", CompOp::Eq, "30"), leaf("country", CompOp::Eq, "USA"));
        let result = plan("users", Some(&expr), 2000, &registry, &cfg);
        assert_eq!(result.strategy, Strategy::IndexComposite);
        assert_eq!(result.indexes_used, vec!["idx_age_country".to_string()]);
    }

    #[test]
    fn s4_and_intersection_fallback() {
        let registry = IndexRegistry::new();
        let schema = users_schema();
        let rows: Vec<(RowId, Vec<String>)> =
            (1..=2000).map(|i| (i, vec![i.to_string(), "30".to_string(), "USA".to_string()])).collect();
        registry.build_single("idx_age", "users", "age", &rows, &schema).unwrap();
        registry.build_single("idx_country", "users", "country", &rows, &schema).unwrap();
        let cfg = IndexConfig::default();
        let expr = Expression::and(leaf("age", CompOp::Eq, "30"), leaf("country", CompOp::Eq, "USA"));
        let result = plan("users", Some(&expr), 2000, &registry, &cfg);
        assert_eq!(result.strategy, Strategy::IndexIntersection);
        assert!(result.indexes_used.contains(&"idx_age".to_string()));
        assert!(result.indexes_used.contains(&"idx_country".to_string()));
    }

    #[test]
    fn s5_or_union() {
        let registry = IndexRegistry::new();
        let schema = Schema::new(vec![ColumnDef::new("status", DataKind::String)]);
        let rows: Vec<(RowId, Vec<String>)> = (1..=2000).map(|i| (i, vec!["active".to_string()])).collect();
        registry.build_single("idx_status", "users", "status", &rows, &schema).unwrap();
        let cfg = IndexConfig::default();
        let expr = Expression::or(leaf("status", CompOp::Eq, "active"), leaf("status", CompOp::Eq, "pending"));
        let result = plan("users", Some(&expr), 2000, &registry, &cfg);
        assert_eq!(result.strategy, Strategy::IndexUnion);
    }

    #[test]
    fn s6_small_table_forces_scan() {
        let registry = IndexRegistry::new();
        let schema = users_schema();
        let rows: Vec<(RowId, Vec<String>)> =
            (1..=500).map(|i| (i, vec![i.to_string(), "30".to_string(), "USA".to_string()])).collect();
        registry.build_single("idx_id", "users", "id", &rows, &schema).unwrap();
        let cfg = IndexConfig::default();
        let expr = leaf("id", CompOp::Eq, "1");
        let result = plan("users", Some(&expr), 500, &registry, &cfg);
        assert_eq!(result.strategy, Strategy::FullScan);
        assert_eq!(result.estimated_speedup, 1.0);
    }

    #[test]
    fn missing_index_recommends_one() {
        let registry = IndexRegistry::new();
        let schema = users_schema();
        let rows: Vec<(RowId, Vec<String>)> =
            (1..=2000).map(|i| (i, vec![i.to_string(), "30".to_string(), "USA".to_string()])).collect();
        registry.build_single("idx_id", "users", "id", &rows, &schema).unwrap();
        let cfg = IndexConfig::default();
        let expr = leaf("country", CompOp::Eq, "USA");
        let result = plan("users", Some(&expr), 2000, &registry, &cfg);
        assert_eq!(result.strategy, Strategy::FullScan);
        assert_eq!(result.index_recommendations.len(), 1);
        assert_eq!(result.index_recommendations[0].columns, vec!["country".to_string()]);
    }

    #[test]
    fn empty_predicate_is_full_scan() {
        let registry = IndexRegistry::new();
        let cfg = IndexConfig::default();
        let result = plan("users", None, 2000, &registry, &cfg);
        assert_eq!(result.strategy, Strategy::FullScan);
    }

    #[test]
    fn mixed_and_or_with_multi_predicate_disjunct_is_hybrid() {
        // (age = 30 AND country = USA) OR status = vip
        let registry = IndexRegistry::new();
        let schema = Schema::new(vec![
            ColumnDef::new("age", DataKind::Int64),
            ColumnDef::new("country", DataKind::String),
            ColumnDef::new("status", DataKind::String),
        ]);
        let rows: Vec<(RowId, Vec<String>)> = (1..=2000)
            .map(|i| (i, vec!["30".to_string(), "USA".to_string(), "member".to_string()]))
            .collect();
        registry.build_single("idx_age", "users", "age", &rows, &schema).unwrap();
        registry.build_single("idx_country", "users", "country", &rows, &schema).unwrap();
        registry.build_single("idx_status", "users", "status", &rows, &schema).unwrap();
        let cfg = IndexConfig::default();

        let expr = Expression::or(
            Expression::and(leaf("age", CompOp::Eq, "30"), leaf("country", CompOp::Eq, "USA")),
            leaf("status", CompOp::Eq, "vip"),
        );
        let result = plan("users", Some(&expr), 2000, &registry, &cfg);
        assert_eq!(result.strategy, Strategy::Hybrid);
        assert!(result.indexes_used.contains(&"idx_age".to_string()));
        assert!(result.indexes_used.contains(&"idx_country".to_string()));
        assert!(result.indexes_used.contains(&"idx_status".to_string()));
        // The intersection disjunct's own per-predicate steps must survive,
        // not just its final "Intersect results" line.
        assert!(result.execution_plan_text.contains("Intersect results"));
        assert!(result.execution_plan_text.matches("IndexLookup").count() >= 2);
    }

    #[test]
    fn mixed_and_or_falls_back_to_scan_when_a_disjunct_is_uncovered() {
        let registry = IndexRegistry::new();
        let schema = Schema::new(vec![
            ColumnDef::new("age", DataKind::Int64),
            ColumnDef::new("country", DataKind::String),
            ColumnDef::new("status", DataKind::String),
        ]);
        let rows: Vec<(RowId, Vec<String>)> = (1..=2000)
            .map(|i| (i, vec!["30".to_string(), "USA".to_string(), "member".to_string()]))
            .collect();
        registry.build_single("idx_age", "users", "age", &rows, &schema).unwrap();
        registry.build_single("idx_country", "users", "country", &rows, &schema).unwrap();
        // No index on `status`.
        let cfg = IndexConfig::default();

        let expr = Expression::or(
            Expression::and(leaf("age", CompOp::Eq, "30"), leaf("country", CompOp::Eq, "USA")),
            leaf("status", CompOp::Eq, "vip"),
        );
        let result = plan("users", Some(&expr), 2000, &registry, &cfg);
        assert_eq!(result.strategy, Strategy::FullScan);
    }
}
