//! Normalizes expression trees: negation sinking, equivalence cleanup,
//! DNF/CNF conversion, AND/OR pushdown, selectivity-based reordering,
//! and redundancy/contradiction elimination.
//!
//! Every step is pure: it takes an expression and returns a new one
//! without mutating the input.

use crate::error::StorageError;
use crate::query::cost::predicate_selectivity;
use crate::query::predicate::{CompOp, Expression, Predicate};

/// Pushes `NOT` down to the leaves via De Morgan's laws, flipping leaf
/// operators and cancelling double negation.
pub fn negate_expr(expr: &Expression) -> Expression {
    match expr {
        Expression::Leaf(p) => Expression::Leaf(p.negated()),
        Expression::And(l, r) => Expression::or(negate_expr(l), negate_expr(r)),
        Expression::Or(l, r) => Expression::and(negate_expr(l), negate_expr(r)),
        Expression::Not(inner) => sink_negations(inner),
    }
}

/// Recursively sinks every `NOT` in the tree to leaf level.
fn sink_negations(expr: &Expression) -> Expression {
    match expr {
        Expression::Leaf(_) => expr.clone(),
        Expression::And(l, r) => Expression::and(sink_negations(l), sink_negations(r)),
        Expression::Or(l, r) => Expression::or(sink_negations(l), sink_negations(r)),
        Expression::Not(inner) => negate_expr(inner),
    }
}

/// Removes double negation and collapses `A ∧ A` / `A ∨ A` to `A`.
pub fn apply_equivalences(expr: &Expression) -> Expression {
    match expr {
        Expression::Leaf(_) => expr.clone(),
        Expression::Not(inner) => {
            if let Expression::Not(inner2) = inner.as_ref() {
                apply_equivalences(inner2)
            } else {
                Expression::negated(apply_equivalences(inner))
            }
        }
        Expression::And(l, r) => {
            let (l, r) = (apply_equivalences(l), apply_equivalences(r));
            if l == r { l } else { Expression::and(l, r) }
        }
        Expression::Or(l, r) => {
            let (l, r) = (apply_equivalences(l), apply_equivalences(r));
            if l == r { l } else { Expression::or(l, r) }
        }
    }
}

/// Converts to disjunctive normal form: distributes AND over OR so the
/// top level is a disjunction of conjunctions of leaves. NOT is sunk
/// first. Stable on input already in DNF.
pub fn to_dnf(expr: &Expression) -> Expression {
    let sunk = sink_negations(expr);
    to_dnf_recursive(&sunk)
}

fn to_dnf_recursive(expr: &Expression) -> Expression {
    match expr {
        Expression::Leaf(_) | Expression::Not(_) => expr.clone(),
        Expression::Or(l, r) => Expression::or(to_dnf_recursive(l), to_dnf_recursive(r)),
        Expression::And(l, r) => {
            let l = to_dnf_recursive(l);
            let r = to_dnf_recursive(r);
            distribute_and_over_or(&l, &r)
        }
    }
}

fn distribute_and_over_or(l: &Expression, r: &Expression) -> Expression {
    match (l, r) {
        (Expression::Or(ll, lr), _) => {
            Expression::or(distribute_and_over_or(ll, r), distribute_and_over_or(lr, r))
        }
        (_, Expression::Or(rl, rr)) => {
            Expression::or(distribute_and_over_or(l, rl), distribute_and_over_or(l, rr))
        }
        _ => Expression::and(l.clone(), r.clone()),
    }
}

/// Converts to conjunctive normal form: distributes OR over AND. NOT is
/// sunk first. Stable on input already in CNF.
pub fn to_cnf(expr: &Expression) -> Expression {
    let sunk = sink_negations(expr);
    to_cnf_recursive(&sunk)
}

fn to_cnf_recursive(expr: &Expression) -> Expression {
    match expr {
        Expression::Leaf(_) | Expression::Not(_) => expr.clone(),
        Expression::And(l, r) => Expression::and(to_cnf_recursive(l), to_cnf_recursive(r)),
        Expression::Or(l, r) => {
            let l = to_cnf_recursive(l);
            let r = to_cnf_recursive(r);
            distribute_or_over_and(&l, &r)
        }
    }
}

fn distribute_or_over_and(l: &Expression, r: &Expression) -> Expression {
    match (l, r) {
        (Expression::And(ll, lr), _) => Expression::and(distribute_or_over_and(ll, r), distribute_or_over_and(lr, r)),
        (_, Expression::And(rl, rr)) => Expression::and(distribute_or_over_and(l, rl), distribute_or_over_and(l, rr)),
        _ => Expression::or(l.clone(), r.clone()),
    }
}

/// When an AND has an OR child, distributes so AND sits at the leaves
/// (equivalent to DNF conversion restricted to exposing independent
/// index-evaluable branches).
pub fn pushdown_filters(expr: &Expression) -> Expression {
    to_dnf(expr)
}

/// Flattens a top-level AND chain, sorts by ascending per-predicate
/// selectivity (most selective first), and rebuilds as a left-leaning
/// AND. Expressions that are not a pure AND chain of leaves are returned
/// unchanged.
pub fn reorder_by_selectivity(expr: &Expression) -> Expression {
    let Some(mut leaves) = expr.flatten_and() else { return expr.clone() };
    if leaves.len() <= 1 {
        return expr.clone();
    }
    leaves.sort_by(|a, b| predicate_selectivity(a).partial_cmp(&predicate_selectivity(b)).unwrap());
    Expression::and_chain(leaves.into_iter().map(Expression::leaf).collect())
}

/// For the same column, `a > 10` dominates `a > 5`; `a >= 10` dominates
/// `a > 5`; `a < 10` dominates `a < 100`; `a = 5` dominates
/// `a IN (..., 5, ...)`.
pub fn is_dominated(dominant: &Predicate, redundant: &Predicate) -> bool {
    if dominant.column != redundant.column {
        return false;
    }
    let (Ok(dv), Ok(rv)) = (dominant.value.parse::<f64>(), redundant.value.parse::<f64>()) else {
        return dominant.operator == CompOp::Eq
            && matches!(redundant.operator, CompOp::In)
            && redundant.value.split(',').map(str::trim).any(|v| v == dominant.value);
    };
    match (dominant.operator, redundant.operator) {
        (CompOp::Gt | CompOp::Ge, CompOp::Gt | CompOp::Ge) => dv >= rv,
        (CompOp::Lt | CompOp::Le, CompOp::Lt | CompOp::Le) => dv <= rv,
        (CompOp::Eq, CompOp::In) => redundant.value.split(',').map(str::trim).any(|v| v == dominant.value),
        _ => false,
    }
}

/// Detects a same-column contradiction: `a = 5 AND a = 10`, or
/// `a > x AND a < y` with `x >= y`.
pub fn are_contradictory(a: &Predicate, b: &Predicate) -> bool {
    if a.column != b.column {
        return false;
    }
    if a.operator == CompOp::Eq && b.operator == CompOp::Eq {
        return a.value != b.value;
    }
    let (Ok(av), Ok(bv)) = (a.value.parse::<f64>(), b.value.parse::<f64>()) else { return false };
    let lower = match a.operator {
        CompOp::Gt | CompOp::Ge => Some((av, a.operator == CompOp::Gt)),
        _ => None,
    };
    let upper = match b.operator {
        CompOp::Lt | CompOp::Le => Some((bv, b.operator == CompOp::Lt)),
        _ => None,
    };
    if let (Some((lo, lo_strict)), Some((hi, hi_strict))) = (lower, upper) {
        return if lo_strict || hi_strict { lo >= hi } else { lo > hi };
    }
    // Try the symmetric case (b supplies the lower bound, a the upper).
    let lower = match b.operator {
        CompOp::Gt | CompOp::Ge => Some((bv, b.operator == CompOp::Gt)),
        _ => None,
    };
    let upper = match a.operator {
        CompOp::Lt | CompOp::Le => Some((av, a.operator == CompOp::Lt)),
        _ => None,
    };
    if let (Some((lo, lo_strict)), Some((hi, hi_strict))) = (lower, upper) {
        return if lo_strict || hi_strict { lo >= hi } else { lo > hi };
    }
    false
}

/// Drops AND-chain predicates dominated by another on the same column.
/// If the chain contains a contradiction, returns `Err(Contradiction)`
/// to signal the predicate is always false (the planner degenerates to
/// an empty materialisation) rather than silently collapsing to "no
/// predicate."
pub fn eliminate_redundant(expr: &Expression) -> Result<Expression, StorageError> {
    let Some(leaves) = expr.flatten_and() else { return Ok(expr.clone()) };
    for i in 0..leaves.len() {
        for j in 0..leaves.len() {
            if i != j && are_contradictory(&leaves[i], &leaves[j]) {
                return Err(StorageError::Contradiction(format!(
                    "{} {} {} conflicts with {} {} {}",
                    leaves[i].column, leaves[i].operator, leaves[i].value,
                    leaves[j].column, leaves[j].operator, leaves[j].value,
                )));
            }
        }
    }
    let mut kept: Vec<Predicate> = Vec::new();
    for (i, p) in leaves.iter().enumerate() {
        let dominated_by_another =
            leaves.iter().enumerate().any(|(j, other)| i != j && is_dominated(other, p));
        if !dominated_by_another && !kept.iter().any(|k| k == p) {
            kept.push(p.clone());
        }
    }
    if kept.is_empty() {
        return Ok(expr.clone());
    }
    Ok(Expression::and_chain(kept.into_iter().map(Expression::leaf).collect()))
}

/// Runs the full normalization pipeline: negation sinking, equivalence
/// cleanup, pushdown, selectivity reordering, and redundancy/
/// contradiction elimination. Idempotent: `normalize(normalize(e))`
/// equals `normalize(e)` structurally. Fails with `Contradiction` if the
/// expression can never be true.
pub fn normalize(expr: &Expression) -> Result<Expression, StorageError> {
    let sunk = sink_negations(expr);
    let cleaned = apply_equivalences(&sunk);
    let pushed = pushdown_filters(&cleaned);
    let reduced = eliminate_redundant(&pushed)?;
    Ok(reorder_by_selectivity(&reduced))
}
