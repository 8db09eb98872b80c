//! Predicate and expression-tree model for WHERE-clause analysis.

use std::fmt;

/// Comparison operator carried by a predicate leaf. Kept as a tagged
/// variant rather than a string so the core never re-parses operator
/// text once the frontend has produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl CompOp {
    /// The operator obtained by logical negation (`NOT (col OP val)`).
    pub fn negate(self) -> CompOp {
        match self {
            CompOp::Eq => CompOp::Ne,
            CompOp::Ne => CompOp::Eq,
            CompOp::Lt => CompOp::Ge,
            CompOp::Ge => CompOp::Lt,
            CompOp::Le => CompOp::Gt,
            CompOp::Gt => CompOp::Le,
            CompOp::In => CompOp::NotIn,
            CompOp::NotIn => CompOp::In,
        }
    }

    pub fn is_range(self) -> bool {
        matches!(self, CompOp::Lt | CompOp::Le | CompOp::Gt | CompOp::Ge)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompOp::Eq => "=",
            CompOp::Ne => "!=",
            CompOp::Lt => "<",
            CompOp::Le => "<=",
            CompOp::Gt => ">",
            CompOp::Ge => ">=",
            CompOp::In => "IN",
            CompOp::NotIn => "NOT IN",
        }
    }
}

impl fmt::Display for CompOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a predicate joins the previous one in a flat left-to-right parse.
/// Only meaningful until the predicate is folded into an `Expression`
/// tree; AND is the implicit default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A single leaf comparison: `column OP value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub operator: CompOp,
    pub value: String,
    pub logical_op: LogicalOp,
}

impl Predicate {
    pub fn new(column: impl Into<String>, operator: CompOp, value: impl Into<String>) -> Self {
        Self { column: column.into(), operator, value: value.into(), logical_op: LogicalOp::And }
    }

    /// Returns the predicate obtained by negating this leaf (`=`↔`≠`,
    /// `<`↔`≥`, `≤`↔`>`, `IN`↔`NOT IN`).
    pub fn negated(&self) -> Predicate {
        Predicate { operator: self.operator.negate(), ..self.clone() }
    }
}

/// Tagged-union expression tree over predicates. The invariant enforced
/// by the rewriter (`§ normalize`) is that after normalization no `Not`
/// sits above a non-leaf node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Leaf(Predicate),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
}

impl Expression {
    pub fn leaf(predicate: Predicate) -> Self {
        Expression::Leaf(predicate)
    }

    pub fn and(l: Expression, r: Expression) -> Self {
        Expression::And(Box::new(l), Box::new(r))
    }

    pub fn or(l: Expression, r: Expression) -> Self {
        Expression::Or(Box::new(l), Box::new(r))
    }

    pub fn negated(inner: Expression) -> Self {
        Expression::Not(Box::new(inner))
    }

    /// Builds a left-leaning AND chain from a non-empty list of
    /// expressions. Panics if `exprs` is empty — callers must guard for
    /// the empty-expression case themselves (it means "no predicate",
    /// not "contradiction").
    pub fn and_chain(mut exprs: Vec<Expression>) -> Expression {
        let mut acc = exprs.remove(0);
        for e in exprs {
            acc = Expression::and(acc, e);
        }
        acc
    }

    pub fn or_chain(mut exprs: Vec<Expression>) -> Expression {
        let mut acc = exprs.remove(0);
        for e in exprs {
            acc = Expression::or(acc, e);
        }
        acc
    }

    /// Flattens a top-level (possibly nested, right- or left-leaning)
    /// AND chain into its leaf predicates. Returns `None` if the
    /// expression is not a pure conjunction of leaves.
    pub fn flatten_and(&self) -> Option<Vec<Predicate>> {
        match self {
            Expression::Leaf(p) => Some(vec![p.clone()]),
            Expression::And(l, r) => {
                let mut out = l.flatten_and()?;
                out.extend(r.flatten_and()?);
                Some(out)
            }
            _ => None,
        }
    }

    /// Flattens a top-level pure disjunction of leaves.
    pub fn flatten_or(&self) -> Option<Vec<Predicate>> {
        match self {
            Expression::Leaf(p) => Some(vec![p.clone()]),
            Expression::Or(l, r) => {
                let mut out = l.flatten_or()?;
                out.extend(r.flatten_or()?);
                Some(out)
            }
            _ => None,
        }
    }

    /// Splits a top-level `Or` tree into its disjuncts without requiring
    /// anything below the `Or` nodes to be a leaf — unlike `flatten_or`,
    /// a disjunct that is itself an AND block (or any other shape) is
    /// returned whole rather than rejecting the whole call. A non-`Or`
    /// expression is its own single disjunct.
    pub fn or_disjuncts(&self) -> Vec<Expression> {
        match self {
            Expression::Or(l, r) => {
                let mut out = l.or_disjuncts();
                out.extend(r.or_disjuncts());
                out
            }
            _ => vec![self.clone()],
        }
    }

    /// Evaluates the expression against an explicit truth assignment for
    /// each leaf predicate (compared by structural equality). Used by
    /// the rewriter's equivalence tests, not by the executor.
    pub fn eval(&self, assignment: &dyn Fn(&Predicate) -> bool) -> bool {
        match self {
            Expression::Leaf(p) => assignment(p),
            Expression::And(l, r) => l.eval(assignment) && r.eval(assignment),
            Expression::Or(l, r) => l.eval(assignment) || r.eval(assignment),
            Expression::Not(inner) => !inner.eval(assignment),
        }
    }

    /// Collects every leaf predicate appearing in the tree, in
    /// left-to-right order, duplicates included.
    pub fn leaves(&self) -> Vec<&Predicate> {
        match self {
            Expression::Leaf(p) => vec![p],
            Expression::And(l, r) | Expression::Or(l, r) => {
                let mut out = l.leaves();
                out.extend(r.leaves());
                out
            }
            Expression::Not(inner) => inner.leaves(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negate_flips_comparison_operators() {
        assert_eq!(CompOp::Eq.negate(), CompOp::Ne);
        assert_eq!(CompOp::Lt.negate(), CompOp::Ge);
        assert_eq!(CompOp::Le.negate(), CompOp::Gt);
        assert_eq!(CompOp::In.negate(), CompOp::NotIn);
        assert_eq!(CompOp::Eq.negate().negate(), CompOp::Eq);
    }

    #[test]
    fn flatten_and_collects_leaves_in_order() {
        let expr = Expression::and_chain(vec![
            Expression::leaf(Predicate::new("a", CompOp::Eq, "1")),
            Expression::leaf(Predicate::new("b", CompOp::Eq, "2")),
            Expression::leaf(Predicate::new("c", CompOp::Eq, "3")),
        ]);
        let flat = expr.flatten_and().unwrap();
        let columns: Vec<&str> = flat.iter().map(|p| p.column.as_str()).collect();
        assert_eq!(columns, vec!["a", "b", "c"]);
    }

    #[test]
    fn flatten_and_rejects_mixed_or() {
        let expr = Expression::and(
            Expression::leaf(Predicate::new("a", CompOp::Eq, "1")),
            Expression::or(
                Expression::leaf(Predicate::new("b", CompOp::Eq, "2")),
                Expression::leaf(Predicate::new("c", CompOp::Eq, "3")),
            ),
        );
        assert!(expr.flatten_and().is_none());
    }

    #[test]
    fn or_disjuncts_keeps_and_blocks_whole() {
        let and_block = Expression::and(
            Expression::leaf(Predicate::new("age", CompOp::Eq, "30")),
            Expression::leaf(Predicate::new("country", CompOp::Eq, "USA")),
        );
        let expr = Expression::or(and_block.clone(), Expression::leaf(Predicate::new("status", CompOp::Eq, "vip")));
        let disjuncts = expr.or_disjuncts();
        assert_eq!(disjuncts.len(), 2);
        assert_eq!(disjuncts[0], and_block);
        assert!(disjuncts[0].flatten_or().is_none(), "an AND block is not itself a pure OR of leaves");
    }

    #[test]
    fn or_disjuncts_of_non_or_expression_is_itself() {
        let leaf = Expression::leaf(Predicate::new("a", CompOp::Eq, "1"));
        assert_eq!(leaf.or_disjuncts(), vec![leaf]);
    }
}
