use crate::{AlgebraNode, AlgebraNodeRef, Expression, Operator};
use rdf_weave_model::{Row, TriplePattern, Variable};
use std::sync::Arc;

/// A convenient builder for programmatically creating algebra trees.
///
/// # Example
///
/// ```
/// use rdf_weave_logical::AlgebraBuilder;
/// use rdf_weave_model::{NamedNode, TriplePattern, Variable};
///
/// let person = Variable::new_unchecked("person");
/// let pattern = TriplePattern {
///     subject: person.clone().into(),
///     predicate: NamedNode::new_unchecked("http://example.com/knows").into(),
///     object: Variable::new_unchecked("friend").into(),
/// };
///
/// let node = AlgebraBuilder::new_from_pattern(pattern)
///     .project(vec![person.clone()])
///     .distinct()
///     .build();
/// assert_eq!(node.variables(), &[person]);
/// ```
#[derive(Clone, Debug)]
pub struct AlgebraBuilder {
    node: AlgebraNodeRef,
}

impl AlgebraBuilder {
    /// Creates a new [AlgebraBuilder] with an existing `node`.
    pub fn new(node: AlgebraNodeRef) -> Self {
        Self { node }
    }

    /// Creates a new [AlgebraBuilder] that looks up a single triple pattern.
    pub fn new_from_pattern(pattern: TriplePattern) -> Self {
        Self::new(AlgebraNode::triple(pattern))
    }

    /// Creates a new [AlgebraBuilder] that joins all patterns of a basic graph pattern.
    pub fn new_from_bgp(patterns: &[TriplePattern]) -> Self {
        let mut patterns = patterns.iter().cloned().map(AlgebraNode::triple);
        match (patterns.next(), patterns.next()) {
            (None, _) => Self::new_identity(),
            (Some(first), None) => Self::new(first),
            (Some(first), Some(second)) => {
                let operands = [first, second].into_iter().chain(patterns).collect();
                Self::new(AlgebraNode::new(Operator::Join(operands)))
            }
        }
    }

    /// Creates a new [AlgebraBuilder] from a constant table of solutions.
    pub fn new_from_values(variables: Vec<Variable>, rows: Vec<Row>) -> Self {
        Self::new(AlgebraNode::new(Operator::Values {
            inner: AlgebraNode::identity(),
            variables,
            rows,
        }))
    }

    /// Creates a new [AlgebraBuilder] that produces the single empty solution.
    pub fn new_identity() -> Self {
        Self::new(AlgebraNode::identity())
    }

    /// Returns the output variables of the current node.
    pub fn variables(&self) -> &[Variable] {
        self.node.variables()
    }

    /// Joins the current node with `rhs`. Nested joins are flattened into a single join.
    pub fn join(self, rhs: AlgebraNodeRef) -> Self {
        let mut operands = flatten_join(self.node);
        operands.extend(flatten_join(rhs));
        Self::new(AlgebraNode::new(Operator::Join(operands)))
    }

    /// Creates a left join with `rhs`, keeping all solutions of the current node.
    pub fn left_join(self, rhs: AlgebraNodeRef, expression: Option<Expression>) -> Self {
        Self::new(AlgebraNode::new(Operator::LeftJoin {
            left: self.node,
            right: rhs,
            expression,
        }))
    }

    /// Concatenates the solutions of the current node and `rhs`.
    pub fn union(self, rhs: AlgebraNodeRef) -> Self {
        let mut operands = match self.node.operator() {
            Operator::Union(children) => children.clone(),
            _ => vec![self.node],
        };
        operands.push(rhs);
        Self::new(AlgebraNode::new(Operator::Union(operands)))
    }

    /// Applies a filter using `expression`. Consecutive filters are merged.
    pub fn filter(self, expression: Expression) -> Self {
        let (inner, mut expressions) = match self.node.operator() {
            Operator::Filter { inner, expressions } => (Arc::clone(inner), expressions.clone()),
            _ => (self.node, Vec::new()),
        };
        expressions.push(expression);
        Self::new(AlgebraNode::new(Operator::Filter { inner, expressions }))
    }

    /// Projects the current node to a new list of variables.
    pub fn project(self, variables: Vec<Variable>) -> Self {
        Self::new(AlgebraNode::new(Operator::Project {
            inner: self.node,
            variables,
        }))
    }

    /// Removes duplicate solutions.
    pub fn distinct(self) -> Self {
        Self::new(AlgebraNode::new(Operator::Distinct(self.node)))
    }

    /// Removes duplicate solutions on a best-effort basis.
    pub fn weak_distinct(self) -> Self {
        Self::new(AlgebraNode::new(Operator::WeakDistinct(self.node)))
    }

    /// Skips `start` solutions and returns at most `length` solutions. Picks the simplest node
    /// that implements the slice.
    pub fn slice(self, start: usize, length: Option<usize>) -> Self {
        let operator = match (start, length) {
            (0, None) => return self,
            (0, Some(limit)) => Operator::Limit {
                inner: self.node,
                limit,
            },
            (offset, None) => Operator::Offset {
                inner: self.node,
                offset,
            },
            (offset, limit) => Operator::Slice {
                inner: self.node,
                offset,
                limit,
            },
        };
        Self::new(AlgebraNode::new(operator))
    }

    /// Binds the result of `expression` to `variable`.
    pub fn extend(self, variable: Variable, expression: Expression) -> Self {
        Self::new(AlgebraNode::new(Operator::Assign {
            inner: self.node,
            variable,
            expression,
        }))
    }

    /// Joins a constant table of solutions with the current node.
    pub fn values(self, variables: Vec<Variable>, rows: Vec<Row>) -> Self {
        Self::new(AlgebraNode::new(Operator::Values {
            inner: self.node,
            variables,
            rows,
        }))
    }

    /// Keeps the solutions for which `pattern` has a solution.
    pub fn exists(self, pattern: AlgebraNodeRef) -> Self {
        Self::new(AlgebraNode::new(Operator::Exists {
            outer: self.node,
            inner: pattern,
        }))
    }

    /// Keeps the solutions for which `pattern` has no solution.
    pub fn not_exists(self, pattern: AlgebraNodeRef) -> Self {
        Self::new(AlgebraNode::new(Operator::NotExists {
            outer: self.node,
            inner: pattern,
        }))
    }

    /// Removes the solutions that are compatible with a solution of `rhs`.
    pub fn minus(self, rhs: AlgebraNodeRef) -> Self {
        Self::new(AlgebraNode::new(Operator::Minus {
            left: self.node,
            right: rhs,
            bound_overlap: false,
        }))
    }

    /// Reduces the current node to a truth value.
    pub fn ask(self) -> Self {
        Self::new(AlgebraNode::new(Operator::Ask(self.node)))
    }

    /// Returns the built node.
    pub fn build(self) -> AlgebraNodeRef {
        self.node
    }
}

fn flatten_join(node: AlgebraNodeRef) -> Vec<AlgebraNodeRef> {
    match node.operator() {
        Operator::Join(children) => children.clone(),
        Operator::Identity => Vec::new(),
        _ => vec![node],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeKind;
    use rdf_weave_model::NamedNode;

    fn pattern(subject: &str, object: &str) -> TriplePattern {
        TriplePattern {
            subject: Variable::new_unchecked(subject).into(),
            predicate: NamedNode::new_unchecked("http://example.com/p").into(),
            object: Variable::new_unchecked(object).into(),
        }
    }

    #[test]
    fn join_is_flattened() {
        let node = AlgebraBuilder::new_from_bgp(&[pattern("a", "b"), pattern("b", "c")])
            .join(AlgebraNode::triple(pattern("c", "d")))
            .build();
        let Operator::Join(children) = node.operator() else {
            panic!("Expected a join");
        };
        assert_eq!(children.len(), 3);
    }

    #[test]
    fn join_with_identity_is_dropped() {
        let node = AlgebraBuilder::new_identity()
            .join(AlgebraNode::triple(pattern("a", "b")))
            .build();
        let Operator::Join(children) = node.operator() else {
            panic!("Expected a join");
        };
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn slice_picks_simplest_node() {
        let base = AlgebraBuilder::new_from_pattern(pattern("a", "b"));
        assert_eq!(base.clone().slice(0, Some(1)).build().kind(), NodeKind::Limit);
        assert_eq!(base.clone().slice(1, None).build().kind(), NodeKind::Offset);
        assert_eq!(base.clone().slice(1, Some(1)).build().kind(), NodeKind::Slice);
        assert_eq!(base.slice(0, None).build().kind(), NodeKind::Triple);
    }
}
