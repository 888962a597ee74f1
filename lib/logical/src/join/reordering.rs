use crate::{AlgebraNode, Operator};
use rdf_weave_common::TripleStore;
use rdf_weave_model::{position_of, union_variables, NamedNodePattern, TermPattern, TriplePattern};
use std::fmt::Debug;
use std::sync::Arc;

/// The result of reordering the operands of a join.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinReordering {
    /// The new operand order. Entry `i` holds the index of the original operand that is evaluated
    /// at position `i`.
    pub permutation: Vec<usize>,
    /// Restores the declared output variable order. Entry `i` holds the position of the `i`-th
    /// declared variable in the variables produced by the reordered join. [None] if the reordered
    /// join already produces the declared order.
    pub projection: Option<Vec<usize>>,
}

/// Reorders the operands of a join before execution.
///
/// The default [JoinReorderStrategy::reorder] sorts the operands by their
/// [JoinReorderStrategy::weight] and then avoids cartesian products: every operand after the first
/// must share a variable with the operands placed before it, if such an operand exists.
pub trait JoinReorderStrategy: Debug + Send + Sync {
    /// Estimates the cardinality of `node`. Lower weights are evaluated first.
    fn weight(&self, node: &AlgebraNode) -> u64;

    /// Reorders the operands of a [Operator::Join]. Returns [None] if `node` is not a join or if
    /// the declared order is kept.
    fn reorder(&self, node: &AlgebraNode) -> Option<JoinReordering> {
        let Operator::Join(operands) = node.operator() else {
            return None;
        };
        if operands.len() < 2 {
            return None;
        }

        let weights = operands
            .iter()
            .map(|o| self.weight(o))
            .collect::<Vec<_>>();
        let mut order = (0..operands.len()).collect::<Vec<_>>();
        order.sort_by_key(|i| weights.get(*i).copied().unwrap_or(u64::MAX));
        avoid_cartesian_products(node, &mut order);

        if order.iter().enumerate().all(|(i, o)| i == *o) {
            return None;
        }

        let produced = union_variables(
            order
                .iter()
                .filter_map(|i| operands.get(*i))
                .map(|o| o.variables()),
        );
        let projection = node
            .variables()
            .iter()
            .map(|v| position_of(&produced, v))
            .collect::<Option<Vec<_>>>()?;
        let is_identity = projection.iter().enumerate().all(|(i, p)| i == *p);

        Some(JoinReordering {
            permutation: order,
            projection: (!is_identity).then_some(projection),
        })
    }
}

/// Swaps operands such that, whenever possible, every operand shares a variable with the operands
/// before it.
fn avoid_cartesian_products(node: &AlgebraNode, order: &mut [usize]) {
    let Operator::Join(operands) = node.operator() else {
        return;
    };
    let variables_of = |i: usize| operands.get(i).map(|o| o.variables()).unwrap_or_default();

    let mut placed = Vec::new();
    if let Some(first) = order.first() {
        placed.extend_from_slice(variables_of(*first));
    }
    for position in 1..order.len() {
        let connected = |candidate: usize| variables_of(candidate).iter().any(|v| placed.contains(v));
        if !connected(order[position]) {
            if let Some(offset) = order[position + 1..].iter().position(|c| connected(*c)) {
                order.swap(position, position + 1 + offset);
            }
        }
        for variable in variables_of(order[position]) {
            if !placed.contains(variable) {
                placed.push(variable.clone());
            }
        }
    }
}

/// Sums the weights of the children. Leaves without children weigh 1.
fn composite_weight(node: &AlgebraNode, weight: impl Fn(&AlgebraNode) -> u64) -> u64 {
    match node.operator() {
        Operator::Identity => 1,
        Operator::Values { inner, rows, .. } => {
            u64::try_from(rows.len())
                .unwrap_or(u64::MAX)
                .saturating_add(weight(inner.as_ref()))
        }
        _ => node
            .children()
            .into_iter()
            .map(|child| weight(child.as_ref()))
            .fold(0, u64::saturating_add),
    }
}

/// Estimates the cardinality of triple patterns purely by their shape.
///
/// Subject-bound patterns are considered cheapest and fully unbound patterns most expensive.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShapeReorderStrategy;

impl ShapeReorderStrategy {
    /// Returns the weight of a single triple pattern.
    pub fn pattern_weight(pattern: &TriplePattern) -> u64 {
        let subject_bound = !matches!(pattern.subject, TermPattern::Variable(_));
        let predicate_bound = matches!(pattern.predicate, NamedNodePattern::NamedNode(_));
        let object_bound = !matches!(pattern.object, TermPattern::Variable(_));

        match (subject_bound, predicate_bound, object_bound) {
            (true, true, true) => 1,
            (true, true, false) => 10,
            (true, false, true) => 2,
            (false, true, true) => 10_000,
            (true, false, false) => 100,
            (false, false, false) => 1_000_000_000,
            (false, true, false) => 1_000_000,
            (false, false, true) => 100_000,
        }
    }
}

impl JoinReorderStrategy for ShapeReorderStrategy {
    fn weight(&self, node: &AlgebraNode) -> u64 {
        match node.operator() {
            Operator::Triple(pattern) => Self::pattern_weight(pattern),
            _ => composite_weight(node, |child| self.weight(child)),
        }
    }
}

/// Uses the cardinality estimates of the store as weights of the triple patterns.
#[derive(Clone, Debug)]
pub struct CardinalityReorderStrategy {
    store: Arc<dyn TripleStore>,
}

impl CardinalityReorderStrategy {
    /// Creates a new [CardinalityReorderStrategy] for `store`.
    pub fn new(store: Arc<dyn TripleStore>) -> Self {
        Self { store }
    }
}

impl JoinReorderStrategy for CardinalityReorderStrategy {
    fn weight(&self, node: &AlgebraNode) -> u64 {
        match node.operator() {
            Operator::Triple(pattern) => self.store.estimate_cardinality(pattern),
            _ => composite_weight(node, |child| self.weight(child)),
        }
    }
}
