use crate::Expression;
use rdf_weave_model::{triple_pattern_variables, union_variables, Row, TriplePattern, Variable};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// A shared reference to an immutable [AlgebraNode].
pub type AlgebraNodeRef = Arc<AlgebraNode>;

/// The closed set of operator kinds. Evaluators are registered per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Triple,
    Join,
    LeftJoin,
    Union,
    Filter,
    Project,
    Distinct,
    WeakDistinct,
    Limit,
    Offset,
    Slice,
    Values,
    Assign,
    Exists,
    NotExists,
    Minus,
    Ask,
    Identity,
}

impl NodeKind {
    /// All node kinds.
    pub const ALL: [NodeKind; 18] = [
        NodeKind::Triple,
        NodeKind::Join,
        NodeKind::LeftJoin,
        NodeKind::Union,
        NodeKind::Filter,
        NodeKind::Project,
        NodeKind::Distinct,
        NodeKind::WeakDistinct,
        NodeKind::Limit,
        NodeKind::Offset,
        NodeKind::Slice,
        NodeKind::Values,
        NodeKind::Assign,
        NodeKind::Exists,
        NodeKind::NotExists,
        NodeKind::Minus,
        NodeKind::Ask,
        NodeKind::Identity,
    ];

    /// Returns the name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Triple => "Triple",
            NodeKind::Join => "Join",
            NodeKind::LeftJoin => "LeftJoin",
            NodeKind::Union => "Union",
            NodeKind::Filter => "Filter",
            NodeKind::Project => "Project",
            NodeKind::Distinct => "Distinct",
            NodeKind::WeakDistinct => "WeakDistinct",
            NodeKind::Limit => "Limit",
            NodeKind::Offset => "Offset",
            NodeKind::Slice => "Slice",
            NodeKind::Values => "Values",
            NodeKind::Assign => "Assign",
            NodeKind::Exists => "Exists",
            NodeKind::NotExists => "NotExists",
            NodeKind::Minus => "Minus",
            NodeKind::Ask => "Ask",
            NodeKind::Identity => "Identity",
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The operator of an [AlgebraNode] together with its operands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    /// Looks up a single triple pattern in the store.
    Triple(TriplePattern),
    /// The inner join of all operands.
    Join(Vec<AlgebraNodeRef>),
    /// The left outer join of two operands. Right solutions are only joined if `expression`
    /// evaluates to true.
    LeftJoin {
        left: AlgebraNodeRef,
        right: AlgebraNodeRef,
        expression: Option<Expression>,
    },
    /// The concatenation of all operands.
    Union(Vec<AlgebraNodeRef>),
    /// Keeps the solutions for which all expressions evaluate to true.
    Filter {
        inner: AlgebraNodeRef,
        expressions: Vec<Expression>,
    },
    /// Selects (and reorders) the given variables.
    Project {
        inner: AlgebraNodeRef,
        variables: Vec<Variable>,
    },
    /// Removes duplicate solutions.
    Distinct(AlgebraNodeRef),
    /// Removes duplicate solutions on a best-effort basis.
    WeakDistinct(AlgebraNodeRef),
    /// Returns at most `limit` solutions.
    Limit { inner: AlgebraNodeRef, limit: usize },
    /// Skips the first `offset` solutions.
    Offset { inner: AlgebraNodeRef, offset: usize },
    /// Combines [Operator::Offset] and [Operator::Limit].
    Slice {
        inner: AlgebraNodeRef,
        offset: usize,
        limit: Option<usize>,
    },
    /// Joins a constant table of solutions with `inner`.
    Values {
        inner: AlgebraNodeRef,
        variables: Vec<Variable>,
        rows: Vec<Row>,
    },
    /// Binds the result of `expression` to `variable`.
    Assign {
        inner: AlgebraNodeRef,
        variable: Variable,
        expression: Expression,
    },
    /// Keeps the outer solutions for which the correlated inner pattern has a solution.
    Exists {
        outer: AlgebraNodeRef,
        inner: AlgebraNodeRef,
    },
    /// Keeps the outer solutions for which the correlated inner pattern has no solution.
    NotExists {
        outer: AlgebraNodeRef,
        inner: AlgebraNodeRef,
    },
    /// Removes the left solutions that are compatible with a right solution.
    ///
    /// `bound_overlap` is set if a variable shared between both sides has been substituted by a
    /// binding. In this case, the domains of all solutions are known to overlap.
    Minus {
        left: AlgebraNodeRef,
        right: AlgebraNodeRef,
        bound_overlap: bool,
    },
    /// Reduces the inner solutions to a zero-column truth value.
    Ask(AlgebraNodeRef),
    /// The single empty solution.
    Identity,
}

impl Operator {
    /// Returns the kind of this operator.
    pub fn kind(&self) -> NodeKind {
        match self {
            Operator::Triple(_) => NodeKind::Triple,
            Operator::Join(_) => NodeKind::Join,
            Operator::LeftJoin { .. } => NodeKind::LeftJoin,
            Operator::Union(_) => NodeKind::Union,
            Operator::Filter { .. } => NodeKind::Filter,
            Operator::Project { .. } => NodeKind::Project,
            Operator::Distinct(_) => NodeKind::Distinct,
            Operator::WeakDistinct(_) => NodeKind::WeakDistinct,
            Operator::Limit { .. } => NodeKind::Limit,
            Operator::Offset { .. } => NodeKind::Offset,
            Operator::Slice { .. } => NodeKind::Slice,
            Operator::Values { .. } => NodeKind::Values,
            Operator::Assign { .. } => NodeKind::Assign,
            Operator::Exists { .. } => NodeKind::Exists,
            Operator::NotExists { .. } => NodeKind::NotExists,
            Operator::Minus { .. } => NodeKind::Minus,
            Operator::Ask(_) => NodeKind::Ask,
            Operator::Identity => NodeKind::Identity,
        }
    }
}

/// A node of the immutable query plan.
///
/// The output variables are computed once on construction. Nodes are shared via [AlgebraNodeRef]
/// and are never mutated. See [AlgebraNode::bind] for specializing a node for a given solution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlgebraNode {
    operator: Operator,
    variables: Arc<[Variable]>,
    certain: Arc<[Variable]>,
}

impl AlgebraNode {
    /// Creates a new [AlgebraNode] and computes its output variables.
    pub fn new(operator: Operator) -> AlgebraNodeRef {
        let variables: Arc<[Variable]> = compute_variables(&operator).into();
        let certain = variables
            .iter()
            .filter(|v| is_certain(&operator, v))
            .cloned()
            .collect();
        Arc::new(Self {
            operator,
            variables,
            certain,
        })
    }

    /// Creates a [Operator::Triple] node.
    pub fn triple(pattern: TriplePattern) -> AlgebraNodeRef {
        Self::new(Operator::Triple(pattern))
    }

    /// Creates a [Operator::Identity] node.
    pub fn identity() -> AlgebraNodeRef {
        Self::new(Operator::Identity)
    }

    /// Returns the operator of this node.
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Returns the kind of this node.
    pub fn kind(&self) -> NodeKind {
        self.operator.kind()
    }

    /// Returns the ordered output variables of this node.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Returns a shared reference to the output variables of this node.
    pub fn variables_arc(&self) -> Arc<[Variable]> {
        Arc::clone(&self.variables)
    }

    /// Returns the output variables that are bound in every solution of this node.
    ///
    /// The remaining output variables may be unbound, e.g., the right side of a
    /// [Operator::LeftJoin] or a variable that only some [Operator::Union] branches mention.
    pub fn certain_variables(&self) -> &[Variable] {
        &self.certain
    }

    /// Returns whether `variable` is an output variable that may be unbound in some solution.
    pub fn is_maybe_unbound(&self, variable: &Variable) -> bool {
        self.variables.contains(variable) && !self.certain.contains(variable)
    }

    /// Returns the children of this node in operand order.
    pub fn children(&self) -> Vec<&AlgebraNodeRef> {
        match &self.operator {
            Operator::Triple(_) | Operator::Identity => Vec::new(),
            Operator::Join(children) | Operator::Union(children) => children.iter().collect(),
            Operator::LeftJoin { left, right, .. } | Operator::Minus { left, right, .. } => {
                vec![left, right]
            }
            Operator::Exists { outer, inner } | Operator::NotExists { outer, inner } => {
                vec![outer, inner]
            }
            Operator::Filter { inner, .. }
            | Operator::Project { inner, .. }
            | Operator::Limit { inner, .. }
            | Operator::Offset { inner, .. }
            | Operator::Slice { inner, .. }
            | Operator::Values { inner, .. }
            | Operator::Assign { inner, .. }
            | Operator::Distinct(inner)
            | Operator::WeakDistinct(inner)
            | Operator::Ask(inner) => vec![inner],
        }
    }
}

fn compute_variables(operator: &Operator) -> Vec<Variable> {
    match operator {
        Operator::Triple(pattern) => triple_pattern_variables(pattern),
        Operator::Join(children) | Operator::Union(children) => {
            union_variables(children.iter().map(|c| c.variables()))
        }
        Operator::LeftJoin { left, right, .. } => {
            union_variables([left.variables(), right.variables()])
        }
        Operator::Project { variables, .. } => union_variables([variables.as_slice()]),
        Operator::Values {
            inner, variables, ..
        } => union_variables([variables.as_slice(), inner.variables()]),
        Operator::Assign {
            inner, variable, ..
        } => union_variables([inner.variables(), std::slice::from_ref(variable)]),
        Operator::Filter { inner, .. }
        | Operator::Limit { inner, .. }
        | Operator::Offset { inner, .. }
        | Operator::Slice { inner, .. }
        | Operator::Distinct(inner)
        | Operator::WeakDistinct(inner) => inner.variables().to_vec(),
        Operator::Exists { outer, .. } | Operator::NotExists { outer, .. } => {
            outer.variables().to_vec()
        }
        Operator::Minus { left, .. } => left.variables().to_vec(),
        Operator::Ask(_) | Operator::Identity => Vec::new(),
    }
}

fn is_certain(operator: &Operator, variable: &Variable) -> bool {
    match operator {
        Operator::Triple(_) => true,
        Operator::Join(children) => children
            .iter()
            .any(|c| c.certain_variables().contains(variable)),
        Operator::Union(children) => children
            .iter()
            .all(|c| c.certain_variables().contains(variable)),
        Operator::LeftJoin { left: inner, .. }
        | Operator::Minus { left: inner, .. }
        | Operator::Exists { outer: inner, .. }
        | Operator::NotExists { outer: inner, .. }
        | Operator::Filter { inner, .. }
        | Operator::Project { inner, .. }
        | Operator::Limit { inner, .. }
        | Operator::Offset { inner, .. }
        | Operator::Slice { inner, .. }
        | Operator::Distinct(inner)
        | Operator::WeakDistinct(inner) => inner.certain_variables().contains(variable),
        Operator::Values {
            inner,
            variables,
            rows,
        } => {
            let in_every_row = variables
                .iter()
                .position(|v| v == variable)
                .is_some_and(|i| rows.iter().all(|row| row.get(i).is_some()));
            in_every_row || inner.certain_variables().contains(variable)
        }
        // A failing expression leaves the target unbound.
        Operator::Assign {
            inner, variable: target, ..
        } => target != variable && inner.certain_variables().contains(variable),
        Operator::Ask(_) | Operator::Identity => false,
    }
}
