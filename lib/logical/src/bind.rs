use crate::{AlgebraNode, AlgebraNodeRef, Expression, Operator};
use rdf_weave_model::{
    triple_pattern_variables, NamedNodePattern, Row, Term, TermPattern, TriplePattern, Variable,
};
use std::sync::Arc;

impl AlgebraNode {
    /// Returns an equivalent node in which every occurrence of a bound variable is replaced by its
    /// term. Variables whose term is [None] are not substituted.
    ///
    /// Bound variables are no longer part of the output variables of the returned node. Subtrees
    /// that do not mention any bound variable are shared with `self`. If nothing is substituted,
    /// `self` is returned.
    ///
    /// Some details:
    /// - Binding the predicate of a triple pattern to a non-IRI yields an empty [Operator::Values].
    /// - [Operator::Project] only substitutes its projected variables.
    /// - A variable that may be unbound in a node (see [AlgebraNode::certain_variables]) is not
    ///   pushed into it. Instead, the node is wrapped in a [Operator::Filter] that keeps the
    ///   solutions leaving the variable unbound or binding it to the same term, and a
    ///   [Operator::Project] that removes the variable.
    /// - The right side of an [Operator::Minus] is only substituted with variables that it
    ///   shares with the left side.
    pub fn bind(self: &Arc<Self>, variables: &[Variable], terms: &[Option<Term>]) -> AlgebraNodeRef {
        let substitution = Substitution::new(variables, terms);
        if substitution.is_empty() {
            return Arc::clone(self);
        }
        substitute(self, &substitution).unwrap_or_else(|| Arc::clone(self))
    }
}

/// The bound pairs of a binding.
struct Substitution<'a> {
    pairs: Vec<(&'a Variable, &'a Term)>,
}

impl<'a> Substitution<'a> {
    fn new(variables: &'a [Variable], terms: &'a [Option<Term>]) -> Self {
        let pairs = variables
            .iter()
            .zip(terms)
            .filter_map(|(v, t)| t.as_ref().map(|t| (v, t)))
            .collect();
        Self { pairs }
    }

    fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn get(&self, variable: &Variable) -> Option<&'a Term> {
        self.pairs
            .iter()
            .find(|(v, _)| *v == variable)
            .map(|(_, t)| *t)
    }

    fn restrict(&self, variables: &[Variable]) -> Substitution<'a> {
        let pairs = self
            .pairs
            .iter()
            .filter(|(v, _)| variables.contains(*v))
            .copied()
            .collect();
        Substitution { pairs }
    }

    /// Splits the pairs into those that can be pushed and those for which `is_deferred` holds.
    fn partition(
        &self,
        is_deferred: impl Fn(&Variable) -> bool,
    ) -> (Substitution<'a>, Substitution<'a>) {
        let (deferred, pushed): (Vec<_>, Vec<_>) =
            self.pairs.iter().copied().partition(|(v, _)| is_deferred(v));
        (Substitution { pairs: pushed }, Substitution { pairs: deferred })
    }

    fn expression(&self, expression: &Expression) -> Option<Expression> {
        expression.substitute(&|v| self.get(v).cloned())
    }
}

fn substitute(node: &AlgebraNodeRef, s: &Substitution<'_>) -> Option<AlgebraNodeRef> {
    let (pushed, deferred) = s.partition(|v| is_deferred(node, v));
    if deferred.is_empty() {
        return substitute_operator(node, s);
    }

    let inner = match node.operator() {
        // The filter sees the bound term, as it would in the joined solution.
        Operator::Filter { inner, expressions } => AlgebraNode::new(Operator::Filter {
            inner: substitute(inner, &pushed).unwrap_or_else(|| Arc::clone(inner)),
            expressions: expressions
                .iter()
                .map(|e| s.expression(e).unwrap_or_else(|| e.clone()))
                .collect(),
        }),
        _ => substitute_operator(node, &pushed).unwrap_or_else(|| Arc::clone(node)),
    };
    let expressions = deferred
        .pairs
        .iter()
        .map(|(variable, term)| unbound_or_same_term(variable, term))
        .collect();
    let variables = inner
        .variables()
        .iter()
        .filter(|v| deferred.get(v).is_none())
        .cloned()
        .collect();
    Some(AlgebraNode::new(Operator::Project {
        inner: AlgebraNode::new(Operator::Filter { inner, expressions }),
        variables,
    }))
}

/// Returns whether binding `variable` must be checked on the solutions of `node` instead of being
/// pushed into its operands.
fn is_deferred(node: &AlgebraNode, variable: &Variable) -> bool {
    if node.is_maybe_unbound(variable) {
        return true;
    }
    match node.operator() {
        Operator::Minus { left, right, .. } => {
            left.variables().contains(variable) && right.is_maybe_unbound(variable)
        }
        _ => false,
    }
}

/// `!BOUND(?variable) || sameTerm(?variable, term)`
fn unbound_or_same_term(variable: &Variable, term: &Term) -> Expression {
    Expression::Or(
        Box::new(Expression::Not(Box::new(Expression::Bound(variable.clone())))),
        Box::new(Expression::SameTerm(
            Box::new(Expression::Variable(variable.clone())),
            Box::new(Expression::Constant(term.clone())),
        )),
    )
}

fn substitute_operator(node: &AlgebraNodeRef, s: &Substitution<'_>) -> Option<AlgebraNodeRef> {
    match node.operator() {
        Operator::Triple(pattern) => substitute_triple(pattern, s),
        Operator::Identity => None,
        Operator::Join(children) => {
            substitute_children(children, s).map(|c| AlgebraNode::new(Operator::Join(c)))
        }
        Operator::Union(children) => {
            substitute_children(children, s).map(|c| AlgebraNode::new(Operator::Union(c)))
        }
        Operator::LeftJoin {
            left,
            right,
            expression,
        } => {
            let new_left = substitute(left, s);
            let new_right = substitute(right, s);
            let new_expression = expression.as_ref().and_then(|e| s.expression(e));
            if new_left.is_none() && new_right.is_none() && new_expression.is_none() {
                return None;
            }
            Some(AlgebraNode::new(Operator::LeftJoin {
                left: new_left.unwrap_or_else(|| Arc::clone(left)),
                right: new_right.unwrap_or_else(|| Arc::clone(right)),
                expression: new_expression.or_else(|| expression.clone()),
            }))
        }
        Operator::Filter { inner, expressions } => {
            let new_inner = substitute(inner, s);
            let new_expressions = expressions
                .iter()
                .map(|e| s.expression(e))
                .collect::<Vec<_>>();
            if new_inner.is_none() && new_expressions.iter().all(Option::is_none) {
                return None;
            }
            Some(AlgebraNode::new(Operator::Filter {
                inner: new_inner.unwrap_or_else(|| Arc::clone(inner)),
                expressions: new_expressions
                    .into_iter()
                    .zip(expressions)
                    .map(|(new, old)| new.unwrap_or_else(|| old.clone()))
                    .collect(),
            }))
        }
        Operator::Project { inner, variables } => {
            let restricted = s.restrict(variables);
            if restricted.is_empty() {
                return None;
            }
            let inner = substitute(inner, &restricted).unwrap_or_else(|| Arc::clone(inner));
            let variables = variables
                .iter()
                .filter(|v| restricted.get(v).is_none())
                .cloned()
                .collect();
            Some(AlgebraNode::new(Operator::Project { inner, variables }))
        }
        Operator::Distinct(inner) => {
            substitute(inner, s).map(|i| AlgebraNode::new(Operator::Distinct(i)))
        }
        Operator::WeakDistinct(inner) => {
            substitute(inner, s).map(|i| AlgebraNode::new(Operator::WeakDistinct(i)))
        }
        Operator::Ask(inner) => substitute(inner, s).map(|i| AlgebraNode::new(Operator::Ask(i))),
        Operator::Limit { inner, limit } => substitute(inner, s).map(|inner| {
            AlgebraNode::new(Operator::Limit {
                inner,
                limit: *limit,
            })
        }),
        Operator::Offset { inner, offset } => substitute(inner, s).map(|inner| {
            AlgebraNode::new(Operator::Offset {
                inner,
                offset: *offset,
            })
        }),
        Operator::Slice {
            inner,
            offset,
            limit,
        } => substitute(inner, s).map(|inner| {
            AlgebraNode::new(Operator::Slice {
                inner,
                offset: *offset,
                limit: *limit,
            })
        }),
        Operator::Values {
            inner,
            variables,
            rows,
        } => substitute_values(inner, variables, rows, s),
        Operator::Assign {
            inner,
            variable,
            expression,
        } => {
            let new_inner = substitute(inner, s);
            let new_expression = s.expression(expression);
            if new_inner.is_none() && new_expression.is_none() {
                return None;
            }
            Some(AlgebraNode::new(Operator::Assign {
                inner: new_inner.unwrap_or_else(|| Arc::clone(inner)),
                variable: variable.clone(),
                expression: new_expression.unwrap_or_else(|| expression.clone()),
            }))
        }
        Operator::Exists { outer, inner } => {
            substitute_pair(outer, inner, s).map(|(outer, inner)| {
                AlgebraNode::new(Operator::Exists { outer, inner })
            })
        }
        Operator::NotExists { outer, inner } => {
            substitute_pair(outer, inner, s).map(|(outer, inner)| {
                AlgebraNode::new(Operator::NotExists { outer, inner })
            })
        }
        Operator::Minus {
            left,
            right,
            bound_overlap,
        } => {
            let shared = s.restrict(left.variables()).restrict(right.variables());
            let new_left = substitute(left, s);
            let new_right = substitute(right, &shared);
            let overlap = *bound_overlap || !shared.is_empty();
            if new_left.is_none() && new_right.is_none() && overlap == *bound_overlap {
                return None;
            }
            Some(AlgebraNode::new(Operator::Minus {
                left: new_left.unwrap_or_else(|| Arc::clone(left)),
                right: new_right.unwrap_or_else(|| Arc::clone(right)),
                bound_overlap: overlap,
            }))
        }
    }
}

fn substitute_children(
    children: &[AlgebraNodeRef],
    s: &Substitution<'_>,
) -> Option<Vec<AlgebraNodeRef>> {
    let substituted = children
        .iter()
        .map(|c| substitute(c, s))
        .collect::<Vec<_>>();
    if substituted.iter().all(Option::is_none) {
        return None;
    }
    Some(
        substituted
            .into_iter()
            .zip(children)
            .map(|(new, old)| new.unwrap_or_else(|| Arc::clone(old)))
            .collect(),
    )
}

fn substitute_pair(
    lhs: &AlgebraNodeRef,
    rhs: &AlgebraNodeRef,
    s: &Substitution<'_>,
) -> Option<(AlgebraNodeRef, AlgebraNodeRef)> {
    let new_lhs = substitute(lhs, s);
    let new_rhs = substitute(rhs, s);
    if new_lhs.is_none() && new_rhs.is_none() {
        return None;
    }
    Some((
        new_lhs.unwrap_or_else(|| Arc::clone(lhs)),
        new_rhs.unwrap_or_else(|| Arc::clone(rhs)),
    ))
}

fn substitute_triple(pattern: &TriplePattern, s: &Substitution<'_>) -> Option<AlgebraNodeRef> {
    let predicate = match &pattern.predicate {
        NamedNodePattern::Variable(v) => match s.get(v) {
            None => None,
            Some(Term::NamedNode(node)) => Some(NamedNodePattern::NamedNode(node.clone())),
            Some(_) => {
                // A non-IRI can never match a predicate.
                let variables = triple_pattern_variables(pattern)
                    .into_iter()
                    .filter(|v| s.get(v).is_none())
                    .collect();
                return Some(AlgebraNode::new(Operator::Values {
                    inner: AlgebraNode::identity(),
                    variables,
                    rows: Vec::new(),
                }));
            }
        },
        NamedNodePattern::NamedNode(_) => None,
    };
    let subject = substitute_term_pattern(&pattern.subject, s);
    let object = substitute_term_pattern(&pattern.object, s);

    if subject.is_none() && predicate.is_none() && object.is_none() {
        return None;
    }
    Some(AlgebraNode::triple(TriplePattern {
        subject: subject.unwrap_or_else(|| pattern.subject.clone()),
        predicate: predicate.unwrap_or_else(|| pattern.predicate.clone()),
        object: object.unwrap_or_else(|| pattern.object.clone()),
    }))
}

fn substitute_term_pattern(pattern: &TermPattern, s: &Substitution<'_>) -> Option<TermPattern> {
    let TermPattern::Variable(v) = pattern else {
        return None;
    };
    s.get(v).map(|term| match term {
        Term::NamedNode(node) => TermPattern::NamedNode(node.clone()),
        Term::BlankNode(node) => TermPattern::BlankNode(node.clone()),
        Term::Literal(literal) => TermPattern::Literal(literal.clone()),
    })
}

fn substitute_values(
    inner: &AlgebraNodeRef,
    variables: &[Variable],
    rows: &[Row],
    s: &Substitution<'_>,
) -> Option<AlgebraNodeRef> {
    let new_inner = substitute(inner, s);
    let bound = variables
        .iter()
        .enumerate()
        .filter_map(|(i, v)| s.get(v).map(|t| (i, t)))
        .collect::<Vec<_>>();
    if bound.is_empty() && new_inner.is_none() {
        return None;
    }

    let kept = (0..variables.len())
        .filter(|i| !bound.iter().any(|(b, _)| b == i))
        .map(Some)
        .collect::<Vec<_>>();
    let rows = rows
        .iter()
        .filter(|row| {
            bound
                .iter()
                .all(|(i, term)| row.get(*i).map_or(true, |value| value == *term))
        })
        .map(|row| row.project(&kept))
        .collect();
    let variables = kept
        .iter()
        .flatten()
        .filter_map(|i| variables.get(*i).cloned())
        .collect::<Vec<_>>();
    Some(AlgebraNode::new(Operator::Values {
        inner: new_inner.unwrap_or_else(|| Arc::clone(inner)),
        variables,
        rows,
    }))
}
