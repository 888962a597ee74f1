use crate::{AlgebraBuilder, AlgebraNodeRef, Expression, Function};
use rdf_weave_model::{
    BlankNode, GroundTerm, Row, Term, TermPattern, TriplePattern, Variable,
};
use spargebra::algebra::{
    Expression as SparqlExpression, Function as SparqlFunction, GraphPattern,
};
use spargebra::Query;
use std::cell::RefCell;
use std::collections::HashMap;

/// An error that is returned if a query cannot be lowered into an algebra tree.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoweringError {
    #[error("Unsupported query form: {0}")]
    UnsupportedQueryForm(&'static str),
    #[error("Queries with a custom dataset are not supported")]
    UnsupportedDataset,
    #[error("Unsupported graph pattern: {0}")]
    UnsupportedGraphPattern(&'static str),
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),
}

/// Lowers a parsed SPARQL query into an algebra tree.
///
/// `SELECT` queries are lowered into their graph pattern, `ASK` queries are additionally wrapped
/// in an [Operator::Ask](crate::Operator::Ask).
pub fn lower_query(query: &Query) -> Result<AlgebraNodeRef, LoweringError> {
    let rewriter = GraphPatternRewriter::new();
    match query {
        Query::Select {
            dataset, pattern, ..
        } => {
            if dataset.is_some() {
                return Err(LoweringError::UnsupportedDataset);
            }
            Ok(rewriter.rewrite(pattern)?.build())
        }
        Query::Ask {
            dataset, pattern, ..
        } => {
            if dataset.is_some() {
                return Err(LoweringError::UnsupportedDataset);
            }
            Ok(rewriter.rewrite(pattern)?.ask().build())
        }
        Query::Construct { .. } => Err(LoweringError::UnsupportedQueryForm("CONSTRUCT")),
        Query::Describe { .. } => Err(LoweringError::UnsupportedQueryForm("DESCRIBE")),
    }
}

/// Lowers a single graph pattern into an algebra tree.
pub fn lower_graph_pattern(pattern: &GraphPattern) -> Result<AlgebraNodeRef, LoweringError> {
    Ok(GraphPatternRewriter::new().rewrite(pattern)?.build())
}

/// Rewrites [GraphPattern]s into algebra trees.
///
/// Blank nodes in basic graph patterns are replaced with fresh variables that are shared across
/// the entire query.
struct GraphPatternRewriter {
    blank_nodes: RefCell<HashMap<BlankNode, Variable>>,
}

impl GraphPatternRewriter {
    fn new() -> Self {
        Self {
            blank_nodes: RefCell::default(),
        }
    }

    fn rewrite(&self, pattern: &GraphPattern) -> Result<AlgebraBuilder, LoweringError> {
        match pattern {
            GraphPattern::Bgp { patterns } => {
                let patterns = patterns
                    .iter()
                    .map(|p| self.rewrite_triple_pattern(p))
                    .collect::<Vec<_>>();
                Ok(AlgebraBuilder::new_from_bgp(&patterns))
            }
            GraphPattern::Join { left, right } => {
                let left = self.rewrite(left)?;
                let right = self.rewrite(right)?;
                Ok(left.join(right.build()))
            }
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => {
                let left = self.rewrite(left)?;
                let right = self.rewrite(right)?;
                let expression = expression
                    .as_ref()
                    .map(|e| self.rewrite_expression(e))
                    .transpose()?;
                Ok(left.left_join(right.build(), expression))
            }
            GraphPattern::Filter { expr, inner } => {
                let inner = self.rewrite(inner)?;
                self.rewrite_filter(inner, expr)
            }
            GraphPattern::Union { left, right } => {
                let left = self.rewrite(left)?;
                let right = self.rewrite(right)?;
                Ok(left.union(right.build()))
            }
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => {
                let inner = self.rewrite(inner)?;
                let expression = self.rewrite_expression(expression)?;
                Ok(inner.extend(variable.clone(), expression))
            }
            GraphPattern::Minus { left, right } => {
                let left = self.rewrite(left)?;
                let right = self.rewrite(right)?;
                Ok(left.minus(right.build()))
            }
            GraphPattern::Values {
                variables,
                bindings,
            } => {
                let rows = bindings
                    .iter()
                    .map(|binding| binding.iter().map(|t| t.clone().map(ground_term)).collect())
                    .collect::<Vec<Row>>();
                Ok(AlgebraBuilder::new_from_values(variables.clone(), rows))
            }
            GraphPattern::Project { inner, variables } => {
                Ok(self.rewrite(inner)?.project(variables.clone()))
            }
            GraphPattern::Distinct { inner } => Ok(self.rewrite(inner)?.distinct()),
            GraphPattern::Reduced { inner } => Ok(self.rewrite(inner)?.weak_distinct()),
            GraphPattern::Slice {
                inner,
                start,
                length,
            } => Ok(self.rewrite(inner)?.slice(*start, *length)),
            GraphPattern::Path { .. } => {
                Err(LoweringError::UnsupportedGraphPattern("property paths"))
            }
            GraphPattern::Graph { .. } => Err(LoweringError::UnsupportedGraphPattern("GRAPH")),
            GraphPattern::OrderBy { .. } => {
                Err(LoweringError::UnsupportedGraphPattern("ORDER BY"))
            }
            GraphPattern::Group { .. } => Err(LoweringError::UnsupportedGraphPattern("GROUP BY")),
            GraphPattern::Service { .. } => {
                Err(LoweringError::UnsupportedGraphPattern("SERVICE"))
            }
        }
    }

    /// Splits the filter condition into its conjuncts. Top-level `EXISTS` and `NOT EXISTS`
    /// conjuncts become correlated nodes, all other conjuncts become a single filter.
    fn rewrite_filter(
        &self,
        inner: AlgebraBuilder,
        expr: &SparqlExpression,
    ) -> Result<AlgebraBuilder, LoweringError> {
        let mut conjuncts = Vec::new();
        collect_conjuncts(expr, &mut conjuncts);

        let mut result = inner;
        let mut correlated = Vec::new();
        for conjunct in conjuncts {
            match conjunct {
                SparqlExpression::Exists(pattern) => {
                    correlated.push((true, self.rewrite(pattern)?.build()));
                }
                SparqlExpression::Not(inner) => match inner.as_ref() {
                    SparqlExpression::Exists(pattern) => {
                        correlated.push((false, self.rewrite(pattern)?.build()));
                    }
                    _ => result = result.filter(self.rewrite_expression(conjunct)?),
                },
                _ => result = result.filter(self.rewrite_expression(conjunct)?),
            }
        }

        for (exists, pattern) in correlated {
            result = if exists {
                result.exists(pattern)
            } else {
                result.not_exists(pattern)
            };
        }
        Ok(result)
    }

    fn rewrite_triple_pattern(&self, pattern: &TriplePattern) -> TriplePattern {
        TriplePattern {
            subject: self.rewrite_term_pattern(&pattern.subject),
            predicate: pattern.predicate.clone(),
            object: self.rewrite_term_pattern(&pattern.object),
        }
    }

    fn rewrite_term_pattern(&self, pattern: &TermPattern) -> TermPattern {
        match pattern {
            TermPattern::BlankNode(node) => {
                let mut blank_nodes = self.blank_nodes.borrow_mut();
                let next = blank_nodes.len();
                let variable = blank_nodes
                    .entry(node.clone())
                    .or_insert_with(|| Variable::new_unchecked(format!("_bnode_{next}")));
                TermPattern::Variable(variable.clone())
            }
            _ => pattern.clone(),
        }
    }

    fn rewrite_expression(&self, expr: &SparqlExpression) -> Result<Expression, LoweringError> {
        let binary = |lhs: &SparqlExpression, rhs: &SparqlExpression| {
            Ok::<_, LoweringError>((
                Box::new(self.rewrite_expression(lhs)?),
                Box::new(self.rewrite_expression(rhs)?),
            ))
        };
        let unary = |inner: &SparqlExpression| {
            Ok::<_, LoweringError>(Box::new(self.rewrite_expression(inner)?))
        };

        Ok(match expr {
            SparqlExpression::NamedNode(node) => Expression::constant(node.clone()),
            SparqlExpression::Literal(literal) => Expression::constant(literal.clone()),
            SparqlExpression::Variable(variable) => Expression::Variable(variable.clone()),
            SparqlExpression::Bound(variable) => Expression::Bound(variable.clone()),
            SparqlExpression::Or(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Or(lhs, rhs)
            }
            SparqlExpression::And(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::And(lhs, rhs)
            }
            SparqlExpression::Equal(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Equal(lhs, rhs)
            }
            SparqlExpression::SameTerm(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::SameTerm(lhs, rhs)
            }
            SparqlExpression::Greater(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Greater(lhs, rhs)
            }
            SparqlExpression::GreaterOrEqual(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::GreaterOrEqual(lhs, rhs)
            }
            SparqlExpression::Less(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Less(lhs, rhs)
            }
            SparqlExpression::LessOrEqual(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::LessOrEqual(lhs, rhs)
            }
            SparqlExpression::Add(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Add(lhs, rhs)
            }
            SparqlExpression::Subtract(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Subtract(lhs, rhs)
            }
            SparqlExpression::Multiply(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Multiply(lhs, rhs)
            }
            SparqlExpression::Divide(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Divide(lhs, rhs)
            }
            SparqlExpression::In(lhs, list) => Expression::In(
                unary(lhs)?,
                list.iter()
                    .map(|e| self.rewrite_expression(e))
                    .collect::<Result<_, _>>()?,
            ),
            SparqlExpression::UnaryPlus(inner) => Expression::UnaryPlus(unary(inner)?),
            SparqlExpression::UnaryMinus(inner) => Expression::UnaryMinus(unary(inner)?),
            SparqlExpression::Not(inner) => Expression::Not(unary(inner)?),
            SparqlExpression::If(condition, then, otherwise) => Expression::If(
                unary(condition)?,
                unary(then)?,
                unary(otherwise)?,
            ),
            SparqlExpression::Coalesce(args) => Expression::Coalesce(
                args.iter()
                    .map(|e| self.rewrite_expression(e))
                    .collect::<Result<_, _>>()?,
            ),
            SparqlExpression::FunctionCall(function, args) => {
                let function = rewrite_function(function)?;
                let (min, max) = function.arity();
                if args.len() < min || args.len() > max {
                    return Err(LoweringError::UnsupportedExpression(format!(
                        "{} expects between {min} and {max} arguments, got {}",
                        function.name(),
                        args.len()
                    )));
                }
                let args = args
                    .iter()
                    .map(|e| self.rewrite_expression(e))
                    .collect::<Result<_, _>>()?;
                Expression::FunctionCall(function, args)
            }
            SparqlExpression::Exists(_) => {
                return Err(LoweringError::UnsupportedExpression(
                    "EXISTS is only supported as a top-level filter condition".to_owned(),
                ))
            }
        })
    }
}

fn collect_conjuncts<'a>(expr: &'a SparqlExpression, result: &mut Vec<&'a SparqlExpression>) {
    match expr {
        SparqlExpression::And(lhs, rhs) => {
            collect_conjuncts(lhs, result);
            collect_conjuncts(rhs, result);
        }
        _ => result.push(expr),
    }
}

fn rewrite_function(function: &SparqlFunction) -> Result<Function, LoweringError> {
    Ok(match function {
        SparqlFunction::IsIri => Function::IsIri,
        SparqlFunction::IsBlank => Function::IsBlank,
        SparqlFunction::IsLiteral => Function::IsLiteral,
        SparqlFunction::IsNumeric => Function::IsNumeric,
        SparqlFunction::Str => Function::Str,
        SparqlFunction::Lang => Function::Lang,
        SparqlFunction::Datatype => Function::Datatype,
        SparqlFunction::StrLen => Function::StrLen,
        SparqlFunction::UCase => Function::UCase,
        SparqlFunction::LCase => Function::LCase,
        SparqlFunction::Contains => Function::Contains,
        SparqlFunction::StrStarts => Function::StrStarts,
        SparqlFunction::StrEnds => Function::StrEnds,
        SparqlFunction::Regex => Function::Regex,
        other => {
            return Err(LoweringError::UnsupportedExpression(format!(
                "function {other}"
            )))
        }
    })
}

fn ground_term(term: GroundTerm) -> Term {
    match term {
        GroundTerm::NamedNode(node) => node.into(),
        GroundTerm::Literal(literal) => literal.into(),
    }
}
