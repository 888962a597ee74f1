use rdf_weave_model::{Literal, Term, Variable};
use std::fmt::{Display, Formatter};

/// A built-in function that can be called in an [Expression].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Function {
    IsIri,
    IsBlank,
    IsLiteral,
    IsNumeric,
    Str,
    Lang,
    Datatype,
    StrLen,
    UCase,
    LCase,
    Contains,
    StrStarts,
    StrEnds,
    Regex,
}

impl Function {
    /// Returns the SPARQL name of the function.
    pub fn name(self) -> &'static str {
        match self {
            Function::IsIri => "isIRI",
            Function::IsBlank => "isBLANK",
            Function::IsLiteral => "isLITERAL",
            Function::IsNumeric => "isNUMERIC",
            Function::Str => "STR",
            Function::Lang => "LANG",
            Function::Datatype => "DATATYPE",
            Function::StrLen => "STRLEN",
            Function::UCase => "UCASE",
            Function::LCase => "LCASE",
            Function::Contains => "CONTAINS",
            Function::StrStarts => "STRSTARTS",
            Function::StrEnds => "STRENDS",
            Function::Regex => "REGEX",
        }
    }

    /// Returns the allowed number of arguments.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Function::IsIri
            | Function::IsBlank
            | Function::IsLiteral
            | Function::IsNumeric
            | Function::Str
            | Function::Lang
            | Function::Datatype
            | Function::StrLen
            | Function::UCase
            | Function::LCase => (1, 1),
            Function::Contains | Function::StrStarts | Function::StrEnds => (2, 2),
            Function::Regex => (2, 3),
        }
    }
}

/// An expression over the variables of a solution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expression {
    Variable(Variable),
    Constant(Term),
    Bound(Variable),
    Or(Box<Expression>, Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    Equal(Box<Expression>, Box<Expression>),
    SameTerm(Box<Expression>, Box<Expression>),
    Greater(Box<Expression>, Box<Expression>),
    GreaterOrEqual(Box<Expression>, Box<Expression>),
    Less(Box<Expression>, Box<Expression>),
    LessOrEqual(Box<Expression>, Box<Expression>),
    In(Box<Expression>, Vec<Expression>),
    Add(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
    UnaryPlus(Box<Expression>),
    UnaryMinus(Box<Expression>),
    If(Box<Expression>, Box<Expression>, Box<Expression>),
    Coalesce(Vec<Expression>),
    FunctionCall(Function, Vec<Expression>),
}

impl Expression {
    /// Creates a constant expression.
    pub fn constant(term: impl Into<Term>) -> Self {
        Self::Constant(term.into())
    }

    /// Returns all variables referenced by this expression, in order of their first occurrence.
    pub fn variables(&self) -> Vec<Variable> {
        let mut result = Vec::new();
        self.collect_variables(&mut result);
        result
    }

    fn collect_variables(&self, result: &mut Vec<Variable>) {
        match self {
            Expression::Variable(v) | Expression::Bound(v) => {
                if !result.contains(v) {
                    result.push(v.clone());
                }
            }
            Expression::Constant(_) => {}
            Expression::Or(lhs, rhs)
            | Expression::And(lhs, rhs)
            | Expression::Equal(lhs, rhs)
            | Expression::SameTerm(lhs, rhs)
            | Expression::Greater(lhs, rhs)
            | Expression::GreaterOrEqual(lhs, rhs)
            | Expression::Less(lhs, rhs)
            | Expression::LessOrEqual(lhs, rhs)
            | Expression::Add(lhs, rhs)
            | Expression::Subtract(lhs, rhs)
            | Expression::Multiply(lhs, rhs)
            | Expression::Divide(lhs, rhs) => {
                lhs.collect_variables(result);
                rhs.collect_variables(result);
            }
            Expression::Not(inner) | Expression::UnaryPlus(inner) | Expression::UnaryMinus(inner) => {
                inner.collect_variables(result);
            }
            Expression::In(lhs, list) => {
                lhs.collect_variables(result);
                for e in list {
                    e.collect_variables(result);
                }
            }
            Expression::If(condition, then, otherwise) => {
                condition.collect_variables(result);
                then.collect_variables(result);
                otherwise.collect_variables(result);
            }
            Expression::Coalesce(args) | Expression::FunctionCall(_, args) => {
                for e in args {
                    e.collect_variables(result);
                }
            }
        }
    }

    /// Substitutes all occurrences of the bound variables.
    ///
    /// `BOUND(?v)` of a bound variable becomes the constant `true`. Returns [None] if the
    /// expression does not reference any bound variable.
    pub fn bind(&self, variables: &[Variable], terms: &[Option<Term>]) -> Option<Expression> {
        let lookup = |v: &Variable| {
            variables
                .iter()
                .zip(terms)
                .find(|(var, _)| *var == v)
                .and_then(|(_, term)| term.clone())
        };
        self.substitute(&lookup)
    }

    pub(crate) fn substitute(
        &self,
        lookup: &impl Fn(&Variable) -> Option<Term>,
    ) -> Option<Expression> {
        let binary = |lhs: &Expression, rhs: &Expression| {
            let new_lhs = lhs.substitute(lookup);
            let new_rhs = rhs.substitute(lookup);
            if new_lhs.is_none() && new_rhs.is_none() {
                return None;
            }
            Some((
                Box::new(new_lhs.unwrap_or_else(|| lhs.clone())),
                Box::new(new_rhs.unwrap_or_else(|| rhs.clone())),
            ))
        };

        match self {
            Expression::Variable(v) => lookup(v).map(Expression::Constant),
            Expression::Bound(v) => lookup(v).map(|_| Expression::constant(Literal::from(true))),
            Expression::Constant(_) => None,
            Expression::Or(lhs, rhs) => binary(lhs, rhs).map(|(l, r)| Expression::Or(l, r)),
            Expression::And(lhs, rhs) => binary(lhs, rhs).map(|(l, r)| Expression::And(l, r)),
            Expression::Equal(lhs, rhs) => binary(lhs, rhs).map(|(l, r)| Expression::Equal(l, r)),
            Expression::SameTerm(lhs, rhs) => {
                binary(lhs, rhs).map(|(l, r)| Expression::SameTerm(l, r))
            }
            Expression::Greater(lhs, rhs) => {
                binary(lhs, rhs).map(|(l, r)| Expression::Greater(l, r))
            }
            Expression::GreaterOrEqual(lhs, rhs) => {
                binary(lhs, rhs).map(|(l, r)| Expression::GreaterOrEqual(l, r))
            }
            Expression::Less(lhs, rhs) => binary(lhs, rhs).map(|(l, r)| Expression::Less(l, r)),
            Expression::LessOrEqual(lhs, rhs) => {
                binary(lhs, rhs).map(|(l, r)| Expression::LessOrEqual(l, r))
            }
            Expression::Add(lhs, rhs) => binary(lhs, rhs).map(|(l, r)| Expression::Add(l, r)),
            Expression::Subtract(lhs, rhs) => {
                binary(lhs, rhs).map(|(l, r)| Expression::Subtract(l, r))
            }
            Expression::Multiply(lhs, rhs) => {
                binary(lhs, rhs).map(|(l, r)| Expression::Multiply(l, r))
            }
            Expression::Divide(lhs, rhs) => {
                binary(lhs, rhs).map(|(l, r)| Expression::Divide(l, r))
            }
            Expression::Not(inner) => inner.substitute(lookup).map(|e| Expression::Not(Box::new(e))),
            Expression::UnaryPlus(inner) => inner
                .substitute(lookup)
                .map(|e| Expression::UnaryPlus(Box::new(e))),
            Expression::UnaryMinus(inner) => inner
                .substitute(lookup)
                .map(|e| Expression::UnaryMinus(Box::new(e))),
            Expression::In(lhs, list) => {
                let new_lhs = lhs.substitute(lookup);
                let new_list = substitute_all(list, lookup);
                if new_lhs.is_none() && new_list.is_none() {
                    return None;
                }
                Some(Expression::In(
                    Box::new(new_lhs.unwrap_or_else(|| lhs.as_ref().clone())),
                    new_list.unwrap_or_else(|| list.clone()),
                ))
            }
            Expression::If(condition, then, otherwise) => {
                let parts = [condition, then, otherwise].map(|e| e.substitute(lookup));
                if parts.iter().all(Option::is_none) {
                    return None;
                }
                let [c, t, o] = parts;
                Some(Expression::If(
                    Box::new(c.unwrap_or_else(|| condition.as_ref().clone())),
                    Box::new(t.unwrap_or_else(|| then.as_ref().clone())),
                    Box::new(o.unwrap_or_else(|| otherwise.as_ref().clone())),
                ))
            }
            Expression::Coalesce(args) => substitute_all(args, lookup).map(Expression::Coalesce),
            Expression::FunctionCall(function, args) => {
                substitute_all(args, lookup).map(|args| Expression::FunctionCall(*function, args))
            }
        }
    }
}

fn substitute_all(
    expressions: &[Expression],
    lookup: &impl Fn(&Variable) -> Option<Term>,
) -> Option<Vec<Expression>> {
    let substituted = expressions
        .iter()
        .map(|e| e.substitute(lookup))
        .collect::<Vec<_>>();
    if substituted.iter().all(Option::is_none) {
        return None;
    }
    Some(
        substituted
            .into_iter()
            .zip(expressions)
            .map(|(new, old)| new.unwrap_or_else(|| old.clone()))
            .collect(),
    )
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Variable(v) => write!(f, "{v}"),
            Expression::Constant(t) => write!(f, "{t}"),
            Expression::Bound(v) => write!(f, "BOUND({v})"),
            Expression::Or(lhs, rhs) => write!(f, "({lhs} || {rhs})"),
            Expression::And(lhs, rhs) => write!(f, "({lhs} && {rhs})"),
            Expression::Not(inner) => write!(f, "!{inner}"),
            Expression::Equal(lhs, rhs) => write!(f, "({lhs} = {rhs})"),
            Expression::SameTerm(lhs, rhs) => write!(f, "sameTerm({lhs}, {rhs})"),
            Expression::Greater(lhs, rhs) => write!(f, "({lhs} > {rhs})"),
            Expression::GreaterOrEqual(lhs, rhs) => write!(f, "({lhs} >= {rhs})"),
            Expression::Less(lhs, rhs) => write!(f, "({lhs} < {rhs})"),
            Expression::LessOrEqual(lhs, rhs) => write!(f, "({lhs} <= {rhs})"),
            Expression::In(lhs, list) => {
                write!(f, "({lhs} IN (")?;
                write_list(f, list)?;
                f.write_str("))")
            }
            Expression::Add(lhs, rhs) => write!(f, "({lhs} + {rhs})"),
            Expression::Subtract(lhs, rhs) => write!(f, "({lhs} - {rhs})"),
            Expression::Multiply(lhs, rhs) => write!(f, "({lhs} * {rhs})"),
            Expression::Divide(lhs, rhs) => write!(f, "({lhs} / {rhs})"),
            Expression::UnaryPlus(inner) => write!(f, "+{inner}"),
            Expression::UnaryMinus(inner) => write!(f, "-{inner}"),
            Expression::If(condition, then, otherwise) => {
                write!(f, "IF({condition}, {then}, {otherwise})")
            }
            Expression::Coalesce(args) => {
                f.write_str("COALESCE(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expression::FunctionCall(function, args) => {
                write!(f, "{}(", function.name())?;
                write_list(f, args)?;
                f.write_str(")")
            }
        }
    }
}

fn write_list(f: &mut Formatter<'_>, expressions: &[Expression]) -> std::fmt::Result {
    for (i, e) in expressions.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{e}")?;
    }
    Ok(())
}
