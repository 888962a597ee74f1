use rdf_weave_logical::{Expression, Function};
use rdf_weave_model::{
    literal_datatype, Integer, Literal, Numeric, Row, Term, ThinError, ThinResult, TypedValue,
    Variable,
};
use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::cmp::Ordering;

/// An [Expression] that has been prepared for the rows of a fixed list of variables.
///
/// Variables are resolved to their column once. Regular expressions with constant patterns are
/// compiled once.
#[derive(Debug)]
pub(crate) struct PreparedExpression {
    expression: Expression,
    columns: FxHashMap<Variable, usize>,
    regexes: FxHashMap<(String, String), Regex>,
}

impl PreparedExpression {
    /// Prepares `expression` for rows that are aligned with `variables`.
    pub(crate) fn new(expression: Expression, variables: &[Variable]) -> Self {
        let columns = variables
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), i))
            .collect();
        let mut regexes = FxHashMap::default();
        collect_constant_regexes(&expression, &mut regexes);
        Self {
            expression,
            columns,
            regexes,
        }
    }

    /// Evaluates the expression for `row`.
    pub(crate) fn evaluate(&self, row: &Row) -> ThinResult<Term> {
        self.eval(&self.expression, row)
    }

    /// Evaluates the [effective boolean value](https://www.w3.org/TR/sparql11-query/#ebv) of
    /// the expression for `row`. Errors evaluate to `false`.
    pub(crate) fn is_true(&self, row: &Row) -> bool {
        self.ebv(&self.expression, row).unwrap_or(false)
    }

    fn ebv(&self, expression: &Expression, row: &Row) -> ThinResult<bool> {
        let term = self.eval(expression, row)?;
        TypedValue::from(&term).effective_boolean_value()
    }

    fn eval(&self, expression: &Expression, row: &Row) -> ThinResult<Term> {
        match expression {
            Expression::Variable(variable) => self.lookup(variable, row).cloned(),
            Expression::Constant(term) => Ok(term.clone()),
            Expression::Bound(variable) => Ok(boolean(self.lookup(variable, row).is_ok())),
            Expression::Or(lhs, rhs) => {
                match (self.ebv(lhs, row), self.ebv(rhs, row)) {
                    (Ok(true), _) | (_, Ok(true)) => Ok(boolean(true)),
                    (Ok(false), Ok(false)) => Ok(boolean(false)),
                    _ => ThinError::expected(),
                }
            }
            Expression::And(lhs, rhs) => {
                match (self.ebv(lhs, row), self.ebv(rhs, row)) {
                    (Ok(false), _) | (_, Ok(false)) => Ok(boolean(false)),
                    (Ok(true), Ok(true)) => Ok(boolean(true)),
                    _ => ThinError::expected(),
                }
            }
            Expression::Not(inner) => Ok(boolean(!self.ebv(inner, row)?)),
            Expression::Equal(lhs, rhs) => {
                let (lhs, rhs) = (self.typed(lhs, row)?, self.typed(rhs, row)?);
                Ok(boolean(lhs.value_eq(&rhs)?))
            }
            Expression::SameTerm(lhs, rhs) => {
                Ok(boolean(self.eval(lhs, row)? == self.eval(rhs, row)?))
            }
            Expression::Greater(lhs, rhs) => self.compare(lhs, rhs, row, Ordering::is_gt),
            Expression::GreaterOrEqual(lhs, rhs) => self.compare(lhs, rhs, row, Ordering::is_ge),
            Expression::Less(lhs, rhs) => self.compare(lhs, rhs, row, Ordering::is_lt),
            Expression::LessOrEqual(lhs, rhs) => self.compare(lhs, rhs, row, Ordering::is_le),
            Expression::In(needle, haystack) => {
                let needle = self.typed(needle, row)?;
                let mut error = false;
                for candidate in haystack {
                    match self
                        .typed(candidate, row)
                        .and_then(|candidate| needle.value_eq(&candidate))
                    {
                        Ok(true) => return Ok(boolean(true)),
                        Ok(false) => {}
                        Err(_) => error = true,
                    }
                }
                if error {
                    ThinError::expected()
                } else {
                    Ok(boolean(false))
                }
            }
            Expression::Add(lhs, rhs) => self.arithmetic(lhs, rhs, row, Numeric::checked_add),
            Expression::Subtract(lhs, rhs) => self.arithmetic(lhs, rhs, row, Numeric::checked_sub),
            Expression::Multiply(lhs, rhs) => self.arithmetic(lhs, rhs, row, Numeric::checked_mul),
            Expression::Divide(lhs, rhs) => self.arithmetic(lhs, rhs, row, Numeric::checked_div),
            Expression::UnaryPlus(inner) => {
                let value = self.numeric(inner, row)?;
                Ok(Literal::from(value).into())
            }
            Expression::UnaryMinus(inner) => {
                let value = self.numeric(inner, row)?.checked_neg()?;
                Ok(Literal::from(value).into())
            }
            Expression::If(condition, then, otherwise) => {
                if self.ebv(condition, row)? {
                    self.eval(then, row)
                } else {
                    self.eval(otherwise, row)
                }
            }
            Expression::Coalesce(args) => args
                .iter()
                .find_map(|arg| self.eval(arg, row).ok())
                .ok_or(ThinError::default()),
            Expression::FunctionCall(function, args) => self.call(*function, args, row),
        }
    }

    fn lookup<'row>(&self, variable: &Variable, row: &'row Row) -> ThinResult<&'row Term> {
        self.columns
            .get(variable)
            .and_then(|i| row.get(*i))
            .ok_or(ThinError::default())
    }

    fn typed(&self, expression: &Expression, row: &Row) -> ThinResult<TypedValue> {
        self.eval(expression, row).map(|term| TypedValue::from(&term))
    }

    fn numeric(&self, expression: &Expression, row: &Row) -> ThinResult<Numeric> {
        match self.typed(expression, row)? {
            TypedValue::NumericLiteral(value) => Ok(value),
            _ => ThinError::expected(),
        }
    }

    fn compare(
        &self,
        lhs: &Expression,
        rhs: &Expression,
        row: &Row,
        accept: fn(Ordering) -> bool,
    ) -> ThinResult<Term> {
        let ordering = self.typed(lhs, row)?.value_cmp(&self.typed(rhs, row)?)?;
        Ok(boolean(accept(ordering)))
    }

    fn arithmetic(
        &self,
        lhs: &Expression,
        rhs: &Expression,
        row: &Row,
        op: fn(Numeric, Numeric) -> ThinResult<Numeric>,
    ) -> ThinResult<Term> {
        let result = op(self.numeric(lhs, row)?, self.numeric(rhs, row)?)?;
        Ok(Literal::from(result).into())
    }

    fn call(&self, function: Function, args: &[Expression], row: &Row) -> ThinResult<Term> {
        let values = args
            .iter()
            .map(|arg| self.eval(arg, row))
            .collect::<ThinResult<Vec<_>>>()?;
        let (min, max) = function.arity();
        if values.len() < min || values.len() > max {
            return ThinError::expected();
        }

        match (function, values.as_slice()) {
            (Function::IsIri, [term]) => Ok(boolean(matches!(term, Term::NamedNode(_)))),
            (Function::IsBlank, [term]) => Ok(boolean(matches!(term, Term::BlankNode(_)))),
            (Function::IsLiteral, [term]) => Ok(boolean(matches!(term, Term::Literal(_)))),
            (Function::IsNumeric, [term]) => Ok(boolean(matches!(
                TypedValue::from(term),
                TypedValue::NumericLiteral(_)
            ))),
            (Function::Str, [term]) => match term {
                Term::NamedNode(node) => Ok(Literal::new_simple_literal(node.as_str()).into()),
                Term::Literal(literal) => Ok(Literal::new_simple_literal(literal.value()).into()),
                _ => ThinError::expected(),
            },
            (Function::Lang, [Term::Literal(literal)]) => {
                Ok(Literal::new_simple_literal(literal.language().unwrap_or_default()).into())
            }
            (Function::Datatype, [Term::Literal(literal)]) => Ok(literal_datatype(literal).into()),
            (Function::StrLen, [term]) => {
                let value = TypedValue::from(term);
                let (value, _) = value.as_string_literal()?;
                let length = i64::try_from(value.chars().count())?;
                Ok(Literal::from(Numeric::Integer(Integer::from(length))).into())
            }
            (Function::UCase, [term]) => map_string(term, str::to_uppercase),
            (Function::LCase, [term]) => map_string(term, str::to_lowercase),
            (Function::Contains, [lhs, rhs]) => {
                compare_strings(lhs, rhs, |lhs, rhs| lhs.contains(rhs))
            }
            (Function::StrStarts, [lhs, rhs]) => {
                compare_strings(lhs, rhs, |lhs, rhs| lhs.starts_with(rhs))
            }
            (Function::StrEnds, [lhs, rhs]) => {
                compare_strings(lhs, rhs, |lhs, rhs| lhs.ends_with(rhs))
            }
            (Function::Regex, [text, pattern, flags @ ..]) => {
                let text = TypedValue::from(text);
                let (text, _) = text.as_string_literal()?;
                let pattern = simple_literal(pattern)?;
                let flags = match flags {
                    [flags] => simple_literal(flags)?,
                    _ => "",
                };

                let is_match = match self.regexes.get(&(pattern.to_owned(), flags.to_owned())) {
                    Some(regex) => regex.is_match(text),
                    None => compile_pattern(pattern, flags)?.is_match(text),
                };
                Ok(boolean(is_match))
            }
            _ => ThinError::expected(),
        }
    }
}

fn boolean(value: bool) -> Term {
    Literal::from(value).into()
}

fn simple_literal(term: &Term) -> ThinResult<&str> {
    match term {
        Term::Literal(literal)
            if literal.language().is_none()
                && literal.datatype() == rdf_weave_model::vocab::xsd::STRING =>
        {
            Ok(literal.value())
        }
        _ => ThinError::expected(),
    }
}

fn map_string(term: &Term, map: impl Fn(&str) -> String) -> ThinResult<Term> {
    match TypedValue::from(term) {
        TypedValue::SimpleLiteral(value) => Ok(Literal::new_simple_literal(map(&value)).into()),
        TypedValue::LanguageStringLiteral { value, language } => {
            Ok(Literal::new_language_tagged_literal_unchecked(map(&value), language).into())
        }
        _ => ThinError::expected(),
    }
}

/// Applies `test` to two [argument-compatible](https://www.w3.org/TR/sparql11-query/#func-arg-compatibility)
/// string literals.
fn compare_strings(lhs: &Term, rhs: &Term, test: impl Fn(&str, &str) -> bool) -> ThinResult<Term> {
    let lhs = TypedValue::from(lhs);
    let rhs = TypedValue::from(rhs);
    let (lhs_value, lhs_language) = lhs.as_string_literal()?;
    let (rhs_value, rhs_language) = rhs.as_string_literal()?;
    if rhs_language.is_some() && lhs_language != rhs_language {
        return ThinError::expected();
    }
    Ok(boolean(test(lhs_value, rhs_value)))
}

fn collect_constant_regexes(
    expression: &Expression,
    regexes: &mut FxHashMap<(String, String), Regex>,
) {
    if let Expression::FunctionCall(Function::Regex, args) = expression {
        fn constant(arg: Option<&Expression>) -> Option<&str> {
            match arg {
                Some(Expression::Constant(term)) => simple_literal(term).ok(),
                None => Some(""),
                Some(_) => None,
            }
        }
        if let (Some(pattern), Some(flags)) = (constant(args.get(1)), constant(args.get(2))) {
            if let Ok(regex) = compile_pattern(pattern, flags) {
                regexes.insert((pattern.to_owned(), flags.to_owned()), regex);
            }
        }
    }

    match expression {
        Expression::Variable(_) | Expression::Constant(_) | Expression::Bound(_) => {}
        Expression::Not(inner) | Expression::UnaryPlus(inner) | Expression::UnaryMinus(inner) => {
            collect_constant_regexes(inner, regexes);
        }
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
            collect_constant_regexes(lhs, regexes);
            collect_constant_regexes(rhs, regexes);
        }
        Expression::In(needle, haystack) => {
            collect_constant_regexes(needle, regexes);
            for e in haystack {
                collect_constant_regexes(e, regexes);
            }
        }
        Expression::If(condition, then, otherwise) => {
            collect_constant_regexes(condition, regexes);
            collect_constant_regexes(then, regexes);
            collect_constant_regexes(otherwise, regexes);
        }
        Expression::Coalesce(args) | Expression::FunctionCall(_, args) => {
            for e in args {
                collect_constant_regexes(e, regexes);
            }
        }
    }
}

fn compile_pattern(pattern: &str, flags: &str) -> ThinResult<Regex> {
    const REGEX_SIZE_LIMIT: usize = 1_000_000;

    let mut pattern = Cow::Borrowed(pattern);
    if flags.contains('q') {
        pattern = regex::escape(&pattern).into();
    }
    let mut regex_builder = RegexBuilder::new(&pattern);
    regex_builder.size_limit(REGEX_SIZE_LIMIT);
    for flag in flags.chars() {
        match flag {
            's' => {
                regex_builder.dot_matches_new_line(true);
            }
            'm' => {
                regex_builder.multi_line(true);
            }
            'i' => {
                regex_builder.case_insensitive(true);
            }
            'x' => {
                regex_builder.ignore_whitespace(true);
            }
            'q' => (),
            _ => return ThinError::expected(),
        }
    }
    regex_builder.build().map_err(|_| ThinError::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_weave_model::vocab::xsd;
    use rdf_weave_model::{Double, NamedNode};

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    fn v(name: &str) -> Box<Expression> {
        Box::new(Expression::Variable(var(name)))
    }

    fn lit(value: impl Into<Literal>) -> Box<Expression> {
        Box::new(Expression::constant(value.into()))
    }

    fn row(terms: Vec<Option<Term>>) -> Row {
        Row::from(terms)
    }

    fn evaluate(expression: Expression, variables: &[Variable], row: &Row) -> ThinResult<Term> {
        PreparedExpression::new(expression, variables).evaluate(row)
    }

    #[test]
    fn arithmetic_and_comparison() -> ThinResult<()> {
        let variables = [var("a"), var("b")];
        let row = row(vec![
            Some(Literal::from(2).into()),
            Some(Literal::from(1.5).into()),
        ]);

        let sum = evaluate(Expression::Add(v("a"), v("b")), &variables, &row)?;
        assert_eq!(
            TypedValue::from(&sum),
            TypedValue::NumericLiteral(Numeric::Double(Double::from(3.5_f64)))
        );
        assert!(matches!(&sum, Term::Literal(l) if l.datatype() == xsd::DOUBLE));

        let greater = PreparedExpression::new(Expression::Greater(v("a"), v("b")), &variables);
        assert!(greater.is_true(&row));
        Ok(())
    }

    #[test]
    fn unbound_variables_are_errors() {
        let variables = [var("a")];
        let row = row(vec![None]);
        assert!(evaluate(Expression::Variable(var("a")), &variables, &row).is_err());
        assert_eq!(
            evaluate(Expression::Bound(var("a")), &variables, &row),
            Ok(boolean(false))
        );
        assert!(evaluate(Expression::Variable(var("unknown")), &variables, &row).is_err());
    }

    #[test]
    fn or_recovers_from_errors() {
        let variables = [var("a")];
        let row = row(vec![None]);
        let expression = Expression::Or(v("a"), lit(true));
        assert_eq!(evaluate(expression, &variables, &row), Ok(boolean(true)));

        let expression = Expression::And(v("a"), lit(true));
        assert!(evaluate(expression, &variables, &row).is_err());
    }

    #[test]
    fn string_functions() {
        let variables = [var("name")];
        let row = row(vec![Some(
            Literal::new_language_tagged_literal_unchecked("Alice", "en").into(),
        )]);

        let call = |function, args| evaluate(Expression::FunctionCall(function, args), &variables, &row);
        assert_eq!(
            call(Function::UCase, vec![*v("name")]),
            Ok(Literal::new_language_tagged_literal_unchecked("ALICE", "en").into())
        );
        assert_eq!(
            call(Function::StrLen, vec![*v("name")]),
            Ok(Literal::from(Numeric::Integer(Integer::from(5_i64))).into())
        );
        assert_eq!(
            call(Function::Lang, vec![*v("name")]),
            Ok(Literal::new_simple_literal("en").into())
        );
        assert_eq!(
            call(Function::StrStarts, vec![*v("name"), *lit("Al")]),
            Ok(boolean(true))
        );
        assert!(call(
            Function::Contains,
            vec![
                *lit("Alice"),
                *lit(Literal::new_language_tagged_literal_unchecked("A", "de"))
            ]
        )
        .is_err());
    }

    #[test]
    fn regex_with_flags() {
        let variables = [var("name")];
        let row = row(vec![Some(Literal::new_simple_literal("Alice").into())]);
        let expression = Expression::FunctionCall(
            Function::Regex,
            vec![*v("name"), *lit("^al"), *lit("i")],
        );
        let prepared = PreparedExpression::new(expression, &variables);
        assert_eq!(prepared.regexes.len(), 1);
        assert!(prepared.is_true(&row));

        let expression = Expression::FunctionCall(Function::Regex, vec![*v("name"), *lit("^al")]);
        assert_eq!(evaluate(expression, &variables, &row), Ok(boolean(false)));
    }

    #[test]
    fn only_constant_regexes_are_compiled_upfront() {
        let variables = [var("name")];
        let row = row(vec![Some(Literal::new_simple_literal("Alice").into())]);

        let constant = Expression::FunctionCall(Function::Regex, vec![*v("name"), *lit("^A")]);
        let prepared = PreparedExpression::new(constant, &variables);
        assert!(prepared.regexes.contains_key(&("^A".to_owned(), String::new())));
        assert!(prepared.is_true(&row));

        let dynamic = Expression::FunctionCall(Function::Regex, vec![*v("name"), *v("name")]);
        let prepared = PreparedExpression::new(dynamic, &variables);
        assert!(prepared.regexes.is_empty());
        assert!(prepared.is_true(&row));
    }

    #[test]
    fn in_and_coalesce() {
        let variables = [var("a")];
        let row = row(vec![Some(NamedNode::new_unchecked("http://example.com/a").into())]);
        let a = Expression::constant(NamedNode::new_unchecked("http://example.com/a"));
        let b = Expression::constant(NamedNode::new_unchecked("http://example.com/b"));

        let expression = Expression::In(v("a"), vec![b.clone(), a]);
        assert_eq!(evaluate(expression, &variables, &row), Ok(boolean(true)));

        let expression = Expression::Coalesce(vec![Expression::Variable(var("x")), b.clone()]);
        assert_eq!(
            evaluate(expression, &variables, &row),
            Ok(NamedNode::new_unchecked("http://example.com/b").into())
        );
    }
}
