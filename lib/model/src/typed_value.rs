use crate::{Boolean, Decimal, Double, Float, Integer, ThinError, ThinResult};
use oxrdf::vocab::{rdf, xsd};
use oxrdf::{BlankNode, Literal, NamedNode, NamedNodeRef, Term};
use std::cmp::Ordering;
use std::str::FromStr;

/// A value of one of the numeric types of SPARQL.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Numeric {
    Integer(Integer),
    Decimal(Decimal),
    Float(Float),
    Double(Double),
}

/// Two numerics that have been promoted to their common type.
#[derive(Clone, Copy, Debug, PartialEq)]
enum NumericPair {
    Integer(Integer, Integer),
    Decimal(Decimal, Decimal),
    Float(Float, Float),
    Double(Double, Double),
}

impl NumericPair {
    fn promote(lhs: Numeric, rhs: Numeric) -> Self {
        match (lhs, rhs) {
            (Numeric::Integer(l), Numeric::Integer(r)) => Self::Integer(l, r),
            (Numeric::Integer(l), Numeric::Decimal(r)) => Self::Decimal(l.into(), r),
            (Numeric::Decimal(l), Numeric::Integer(r)) => Self::Decimal(l, r.into()),
            (Numeric::Decimal(l), Numeric::Decimal(r)) => Self::Decimal(l, r),
            (Numeric::Integer(l), Numeric::Float(r)) => Self::Float(l.into(), r),
            (Numeric::Float(l), Numeric::Integer(r)) => Self::Float(l, r.into()),
            (Numeric::Decimal(l), Numeric::Float(r)) => Self::Float(l.into(), r),
            (Numeric::Float(l), Numeric::Decimal(r)) => Self::Float(l, r.into()),
            (Numeric::Float(l), Numeric::Float(r)) => Self::Float(l, r),
            (Numeric::Double(l), r) => Self::Double(l, r.to_double()),
            (l, Numeric::Double(r)) => Self::Double(l.to_double(), r),
        }
    }
}

impl Numeric {
    fn to_double(self) -> Double {
        match self {
            Numeric::Integer(v) => v.into(),
            Numeric::Decimal(v) => v.into(),
            Numeric::Float(v) => v.into(),
            Numeric::Double(v) => v,
        }
    }

    /// [op:numeric-add](https://www.w3.org/TR/xpath-functions-31/#func-numeric-add)
    pub fn checked_add(self, rhs: Self) -> ThinResult<Self> {
        match NumericPair::promote(self, rhs) {
            NumericPair::Integer(l, r) => l.checked_add(r).map(Self::Integer),
            NumericPair::Decimal(l, r) => l.checked_add(r).map(Self::Decimal),
            NumericPair::Float(l, r) => Some(Self::Float(l + r)),
            NumericPair::Double(l, r) => Some(Self::Double(l + r)),
        }
        .ok_or(ThinError::default())
    }

    /// [op:numeric-subtract](https://www.w3.org/TR/xpath-functions-31/#func-numeric-subtract)
    pub fn checked_sub(self, rhs: Self) -> ThinResult<Self> {
        match NumericPair::promote(self, rhs) {
            NumericPair::Integer(l, r) => l.checked_sub(r).map(Self::Integer),
            NumericPair::Decimal(l, r) => l.checked_sub(r).map(Self::Decimal),
            NumericPair::Float(l, r) => Some(Self::Float(l - r)),
            NumericPair::Double(l, r) => Some(Self::Double(l - r)),
        }
        .ok_or(ThinError::default())
    }

    /// [op:numeric-multiply](https://www.w3.org/TR/xpath-functions-31/#func-numeric-multiply)
    pub fn checked_mul(self, rhs: Self) -> ThinResult<Self> {
        match NumericPair::promote(self, rhs) {
            NumericPair::Integer(l, r) => l.checked_mul(r).map(Self::Integer),
            NumericPair::Decimal(l, r) => l.checked_mul(r).map(Self::Decimal),
            NumericPair::Float(l, r) => Some(Self::Float(l * r)),
            NumericPair::Double(l, r) => Some(Self::Double(l * r)),
        }
        .ok_or(ThinError::default())
    }

    /// [op:numeric-divide](https://www.w3.org/TR/xpath-functions-31/#func-numeric-divide)
    ///
    /// Dividing two integers produces a decimal.
    pub fn checked_div(self, rhs: Self) -> ThinResult<Self> {
        match NumericPair::promote(self, rhs) {
            NumericPair::Integer(l, r) => Decimal::from(l)
                .checked_div(Decimal::from(r))
                .map(Self::Decimal),
            NumericPair::Decimal(l, r) => l.checked_div(r).map(Self::Decimal),
            NumericPair::Float(l, r) => Some(Self::Float(l / r)),
            NumericPair::Double(l, r) => Some(Self::Double(l / r)),
        }
        .ok_or(ThinError::default())
    }

    /// [op:numeric-unary-minus](https://www.w3.org/TR/xpath-functions-31/#func-numeric-unary-minus)
    pub fn checked_neg(self) -> ThinResult<Self> {
        match self {
            Numeric::Integer(v) => v.checked_neg().map(Self::Integer),
            Numeric::Decimal(v) => v.checked_neg().map(Self::Decimal),
            Numeric::Float(v) => Some(Self::Float(-v)),
            Numeric::Double(v) => Some(Self::Double(-v)),
        }
        .ok_or(ThinError::default())
    }

    /// Compares two numerics after promoting them to their common type. Returns [None] if one of
    /// the values is `NaN`.
    pub fn compare(self, rhs: Self) -> Option<Ordering> {
        match NumericPair::promote(self, rhs) {
            NumericPair::Integer(l, r) => Some(l.cmp(&r)),
            NumericPair::Decimal(l, r) => Some(l.cmp(&r)),
            NumericPair::Float(l, r) => l.partial_cmp(&r),
            NumericPair::Double(l, r) => l.partial_cmp(&r),
        }
    }

    fn is_zero_or_nan(self) -> bool {
        match self {
            Numeric::Integer(v) => v == Integer::from(0_i64),
            Numeric::Decimal(v) => v == Decimal::from(0_i64),
            Numeric::Float(v) => v.is_nan() || v == Float::from(0.0_f32),
            Numeric::Double(v) => v.is_nan() || v == Double::from(0.0_f64),
        }
    }
}

impl From<Numeric> for Literal {
    fn from(value: Numeric) -> Self {
        match value {
            Numeric::Integer(v) => Literal::new_typed_literal(v.to_string(), xsd::INTEGER),
            Numeric::Decimal(v) => Literal::new_typed_literal(v.to_string(), xsd::DECIMAL),
            Numeric::Float(v) => Literal::new_typed_literal(v.to_string(), xsd::FLOAT),
            Numeric::Double(v) => Literal::new_typed_literal(v.to_string(), xsd::DOUBLE),
        }
    }
}

/// The value of an RDF term as it is seen by SPARQL expressions.
///
/// Literals with a recognized datatype are parsed into their value space. Literals that are
/// ill-typed or have an unknown datatype are kept as [TypedValue::OtherLiteral].
#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    BooleanLiteral(Boolean),
    NumericLiteral(Numeric),
    SimpleLiteral(String),
    LanguageStringLiteral { value: String, language: String },
    OtherLiteral(Literal),
}

impl TypedValue {
    /// Computes the [effective boolean value](https://www.w3.org/TR/sparql11-query/#ebv).
    pub fn effective_boolean_value(&self) -> ThinResult<bool> {
        match self {
            TypedValue::BooleanLiteral(v) => Ok(bool::from(*v)),
            TypedValue::NumericLiteral(v) => Ok(!v.is_zero_or_nan()),
            TypedValue::SimpleLiteral(v) => Ok(!v.is_empty()),
            _ => ThinError::expected(),
        }
    }

    /// Returns the lexical form and language of a string literal.
    pub fn as_string_literal(&self) -> ThinResult<(&str, Option<&str>)> {
        match self {
            TypedValue::SimpleLiteral(value) => Ok((value, None)),
            TypedValue::LanguageStringLiteral { value, language } => Ok((value, Some(language))),
            _ => ThinError::expected(),
        }
    }

    /// Compares two values with the semantics of the SPARQL `=` operator.
    ///
    /// Terms that are not equal and whose values cannot be compared produce an error.
    pub fn value_eq(&self, other: &Self) -> ThinResult<bool> {
        match (self, other) {
            (TypedValue::NumericLiteral(l), TypedValue::NumericLiteral(r)) => {
                Ok(l.compare(*r) == Some(Ordering::Equal))
            }
            (TypedValue::BooleanLiteral(l), TypedValue::BooleanLiteral(r)) => Ok(l == r),
            (TypedValue::SimpleLiteral(l), TypedValue::SimpleLiteral(r)) => Ok(l == r),
            (TypedValue::OtherLiteral(_), _) | (_, TypedValue::OtherLiteral(_)) => {
                if self == other {
                    Ok(true)
                } else {
                    ThinError::expected()
                }
            }
            _ => Ok(self == other),
        }
    }

    /// Orders two values with the semantics of the SPARQL `<` operator.
    pub fn value_cmp(&self, other: &Self) -> ThinResult<Ordering> {
        match (self, other) {
            (TypedValue::NumericLiteral(l), TypedValue::NumericLiteral(r)) => {
                l.compare(*r).ok_or(ThinError::default())
            }
            (TypedValue::BooleanLiteral(l), TypedValue::BooleanLiteral(r)) => Ok(l.cmp(r)),
            (TypedValue::SimpleLiteral(l), TypedValue::SimpleLiteral(r)) => Ok(l.cmp(r)),
            (
                TypedValue::LanguageStringLiteral {
                    value: l,
                    language: l_language,
                },
                TypedValue::LanguageStringLiteral {
                    value: r,
                    language: r_language,
                },
            ) if l_language == r_language => Ok(l.cmp(r)),
            _ => ThinError::expected(),
        }
    }
}

impl From<&Term> for TypedValue {
    fn from(term: &Term) -> Self {
        match term {
            Term::NamedNode(node) => TypedValue::NamedNode(node.clone()),
            Term::BlankNode(node) => TypedValue::BlankNode(node.clone()),
            Term::Literal(literal) => TypedValue::from(literal),
            #[allow(unreachable_patterns, reason = "Depends on the rdf-star feature of oxrdf")]
            _ => TypedValue::OtherLiteral(Literal::new_simple_literal(term.to_string())),
        }
    }
}

impl From<&Literal> for TypedValue {
    fn from(literal: &Literal) -> Self {
        if let Some(language) = literal.language() {
            return TypedValue::LanguageStringLiteral {
                value: literal.value().to_owned(),
                language: language.to_owned(),
            };
        }
        parse_literal(literal.value(), literal.datatype())
            .unwrap_or_else(|_| TypedValue::OtherLiteral(literal.clone()))
    }
}

fn parse_literal(value: &str, datatype: NamedNodeRef<'_>) -> ThinResult<TypedValue> {
    let result = match datatype {
        xsd::STRING => TypedValue::SimpleLiteral(value.to_owned()),
        xsd::BOOLEAN => TypedValue::BooleanLiteral(Boolean::from_str(value)?),
        xsd::DECIMAL => TypedValue::NumericLiteral(Numeric::Decimal(Decimal::from_str(value)?)),
        xsd::FLOAT => TypedValue::NumericLiteral(Numeric::Float(Float::from_str(value)?)),
        xsd::DOUBLE => TypedValue::NumericLiteral(Numeric::Double(Double::from_str(value)?)),
        datatype if is_integer_datatype(datatype) => {
            TypedValue::NumericLiteral(Numeric::Integer(Integer::from_str(value)?))
        }
        _ => return ThinError::expected(),
    };
    Ok(result)
}

impl From<TypedValue> for Term {
    fn from(value: TypedValue) -> Self {
        match value {
            TypedValue::NamedNode(node) => node.into(),
            TypedValue::BlankNode(node) => node.into(),
            TypedValue::BooleanLiteral(v) => Literal::from(bool::from(v)).into(),
            TypedValue::NumericLiteral(v) => Literal::from(v).into(),
            TypedValue::SimpleLiteral(v) => Literal::new_simple_literal(v).into(),
            TypedValue::LanguageStringLiteral { value, language } => {
                Literal::new_language_tagged_literal_unchecked(value, language).into()
            }
            TypedValue::OtherLiteral(literal) => literal.into(),
        }
    }
}

/// Checks if the datatype is `xsd:integer` or one of its derived datatypes.
pub fn is_integer_datatype(datatype: NamedNodeRef<'_>) -> bool {
    static INTEGER_DATATYPES: &[NamedNodeRef<'_>; 13] = &[
        xsd::INTEGER,
        xsd::BYTE,
        xsd::SHORT,
        xsd::INT,
        xsd::LONG,
        xsd::UNSIGNED_BYTE,
        xsd::UNSIGNED_SHORT,
        xsd::UNSIGNED_INT,
        xsd::UNSIGNED_LONG,
        xsd::POSITIVE_INTEGER,
        xsd::NEGATIVE_INTEGER,
        xsd::NON_POSITIVE_INTEGER,
        xsd::NON_NEGATIVE_INTEGER,
    ];
    INTEGER_DATATYPES.contains(&datatype)
}

/// Checks if the datatype is one of the numeric datatypes of SPARQL.
pub fn is_numeric_datatype(datatype: NamedNodeRef<'_>) -> bool {
    matches!(datatype, xsd::DECIMAL | xsd::FLOAT | xsd::DOUBLE) || is_integer_datatype(datatype)
}

/// Returns the datatype of a literal as reported by `DATATYPE`.
pub fn literal_datatype(literal: &Literal) -> NamedNode {
    if literal.language().is_some() {
        rdf::LANG_STRING.into_owned()
    } else {
        literal.datatype().into_owned()
    }
}
