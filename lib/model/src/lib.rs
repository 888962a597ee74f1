mod error;
mod row;
mod typed_value;
mod variables;

pub use error::*;
pub use row::Row;
pub use typed_value::{
    is_integer_datatype, is_numeric_datatype, literal_datatype, Numeric, TypedValue,
};
pub use variables::{
    position_of, triple_pattern_variables, union_variables, ColumnProjection,
};

/// Vocabularies used by the engine.
pub mod vocab {
    pub use oxrdf::vocab::{rdf, xsd};
}

// Re-export some oxrdf types.
pub use oxrdf::{
    BlankNode, BlankNodeRef, Literal, LiteralRef, NamedNode, NamedNodeRef, Subject, SubjectRef,
    Term, TermRef, Triple, TripleRef, Variable, VariableNameParseError, VariableRef,
};
pub use oxsdatatypes::{Boolean, Decimal, Double, Float, Integer};
pub use spargebra::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};
