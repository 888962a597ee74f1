use oxrdf::Variable;
use spargebra::term::{NamedNodePattern, TermPattern, TriplePattern};

/// Returns the position of `variable` in `variables`.
pub fn position_of(variables: &[Variable], variable: &Variable) -> Option<usize> {
    variables.iter().position(|v| v == variable)
}

/// Returns the variables of a triple pattern in subject, predicate, object order. A variable that
/// occurs more than once is only returned for its first occurrence.
pub fn triple_pattern_variables(pattern: &TriplePattern) -> Vec<Variable> {
    let mut result = Vec::with_capacity(3);
    let mut push = |variable: &Variable| {
        if !result.contains(variable) {
            result.push(variable.clone());
        }
    };

    if let TermPattern::Variable(v) = &pattern.subject {
        push(v);
    }
    if let NamedNodePattern::Variable(v) = &pattern.predicate {
        push(v);
    }
    if let TermPattern::Variable(v) = &pattern.object {
        push(v);
    }
    result
}

/// Computes the ordered union of several variable lists. Variables keep the position of their
/// first occurrence.
pub fn union_variables<'a>(lists: impl IntoIterator<Item = &'a [Variable]>) -> Vec<Variable> {
    let mut result: Vec<Variable> = Vec::new();
    for list in lists {
        for variable in list {
            if !result.contains(variable) {
                result.push(variable.clone());
            }
        }
    }
    result
}

/// Maps the columns of a source variable list onto a target variable list.
///
/// Entry `i` holds the source position of the `i`-th target variable, or [None] if the source
/// does not contain that variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnProjection {
    indices: Vec<Option<usize>>,
}

impl ColumnProjection {
    /// Creates a new projection from `source` onto `target`.
    pub fn new(source: &[Variable], target: &[Variable]) -> Self {
        let indices = target.iter().map(|v| position_of(source, v)).collect();
        Self { indices }
    }

    /// Returns the source positions.
    pub fn indices(&self) -> &[Option<usize>] {
        &self.indices
    }

    /// Returns true if applying this projection to a row of `source_len` positions returns an
    /// equal row.
    pub fn is_identity(&self, source_len: usize) -> bool {
        self.indices.len() == source_len
            && self
                .indices
                .iter()
                .enumerate()
                .all(|(i, index)| *index == Some(i))
    }
}
