use oxrdf::Term;
use std::fmt::{Display, Formatter};
use std::ops::Index;
use std::sync::Arc;

/// A single solution aligned positionally with a variable list.
///
/// An entry is [None] if the variable is unbound in this solution. Two rows are equal iff all of
/// their positions are equal, where two unbound positions are considered equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Row(Arc<[Option<Term>]>);

impl Row {
    /// Creates a new [Row] from the given `terms`.
    pub fn new(terms: impl Into<Arc<[Option<Term>]>>) -> Self {
        Self(terms.into())
    }

    /// Creates a zero-column [Row]. This is the only row of an `ASK`-shaped solution sequence
    /// that evaluates to `true`.
    pub fn empty() -> Self {
        Self(Arc::new([]))
    }

    /// Creates a row of `width` unbound positions.
    pub fn unbound(width: usize) -> Self {
        Self(vec![None; width].into())
    }

    /// Returns the number of positions in this row.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether this row has zero positions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the term at `index` if the position exists and is bound.
    pub fn get(&self, index: usize) -> Option<&Term> {
        self.0.get(index).and_then(Option::as_ref)
    }

    /// Returns all positions of this row.
    pub fn terms(&self) -> &[Option<Term>] {
        &self.0
    }

    /// Iterates over all positions of this row.
    pub fn iter(&self) -> impl Iterator<Item = Option<&Term>> + '_ {
        self.0.iter().map(Option::as_ref)
    }

    /// Creates a new row by picking the given positions. A [None] index creates an unbound
    /// position.
    pub fn project(&self, indices: &[Option<usize>]) -> Row {
        indices
            .iter()
            .map(|index| index.and_then(|i| self.0.get(i).cloned().flatten()))
            .collect()
    }

    /// Creates a new row that consists of all positions of `self` followed by the positions
    /// `indices` of `other`.
    pub fn extend(&self, other: &Row, indices: &[usize]) -> Row {
        self.0
            .iter()
            .cloned()
            .chain(indices.iter().map(|i| other.0.get(*i).cloned().flatten()))
            .collect()
    }

    /// Creates a new row that consists of all positions of `self` followed by `count` unbound
    /// positions.
    pub fn extend_unbound(&self, count: usize) -> Row {
        self.0
            .iter()
            .cloned()
            .chain(std::iter::repeat(None).take(count))
            .collect()
    }

    /// Returns a new row in which the position `index` is replaced with `term`. If `index` is
    /// equal to the length of the row, the term is appended.
    pub fn with_term(&self, index: usize, term: Option<Term>) -> Row {
        let mut terms = self.0.to_vec();
        if index < terms.len() {
            terms[index] = term;
        } else {
            terms.push(term);
        }
        Row::new(terms)
    }
}

impl Index<usize> for Row {
    type Output = Option<Term>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl FromIterator<Option<Term>> for Row {
    fn from_iter<T: IntoIterator<Item = Option<Term>>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Option<Term>>> for Row {
    fn from(value: Vec<Option<Term>>) -> Self {
        Self(value.into())
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("(")?;
        for (i, term) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match term {
                Some(term) => write!(f, "{term}")?,
                None => f.write_str("UNDEF")?,
            }
        }
        f.write_str(")")
    }
}
