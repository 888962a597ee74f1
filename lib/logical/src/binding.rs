use crate::AlgebraNodeRef;
use rdf_weave_model::{Row, Term, Variable};
use std::sync::Arc;

/// A reusable substitution buffer.
///
/// The variables of a binding are fixed on construction. Only the terms change, for example, once
/// for every outer solution of a bind join. A binding is owned by exactly one evaluation frame.
#[derive(Clone, Debug)]
pub struct Binding {
    variables: Arc<[Variable]>,
    terms: Vec<Option<Term>>,
}

impl Binding {
    /// Creates a new binding with all variables unbound.
    pub fn new(variables: impl Into<Arc<[Variable]>>) -> Self {
        let variables = variables.into();
        let terms = vec![None; variables.len()];
        Self { variables, terms }
    }

    /// Returns the number of variables in this binding.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns whether this binding has no variables.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Returns the variables of this binding.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Returns the current terms of this binding.
    pub fn terms(&self) -> &[Option<Term>] {
        &self.terms
    }

    /// Sets the term of the variable at `index`. Out of bounds indices are ignored.
    pub fn set(&mut self, index: usize, term: Option<Term>) {
        if let Some(slot) = self.terms.get_mut(index) {
            *slot = term;
        }
    }

    /// Loads the terms from `row`. The `i`-th variable of the binding is set to the term at
    /// position `indices[i]` of the row.
    pub fn load(&mut self, row: &Row, indices: &[usize]) {
        for (slot, index) in self.terms.iter_mut().zip(indices) {
            *slot = row.get(*index).cloned();
        }
    }

    /// Unbinds all variables.
    pub fn clear(&mut self) {
        self.terms.fill(None);
    }

    /// Specializes `node` with the current contents of this binding.
    pub fn apply(&self, node: &AlgebraNodeRef) -> AlgebraNodeRef {
        node.bind(&self.variables, &self.terms)
    }
}
