use crate::evaluators::{pull_sequence, push_sequence, unexpected_node};
use crate::{DistinctStrategy, Dispatcher};
use futures::{future, StreamExt, TryStreamExt};
use rdf_weave_common::{ExecutionResult, SolutionSequence};
use rdf_weave_logical::{AlgebraNodeRef, Operator};
use rdf_weave_model::Row;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::fmt::Debug;

/// A container that rejects duplicate rows.
pub trait RowSet: Debug + Send {
    /// Inserts `row`. Returns false if the row is rejected as a duplicate.
    fn insert(&mut self, row: &Row) -> bool;
}

/// Creates an empty [RowSet] for `strategy`.
pub fn create_set(strategy: DistinctStrategy) -> Box<dyn RowSet> {
    match strategy {
        DistinctStrategy::Hash => Box::<HashRowSet>::default(),
        DistinctStrategy::Window(size) => Box::new(WindowRowSet::new(size)),
    }
}

/// Remembers every accepted row.
#[derive(Debug, Default)]
struct HashRowSet {
    rows: FxHashSet<Row>,
}

impl RowSet for HashRowSet {
    fn insert(&mut self, row: &Row) -> bool {
        if self.rows.contains(row) {
            return false;
        }
        self.rows.insert(row.clone())
    }
}

/// Remembers the last `size` accepted rows.
///
/// The window is a FIFO queue of accepted rows. If the window is full when a row arrives, the
/// oldest row is evicted before the arriving row is tested. A row is rejected iff it is equal to
/// one of the remaining rows.
#[derive(Debug)]
struct WindowRowSet {
    size: usize,
    window: VecDeque<Row>,
    members: FxHashSet<Row>,
}

impl WindowRowSet {
    fn new(size: usize) -> Self {
        Self {
            size,
            window: VecDeque::with_capacity(size),
            members: FxHashSet::default(),
        }
    }
}

impl RowSet for WindowRowSet {
    fn insert(&mut self, row: &Row) -> bool {
        if self.size == 0 {
            return true;
        }
        if self.window.len() == self.size {
            if let Some(evicted) = self.window.pop_front() {
                self.members.remove(&evicted);
            }
        }
        if self.members.contains(row) {
            return false;
        }
        self.members.insert(row.clone());
        self.window.push_back(row.clone());
        true
    }
}

fn prepare(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<(SolutionSequence, DistinctStrategy)> {
    let (inner, strategy) = match node.operator() {
        Operator::Distinct(inner) => (inner, dispatcher.config().distinct),
        Operator::WeakDistinct(inner) => (inner, dispatcher.config().weak_distinct),
        _ => return Err(unexpected_node(node)),
    };
    Ok((dispatcher.execute(inner)?, strategy))
}

/// Removes duplicate rows. Every consumption starts with an empty [RowSet].
pub(super) fn pull(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (inner, strategy) = prepare(dispatcher, node)?;
    Ok(pull_sequence(node.variables_arc(), inner.is_hot(), move || {
        let mut set = create_set(strategy);
        Box::new(
            inner
                .iter()
                .filter(move |row| row.as_ref().map_or(true, |row| set.insert(row))),
        )
    }))
}

pub(super) fn push(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (inner, strategy) = prepare(dispatcher, node)?;
    let mut set = create_set(strategy);
    let stream = inner
        .stream()
        .try_filter(move |row| future::ready(set.insert(row)))
        .boxed();
    Ok(push_sequence(node.variables_arc(), stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_weave_model::{NamedNode, Term};

    fn row(value: &str) -> Row {
        Row::from(vec![Some(Term::from(NamedNode::new_unchecked(format!(
            "http://example.com/{value}"
        ))))])
    }

    fn accepted(strategy: DistinctStrategy, values: &[&str]) -> Vec<Row> {
        let mut set = create_set(strategy);
        values
            .iter()
            .map(|v| row(v))
            .filter(|r| set.insert(r))
            .collect()
    }

    #[test]
    fn hash_set_removes_all_duplicates() {
        let result = accepted(DistinctStrategy::Hash, &["a", "b", "a", "c", "b"]);
        assert_eq!(result, vec![row("a"), row("b"), row("c")]);
    }

    #[test]
    fn window_evicts_oldest_accepted_row() {
        let result = accepted(DistinctStrategy::Window(2), &["a", "b", "a", "c"]);
        assert_eq!(result, vec![row("a"), row("b"), row("a"), row("c")]);
    }

    #[test]
    fn window_rejects_recent_duplicates() {
        let result = accepted(DistinctStrategy::Window(3), &["a", "a", "b", "a", "c", "d", "a"]);
        assert_eq!(result, vec![row("a"), row("b"), row("c"), row("d"), row("a")]);
    }

    #[test]
    fn empty_window_accepts_everything() {
        let result = accepted(DistinctStrategy::Window(0), &["a", "a"]);
        assert_eq!(result.len(), 2);
    }
}
