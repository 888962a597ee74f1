use crate::evaluators::{
    fuse_on_error, fuse_stream_on_error, pull_sequence, push_sequence, unexpected_node,
};
use crate::{Dispatcher, MinusStrategy};
use futures::{FutureExt, TryStreamExt};
use rdf_weave_common::error::ExecutionError;
use rdf_weave_common::{ExecutionResult, SolutionSequence};
use rdf_weave_logical::{AlgebraNodeRef, Binding, Operator};
use rdf_weave_model::{position_of, Row, Variable};
use rustc_hash::FxHashSet;
use std::sync::{Arc, OnceLock};

/// Removes the left rows that are compatible with a right row.
///
/// Two rows are compatible if they agree on every shared variable that both of them bind. A left
/// row is only removed if it shares at least one bound variable with the right row, unless a shared
/// variable has already been substituted by an enclosing binding (`bound_overlap`).
struct MinusPlan {
    right: AlgebraNodeRef,
    shared: Arc<[Variable]>,
    left_key: Vec<Option<usize>>,
    right_key: Vec<Option<usize>>,
    bound_overlap: bool,
    /// Shared variables that every right row binds. [MinusStrategy::Bind] substitutes them.
    substituted: Arc<[Variable]>,
    substituted_positions: Vec<usize>,
    /// Shared variables that some right rows leave unbound. [MinusStrategy::Bind] compares them
    /// per right row.
    checked: Vec<Variable>,
    checked_left_key: Vec<Option<usize>>,
}

/// The right node of a [MinusPlan] specialized for a single left row.
struct SpecializedRight {
    node: AlgebraNodeRef,
    left_key: Row,
    overlap_required: bool,
}

impl SpecializedRight {
    /// Returns true if `right_row` removes the left row. `key` locates the checked variables in
    /// `right_row`.
    fn matches(&self, key: &[Option<usize>], right_row: &Row) -> bool {
        compatible(&self.left_key, &right_row.project(key), self.overlap_required)
    }
}

impl MinusPlan {
    fn new(left: &AlgebraNodeRef, right: &AlgebraNodeRef, bound_overlap: bool) -> Self {
        let shared = left
            .variables()
            .iter()
            .filter(|v| right.variables().contains(v))
            .cloned()
            .collect::<Vec<_>>();
        let left_key = shared
            .iter()
            .map(|v| position_of(left.variables(), v))
            .collect();
        let right_key = shared
            .iter()
            .map(|v| position_of(right.variables(), v))
            .collect();
        let (substituted, checked): (Vec<_>, Vec<_>) = shared
            .iter()
            .cloned()
            .partition(|v| right.certain_variables().contains(v));
        let substituted_positions = substituted
            .iter()
            .filter_map(|v| position_of(left.variables(), v))
            .collect();
        let checked_left_key = checked
            .iter()
            .map(|v| position_of(left.variables(), v))
            .collect();
        Self {
            right: Arc::clone(right),
            shared: shared.into(),
            left_key,
            right_key,
            bound_overlap,
            substituted: substituted.into(),
            substituted_positions,
            checked,
            checked_left_key,
        }
    }

    /// Evaluates the right node specialized with the shared values of `row`. Returns true if the
    /// row must be removed.
    fn removes_by_binding(
        &self,
        dispatcher: &Dispatcher,
        binding: &mut Binding,
        row: &Row,
    ) -> ExecutionResult<bool> {
        let Some(right) = self.specialize(binding, row) else {
            return Ok(false);
        };
        let sequence = dispatcher.execute(&right.node)?;
        if self.checked.is_empty() {
            return sequence.ask_result();
        }
        let key = self.checked_right_key(sequence.variables());
        for right_row in sequence.iter() {
            if right.matches(&key, &right_row?) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Specializes the right node for `row`. Returns [None] if `row` cannot overlap with any right
    /// row.
    fn specialize(&self, binding: &mut Binding, row: &Row) -> Option<SpecializedRight> {
        binding.load(row, &self.substituted_positions);
        let left_key = row.project(&self.checked_left_key);
        let overlap_required =
            !self.bound_overlap && binding.terms().iter().all(Option::is_none);
        if overlap_required && left_key.iter().all(|t| t.is_none()) {
            return None;
        }
        Some(SpecializedRight {
            node: binding.apply(&self.right),
            left_key,
            overlap_required,
        })
    }

    /// The positions of the checked variables in the specialized right node.
    fn checked_right_key(&self, variables: &[Variable]) -> Vec<Option<usize>> {
        self.checked
            .iter()
            .map(|v| position_of(variables, v))
            .collect()
    }

    fn binding(&self) -> Binding {
        Binding::new(Arc::clone(&self.substituted))
    }

    fn removes(&self, table: &MinusTable, row: &Row) -> bool {
        table.removes(&row.project(&self.left_key), !self.bound_overlap)
    }
}

/// The right rows of a [MinusPlan], projected onto the shared variables.
#[derive(Debug, Default)]
struct MinusTable {
    /// Keys that bind every shared variable.
    complete: FxHashSet<Row>,
    /// Keys with at least one unbound shared variable.
    partial: Vec<Row>,
}

impl MinusTable {
    fn new(rows: &[Row], key: &[Option<usize>]) -> Self {
        let mut table = Self::default();
        for row in rows {
            let key = row.project(key);
            if key.iter().all(|t| t.is_some()) {
                table.complete.insert(key);
            } else {
                table.partial.push(key);
            }
        }
        table
    }

    fn removes(&self, key: &Row, overlap_required: bool) -> bool {
        let complete_key = key.iter().all(|t| t.is_some());
        if complete_key
            && (!overlap_required || !key.is_empty())
            && self.complete.contains(key)
        {
            return true;
        }

        // A complete key can only match a complete right key if both are equal.
        let complete = self.complete.iter().filter(|_| !complete_key);
        self.partial
            .iter()
            .chain(complete)
            .any(|right| compatible(key, right, overlap_required))
    }
}

fn compatible(left: &Row, right: &Row, overlap_required: bool) -> bool {
    let mut overlap = false;
    for (l, r) in left.iter().zip(right.iter()) {
        if let (Some(l), Some(r)) = (l, r) {
            if l != r {
                return false;
            }
            overlap = true;
        }
    }
    overlap || !overlap_required
}

fn prepare(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<(SolutionSequence, Arc<MinusPlan>)> {
    let Operator::Minus {
        left,
        right,
        bound_overlap,
    } = node.operator()
    else {
        return Err(unexpected_node(node));
    };
    let plan = MinusPlan::new(left, right, *bound_overlap);
    Ok((dispatcher.execute(left)?, Arc::new(plan)))
}

/// Evaluates [Operator::Minus] with the configured [MinusStrategy].
///
/// With [MinusStrategy::Set], the right side is materialized at most once, even if the result is
/// consumed multiple times. With [MinusStrategy::Bind], the unspecialized right side is never
/// evaluated.
pub(super) fn pull(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (left, plan) = prepare(dispatcher, node)?;
    let hot = left.is_hot();

    let sequence = match dispatcher.config().minus {
        MinusStrategy::Bind => {
            let dispatcher = dispatcher.clone();
            pull_sequence(node.variables_arc(), hot, move || {
                let plan = Arc::clone(&plan);
                let dispatcher = dispatcher.clone();
                let mut binding = plan.binding();
                fuse_on_error(left.iter().filter_map(move |row| {
                    let row = match row {
                        Ok(row) => row,
                        Err(error) => return Some(Err(error)),
                    };
                    match plan.removes_by_binding(&dispatcher, &mut binding, &row) {
                        Ok(true) => None,
                        Ok(false) => Some(Ok(row)),
                        Err(error) => Some(Err(error)),
                    }
                }))
            })
        }
        MinusStrategy::Set => {
            let right = Arc::new(dispatcher.execute(&plan.right)?);
            let table = Arc::new(OnceLock::<ExecutionResult<Arc<MinusTable>>>::new());
            pull_sequence(node.variables_arc(), hot, move || {
                let plan = Arc::clone(&plan);
                let right = Arc::clone(&right);
                let table = Arc::clone(&table);
                fuse_on_error(left.iter().filter_map(move |row| {
                    let row = match row {
                        Ok(row) => row,
                        Err(error) => return Some(Err(error)),
                    };
                    let table = table.get_or_init(|| {
                        let rows = right.materialize()?;
                        Ok(Arc::new(MinusTable::new(&rows, &plan.right_key)))
                    });
                    match table {
                        Ok(table) => (!plan.removes(table, &row)).then_some(Ok(row)),
                        Err(error) => Some(Err(error.clone())),
                    }
                }))
            })
        }
    };
    Ok(sequence)
}

pub(super) fn push(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (left, plan) = prepare(dispatcher, node)?;

    let stream = match dispatcher.config().minus {
        MinusStrategy::Bind => {
            let dispatcher = dispatcher.clone();
            let mut binding = plan.binding();
            let stream = left.stream().try_filter_map(move |row| {
                let right = plan.specialize(&mut binding, &row);
                let dispatcher = dispatcher.clone();
                let plan = Arc::clone(&plan);
                async move {
                    let Some(right) = right else {
                        return Ok::<_, ExecutionError>(Some(row));
                    };
                    let sequence = dispatcher.execute(&right.node)?;
                    if plan.checked.is_empty() {
                        let found = sequence.ask().await?;
                        return Ok((!found).then_some(row));
                    }
                    let key = plan.checked_right_key(sequence.variables());
                    let mut right_rows = sequence.stream();
                    while let Some(right_row) = right_rows.try_next().await? {
                        if right.matches(&key, &right_row) {
                            return Ok(None);
                        }
                    }
                    Ok(Some(row))
                }
            });
            fuse_stream_on_error(stream)
        }
        MinusStrategy::Set => {
            let right = dispatcher.execute(&plan.right)?;
            let table = {
                let plan = Arc::clone(&plan);
                async move {
                    let rows = right.collect().await?;
                    Ok::<_, ExecutionError>(Arc::new(MinusTable::new(&rows, &plan.right_key)))
                }
            }
            .boxed()
            .shared();
            let stream = left.stream().try_filter_map(move |row| {
                let table = table.clone();
                let plan = Arc::clone(&plan);
                async move {
                    let table = table.await?;
                    Ok::<_, ExecutionError>((!plan.removes(&table, &row)).then_some(row))
                }
            });
            fuse_stream_on_error(stream)
        }
    };
    Ok(push_sequence(node.variables_arc(), stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::test_utils::{evaluate, iri, pattern, var};
    use crate::ExecutionConfig;
    use insta::assert_snapshot;
    use rdf_weave_logical::AlgebraNode;
    use rdf_weave_model::Term;

    fn key(values: &[Option<&str>]) -> Row {
        values
            .iter()
            .map(|v| v.map(|v| Term::from(iri(v))))
            .collect()
    }

    #[test]
    fn table_requires_overlap() {
        let table = MinusTable::new(&[key(&[Some("a"), None])], &[Some(0), Some(1)]);
        assert!(table.removes(&key(&[Some("a"), Some("b")]), true));
        assert!(!table.removes(&key(&[None, Some("b")]), true));
        assert!(table.removes(&key(&[None, Some("b")]), false));
        assert!(!table.removes(&key(&[Some("c"), None]), false));
    }

    #[test]
    fn table_without_shared_variables() {
        let table = MinusTable::new(&[Row::empty()], &[]);
        assert!(!table.removes(&Row::empty(), true));
        assert!(table.removes(&Row::empty(), false));
    }

    fn minus(right: AlgebraNodeRef) -> AlgebraNodeRef {
        AlgebraNode::new(Operator::Minus {
            left: pattern("?x", "name", "?n"),
            right,
            bound_overlap: false,
        })
    }

    fn evaluate_all(node: &AlgebraNodeRef) -> String {
        let results = [MinusStrategy::Bind, MinusStrategy::Set]
            .map(|strategy| evaluate(ExecutionConfig::default().with_minus(strategy), node));
        assert_eq!(results[0], results[1]);
        results[1].clone()
    }

    #[test]
    fn minus_removes_compatible_rows() {
        assert_snapshot!(
            evaluate_all(&minus(pattern("?x", "knows", "?y"))),
            @r#"[?x=<http://example.com/carol> ?n="Carol"]"#
        );
    }

    #[test]
    fn minus_without_shared_variables_keeps_everything() {
        assert_snapshot!(evaluate_all(&minus(pattern("?a", "knows", "?b"))), @r#"
        [?x=<http://example.com/alice> ?n="Alice"]
        [?x=<http://example.com/bob> ?n="Bob"]
        [?x=<http://example.com/carol> ?n="Carol"]
        "#);
    }

    #[test]
    fn minus_ignores_right_rows_without_shared_variables() {
        let right = AlgebraNode::new(Operator::Union(vec![
            pattern("?x", "knows", "bob"),
            pattern("?z", "name", "?w"),
        ]));
        assert_snapshot!(evaluate_all(&minus(right)), @r#"
        [?x=<http://example.com/bob> ?n="Bob"]
        [?x=<http://example.com/carol> ?n="Carol"]
        "#);
    }

    #[test]
    fn plan_projects_shared_variables() {
        let plan = MinusPlan::new(
            &pattern("?x", "name", "?n"),
            &pattern("?y", "knows", "?x"),
            false,
        );
        assert_eq!(plan.shared.as_ref(), &[var("x")]);
        assert_eq!(plan.left_key, vec![Some(0)]);
        assert_eq!(plan.right_key, vec![Some(1)]);
        assert_eq!(plan.substituted.as_ref(), &[var("x")]);
        assert!(plan.checked.is_empty());
    }

    #[test]
    fn plan_checks_optional_shared_variables() {
        let right = AlgebraNode::new(Operator::Union(vec![
            pattern("?x", "knows", "?n"),
            pattern("?z", "name", "?n"),
        ]));
        let plan = MinusPlan::new(&pattern("?x", "name", "?n"), &right, false);
        assert_eq!(plan.substituted.as_ref(), &[var("n")]);
        assert_eq!(plan.checked, vec![var("x")]);
        assert_eq!(plan.checked_left_key, vec![Some(0)]);
    }
}
