use crate::{dispatcher, iri, var};
use rdf_weave_execution::{DistinctStrategy, ExecutionConfig, ExecutionMode};
use rdf_weave_logical::{AlgebraBuilder, AlgebraNodeRef};
use rdf_weave_model::{Row, Term};

fn table(values: &[&str]) -> AlgebraBuilder {
    let rows = values
        .iter()
        .map(|v| Row::from(vec![Some(Term::from(iri(v)))]))
        .collect();
    AlgebraBuilder::new_from_values(vec![var("x")], rows)
}

/// Evaluates `node` and returns the local names of `?x` in production order.
fn accepted(config: ExecutionConfig, node: &AlgebraNodeRef) -> Vec<Vec<String>> {
    [ExecutionMode::Pull, ExecutionMode::Push]
        .into_iter()
        .map(|mode| {
            let dispatcher = dispatcher(config.clone().with_default_mode(mode));
            let sequence = dispatcher.execute(node).unwrap();
            let rows = futures::executor::block_on(sequence.collect()).unwrap();
            rows.iter()
                .map(|row| match row.get(0) {
                    Some(Term::NamedNode(node)) => node
                        .as_str()
                        .trim_start_matches("http://example.com/")
                        .to_owned(),
                    other => panic!("unexpected term {other:?}"),
                })
                .collect()
        })
        .collect()
}

#[test]
fn window_evicts_before_testing() {
    let node = table(&["a", "b", "a", "c"]).weak_distinct().build();
    let config = ExecutionConfig::default().with_weak_distinct(DistinctStrategy::Window(2));
    for result in accepted(config, &node) {
        assert_eq!(result, ["a", "b", "a", "c"]);
    }
}

#[test]
fn larger_window_rejects_recent_duplicates() {
    let node = table(&["a", "b", "a", "c"]).weak_distinct().build();
    let config = ExecutionConfig::default().with_weak_distinct(DistinctStrategy::Window(3));
    for result in accepted(config, &node) {
        assert_eq!(result, ["a", "b", "c"]);
    }
}

#[test]
fn hash_distinct_keeps_first_occurrences() {
    let node = table(&["c", "a", "c", "b", "a"]).distinct().build();
    for result in accepted(ExecutionConfig::default(), &node) {
        assert_eq!(result, ["c", "a", "b"]);
    }
}
