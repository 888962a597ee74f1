use crate::{pattern, var, CountingStore};
use futures::stream::{self, StreamExt};
use rdf_weave_common::SolutionSequence;
use rdf_weave_execution::{Dispatcher, ExecutionConfig, ExecutionMode};
use rdf_weave_logical::AlgebraBuilder;
use rdf_weave_model::Row;
use std::sync::Arc;

#[test]
fn ask_demands_at_most_one_row() {
    for mode in [ExecutionMode::Pull, ExecutionMode::Push] {
        let store = Arc::new(CountingStore::new());
        let config = ExecutionConfig::default().with_default_mode(mode);
        let dispatcher = Dispatcher::new(Arc::clone(&store) as _, config);
        let node = AlgebraBuilder::new(pattern("?s", "knows", "?o")).ask().build();

        let sequence = dispatcher.execute(&node).unwrap();
        assert!(sequence.variables().is_empty());
        assert!(sequence.ask_result().unwrap());
        assert!(store.pulled() <= 1, "{mode:?} pulled {}", store.pulled());
    }
}

#[test]
fn ask_of_empty_pattern_is_false() {
    for mode in [ExecutionMode::Pull, ExecutionMode::Push] {
        let dispatcher = crate::dispatcher(ExecutionConfig::default().with_default_mode(mode));
        let node = AlgebraBuilder::new(pattern("?s", "knows", "bob"))
            .join(pattern("?s", "knows", "dave"))
            .ask()
            .build();
        let sequence = dispatcher.execute(&node).unwrap();
        assert!(!sequence.ask_result().unwrap());
    }
}

#[test]
fn ask_terminates_on_unbounded_sequences() {
    let pulled = SolutionSequence::from_generator([var("x")], || {
        Box::new(std::iter::repeat_with(|| Ok(Row::unbound(1))))
    });
    assert!(pulled.ask_result().unwrap());

    let pushed = SolutionSequence::from_stream(
        [var("x")],
        stream::repeat_with(|| Ok(Row::unbound(1))).boxed(),
    );
    assert!(pushed.ask_result().unwrap());
}
