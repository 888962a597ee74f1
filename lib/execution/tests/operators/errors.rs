use crate::{dispatcher as social_dispatcher, pattern, try_run, var, FailingStore};
use rdf_weave_execution::{
    Dispatcher, ExecutionConfig, ExecutionMode, JoinReorderingMode, MinusStrategy,
};
use rdf_weave_logical::{AlgebraBuilder, AlgebraNode, AlgebraNodeRef, Expression, Operator};
use std::sync::Arc;

const MODES: [ExecutionMode; 2] = [ExecutionMode::Pull, ExecutionMode::Push];

/// Evaluates `node` on a store whose `knows` patterns fail.
fn evaluate(
    config: ExecutionConfig,
    node: &AlgebraNodeRef,
) -> (Result<Vec<String>, String>, Arc<FailingStore>) {
    let store = Arc::new(FailingStore::new("knows"));
    let dispatcher = Dispatcher::new(Arc::clone(&store) as _, config);
    (try_run(&dispatcher, node), store)
}

fn assert_fails_in_every_mode(node: &AlgebraNodeRef) {
    for mode in MODES {
        let (result, _) = evaluate(ExecutionConfig::default().with_default_mode(mode), node);
        assert_eq!(result, Err(FailingStore::MESSAGE.to_owned()), "{mode:?}");
    }
}

#[test]
fn join_propagates_storage_errors() {
    let node = AlgebraNode::new(Operator::Join(vec![
        pattern("?x", "name", "?n"),
        pattern("?x", "knows", "?y"),
    ]));
    for reordering in [
        JoinReorderingMode::Disabled,
        JoinReorderingMode::Shape,
        JoinReorderingMode::Cardinality,
    ] {
        for mode in MODES {
            let config = ExecutionConfig::default()
                .with_join_reordering(reordering)
                .with_default_mode(mode);
            let (result, _) = evaluate(config, &node);
            assert_eq!(
                result,
                Err(FailingStore::MESSAGE.to_owned()),
                "{reordering:?} {mode:?}"
            );
        }
    }
}

#[test]
fn optional_propagates_storage_errors() {
    let node = AlgebraBuilder::new(pattern("?x", "name", "?n"))
        .left_join(pattern("?x", "knows", "?y"), None)
        .build();
    assert_fails_in_every_mode(&node);
}

#[test]
fn filter_propagates_storage_errors() {
    let node = AlgebraBuilder::new(pattern("?x", "knows", "?y"))
        .filter(Expression::Bound(var("y")))
        .build();
    assert_fails_in_every_mode(&node);
}

#[test]
fn slice_propagates_errors_inside_the_offset() {
    let skipped = AlgebraBuilder::new(pattern("?x", "knows", "?y"))
        .slice(1, None)
        .build();
    assert_fails_in_every_mode(&skipped);

    let limited = AlgebraBuilder::new(pattern("?x", "knows", "?y"))
        .slice(0, Some(1))
        .build();
    assert_fails_in_every_mode(&limited);

    let beyond = AlgebraBuilder::new(pattern("?x", "knows", "?y"))
        .slice(100, Some(1))
        .build();
    assert_fails_in_every_mode(&beyond);
}

#[test]
fn minus_propagates_storage_errors() {
    let node = AlgebraBuilder::new(pattern("?x", "name", "?n"))
        .minus(pattern("?x", "knows", "?y"))
        .build();
    for strategy in [MinusStrategy::Bind, MinusStrategy::Set] {
        for mode in MODES {
            let config = ExecutionConfig::default()
                .with_default_mode(mode)
                .with_minus(strategy);
            let (result, _) = evaluate(config, &node);
            assert_eq!(
                result,
                Err(FailingStore::MESSAGE.to_owned()),
                "{strategy:?} {mode:?}"
            );
        }
    }
}

#[test]
fn failed_minus_materialization_is_shared_by_every_consumption() {
    let node = AlgebraBuilder::new(pattern("?x", "name", "?n"))
        .minus(pattern("?x", "knows", "?y"))
        .build();
    let store = Arc::new(FailingStore::new("knows"));
    let config = ExecutionConfig::default()
        .with_default_mode(ExecutionMode::Pull)
        .with_minus(MinusStrategy::Set);
    let dispatcher = Dispatcher::new(Arc::clone(&store) as _, config);

    let sequence = dispatcher.execute(&node).unwrap();
    let first = sequence.materialize().unwrap_err();
    let second = sequence.materialize().unwrap_err();
    assert_eq!(first.to_string(), FailingStore::MESSAGE);
    assert_eq!(second.to_string(), first.to_string());
    assert_eq!(store.failing_queries(), 1);
}

#[test]
fn failed_minus_materialization_is_evaluated_once_when_pushed() {
    let node = AlgebraBuilder::new(pattern("?x", "name", "?n"))
        .minus(pattern("?x", "knows", "?y"))
        .build();
    let config = ExecutionConfig::default()
        .with_default_mode(ExecutionMode::Push)
        .with_minus(MinusStrategy::Set);
    let (result, store) = evaluate(config, &node);
    assert_eq!(result, Err(FailingStore::MESSAGE.to_owned()));
    assert_eq!(store.failing_queries(), 1);
}

#[test]
fn patterns_without_failures_are_unaffected() {
    let node = pattern("?x", "name", "?n");
    for mode in MODES {
        let config = ExecutionConfig::default().with_default_mode(mode);
        let (result, store) = evaluate(config.clone(), &node);
        assert_eq!(result.unwrap(), crate::run(&social_dispatcher(config), &node));
        assert_eq!(store.failing_queries(), 0);
    }
}
