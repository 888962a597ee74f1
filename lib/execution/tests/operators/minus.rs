use crate::{dispatcher, pattern, run, triple_pattern, CountingStore};
use rdf_weave_execution::{Dispatcher, ExecutionConfig, ExecutionMode, MinusStrategy};
use rdf_weave_logical::{AlgebraBuilder, AlgebraNodeRef};
use std::sync::Arc;

fn minus(left: AlgebraNodeRef, right: AlgebraNodeRef) -> AlgebraNodeRef {
    AlgebraBuilder::new(left).minus(right).build()
}

#[test]
fn bind_and_set_strategies_agree() {
    let pairs = [
        (pattern("?x", "name", "?n"), pattern("?x", "knows", "?y")),
        (pattern("?x", "knows", "?y"), pattern("?y", "knows", "?x")),
        (pattern("?x", "name", "?n"), pattern("?a", "knows", "?b")),
        (
            AlgebraBuilder::new(pattern("?x", "name", "?n"))
                .left_join(pattern("?x", "knows", "?y"), None)
                .build(),
            pattern("?z", "knows", "?y"),
        ),
        (
            pattern("?x", "name", "?n"),
            AlgebraBuilder::new(pattern("?x", "knows", "bob"))
                .union(pattern("?z", "name", "?w"))
                .build(),
        ),
        (
            pattern("?x", "knows", "?y"),
            AlgebraBuilder::new(pattern("?x", "name", "?n"))
                .left_join(pattern("?x", "knows", "?y"), None)
                .build(),
        ),
    ];

    for (left, right) in pairs {
        let node = minus(left, right);
        for mode in [ExecutionMode::Pull, ExecutionMode::Push] {
            let config = ExecutionConfig::default().with_default_mode(mode);
            let bind = run(&dispatcher(config.clone().with_minus(MinusStrategy::Bind)), &node);
            let set = run(&dispatcher(config.with_minus(MinusStrategy::Set)), &node);
            assert_eq!(bind, set, "{mode:?}");
        }
    }
}

#[test]
fn minus_removes_mutual_acquaintances() {
    let node = minus(
        pattern("?x", "knows", "?y"),
        pattern("?y", "knows", "?x"),
    );
    assert_eq!(
        run(&dispatcher(ExecutionConfig::default()), &node),
        vec![
            "[?x=<http://example.com/alice> ?y=<http://example.com/bob>]",
            "[?x=<http://example.com/bob> ?y=<http://example.com/carol>]",
            "[?x=<http://example.com/carol> ?y=<http://example.com/dave>]",
        ]
    );
}

#[test]
fn right_rows_without_shared_variables_remove_nothing() {
    let right = AlgebraBuilder::new(pattern("?x", "knows", "bob"))
        .union(pattern("?z", "name", "?w"))
        .build();
    let node = minus(pattern("?x", "name", "?n"), right);
    for strategy in [MinusStrategy::Bind, MinusStrategy::Set] {
        for mode in [ExecutionMode::Pull, ExecutionMode::Push] {
            let config = ExecutionConfig::default()
                .with_default_mode(mode)
                .with_minus(strategy);
            assert_eq!(
                run(&dispatcher(config), &node),
                vec![
                    r#"[?n="Bob" ?x=<http://example.com/bob>]"#,
                    r#"[?n="Carol" ?x=<http://example.com/carol>]"#,
                ],
                "{strategy:?} {mode:?}"
            );
        }
    }
}

#[test]
fn set_strategy_materializes_right_side_once() {
    let store = Arc::new(CountingStore::new());
    let config = ExecutionConfig::default().with_minus(MinusStrategy::Set);
    let dispatcher = Dispatcher::new(Arc::clone(&store) as _, config);
    let node = minus(pattern("?x", "name", "?n"), pattern("?x", "knows", "carol"));

    let sequence = dispatcher.execute(&node).unwrap();
    assert_eq!(sequence.iter().count(), 1);
    assert_eq!(sequence.iter().count(), 1);

    // Three left rows per consumption and two right rows in total.
    assert_eq!(store.pulled(), 3 * 2 + 2);
    assert_eq!(store.queried(&triple_pattern("?x", "knows", "carol")), 1);
}

#[test]
fn bind_strategy_never_evaluates_the_unspecialized_right_side() {
    let store = Arc::new(CountingStore::new());
    let config = ExecutionConfig::default().with_minus(MinusStrategy::Bind);
    let dispatcher = Dispatcher::new(Arc::clone(&store) as _, config);
    let node = minus(pattern("?x", "name", "?n"), pattern("?x", "knows", "carol"));

    assert_eq!(
        run(&dispatcher, &node),
        vec![r#"[?n="Carol" ?x=<http://example.com/carol>]"#]
    );
    assert_eq!(store.queried(&triple_pattern("?x", "knows", "carol")), 0);
    assert_eq!(store.queried(&triple_pattern("carol", "knows", "carol")), 1);
}
