use crate::{dispatcher, iri, pattern, run, triple_pattern, var, CountingStore};
use itertools::Itertools;
use rdf_weave_execution::{Dispatcher, ExecutionConfig, ExecutionMode, JoinReorderingMode};
use rdf_weave_logical::join::{JoinReorderStrategy, ShapeReorderStrategy};
use rdf_weave_logical::{AlgebraBuilder, AlgebraNode, AlgebraNodeRef, Expression, Operator};
use rdf_weave_model::{Literal, Row, Term};
use std::sync::Arc;

const REORDERINGS: [JoinReorderingMode; 3] = [
    JoinReorderingMode::Disabled,
    JoinReorderingMode::Shape,
    JoinReorderingMode::Cardinality,
];

const MODES: [ExecutionMode; 2] = [ExecutionMode::Pull, ExecutionMode::Push];

#[test]
fn join_result_is_independent_of_operand_order() {
    let operands = vec![
        pattern("?x", "knows", "?y"),
        pattern("?y", "name", "?n"),
        pattern("?x", "name", "?m"),
    ];
    assert_order_invariant(operands, 4);
}

/// Asserts that every permutation of `operands` yields `expected_len` rows in every configuration.
fn assert_order_invariant(operands: Vec<AlgebraNodeRef>, expected_len: usize) {
    let baseline = run(
        &dispatcher(ExecutionConfig::default().with_join_reordering(JoinReorderingMode::Disabled)),
        &AlgebraNode::new(Operator::Join(operands.clone())),
    );
    assert_eq!(baseline.len(), expected_len);

    for permutation in operands.iter().cloned().permutations(operands.len()) {
        let node = AlgebraNode::new(Operator::Join(permutation));
        for reordering in REORDERINGS {
            for mode in MODES {
                let config = ExecutionConfig::default()
                    .with_join_reordering(reordering)
                    .with_default_mode(mode);
                assert_eq!(
                    run(&dispatcher(config), &node),
                    baseline,
                    "{reordering:?} {mode:?}"
                );
            }
        }
    }
}

#[test]
fn optional_operand_is_order_invariant() {
    let optional = AlgebraBuilder::new(pattern("?x", "name", "?n"))
        .left_join(pattern("?x", "knows", "?y"), None)
        .build();
    assert_order_invariant(vec![optional, pattern("alice", "knows", "?y")], 3);
}

#[test]
fn union_operand_with_differing_variables_is_order_invariant() {
    let union = AlgebraBuilder::new(pattern("?x", "knows", "bob"))
        .union(pattern("?z", "name", "?w"))
        .build();
    assert_order_invariant(vec![union, pattern("?x", "name", "?n")], 10);
}

#[test]
fn reordering_avoids_cartesian_products() {
    // Sorted by weight alone, `?b ?y bob` would directly follow `alice ?a ?x`.
    let operands = vec![
        pattern("?x", "knows", "?y"),
        pattern("alice", "?a", "?x"),
        pattern("?b", "?y", "bob"),
    ];
    let node = AlgebraNode::new(Operator::Join(operands.clone()));

    let reordering = ShapeReorderStrategy.reorder(&node).unwrap();
    assert_eq!(reordering.permutation, vec![1, 0, 2]);

    let mut placed = Vec::new();
    for (position, operand) in reordering.permutation.iter().enumerate() {
        let variables = operands[*operand].variables();
        if position > 0 {
            assert!(variables.iter().any(|v| placed.contains(v)));
        }
        placed.extend_from_slice(variables);
    }

    let store = Arc::new(CountingStore::new());
    let config = ExecutionConfig::default().with_join_reordering(JoinReorderingMode::Shape);
    let dispatcher = Dispatcher::new(Arc::clone(&store) as _, config);
    assert!(run(&dispatcher, &node).is_empty());
    assert_eq!(store.queried(&triple_pattern("?b", "?y", "bob")), 0);
}

#[test]
fn left_join_keeps_unmatched_left_rows() {
    let node = AlgebraBuilder::new_from_values(
        vec![var("x")],
        vec![Row::from(vec![Some(Term::from(iri("dave")))])],
    )
    .left_join(pattern("?x", "knows", "?y"), None)
    .build();

    for mode in MODES {
        let dispatcher = dispatcher(ExecutionConfig::default().with_default_mode(mode));
        assert_eq!(run(&dispatcher, &node), vec!["[?x=<http://example.com/dave>]"]);
    }
}

#[test]
fn left_join_with_false_expression_keeps_every_left_row_once() {
    let node = AlgebraBuilder::new(pattern("?x", "name", "?n"))
        .left_join(
            pattern("?x", "knows", "?y"),
            Some(Expression::constant(Literal::from(false))),
        )
        .build();

    for mode in MODES {
        let dispatcher = dispatcher(ExecutionConfig::default().with_default_mode(mode));
        assert_eq!(
            run(&dispatcher, &node),
            vec![
                r#"[?n="Alice" ?x=<http://example.com/alice>]"#,
                r#"[?n="Bob" ?x=<http://example.com/bob>]"#,
                r#"[?n="Carol" ?x=<http://example.com/carol>]"#,
            ]
        );
    }
}
