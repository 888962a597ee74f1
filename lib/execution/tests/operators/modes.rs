use crate::{dispatcher, iri, pattern, run, var};
use rdf_weave_execution::{ExecutionConfig, ExecutionMode};
use rdf_weave_logical::{AlgebraBuilder, AlgebraNodeRef, Expression, NodeKind};
use rdf_weave_model::{Literal, Row, Term};
use std::collections::BTreeSet;

/// A node for every node kind.
fn nodes() -> Vec<AlgebraNodeRef> {
    let knows = || pattern("?x", "knows", "?y");
    let named = || pattern("?x", "name", "?n");
    let friend_name = || pattern("?y", "name", "?m");
    vec![
        knows(),
        AlgebraBuilder::new(knows()).join(friend_name()).build(),
        AlgebraBuilder::new(knows())
            .left_join(
                friend_name(),
                Some(Expression::Equal(
                    Box::new(Expression::Variable(var("m"))),
                    Box::new(Expression::constant(Literal::new_simple_literal("Carol"))),
                )),
            )
            .build(),
        AlgebraBuilder::new(named()).union(knows()).build(),
        AlgebraBuilder::new(knows())
            .filter(Expression::Not(Box::new(Expression::Equal(
                Box::new(Expression::Variable(var("x"))),
                Box::new(Expression::constant(iri("carol"))),
            ))))
            .build(),
        AlgebraBuilder::new(knows())
            .project(vec![var("y"), var("x")])
            .build(),
        AlgebraBuilder::new(knows())
            .project(vec![var("y")])
            .distinct()
            .build(),
        AlgebraBuilder::new(knows())
            .project(vec![var("x")])
            .weak_distinct()
            .build(),
        AlgebraBuilder::new(knows()).slice(0, Some(2)).build(),
        AlgebraBuilder::new(knows()).slice(3, None).build(),
        AlgebraBuilder::new(knows()).slice(1, Some(2)).build(),
        AlgebraBuilder::new(knows())
            .values(
                vec![var("y")],
                vec![
                    Row::from(vec![Some(Term::from(iri("carol")))]),
                    Row::from(vec![None]),
                ],
            )
            .build(),
        AlgebraBuilder::new(named())
            .extend(var("same"), Expression::Variable(var("n")))
            .build(),
        AlgebraBuilder::new(named()).exists(knows()).build(),
        AlgebraBuilder::new(knows())
            .not_exists(pattern("?y", "name", "?any"))
            .build(),
        AlgebraBuilder::new(knows()).minus(pattern("?y", "knows", "?x")).build(),
        AlgebraBuilder::new(named()).ask().build(),
        AlgebraBuilder::new_identity().build(),
    ]
}

/// Every second node kind is evaluated by the push family.
fn mixed(first: ExecutionMode, second: ExecutionMode) -> ExecutionConfig {
    NodeKind::ALL
        .into_iter()
        .enumerate()
        .fold(ExecutionConfig::default(), |config, (i, kind)| {
            config.with_mode(kind, if i % 2 == 0 { first } else { second })
        })
}

#[test]
fn nodes_cover_every_kind() {
    let covered = nodes()
        .iter()
        .map(|node| node.kind())
        .collect::<BTreeSet<_>>();
    let all = NodeKind::ALL.into_iter().collect::<BTreeSet<_>>();
    assert_eq!(covered, all);
}

#[test]
fn pull_and_push_families_agree() {
    let configs = [
        ExecutionConfig::default().with_default_mode(ExecutionMode::Push),
        mixed(ExecutionMode::Pull, ExecutionMode::Push),
        mixed(ExecutionMode::Push, ExecutionMode::Pull),
    ];
    for node in nodes() {
        let expected = run(
            &dispatcher(ExecutionConfig::default().with_default_mode(ExecutionMode::Pull)),
            &node,
        );
        for config in configs.iter().cloned() {
            assert_eq!(run(&dispatcher(config), &node), expected, "{}", node.kind());
        }
    }
}
