use crate::{Dispatcher, ExecutionConfig, ExecutionMode};
use rdf_weave_logical::{AlgebraNode, AlgebraNodeRef};
use rdf_weave_model::{
    Literal, NamedNode, NamedNodePattern, Row, TermPattern, Triple, TriplePattern, Variable,
};
use rdf_weave_storage::MemoryTripleStore;
use std::sync::Arc;

pub(crate) fn var(name: &str) -> Variable {
    Variable::new_unchecked(name)
}

pub(crate) fn iri(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{name}"))
}

/// Creates a triple pattern node. Components starting with `?` are variables, all others are
/// local names of IRIs.
pub(crate) fn pattern(subject: &str, predicate: &str, object: &str) -> AlgebraNodeRef {
    AlgebraNode::triple(TriplePattern {
        subject: term_pattern(subject),
        predicate: NamedNodePattern::NamedNode(iri(predicate)),
        object: term_pattern(object),
    })
}

fn term_pattern(value: &str) -> TermPattern {
    match value.strip_prefix('?') {
        Some(name) => var(name).into(),
        None => iri(value).into(),
    }
}

/// A dispatcher over a small social graph: alice knows bob, bob knows carol, and everyone has a
/// name.
pub(crate) fn test_dispatcher(config: ExecutionConfig) -> Dispatcher {
    let store = MemoryTripleStore::new();
    let mut triples = vec![
        Triple::new(iri("alice"), iri("knows"), iri("bob")),
        Triple::new(iri("bob"), iri("knows"), iri("carol")),
    ];
    for (person, name) in [("alice", "Alice"), ("bob", "Bob"), ("carol", "Carol")] {
        triples.push(Triple::new(
            iri(person),
            iri("name"),
            Literal::new_simple_literal(name),
        ));
    }
    store.extend(triples).unwrap();
    Dispatcher::new(Arc::new(store), config)
}

/// Evaluates `node` with the pull and the push family and returns the sorted rows.
///
/// Panics if both families disagree.
pub(crate) fn evaluate(config: ExecutionConfig, node: &AlgebraNodeRef) -> String {
    let pull = test_dispatcher(config.clone().with_default_mode(ExecutionMode::Pull));
    let pulled = pull.execute(node).unwrap().materialize().unwrap();
    let pulled = render(node.variables(), &pulled);

    let push = test_dispatcher(config.with_default_mode(ExecutionMode::Push));
    let sequence = push.execute(node).unwrap();
    let pushed = futures::executor::block_on(sequence.collect()).unwrap();
    let pushed = render(node.variables(), &pushed);

    assert_eq!(pulled, pushed, "pull and push evaluation differ");
    pulled
}

fn render(variables: &[Variable], rows: &[Row]) -> String {
    let mut lines = rows
        .iter()
        .map(|row| {
            let bindings = variables
                .iter()
                .zip(row.iter())
                .map(|(variable, term)| match term {
                    Some(term) => format!("{variable}={term}"),
                    None => format!("{variable}=UNDEF"),
                })
                .collect::<Vec<_>>();
            format!("[{}]", bindings.join(" "))
        })
        .collect::<Vec<_>>();
    lines.sort();
    lines.join("\n")
}
