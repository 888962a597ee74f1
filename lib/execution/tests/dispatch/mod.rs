use crate::{pattern, social_store};
use rdf_weave_common::error::ExecutionError;
use rdf_weave_execution::{
    ConfigurationError, Dispatcher, EvaluatorRegistry, ExecutionConfig, ExecutionMode,
};
use rdf_weave_logical::NodeKind;
use std::sync::Arc;

#[test]
fn missing_evaluator_is_reported_at_init() {
    let mut registry = EvaluatorRegistry::builtin();
    registry.unregister(NodeKind::Minus, ExecutionMode::Push);

    // Pull is the default family. The push minus is only required once it is configured.
    let dispatcher = Dispatcher::with_registry(
        Arc::new(social_store()),
        ExecutionConfig::default(),
        registry.clone(),
    );
    assert_eq!(dispatcher.init(), Ok(()));

    let config = ExecutionConfig::default().with_mode(NodeKind::Minus, ExecutionMode::Push);
    let dispatcher = Dispatcher::with_registry(Arc::new(social_store()), config, registry);
    let error = dispatcher.init().unwrap_err();
    assert_eq!(
        error,
        ConfigurationError::MissingEvaluator {
            kind: NodeKind::Minus,
            mode: ExecutionMode::Push,
        }
    );
    assert!(matches!(
        dispatcher.execute(&pattern("?x", "knows", "?y")),
        Err(ExecutionError::Internal(_))
    ));
}
