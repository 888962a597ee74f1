#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod engine;
pub mod error;

pub use engine::{QueryEngine, QueryResults};
pub use rdf_weave_execution::{
    DistinctStrategy, ExecutionConfig, ExecutionMode, JoinReorderingMode, MinusStrategy,
};

pub mod model {
    pub use rdf_weave_model::*;
}

pub mod common {
    pub use rdf_weave_common::*;
}

pub mod logical {
    pub use rdf_weave_logical::*;
}

pub mod execution {
    pub use rdf_weave_execution::*;
}

pub mod storage {
    pub use rdf_weave_storage::*;
}
