mod bind;
mod binding;
mod builder;
mod display;
mod expr;
pub mod join;
mod lowering;
mod node;

pub use binding::Binding;
pub use builder::AlgebraBuilder;
pub use expr::{Expression, Function};
pub use lowering::{lower_graph_pattern, lower_query, LoweringError};
pub use node::{AlgebraNode, AlgebraNodeRef, NodeKind, Operator};
