mod reordering;

pub use reordering::{
    CardinalityReorderStrategy, JoinReorderStrategy, JoinReordering, ShapeReorderStrategy,
};
