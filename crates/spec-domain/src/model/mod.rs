//! Modelo de datos declarativo del framework.

pub mod context;
pub mod modifier;
pub mod node;
pub mod outcome;

pub use context::ExecutionContext;
pub use modifier::{Condition, ConditionFn, Modifier, StateScope, TimeUnit};
pub use node::{CleanupTarget, FeatureNode, ReleaseFn, SpecNode};
pub use outcome::Outcome;
