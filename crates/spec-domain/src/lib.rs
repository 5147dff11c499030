//! spec-domain: modelo declarativo de specs, features y modificadores.

pub mod error;
pub mod model;

pub use error::DomainError;
pub use model::{Condition, ConditionFn, CleanupTarget, ExecutionContext, FeatureNode, Modifier, Outcome, ReleaseFn,
                SpecNode, StateScope, TimeUnit};
