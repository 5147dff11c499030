//! spec-core: capa de intercepción composable del ciclo de vida de specs.
pub mod cleanup;
pub mod condition;
pub mod errors;
pub mod event;
pub mod interceptor;
pub mod registry;
pub mod runner;
pub mod snapshot;
pub mod stepwise;
pub mod timeout;

pub use cleanup::{CleanupChain, CleanupEntry, CleanupRegistrar};
pub use condition::ConditionEvaluator;
pub use errors::{CleanupFailure, ExtensionError};
pub use event::{EventStore, InMemoryEventStore, RunEvent, RunEventKind};
pub use interceptor::{noop_action, Interceptor, InterceptorChain, Invocation, PhaseAction, PhaseKind, PhaseResult};
pub use registry::ExtensionRegistry;
pub use runner::{FeatureActions, FeatureReport, SpecActions, SpecReport, SpecRunner};
pub use snapshot::AmbientSnapshot;
pub use stepwise::StepwiseGate;
pub use timeout::TimeoutGuard;
