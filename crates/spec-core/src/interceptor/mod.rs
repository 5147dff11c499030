//! Cadena de interceptores alrededor de las fases del ciclo de vida.
//!
//! El runner invoca cada fase *a través* de la cadena; cada interceptor
//! puede (a) no llamar a la acción interna y devolver un resultado
//! sintético, (b) llamarla y post-procesar el resultado, o (c) llamarla
//! dentro de un scope de recursos propio. Orden outside-in: gates
//! (ignore, stepwise, condición) envuelven todo lo demás; los snapshots
//! envuelven al timeout; el timeout envuelve la acción cruda. Garantía:
//! si un gate decide saltear, ningún interceptor interno ejecuta su
//! lógica before/after (no se captura snapshot, no arranca reloj).

mod chain;
mod kinds;

pub use chain::{Interceptor, InterceptorChain, Invocation};
pub use kinds::{ConditionInterceptor, IgnoreInterceptor, SkipCondition, SnapshotInterceptor, SnapshotPlacement,
                StepwiseInterceptor, TimeoutInterceptor, TimeoutScope};

use serde::{Deserialize, Serialize};

use crate::errors::ExtensionError;

/// Las cinco fases interceptables del ciclo de vida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseKind {
    /// Fixture de apertura del spec (una vez por corrida).
    SetupSpec,
    /// Fixture de apertura de una feature.
    Setup,
    /// Cuerpo de la feature.
    Feature,
    /// Fixture de cierre de una feature.
    Cleanup,
    /// Fixture de cierre del spec (una vez por corrida).
    CleanupSpec,
}

impl PhaseKind {
    /// Primera fase que una cadena ve: ahí deciden los gates.
    pub fn is_entry(self) -> bool {
        matches!(self, PhaseKind::SetupSpec | PhaseKind::Setup)
    }
}

/// Acción cruda de una fase. `Send + 'static` porque puede cruzar al hilo
/// del guard de timeout.
pub type PhaseAction = Box<dyn FnOnce() -> Result<(), ExtensionError> + Send + 'static>;

/// Acción vacía para fases que el caller no define.
pub fn noop_action() -> PhaseAction {
    Box::new(|| Ok(()))
}

/// Resultado de una fase ejecutada a través de la cadena.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseResult {
    /// La acción corrió y terminó bien.
    Completed,
    /// Un gate decidió no ejecutar la fase. Los gates nunca levantan
    /// errores: este resultado es silencioso por contrato.
    Skipped { reason: Option<String> },
    /// La acción corrió y falló, o un interceptor convirtió la ejecución
    /// en falla (timeout, condición rota).
    Failed(ExtensionError),
}

impl PhaseResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, PhaseResult::Completed)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PhaseResult::Skipped { .. })
    }

    pub fn skip_reason(&self) -> Option<&str> {
        match self {
            PhaseResult::Skipped { reason } => reason.as_deref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ExtensionError> {
        match self {
            PhaseResult::Failed(e) => Some(e),
            _ => None,
        }
    }
}
