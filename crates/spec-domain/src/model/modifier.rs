//! Modificadores declarativos adjuntables a specs y features.
//!
//! Un `Modifier` es la unidad del contrato observable entre el descubridor
//! de anotaciones (colaborador externo) y el `ExtensionRegistry`: una
//! variante etiquetada, inmutable una vez adjuntada. Este módulo no decide
//! precedencias ni orden de aplicación; eso es responsabilidad del registry.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::context::ExecutionContext;

/// Unidad de tiempo aceptada por `Modifier::timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Millis,
    Seconds,
    Minutes,
}

impl TimeUnit {
    /// Convierte `value` expresado en esta unidad a `Duration`.
    pub fn to_duration(self, value: u64) -> Duration {
        match self {
            TimeUnit::Millis => Duration::from_millis(value),
            TimeUnit::Seconds => Duration::from_secs(value),
            TimeUnit::Minutes => Duration::from_secs(value * 60),
        }
    }
}

/// Alcance de un snapshot de estado ambiente.
///
/// Cerrado por diseño: un selector textual dejaría representable el scope
/// mal escrito; el enum lo hace imposible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateScope {
    /// Variables de entorno del proceso.
    Env,
    /// Registro global de properties del proceso.
    Props,
    /// Ambos.
    All,
}

/// Callback opaco productor de booleanos.
///
/// `Err` señala que el predicado mismo falló (bug de la condición), lo que
/// se reporta como outcome `Error`, nunca como skip silencioso.
pub type ConditionFn = dyn Fn(&ExecutionContext) -> Result<bool, String> + Send + Sync;

/// Predicado opaco con una etiqueta estable para diagnósticos.
#[derive(Clone)]
pub struct Condition {
    label: String,
    eval: Arc<ConditionFn>,
}

impl Condition {
    pub fn new<F>(label: impl Into<String>, eval: F) -> Self
        where F: Fn(&ExecutionContext) -> Result<bool, String> + Send + Sync + 'static
    {
        Self { label: label.into(),
               eval: Arc::new(eval) }
    }

    /// Condición constante, útil en composición y tests.
    pub fn constant(value: bool) -> Self {
        Self::new(format!("constant({value})"), move |_| Ok(value))
    }

    /// Evalúa el predicado contra el contexto dado. Invocación única por
    /// llamada: aquí no hay caching.
    pub fn eval(&self, ctx: &ExecutionContext) -> Result<bool, String> {
        (self.eval)(ctx)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition").field("label", &self.label).finish()
    }
}

/// Modificador declarativo. Inmutable una vez adjuntado al nodo.
#[derive(Debug, Clone)]
pub enum Modifier {
    /// Fuerza outcome SKIPPED, con motivo opcional.
    Ignore { reason: Option<String> },
    /// Todas las features hermanas sin este modificador quedan SKIPPED.
    IgnoreRest,
    /// SKIPPED si el predicado evalúa a `true`.
    IgnoreIf(Condition),
    /// SKIPPED si el predicado evalúa a `false`.
    Requires(Condition),
    /// Acota la duración de una fase.
    Timeout(Duration),
    /// Registra una entrada de cleanup resuelta perezosamente contra los
    /// targets del spec (`owner.method`).
    AutoCleanup {
        owner: String,
        method: String,
        quiet: bool,
    },
    /// Snapshot/restore del estado ambiente acotado a la feature o al spec.
    ConfineState(StateScope),
    /// Alias semántico de `ConfineState` para estado que se restaura sin
    /// confinar mutaciones nuevas; mismo mecanismo de snapshot.
    RestoreState(StateScope),
    /// Habilita el gate stepwise para el spec anotado (solo class scope).
    Stepwise,
}

impl Modifier {
    pub fn ignore() -> Self {
        Modifier::Ignore { reason: None }
    }

    pub fn ignore_with_reason(reason: impl Into<String>) -> Self {
        Modifier::Ignore { reason: Some(reason.into()) }
    }

    /// Timeout en la unidad indicada.
    pub fn timeout(value: u64, unit: TimeUnit) -> Self {
        Modifier::Timeout(unit.to_duration(value))
    }

    /// Timeout con la unidad por defecto (segundos).
    pub fn timeout_secs(value: u64) -> Self {
        Self::timeout(value, TimeUnit::Seconds)
    }

    /// AutoCleanup con el método por defecto `close` y `quiet = false`.
    pub fn auto_cleanup(owner: impl Into<String>) -> Self {
        Modifier::AutoCleanup { owner: owner.into(),
                                method: "close".to_string(),
                                quiet: false }
    }

    pub fn auto_cleanup_with(owner: impl Into<String>, method: impl Into<String>, quiet: bool) -> Self {
        Modifier::AutoCleanup { owner: owner.into(),
                                method: method.into(),
                                quiet }
    }

    /// `true` para los modificadores que actúan como gate duro (se
    /// resuelven antes de evaluar cualquier predicado).
    pub fn is_hard_gate(&self) -> bool {
        matches!(self, Modifier::Ignore { .. } | Modifier::IgnoreRest)
    }
}
