//! Interceptores concretos que el registry compone en la cadena.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use spec_domain::{Condition, SpecNode, StateScope};

use crate::condition::ConditionEvaluator;
use crate::snapshot::{self, AmbientSnapshot};
use crate::stepwise::StepwiseGate;
use crate::timeout::TimeoutGuard;

use super::{Interceptor, Invocation, PhaseKind, PhaseResult};

/// Gate duro: la feature (o el spec entero) está marcada Ignore.
/// Se resuelve antes que cualquier predicado, en cualquier fase.
pub struct IgnoreInterceptor {
    reason: Option<String>,
}

impl IgnoreInterceptor {
    pub fn new(reason: Option<String>) -> Self {
        Self { reason }
    }
}

impl Interceptor for IgnoreInterceptor {
    fn name(&self) -> &'static str {
        "ignore"
    }

    fn intercept(&self, _inv: Invocation<'_>) -> PhaseResult {
        PhaseResult::Skipped { reason: self.reason.clone() }
    }
}

/// Gate stepwise: consulta el flag del spec antes de dejar pasar la fase.
pub struct StepwiseInterceptor {
    spec: Arc<SpecNode>,
}

impl StepwiseInterceptor {
    pub fn new(spec: Arc<SpecNode>) -> Self {
        Self { spec }
    }
}

impl Interceptor for StepwiseInterceptor {
    fn name(&self) -> &'static str {
        "stepwise"
    }

    fn intercept(&self, inv: Invocation<'_>) -> PhaseResult {
        if StepwiseGate::should_run(&self.spec) {
            inv.proceed()
        } else {
            PhaseResult::Skipped { reason: Some("stepwise: an earlier feature failed".to_string()) }
        }
    }
}

/// Un predicado resuelto por el registry: `skip_when` es el veredicto que
/// produce el salto (`true` para IgnoreIf, `false` para Requires, que se
/// reescribe como su dual).
pub struct SkipCondition {
    pub condition: Condition,
    pub skip_when: bool,
}

impl SkipCondition {
    fn skip_reason(&self) -> String {
        if self.skip_when {
            format!("ignored: condition `{}` evaluated to true", self.condition.label())
        } else {
            format!("requires: condition `{}` evaluated to false", self.condition.label())
        }
    }
}

/// Gate condicional: evalúa los predicados una única vez, en la fase de
/// entrada de la cadena. Un predicado que falla corta con error (outcome
/// ERROR), nunca con skip.
pub struct ConditionInterceptor {
    gates: Vec<SkipCondition>,
}

impl ConditionInterceptor {
    pub fn new(gates: Vec<SkipCondition>) -> Self {
        Self { gates }
    }
}

impl Interceptor for ConditionInterceptor {
    fn name(&self) -> &'static str {
        "condition"
    }

    fn intercept(&self, inv: Invocation<'_>) -> PhaseResult {
        if !inv.phase().is_entry() {
            return inv.proceed();
        }
        let ctx = ConditionEvaluator::current_context();
        for gate in &self.gates {
            match ConditionEvaluator::evaluate(&gate.condition, &ctx) {
                Ok(verdict) if verdict == gate.skip_when => {
                    return PhaseResult::Skipped { reason: Some(gate.skip_reason()) };
                }
                Ok(_) => {}
                Err(e) => return PhaseResult::Failed(e),
            }
        }
        inv.proceed()
    }
}

/// Dónde ancla sus puntos de captura/restauración un snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPlacement {
    /// Captura justo después del setup de la feature (no antes) y restaura
    /// justo antes de su cleanup (no después).
    FeatureScoped,
    /// Captura justo antes de `setup_spec` y restaura justo después de
    /// `cleanup_spec`.
    SpecScoped,
}

/// Envuelve fases con captura/restauración de estado ambiente. Queda por
/// dentro de los gates: una feature salteada no captura nada.
pub struct SnapshotInterceptor {
    scope: StateScope,
    placement: SnapshotPlacement,
    stored: RefCell<Option<AmbientSnapshot>>,
}

impl SnapshotInterceptor {
    pub fn new(scope: StateScope, placement: SnapshotPlacement) -> Self {
        Self { scope,
               placement,
               stored: RefCell::new(None) }
    }
}

impl Interceptor for SnapshotInterceptor {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn intercept(&self, inv: Invocation<'_>) -> PhaseResult {
        match (self.placement, inv.phase()) {
            (SnapshotPlacement::SpecScoped, PhaseKind::SetupSpec) => {
                *self.stored.borrow_mut() = Some(snapshot::capture(self.scope));
                inv.proceed()
            }
            (SnapshotPlacement::SpecScoped, PhaseKind::CleanupSpec) => {
                let result = inv.proceed();
                if let Some(snap) = self.stored.borrow_mut().take() {
                    snapshot::restore(&snap);
                }
                result
            }
            (SnapshotPlacement::FeatureScoped, PhaseKind::Setup) => {
                // La captura ocurre después del setup aunque este falle:
                // el cleanup posterior restaura a este punto igualmente.
                let result = inv.proceed();
                *self.stored.borrow_mut() = Some(snapshot::capture(self.scope));
                result
            }
            (SnapshotPlacement::FeatureScoped, PhaseKind::Cleanup) => {
                if let Some(snap) = self.stored.borrow_mut().take() {
                    snapshot::restore(&snap);
                }
                inv.proceed()
            }
            _ => inv.proceed(),
        }
    }
}

/// Qué fases cubre un timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutScope {
    /// Exactamente una ejecución del cuerpo de la feature; setup y cleanup
    /// quedan afuera del reloj.
    FeatureBody,
    /// Una fase fixture del spec.
    SpecFixture,
}

/// Acota la duración de la fase que cubre. Es siempre el interceptor más
/// interno: el reloj solo mide la acción cruda.
pub struct TimeoutInterceptor {
    limit: Duration,
    scope: TimeoutScope,
}

impl TimeoutInterceptor {
    pub fn new(limit: Duration, scope: TimeoutScope) -> Self {
        Self { limit, scope }
    }

    fn guards(&self, phase: PhaseKind) -> bool {
        match self.scope {
            TimeoutScope::FeatureBody => matches!(phase, PhaseKind::Feature),
            TimeoutScope::SpecFixture => matches!(phase, PhaseKind::SetupSpec | PhaseKind::CleanupSpec),
        }
    }
}

impl Interceptor for TimeoutInterceptor {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn intercept(&self, inv: Invocation<'_>) -> PhaseResult {
        if !self.guards(inv.phase()) {
            return inv.proceed();
        }
        match inv.into_inner_action() {
            Ok(action) => TimeoutGuard::run(self.limit, action),
            Err(e) => PhaseResult::Failed(e),
        }
    }
}
