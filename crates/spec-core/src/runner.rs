//! Driver secuencial de referencia.
//!
//! No es un runner de propósito general: el matching de features, las
//! data tables y el render de reportes siguen siendo colaboradores
//! externos. Este driver materializa el contrato de intercepción: por cada
//! feature pide la cadena al `ExtensionRegistry`, invoca cada fase *a
//! través* de ella, escribe el outcome exactamente una vez, alimenta el
//! gate stepwise y emite los eventos de la corrida.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use spec_domain::{Outcome, SpecNode};

use crate::errors::{CleanupFailure, ExtensionError};
use crate::event::{EventStore, InMemoryEventStore, RunEventKind};
use crate::interceptor::{noop_action, InterceptorChain, PhaseAction, PhaseKind, PhaseResult};
use crate::registry::ExtensionRegistry;
use crate::stepwise::StepwiseGate;

/// Acciones de una feature: setup, cuerpo y cleanup. Las fases ausentes
/// corren como no-op.
#[derive(Default)]
pub struct FeatureActions {
    pub setup: Option<PhaseAction>,
    pub body: Option<PhaseAction>,
    pub cleanup: Option<PhaseAction>,
}

impl FeatureActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_setup<F>(mut self, f: F) -> Self
        where F: FnOnce() -> Result<(), ExtensionError> + Send + 'static
    {
        self.setup = Some(Box::new(f));
        self
    }

    pub fn with_body<F>(mut self, f: F) -> Self
        where F: FnOnce() -> Result<(), ExtensionError> + Send + 'static
    {
        self.body = Some(Box::new(f));
        self
    }

    pub fn with_cleanup<F>(mut self, f: F) -> Self
        where F: FnOnce() -> Result<(), ExtensionError> + Send + 'static
    {
        self.cleanup = Some(Box::new(f));
        self
    }
}

/// Acciones de la corrida completa, en orden de declaración de features.
#[derive(Default)]
pub struct SpecActions {
    pub setup_spec: Option<PhaseAction>,
    pub cleanup_spec: Option<PhaseAction>,
    /// Deadline aplicado directamente a cada fase fixture del spec.
    pub fixture_timeout: Option<Duration>,
    pub features: Vec<FeatureActions>,
}

impl SpecActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_setup_spec<F>(mut self, f: F) -> Self
        where F: FnOnce() -> Result<(), ExtensionError> + Send + 'static
    {
        self.setup_spec = Some(Box::new(f));
        self
    }

    pub fn with_cleanup_spec<F>(mut self, f: F) -> Self
        where F: FnOnce() -> Result<(), ExtensionError> + Send + 'static
    {
        self.cleanup_spec = Some(Box::new(f));
        self
    }

    pub fn with_fixture_timeout(mut self, limit: Duration) -> Self {
        self.fixture_timeout = Some(limit);
        self
    }

    pub fn with_feature(mut self, feature: FeatureActions) -> Self {
        self.features.push(feature);
        self
    }
}

/// Reporte final de una feature: outcome único más los registros
/// secundarios (fallas de cleanup, marca de timeout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureReport {
    pub feature_name: String,
    pub outcome: Outcome,
    pub skip_reason: Option<String>,
    pub timed_out: bool,
    pub cleanup_failures: Vec<CleanupFailure>,
    /// Error terminal que determinó el outcome, si lo hubo.
    pub error: Option<ExtensionError>,
}

impl FeatureReport {
    fn skipped(name: &str, reason: Option<String>) -> Self {
        Self { feature_name: name.to_string(),
               outcome: Outcome::Skipped,
               skip_reason: reason,
               timed_out: false,
               cleanup_failures: Vec::new(),
               error: None }
    }
}

/// Reporte de la corrida entera.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecReport {
    pub run_id: Uuid,
    pub spec_id: Uuid,
    pub spec_name: String,
    pub features: Vec<FeatureReport>,
    /// Falla de una fase fixture del spec, si la hubo.
    pub spec_failure: Option<ExtensionError>,
}

impl SpecReport {
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.features.iter().map(|f| f.outcome).collect()
    }
}

/// Driver de referencia sobre un `EventStore`.
pub struct SpecRunner<E: EventStore> {
    event_store: E,
}

impl SpecRunner<InMemoryEventStore> {
    pub fn new() -> Self {
        Self { event_store: InMemoryEventStore::default() }
    }
}

impl Default for SpecRunner<InMemoryEventStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EventStore> SpecRunner<E> {
    pub fn with_store(event_store: E) -> Self {
        Self { event_store }
    }

    pub fn event_store(&self) -> &E {
        &self.event_store
    }

    /// Corre el spec completo y devuelve el reporte.
    ///
    /// Un error acá es un problema de configuración de la corrida misma
    /// (spec inválido, acciones que no coinciden con las features); los
    /// fallos de features viajan dentro del reporte, nunca como `Err`.
    pub fn run(&mut self, spec: Arc<SpecNode>, actions: SpecActions) -> Result<SpecReport, ExtensionError> {
        spec.validate().map_err(|e| ExtensionError::Configuration(e.to_string()))?;
        if actions.features.len() != spec.features.len() {
            return Err(ExtensionError::Configuration(format!("{} feature action set(s) for {} declared feature(s)",
                                                             actions.features.len(),
                                                             spec.features.len())));
        }

        let run_id = Uuid::new_v4();
        self.event_store.append_kind(run_id,
                                     RunEventKind::SpecStarted { spec_id: spec.id,
                                                                 spec_name: spec.name.clone(),
                                                                 feature_count: spec.features.len() });

        let spec_chain = ExtensionRegistry::build_spec_chain(&spec, actions.fixture_timeout)?;
        let mut spec_failure = None;

        let setup_spec_result = self.run_spec_fixture(run_id,
                                                      &spec_chain,
                                                      PhaseKind::SetupSpec,
                                                      actions.setup_spec);
        let blocked_reason = match &setup_spec_result {
            PhaseResult::Completed => None,
            PhaseResult::Skipped { reason } => Some(reason.clone()),
            PhaseResult::Failed(e) => {
                spec_failure = Some(e.clone());
                Some(Some("setup_spec failed".to_string()))
            }
        };

        let mut reports = Vec::with_capacity(spec.features.len());
        for (index, feature_actions) in actions.features.into_iter().enumerate() {
            let report = match &blocked_reason {
                Some(reason) => {
                    let name = spec.features[index].name.clone();
                    self.emit_skip(run_id, index, &name, reason.clone());
                    FeatureReport::skipped(&name, reason.clone())
                }
                None => self.run_feature(run_id, &spec, index, feature_actions)?,
            };
            reports.push(report);
        }

        let cleanup_spec_result = self.run_spec_fixture(run_id,
                                                        &spec_chain,
                                                        PhaseKind::CleanupSpec,
                                                        actions.cleanup_spec);
        if let PhaseResult::Failed(e) = cleanup_spec_result {
            spec_failure.get_or_insert(e);
        }

        let outcomes: Vec<Outcome> = reports.iter().map(|r| r.outcome).collect();
        self.event_store.append_kind(run_id, RunEventKind::SpecCompleted { outcomes });

        Ok(SpecReport { run_id,
                        spec_id: spec.id,
                        spec_name: spec.name.clone(),
                        features: reports,
                        spec_failure })
    }

    fn run_spec_fixture(&mut self,
                        run_id: Uuid,
                        chain: &InterceptorChain,
                        phase: PhaseKind,
                        action: Option<PhaseAction>)
                        -> PhaseResult {
        self.event_store.append_kind(run_id, RunEventKind::PhaseStarted { feature_index: None, phase });
        let result = chain.run_phase(phase, action.unwrap_or_else(noop_action));
        self.event_store.append_kind(run_id, RunEventKind::PhaseFinished { feature_index: None, phase });
        result
    }

    fn run_feature(&mut self,
                   run_id: Uuid,
                   spec: &Arc<SpecNode>,
                   index: usize,
                   actions: FeatureActions)
                   -> Result<FeatureReport, ExtensionError> {
        let name = spec.features[index].name.clone();
        self.event_store.append_kind(run_id,
                                     RunEventKind::FeatureStarted { feature_index: index,
                                                                    feature_name: name.clone() });

        let chain = match ExtensionRegistry::build(spec, index) {
            Ok(chain) => chain,
            Err(e) => {
                // Modificador mal configurado: la feature queda en ERROR y
                // la corrida sigue con la siguiente
                let report = FeatureReport { feature_name: name.clone(),
                                             outcome: Outcome::Error,
                                             skip_reason: None,
                                             timed_out: false,
                                             cleanup_failures: Vec::new(),
                                             error: Some(e) };
                self.finish_feature(run_id, spec, index, &name, report.outcome);
                return Ok(report);
            }
        };

        let setup_result = self.run_feature_phase(run_id, &chain, index, PhaseKind::Setup, actions.setup);
        if let PhaseResult::Skipped { reason } = &setup_result {
            // Gate: ni el body ni el cleanup corren, ninguna liberación
            self.emit_skip(run_id, index, &name, reason.clone());
            let report = FeatureReport::skipped(&name, reason.clone());
            self.finish_feature(run_id, spec, index, &name, report.outcome);
            return Ok(report);
        }

        let primary = match setup_result {
            PhaseResult::Completed => self.run_feature_phase(run_id, &chain, index, PhaseKind::Feature, actions.body),
            other => other,
        };

        let (mut outcome, mut timed_out, mut error) = Self::resolve_primary(&primary);

        // El cleanup y las liberaciones corren aunque setup o body hayan
        // fallado; solo un skip los evita (y ya retornamos en ese caso)
        let cleanup_result = self.run_feature_phase(run_id, &chain, index, PhaseKind::Cleanup, actions.cleanup);
        if let PhaseResult::Failed(e) = cleanup_result {
            if outcome == Outcome::Passed {
                // La falla de cleanup es lo único que falló: pasa a ser la
                // falla reportada de la feature
                let (o, t, err) = Self::resolve_error(e);
                outcome = o;
                timed_out = timed_out || t;
                error = Some(err);
            }
        }

        let cleanup_failures = chain.release_cleanups();
        for failure in &cleanup_failures {
            self.event_store.append_kind(run_id,
                                         RunEventKind::CleanupFailureRecorded { feature_index: index,
                                                                                owner: failure.owner.clone(),
                                                                                error: failure.error.clone() });
        }
        if outcome == Outcome::Passed && !cleanup_failures.is_empty() {
            outcome = if cleanup_failures.iter().any(CleanupFailure::is_configuration) {
                Outcome::Error
            } else {
                Outcome::Failed
            };
            error = error.or_else(|| Some(cleanup_failures[0].error.clone()));
        }

        self.finish_feature(run_id, spec, index, &name, outcome);

        Ok(FeatureReport { feature_name: name,
                           outcome,
                           skip_reason: None,
                           timed_out,
                           cleanup_failures,
                           error })
    }

    fn run_feature_phase(&mut self,
                         run_id: Uuid,
                         chain: &InterceptorChain,
                         index: usize,
                         phase: PhaseKind,
                         action: Option<PhaseAction>)
                         -> PhaseResult {
        self.event_store.append_kind(run_id,
                                     RunEventKind::PhaseStarted { feature_index: Some(index), phase });
        let result = chain.run_phase(phase, action.unwrap_or_else(noop_action));
        self.event_store.append_kind(run_id,
                                     RunEventKind::PhaseFinished { feature_index: Some(index), phase });
        result
    }

    fn emit_skip(&mut self, run_id: Uuid, index: usize, name: &str, reason: Option<String>) {
        self.event_store.append_kind(run_id,
                                     RunEventKind::FeatureSkipped { feature_index: index,
                                                                    feature_name: name.to_string(),
                                                                    reason });
    }

    /// Escribe el outcome (una sola vez), alimenta el gate stepwise y
    /// emite el evento de cierre.
    fn finish_feature(&mut self, run_id: Uuid, spec: &SpecNode, index: usize, name: &str, outcome: Outcome) {
        StepwiseGate::record(spec, outcome);
        self.event_store.append_kind(run_id,
                                     RunEventKind::FeatureFinished { feature_index: index,
                                                                     feature_name: name.to_string(),
                                                                     outcome });
    }

    fn resolve_primary(result: &PhaseResult) -> (Outcome, bool, Option<ExtensionError>) {
        match result {
            PhaseResult::Completed => (Outcome::Passed, false, None),
            // Gate tardío (no debería ocurrir pasado el setup, pero un
            // skip nunca se convierte en falla)
            PhaseResult::Skipped { .. } => (Outcome::Skipped, false, None),
            PhaseResult::Failed(e) => {
                let (o, t, err) = Self::resolve_error(e.clone());
                (o, t, Some(err))
            }
        }
    }

    /// Mapea la taxonomía de errores a outcomes: condición o configuración
    /// rota es ERROR, timeout y aserción son FAILED.
    fn resolve_error(error: ExtensionError) -> (Outcome, bool, ExtensionError) {
        match &error {
            ExtensionError::TimeoutExceeded { .. } => (Outcome::Failed, true, error),
            ExtensionError::PhaseFailure(_) => (Outcome::Failed, false, error),
            ExtensionError::ConditionEvaluation(_)
            | ExtensionError::Configuration(_)
            | ExtensionError::Internal(_) => (Outcome::Error, false, error),
        }
    }
}
