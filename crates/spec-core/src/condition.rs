//! Evaluación de predicados contra el contexto ambiente.
//!
//! El `ConditionEvaluator` es sin estado y determinista respecto del
//! contexto que recibe: una invocación, un veredicto, sin caching. Un
//! predicado que falla al evaluarse no se traga: se convierte en
//! `ExtensionError::ConditionEvaluation` (outcome ERROR), distinto de un
//! skip, para que los bugs de condiciones queden visibles.

use spec_domain::{Condition, ExecutionContext};

use crate::errors::ExtensionError;
use crate::snapshot;

pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evalúa el predicado contra el contexto dado.
    pub fn evaluate(condition: &Condition, ctx: &ExecutionContext) -> Result<bool, ExtensionError> {
        condition.eval(ctx)
                 .map_err(|msg| ExtensionError::ConditionEvaluation(format!("{}: {}", condition.label(), msg)))
    }

    /// Captura el contexto ambiente actual del proceso: properties
    /// globales, entorno y descriptores de plataforma.
    pub fn current_context() -> ExecutionContext {
        ExecutionContext::new(snapshot::properties(), snapshot::environment())
    }
}
