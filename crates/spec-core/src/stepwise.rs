//! Gate stepwise: suprime features posteriores a la primera falla.
//!
//! Máquina de estados por spec: `RUNNING -> (falla) -> HALTED`, y `HALTED`
//! es terminal para esa instancia. El flag vive en el `SpecNode` y se
//! escribe de forma monótona; el gate se consulta antes de la primera fase
//! de cada feature. El alcance es el spec anotado y nada más.

use spec_domain::{Outcome, SpecNode};

pub struct StepwiseGate;

impl StepwiseGate {
    /// `false` cuando el spec está bajo stepwise y ya hubo una falla:
    /// ninguna feature posterior debe correr.
    pub fn should_run(spec: &SpecNode) -> bool {
        !(spec.is_stepwise() && spec.stepwise_failed())
    }

    /// Alimenta el gate con el outcome recién escrito de una feature.
    pub fn record(spec: &SpecNode, outcome: Outcome) {
        if spec.is_stepwise() && outcome.halts_stepwise() {
            spec.mark_stepwise_failed();
        }
    }
}
