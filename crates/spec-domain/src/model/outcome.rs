use serde::{Deserialize, Serialize};

/// Resultado final de una feature.
///
/// Cada feature recibe exactamente un `Outcome` por ejecución, escrito una
/// sola vez por el runner. Distinguimos `Error` (la condición o la
/// configuración se rompió) de `Failed` (la feature corrió y falló) para
/// que el reporte externo pueda separarlos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// La feature corrió y terminó bien.
    Passed,
    /// La feature corrió y falló (aserción, timeout o cleanup).
    Failed,
    /// La feature nunca corrió: gate de ignore, condición o stepwise.
    Skipped,
    /// Fallo del framework o del predicado, no de la feature.
    Error,
}

impl Outcome {
    /// `true` para los outcomes que disparan el gate stepwise.
    pub fn halts_stepwise(self) -> bool {
        matches!(self, Outcome::Failed | Outcome::Error)
    }
}
