//! Taxonomía de errores del core de intercepción.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum ExtensionError {
    /// Modificador mal usado: timeout cero, target de cleanup inexistente,
    /// acciones que no coinciden con las features declaradas.
    #[error("invalid modifier configuration: {0}")] Configuration(String),
    /// El predicado mismo falló al evaluarse. Outcome ERROR, nunca skip.
    #[error("condition evaluation failed: {0}")] ConditionEvaluation(String),
    /// La fase excedió su deadline. Outcome FAILED con marca de timeout.
    #[error("phase exceeded its timeout of {limit_ms} ms")] TimeoutExceeded { limit_ms: u64 },
    /// La acción envuelta falló (aserción de la feature, fixture roto).
    /// Se propaga sin cambios a través de gates y snapshots.
    #[error("phase failed: {0}")] PhaseFailure(String),
    #[error("internal: {0}")] Internal(String),
}

/// Registro de una liberación de cleanup fallida.
///
/// Es un registro acumulable, no un error que se propaga: una falla de
/// release nunca aborta las liberaciones restantes ni enmascara el outcome
/// primario de la feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupFailure {
    /// Nombre del target dueño de la entrada.
    pub owner: String,
    pub error: ExtensionError,
}

impl CleanupFailure {
    /// `true` cuando la falla es de configuración (método inexistente),
    /// detectada perezosamente recién al liberar.
    pub fn is_configuration(&self) -> bool {
        matches!(self.error, ExtensionError::Configuration(_))
    }
}
