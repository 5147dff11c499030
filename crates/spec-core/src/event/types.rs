//! Tipos de evento de la corrida y estructura `RunEvent`.
//!
//! Rol en la corrida:
//! - El `SpecRunner` emite eventos a un `EventStore` append-only a medida
//!   que atraviesa las fases de cada feature.
//! - El log es la superficie de hand-off hacia el renderizador de reportes
//!   (colaborador externo): replay del log = reporte completo.
//! - El enum `RunEventKind` es el contrato observable y estable del core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use spec_domain::Outcome;

use crate::errors::ExtensionError;
use crate::interceptor::PhaseKind;

/// Tipos de evento soportados.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEventKind {
    /// Apertura de una corrida de spec. Invariante: primer evento del run.
    SpecStarted {
        spec_id: Uuid,
        spec_name: String,
        feature_count: usize,
    },
    /// Una feature entró a su primera fase.
    FeatureStarted { feature_index: usize, feature_name: String },
    /// Una fase fue invocada a través de la cadena (un gate puede aún
    /// saltearla; el skip queda en `FeatureSkipped`).
    PhaseStarted { feature_index: Option<usize>, phase: PhaseKind },
    /// Una fase terminó (bien o mal; el detalle viaja en los eventos de
    /// cierre de feature).
    PhaseFinished { feature_index: Option<usize>, phase: PhaseKind },
    /// Una feature quedó SKIPPED por gate, condición o stepwise. Los gates
    /// nunca levantan errores: este evento es su única traza.
    FeatureSkipped {
        feature_index: usize,
        feature_name: String,
        reason: Option<String>,
    },
    /// Cierre de feature con su outcome único.
    FeatureFinished {
        feature_index: usize,
        feature_name: String,
        outcome: Outcome,
    },
    /// Una liberación de cleanup falló (entrada no-quiet).
    CleanupFailureRecorded {
        feature_index: usize,
        owner: String,
        error: ExtensionError,
    },
    /// Cierre de la corrida con los outcomes en orden de declaración.
    SpecCompleted { outcomes: Vec<Outcome> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub seq: u64, // asignado por el EventStore (orden de append)
    pub run_id: Uuid,
    pub kind: RunEventKind,
    pub ts: DateTime<Utc>, // metadato, no participa de ningún contrato
}
