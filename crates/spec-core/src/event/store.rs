//! Almacenamiento append-only del log de la corrida.
//!
//! El `seq` lo asigna el store en el momento del append y es contiguo
//! por corrida (0, 1, 2, ...): el renderizador externo puede replayar el
//! log de una corrida sin ordenarlo ni deduplicarlo. Corridas distintas
//! no comparten numeración ni se observan entre sí.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::{RunEvent, RunEventKind};

pub trait EventStore {
    /// Materializa `kind` como el próximo evento de la corrida `run_id`
    /// y lo devuelve ya numerado y timestampeado.
    fn append_kind(&mut self, run_id: Uuid, kind: RunEventKind) -> RunEvent;

    /// Eventos de la corrida en orden de append. Una corrida desconocida
    /// es simplemente una corrida sin eventos todavía.
    fn list(&self, run_id: Uuid) -> Vec<RunEvent>;
}

/// Store en memoria, un buffer de eventos por corrida. Suficiente para el
/// driver de referencia y los tests; un backend durable implementa el
/// mismo trait.
#[derive(Default)]
pub struct InMemoryEventStore {
    runs: HashMap<Uuid, Vec<RunEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cantidad de eventos acumulados para una corrida.
    pub fn event_count(&self, run_id: Uuid) -> usize {
        self.runs.get(&run_id).map_or(0, Vec::len)
    }
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, run_id: Uuid, kind: RunEventKind) -> RunEvent {
        let buffer = self.runs.entry(run_id).or_default();
        let event = RunEvent { seq: buffer.len() as u64,
                               run_id,
                               kind,
                               ts: Utc::now() };
        buffer.push(event.clone());
        event
    }

    fn list(&self, run_id: Uuid) -> Vec<RunEvent> {
        self.runs.get(&run_id).cloned().unwrap_or_default()
    }
}
