//! Log de eventos de la corrida (superficie hacia el reporte externo).

mod store;
mod types;

pub use store::{EventStore, InMemoryEventStore};
pub use types::{RunEvent, RunEventKind};
