//! Guard de deadline sobre una fase.
//!
//! Único componente del core que introduce concurrencia real: la acción
//! envuelta corre en un hilo worker propio mientras el hilo llamador
//! bloquea en el canal hasta completarse o vencer el deadline, lo que
//! ocurra primero. La cancelación es best-effort: un hilo std no puede
//! interrumpirse a la fuerza, así que ante overrun el worker se desacopla
//! y el guard retorna enseguida marcando la falla. Los efectos tardíos de
//! una acción desacoplada que sigue corriendo son, explícitamente,
//! contrato del caller (comportamiento indefinido para el framework).

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::errors::ExtensionError;
use crate::interceptor::{PhaseAction, PhaseResult};

/// Milisegundos del deadline para el diagnóstico, saturando en `u64::MAX`
/// en vez de truncar silenciosamente un `Duration` patológico.
fn saturating_millis(limit: Duration) -> u64 {
    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)
}

pub struct TimeoutGuard;

impl TimeoutGuard {
    /// Ejecuta `action` con deadline `limit`.
    ///
    /// Ante overrun el diagnóstico se sintetiza acá, en la ejecución
    /// llamadora: el stack del worker interrumpido puede no significar
    /// nada (o directamente no existir), así que no se usa.
    pub fn run(limit: Duration, action: PhaseAction) -> PhaseResult {
        let (tx, rx) = mpsc::channel::<Result<(), ExtensionError>>();

        let spawned = thread::Builder::new().name("specflow-timeout-worker".to_string())
                                            .spawn(move || {
                                                let _ = tx.send(action());
                                            });
        let handle = match spawned {
            Ok(h) => h,
            Err(e) => return PhaseResult::Failed(ExtensionError::Internal(format!("cannot spawn timeout worker: {e}"))),
        };

        match rx.recv_timeout(limit) {
            Ok(Ok(())) => {
                let _ = handle.join();
                PhaseResult::Completed
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                PhaseResult::Failed(e)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // Worker desacoplado: no se espera su join. Sus efectos
                // posteriores al deadline quedan fuera de contrato.
                PhaseResult::Failed(ExtensionError::TimeoutExceeded { limit_ms: saturating_millis(limit) })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                // El sender murió sin enviar: la acción entró en panic.
                let _ = handle.join();
                PhaseResult::Failed(ExtensionError::PhaseFailure("phase panicked under timeout guard".to_string()))
            }
        }
    }
}
