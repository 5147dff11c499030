//! Composición ordenada de interceptores (chain of responsibility).

use crate::cleanup::{CleanupChain, CleanupRegistrar};
use crate::errors::{CleanupFailure, ExtensionError};

use super::{PhaseAction, PhaseKind, PhaseResult};

/// Un wrapper alrededor de una fase del ciclo de vida.
///
/// Implementaciones reciben la `Invocation` por valor: llamar
/// `inv.proceed()` delega en el resto de la cadena; no llamarla produce un
/// resultado sintético sin que nada interno ejecute.
pub trait Interceptor {
    /// Nombre estable para diagnósticos y asserts de composición.
    fn name(&self) -> &'static str;

    fn intercept(&self, inv: Invocation<'_>) -> PhaseResult;
}

/// Invocación en tránsito: la fase, los interceptores restantes y la
/// acción cruda al fondo.
pub struct Invocation<'a> {
    phase: PhaseKind,
    rest: &'a [Box<dyn Interceptor>],
    action: PhaseAction,
}

impl<'a> Invocation<'a> {
    pub fn phase(&self) -> PhaseKind {
        self.phase
    }

    /// Delega en el siguiente interceptor, o ejecuta la acción cruda si no
    /// queda ninguno.
    pub fn proceed(self) -> PhaseResult {
        match self.rest.split_first() {
            Some((head, tail)) => head.intercept(Invocation { phase: self.phase,
                                                              rest: tail,
                                                              action: self.action }),
            None => match (self.action)() {
                Ok(()) => PhaseResult::Completed,
                Err(e) => PhaseResult::Failed(e),
            },
        }
    }

    /// Consume la invocación y entrega la acción cruda, para interceptores
    /// que la ejecutan en otro contexto (el guard de timeout). Solo es
    /// válido en la posición más interna de la cadena; el registry
    /// garantiza esa colocación.
    pub fn into_inner_action(self) -> Result<PhaseAction, ExtensionError> {
        if self.rest.is_empty() {
            Ok(self.action)
        } else {
            Err(ExtensionError::Internal(format!("timeout interceptor must be innermost, {} interceptor(s) remain",
                                                 self.rest.len())))
        }
    }
}

/// Pipeline ordenado de interceptores ligado a un par spec/feature.
/// Se construye una vez por ejecución de feature y se descarta después.
pub struct InterceptorChain {
    interceptors: Vec<Box<dyn Interceptor>>,
    cleanup: CleanupChain,
}

impl InterceptorChain {
    pub fn new(interceptors: Vec<Box<dyn Interceptor>>, cleanup: CleanupChain) -> Self {
        Self { interceptors, cleanup }
    }

    /// Ejecuta una fase a través de la cadena completa, outside-in.
    pub fn run_phase(&self, phase: PhaseKind, action: PhaseAction) -> PhaseResult {
        Invocation { phase,
                     rest: &self.interceptors,
                     action }.proceed()
    }

    /// Handle para registrar entradas de cleanup desde las acciones.
    pub fn cleanup_registrar(&self) -> CleanupRegistrar {
        self.cleanup.registrar()
    }

    /// Libera las entradas acumuladas (orden inverso, tolerante a fallas).
    /// El runner la invoca durante la fase de cleanup de la feature.
    pub fn release_cleanups(&self) -> Vec<CleanupFailure> {
        self.cleanup.release_all()
    }

    /// Nombres de los interceptores en orden outside-in.
    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }
}
