//! Cadena de liberaciones de recursos, tolerante a fallas.
//!
//! Las entradas se registran en orden de declaración (campos de la clase
//! base primero cuando hay jerarquía) durante setup/body, y se liberan en
//! el orden exacto inverso durante cleanup: los campos de la clase más
//! derivada liberan antes que los de su base. Una liberación que
//! falla se captura por entrada y se acumula; nunca aborta las restantes.
//! Es el único comportamiento "continúa ante error" del core.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::errors::{CleanupFailure, ExtensionError};

type ReleaseAction = Box<dyn FnOnce() -> Result<(), ExtensionError> + Send>;

/// (ownerObject, releaseAction, quiet): una liberación pendiente.
pub struct CleanupEntry {
    pub owner: String,
    pub quiet: bool,
    release: ReleaseAction,
}

impl CleanupEntry {
    pub fn new<F>(owner: impl Into<String>, quiet: bool, release: F) -> Self
        where F: FnOnce() -> Result<(), ExtensionError> + Send + 'static
    {
        Self { owner: owner.into(),
               quiet,
               release: Box::new(release) }
    }
}

impl fmt::Debug for CleanupEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupEntry")
         .field("owner", &self.owner)
         .field("quiet", &self.quiet)
         .finish()
    }
}

/// Handle clonable y `Send` para registrar entradas desde dentro de una
/// fase en ejecución (incluida una fase corriendo bajo deadline en otro
/// hilo).
#[derive(Clone)]
pub struct CleanupRegistrar {
    entries: Arc<Mutex<Vec<CleanupEntry>>>,
}

impl CleanupRegistrar {
    pub fn register(&self, entry: CleanupEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.push(entry);
    }
}

/// Lista ordenada de liberaciones con ejecución inversa y tolerante a
/// fallas.
pub struct CleanupChain {
    entries: Arc<Mutex<Vec<CleanupEntry>>>,
}

impl Default for CleanupChain {
    fn default() -> Self {
        Self::new()
    }
}

impl CleanupChain {
    pub fn new() -> Self {
        Self { entries: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Registra una entrada. El orden de registro es la única clave de
    /// ordenamiento de la liberación.
    pub fn register(&self, entry: CleanupEntry) {
        self.registrar().register(entry);
    }

    pub fn registrar(&self) -> CleanupRegistrar {
        CleanupRegistrar { entries: Arc::clone(&self.entries) }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Libera todas las entradas en orden inverso al registro.
    ///
    /// Cada liberación corre aislada: un `Err` (o un panic, que se
    /// contiene) se convierte en un `CleanupFailure` y la cadena sigue con
    /// la siguiente entrada. Las entradas `quiet` descartan su registro de
    /// falla; tampoco se re-lanza.
    pub fn release_all(&self) -> Vec<CleanupFailure> {
        let entries: Vec<CleanupEntry> = {
            let mut guard = self.entries.lock().unwrap_or_else(|p| p.into_inner());
            guard.drain(..).collect()
        };

        let mut failures = Vec::new();
        for entry in entries.into_iter().rev() {
            let CleanupEntry { owner, quiet, release } = entry;
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(release));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(_) => ExtensionError::PhaseFailure(format!("release for `{owner}` panicked")),
            };
            if !quiet {
                failures.push(CleanupFailure { owner, error });
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recording_entry(owner: &str, order: &Arc<Mutex<Vec<String>>>, result: Result<(), ExtensionError>) -> CleanupEntry {
        let order = Arc::clone(order);
        let name = owner.to_string();
        CleanupEntry::new(owner, false, move || {
            order.lock().unwrap().push(name);
            result
        })
    }

    #[test]
    fn releases_in_exact_reverse_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = CleanupChain::new();
        for owner in ["a", "b", "c"] {
            chain.register(recording_entry(owner, &order, Ok(())));
        }

        let failures = chain.release_all();
        assert!(failures.is_empty());
        assert_eq!(*order.lock().unwrap(), vec!["c", "b", "a"]);
    }

    #[test]
    fn derived_class_fields_release_before_base_class_fields() {
        // Registro en orden de declaración: la base primero, la derivada
        // después; la liberación inversa suelta la derivada antes
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = CleanupChain::new();
        chain.register(recording_entry("base_session", &order, Ok(())));
        chain.register(recording_entry("derived_socket", &order, Ok(())));

        chain.release_all();
        assert_eq!(*order.lock().unwrap(), vec!["derived_socket", "base_session"]);
    }

    #[test]
    fn failure_of_one_entry_never_stops_the_rest() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = CleanupChain::new();
        // A declarado primero, B segundo: B libera primero y falla
        chain.register(recording_entry("a", &order, Ok(())));
        chain.register(recording_entry("b", &order, Err(ExtensionError::PhaseFailure("broken pipe".to_string()))));

        let failures = chain.release_all();
        assert_eq!(*order.lock().unwrap(), vec!["b", "a"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].owner, "b");
    }

    #[test]
    fn quiet_entries_discard_their_failure_record() {
        let chain = CleanupChain::new();
        chain.register(CleanupEntry::new("loud", false, || {
                           Err(ExtensionError::PhaseFailure("loud failure".to_string()))
                       }));
        chain.register(CleanupEntry::new("muted", true, || {
                           Err(ExtensionError::PhaseFailure("silent failure".to_string()))
                       }));

        let failures = chain.release_all();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].owner, "loud");
    }

    #[test]
    fn panicking_release_is_contained() {
        let ran_after = Arc::new(AtomicUsize::new(0));
        let chain = CleanupChain::new();
        let counter = Arc::clone(&ran_after);
        chain.register(CleanupEntry::new("first", false, move || {
                           counter.fetch_add(1, Ordering::SeqCst);
                           Ok(())
                       }));
        chain.register(CleanupEntry::new("second", false, || panic!("release blew up")));

        let failures = chain.release_all();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].owner, "second");
        assert_eq!(ran_after.load(Ordering::SeqCst), 1, "earlier-registered entry must still release");
    }

    #[test]
    fn registrar_handle_registers_from_elsewhere() {
        let chain = CleanupChain::new();
        let registrar = chain.registrar();
        std::thread::spawn(move || {
            registrar.register(CleanupEntry::new("remote", false, || Ok(())));
        }).join().unwrap();
        assert_eq!(chain.len(), 1);
    }
}
