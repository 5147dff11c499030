//! Captura y restauración de estado ambiente del proceso.
//!
//! Dos alcances: las variables de entorno del proceso y un registro global
//! de properties (el análogo a las system properties del host). Ambos son
//! estado process-wide: el contrato de §concurrencia es que un solo worker
//! atraviesa el ciclo de vida de una feature a la vez. Este módulo no
//! agrega locking propio más allá del acceso al registro; features
//! concurrentes mutando y restaurando en paralelo quedan fuera de contrato.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::sync::Mutex;

use spec_domain::StateScope;

/// Registro global de properties del proceso.
static AMBIENT_PROPS: Lazy<Mutex<IndexMap<String, String>>> = Lazy::new(|| Mutex::new(IndexMap::new()));

/// Fija una property global.
pub fn set_property(key: impl Into<String>, value: impl Into<String>) {
    let mut props = AMBIENT_PROPS.lock().unwrap_or_else(|p| p.into_inner());
    props.insert(key.into(), value.into());
}

/// Elimina una property global.
pub fn remove_property(key: &str) {
    let mut props = AMBIENT_PROPS.lock().unwrap_or_else(|p| p.into_inner());
    props.shift_remove(key);
}

/// Lee una property global.
pub fn get_property(key: &str) -> Option<String> {
    let props = AMBIENT_PROPS.lock().unwrap_or_else(|p| p.into_inner());
    props.get(key).cloned()
}

/// Copia del registro completo de properties.
pub fn properties() -> IndexMap<String, String> {
    AMBIENT_PROPS.lock().unwrap_or_else(|p| p.into_inner()).clone()
}

/// Copia de las variables de entorno visibles (solo las UTF-8 válidas; las
/// demás no son direccionables desde los predicados).
pub fn environment() -> IndexMap<String, String> {
    std::env::vars().collect()
}

/// Snapshot de estado ambiente capturado en un punto preciso del ciclo de
/// vida (ver invariantes de anidamiento en el registry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbientSnapshot {
    scope: StateScope,
    env: Option<IndexMap<String, String>>,
    props: Option<IndexMap<String, String>>,
}

impl AmbientSnapshot {
    pub fn scope(&self) -> StateScope {
        self.scope
    }
}

/// Captura el estado del alcance pedido.
pub fn capture(scope: StateScope) -> AmbientSnapshot {
    let env = matches!(scope, StateScope::Env | StateScope::All).then(environment);
    let props = matches!(scope, StateScope::Props | StateScope::All).then(properties);
    AmbientSnapshot { scope, env, props }
}

/// Restaura exactamente el estado capturado: claves cambiadas vuelven a su
/// valor, claves borradas reaparecen, claves agregadas desaparecen. Ninguna
/// fase posterior puede observar un estado parcialmente restaurado porque
/// la restauración corre completa dentro de la misma fase de la cadena.
pub fn restore(snapshot: &AmbientSnapshot) {
    if let Some(captured) = &snapshot.props {
        let mut props = AMBIENT_PROPS.lock().unwrap_or_else(|p| p.into_inner());
        *props = captured.clone();
    }
    if let Some(captured) = &snapshot.env {
        let current = environment();
        for key in current.keys() {
            if !captured.contains_key(key) {
                std::env::remove_var(key);
            }
        }
        for (key, value) in captured {
            std::env::set_var(key, value);
        }
    }
}
