//! Nodos del modelo: `SpecNode` y `FeatureNode`.
//!
//! Ambos se construyen una vez antes de la corrida y son inmutables salvo
//! el flag `stepwise_failed`, que el runner escribe de forma monótona a
//! través del gate. El descubridor de anotaciones (colaborador externo) es
//! quien mapea declaraciones fuente a `Modifier`s adjuntos aquí; el core no
//! hace ningún escaneo reflexivo.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::error::DomainError;
use super::modifier::Modifier;

/// Acción de liberación asociada a un método de un target de cleanup.
///
/// `Arc<dyn Fn>` y no `FnOnce`: la misma acción puede liberarse una vez por
/// cada ejecución de feature dentro de la corrida.
pub type ReleaseFn = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

/// Target sobre el que un `Modifier::AutoCleanup` resuelve su método de
/// liberación. Equivale al campo anotado de la clase original: un nombre
/// estable más el conjunto de métodos que realmente expone.
///
/// La resolución `owner.method` es perezosa (ocurre recién al liberar), de
/// modo que un método inexistente se detecta en cleanup y no al registrar.
#[derive(Clone)]
pub struct CleanupTarget {
    name: String,
    methods: IndexMap<String, ReleaseFn>,
}

impl CleanupTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               methods: IndexMap::new() }
    }

    /// Registra un método de liberación bajo `method`.
    pub fn with_method<F>(mut self, method: impl Into<String>, release: F) -> Self
        where F: Fn() -> Result<(), String> + Send + Sync + 'static
    {
        self.methods.insert(method.into(), Arc::new(release));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Busca el método de liberación; `None` si el target no lo expone.
    pub fn method(&self, method: &str) -> Option<ReleaseFn> {
        self.methods.get(method).cloned()
    }
}

impl fmt::Debug for CleanupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupTarget")
         .field("name", &self.name)
         .field("methods", &self.methods.keys().collect::<Vec<_>>())
         .finish()
    }
}

/// Una feature dentro de un spec, con sus modificadores de method scope.
#[derive(Debug, Clone)]
pub struct FeatureNode {
    pub id: Uuid,
    pub name: String,
    pub modifiers: Vec<Modifier>,
}

impl FeatureNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(),
               name: name.into(),
               modifiers: Vec::new() }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn has_ignore_rest(&self) -> bool {
        self.modifiers.iter().any(|m| matches!(m, Modifier::IgnoreRest))
    }
}

/// Un spec: lista ordenada de features más modificadores de class scope.
///
/// `stepwise_failed` es el único estado mutable: arranca en `false`, se
/// setea a lo sumo una vez y nunca se resetea (RUNNING -> HALTED, terminal
/// para esta instancia). El gate es local al spec anotado: no se hereda
/// hacia sub ni superclases.
#[derive(Debug)]
pub struct SpecNode {
    pub id: Uuid,
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub features: Vec<FeatureNode>,
    pub cleanup_targets: Vec<CleanupTarget>,
    stepwise_failed: AtomicBool,
}

impl SpecNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(),
               name: name.into(),
               modifiers: Vec::new(),
               features: Vec::new(),
               cleanup_targets: Vec::new(),
               stepwise_failed: AtomicBool::new(false) }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_feature(mut self, feature: FeatureNode) -> Self {
        self.features.push(feature);
        self
    }

    /// Adjunta un target de cleanup. El orden de adjuntado es el orden de
    /// declaración, campos de la clase base primero cuando hay jerarquía:
    /// como la liberación es inversa, los de la clase más derivada liberan
    /// antes. Es la única clave de ordenamiento que usa la liberación.
    pub fn with_cleanup_target(mut self, target: CleanupTarget) -> Self {
        self.cleanup_targets.push(target);
        self
    }

    pub fn is_stepwise(&self) -> bool {
        self.modifiers.iter().any(|m| matches!(m, Modifier::Stepwise))
    }

    pub fn stepwise_failed(&self) -> bool {
        self.stepwise_failed.load(Ordering::Relaxed)
    }

    /// Marca el spec como HALTED. Monótono: no hay camino de vuelta.
    pub fn mark_stepwise_failed(&self) {
        self.stepwise_failed.store(true, Ordering::Relaxed);
    }

    pub fn cleanup_target(&self, name: &str) -> Option<&CleanupTarget> {
        self.cleanup_targets.iter().find(|t| t.name() == name)
    }

    /// `true` si alguna feature declara `IgnoreRest`.
    pub fn any_ignore_rest(&self) -> bool {
        self.features.iter().any(|f| f.has_ignore_rest())
    }

    /// Valida la forma declarativa antes de correr.
    ///
    /// - nombres no vacíos y únicos entre features;
    /// - `Stepwise` solo en class scope;
    /// - `IgnoreRest` solo en method scope.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationError("spec name must not be empty".to_string()));
        }
        let mut seen: Vec<&str> = Vec::with_capacity(self.features.len());
        for feature in &self.features {
            if feature.name.trim().is_empty() {
                return Err(DomainError::ValidationError("feature name must not be empty".to_string()));
            }
            if seen.contains(&feature.name.as_str()) {
                return Err(DomainError::ValidationError(format!("duplicate feature name: {}", feature.name)));
            }
            seen.push(feature.name.as_str());
            if feature.modifiers.iter().any(|m| matches!(m, Modifier::Stepwise)) {
                return Err(DomainError::ScopeError(format!("Stepwise is class-scoped, found on feature {}",
                                                           feature.name)));
            }
        }
        if self.modifiers.iter().any(|m| matches!(m, Modifier::IgnoreRest)) {
            return Err(DomainError::ScopeError("IgnoreRest is method-scoped, found on spec".to_string()));
        }
        Ok(())
    }
}
