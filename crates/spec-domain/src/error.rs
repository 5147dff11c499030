use thiserror::Error;

/// Errores de validación del modelo declarativo.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    ScopeError(String),
}
