use indexmap::IndexMap;

/// Contexto de ejecución entregado a los predicados de condición.
///
/// Es una vista de solo lectura del estado ambiente del proceso en el
/// instante de la evaluación. El framework nunca lo muta: los predicados
/// reciben una copia congelada, no un canal hacia el estado vivo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Pares clave/valor tipo system-property (registro global del proceso).
    pub properties: IndexMap<String, String>,
    /// Variables de entorno visibles al proceso.
    pub env: IndexMap<String, String>,
    /// Descriptor del sistema operativo (`std::env::consts::OS`).
    pub os: &'static str,
    /// Descriptor de la arquitectura (`std::env::consts::ARCH`).
    pub arch: &'static str,
}

impl ExecutionContext {
    /// Construye el contexto a partir de vistas ya capturadas.
    pub fn new(properties: IndexMap<String, String>, env: IndexMap<String, String>) -> Self {
        Self { properties,
               env,
               os: std::env::consts::OS,
               arch: std::env::consts::ARCH }
    }

    /// Lookup de una property, `None` si no existe.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|s| s.as_str())
    }

    /// Lookup de una variable de entorno, `None` si no existe.
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(|s| s.as_str())
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(IndexMap::new(), IndexMap::new())
    }
}
