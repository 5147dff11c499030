//! Resolución de modificadores declarados en cadenas de interceptores.
//!
//! El registry es la raíz de composición: toma los `Modifier`s de class y
//! method scope y arma la cadena ordenada para un par spec/feature. Reglas:
//!
//! - `Ignore`/`IgnoreRest` son gates duros y van primero: una feature que
//!   nunca va a correr no evalúa ninguna condición (la pereza de la cadena
//!   lo garantiza: el gate no llama `proceed`).
//! - `Requires(p)` se reescribe internamente como su dual `IgnoreIf(!p)`;
//!   ambos alimentan el mismo interceptor condicional.
//! - `Timeout` de method scope reemplaza estrictamente al de class scope,
//!   nunca se fusionan. Dentro de un mismo scope gana el último declarado.
//! - Todos los demás kinds son aditivos: entradas de cleanup y snapshots
//!   de ambos scopes contribuyen, class scope primero.

use std::sync::Arc;
use std::time::Duration;

use spec_domain::{FeatureNode, Modifier, SpecNode, StateScope};

use crate::cleanup::{CleanupChain, CleanupEntry};
use crate::errors::ExtensionError;
use crate::interceptor::{ConditionInterceptor, IgnoreInterceptor, Interceptor, InterceptorChain, SkipCondition,
                         SnapshotInterceptor, SnapshotPlacement, StepwiseInterceptor, TimeoutInterceptor, TimeoutScope};

pub struct ExtensionRegistry;

impl ExtensionRegistry {
    /// Construye la cadena para una feature. Se construye una vez por
    /// ejecución y se descarta después.
    pub fn build(spec: &Arc<SpecNode>, feature_index: usize) -> Result<InterceptorChain, ExtensionError> {
        let feature = spec.features
                          .get(feature_index)
                          .ok_or_else(|| ExtensionError::Configuration(format!("feature index {} out of range",
                                                                               feature_index)))?;

        let mut interceptors: Vec<Box<dyn Interceptor>> = Vec::new();

        if let Some(gate) = Self::hard_gate(spec, feature) {
            interceptors.push(Box::new(gate));
        }

        if spec.is_stepwise() {
            interceptors.push(Box::new(StepwiseInterceptor::new(Arc::clone(spec))));
        }

        let gates = Self::skip_conditions(spec, feature);
        if !gates.is_empty() {
            interceptors.push(Box::new(ConditionInterceptor::new(gates)));
        }

        for scope in Self::snapshot_scopes(&spec.modifiers).into_iter()
                                                          .chain(Self::snapshot_scopes(&feature.modifiers)) {
            interceptors.push(Box::new(SnapshotInterceptor::new(scope, SnapshotPlacement::FeatureScoped)));
        }

        if let Some(limit) = Self::effective_timeout(spec, feature)? {
            interceptors.push(Box::new(TimeoutInterceptor::new(limit, TimeoutScope::FeatureBody)));
        }

        let cleanup = CleanupChain::new();
        Self::register_auto_cleanups(spec, &spec.modifiers, &cleanup);
        Self::register_auto_cleanups(spec, &feature.modifiers, &cleanup);

        Ok(InterceptorChain::new(interceptors, cleanup))
    }

    /// Construye la cadena para las fases fixture del spec (`setup_spec` /
    /// `cleanup_spec`). `fixture_timeout` acota cada fixture directamente,
    /// cuando el caller lo pide.
    pub fn build_spec_chain(spec: &Arc<SpecNode>,
                            fixture_timeout: Option<Duration>)
                            -> Result<InterceptorChain, ExtensionError> {
        let mut interceptors: Vec<Box<dyn Interceptor>> = Vec::new();

        if let Some(reason) = Self::class_ignore(spec) {
            interceptors.push(Box::new(IgnoreInterceptor::new(reason)));
        }

        for scope in Self::snapshot_scopes(&spec.modifiers) {
            interceptors.push(Box::new(SnapshotInterceptor::new(scope, SnapshotPlacement::SpecScoped)));
        }

        if let Some(limit) = fixture_timeout {
            Self::check_timeout(limit)?;
            interceptors.push(Box::new(TimeoutInterceptor::new(limit, TimeoutScope::SpecFixture)));
        }

        Ok(InterceptorChain::new(interceptors, CleanupChain::new()))
    }

    fn class_ignore(spec: &SpecNode) -> Option<Option<String>> {
        spec.modifiers.iter().find_map(|m| match m {
                                 Modifier::Ignore { reason } => Some(reason.clone()),
                                 _ => None,
                             })
    }

    /// Resuelve el gate duro de la feature, si hay alguno: Ignore de class
    /// scope, Ignore propio, o el efecto de un `IgnoreRest` en una hermana.
    fn hard_gate(spec: &SpecNode, feature: &FeatureNode) -> Option<IgnoreInterceptor> {
        if let Some(reason) = Self::class_ignore(spec) {
            return Some(IgnoreInterceptor::new(reason));
        }
        if let Some(reason) = feature.modifiers.iter().find_map(|m| match m {
                                                          Modifier::Ignore { reason } => Some(reason.clone()),
                                                          _ => None,
                                                      }) {
            return Some(IgnoreInterceptor::new(reason));
        }
        if spec.any_ignore_rest() && !feature.has_ignore_rest() {
            return Some(IgnoreInterceptor::new(Some("ignore-rest: a sibling feature claimed the run".to_string())));
        }
        None
    }

    /// Junta los predicados de ambos scopes en orden de declaración, class
    /// scope primero, reescribiendo `Requires` como su dual.
    fn skip_conditions(spec: &SpecNode, feature: &FeatureNode) -> Vec<SkipCondition> {
        spec.modifiers
            .iter()
            .chain(feature.modifiers.iter())
            .filter_map(|m| match m {
                Modifier::IgnoreIf(c) => Some(SkipCondition { condition: c.clone(), skip_when: true }),
                Modifier::Requires(c) => Some(SkipCondition { condition: c.clone(), skip_when: false }),
                _ => None,
            })
            .collect()
    }

    fn snapshot_scopes(modifiers: &[Modifier]) -> Vec<StateScope> {
        modifiers.iter()
                 .filter_map(|m| match m {
                     Modifier::ConfineState(s) | Modifier::RestoreState(s) => Some(*s),
                     _ => None,
                 })
                 .collect()
    }

    fn declared_timeout(modifiers: &[Modifier]) -> Option<Duration> {
        modifiers.iter().rev().find_map(|m| match m {
                                   Modifier::Timeout(d) => Some(*d),
                                   _ => None,
                               })
    }

    fn check_timeout(limit: Duration) -> Result<(), ExtensionError> {
        if limit.is_zero() {
            Err(ExtensionError::Configuration("timeout duration must be positive".to_string()))
        } else {
            Ok(())
        }
    }

    /// Method scope reemplaza estrictamente a class scope.
    fn effective_timeout(spec: &SpecNode, feature: &FeatureNode) -> Result<Option<Duration>, ExtensionError> {
        let limit = Self::declared_timeout(&feature.modifiers).or_else(|| Self::declared_timeout(&spec.modifiers));
        if let Some(limit) = limit {
            Self::check_timeout(limit)?;
        }
        Ok(limit)
    }

    /// Materializa cada `AutoCleanup` como entrada de la cadena. La
    /// resolución `owner.method` es perezosa: recién al liberar se chequea
    /// que el target exista y exponga el método, y su ausencia surge como
    /// `Configuration` dentro del registro de fallas de cleanup.
    fn register_auto_cleanups(spec: &Arc<SpecNode>, modifiers: &[Modifier], cleanup: &CleanupChain) {
        for modifier in modifiers {
            if let Modifier::AutoCleanup { owner, method, quiet } = modifier {
                let spec = Arc::clone(spec);
                let owner_name = owner.clone();
                let method_name = method.clone();
                cleanup.register(CleanupEntry::new(owner.clone(), *quiet, move || {
                                     let target = spec.cleanup_target(&owner_name).ok_or_else(|| {
                                                      ExtensionError::Configuration(format!(
                                         "AutoCleanup target `{owner_name}` is not attached to spec `{}`",
                                         spec.name
                                     ))
                                                  })?;
                                     let release = target.method(&method_name).ok_or_else(|| {
                                                       ExtensionError::Configuration(format!(
                                         "target `{owner_name}` has no `{method_name}` method"
                                     ))
                                                   })?;
                                     release().map_err(ExtensionError::PhaseFailure)
                                 }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spec_domain::{Condition, FeatureNode, Modifier};

    fn spec_with(class: Vec<Modifier>, method: Vec<Modifier>) -> Arc<SpecNode> {
        let mut feature = FeatureNode::new("f1");
        feature.modifiers = method;
        let mut spec = SpecNode::new("demo").with_feature(feature);
        spec.modifiers = class;
        Arc::new(spec)
    }

    #[test]
    fn gating_interceptors_wrap_everything_else() {
        let spec = spec_with(vec![Modifier::Stepwise,
                                  Modifier::ConfineState(StateScope::Props),
                                  Modifier::timeout_secs(1)],
                             vec![Modifier::IgnoreIf(Condition::constant(false))]);
        let chain = ExtensionRegistry::build(&spec, 0).unwrap();
        assert_eq!(chain.interceptor_names(), vec!["stepwise", "condition", "snapshot", "timeout"]);
    }

    #[test]
    fn hard_gate_goes_before_predicates() {
        let spec = spec_with(vec![], vec![Modifier::ignore_with_reason("flaky"),
                                          Modifier::IgnoreIf(Condition::constant(true))]);
        let chain = ExtensionRegistry::build(&spec, 0).unwrap();
        assert_eq!(chain.interceptor_names()[0], "ignore");
    }

    #[test]
    fn method_timeout_replaces_class_timeout() {
        let spec = spec_with(vec![Modifier::timeout_secs(30)], vec![Modifier::timeout_secs(1)]);
        let feature = &spec.features[0];
        let limit = ExtensionRegistry::effective_timeout(&spec, feature).unwrap();
        assert_eq!(limit, Some(Duration::from_secs(1)));
    }

    #[test]
    fn class_timeout_applies_when_method_has_none() {
        let spec = spec_with(vec![Modifier::timeout_secs(30)], vec![]);
        let feature = &spec.features[0];
        let limit = ExtensionRegistry::effective_timeout(&spec, feature).unwrap();
        assert_eq!(limit, Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_timeout_is_a_configuration_error() {
        let spec = spec_with(vec![], vec![Modifier::Timeout(Duration::ZERO)]);
        assert!(matches!(ExtensionRegistry::build(&spec, 0),
                         Err(ExtensionError::Configuration(_))));
    }

    #[test]
    fn out_of_range_feature_index_is_rejected() {
        let spec = spec_with(vec![], vec![]);
        assert!(matches!(ExtensionRegistry::build(&spec, 5),
                         Err(ExtensionError::Configuration(_))));
    }

    #[test]
    fn auto_cleanup_entries_are_additive_across_scopes() {
        let spec = spec_with(vec![Modifier::auto_cleanup("class_db")],
                             vec![Modifier::auto_cleanup("method_file")]);
        let chain = ExtensionRegistry::build(&spec, 0).unwrap();
        // Dos entradas registradas aunque ningún target exista todavía:
        // la resolución es perezosa
        let failures = chain.release_cleanups();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|f| f.is_configuration()));
    }
}
