use std::sync::{Arc, Mutex};

use spec_core::{FeatureActions, SpecActions, SpecRunner};
use spec_domain::{CleanupTarget, FeatureNode, Modifier, Outcome, SpecNode};

fn recording_target(name: &str, order: &Arc<Mutex<Vec<String>>>, fails: bool) -> CleanupTarget {
    let order = Arc::clone(order);
    let tag = name.to_string();
    CleanupTarget::new(name).with_method("close", move || {
                                order.lock().unwrap().push(tag.clone());
                                if fails {
                                    Err(format!("{tag}: close failed"))
                                } else {
                                    Ok(())
                                }
                            })
}

#[test]
fn releases_run_in_reverse_declaration_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    // A declarado primero, B segundo: B cierra primero y su falla no toca
    // el éxito de A (escenario concreto de referencia)
    let spec = Arc::new(SpecNode::new("two fields")
        .with_cleanup_target(recording_target("a", &order, false))
        .with_cleanup_target(recording_target("b", &order, true))
        .with_modifier(Modifier::auto_cleanup("a"))
        .with_modifier(Modifier::auto_cleanup("b"))
        .with_feature(FeatureNode::new("f1")));
    let actions = SpecActions::new().with_feature(FeatureActions::new().with_body(|| Ok(())));

    let report = SpecRunner::new().run(spec, actions).unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["b", "a"]);
    let failures = &report.features[0].cleanup_failures;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].owner, "b");
    // Solo el cleanup falló: pasa a ser la falla reportada de la feature
    assert_eq!(report.outcomes(), vec![Outcome::Failed]);
}

#[test]
fn releases_still_run_when_the_body_failed() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let spec = Arc::new(SpecNode::new("failing body")
        .with_cleanup_target(recording_target("db", &order, false))
        .with_modifier(Modifier::auto_cleanup("db"))
        .with_feature(FeatureNode::new("f1")));
    let actions = SpecActions::new().with_feature(FeatureActions::new().with_body(|| {
        Err(spec_core::ExtensionError::PhaseFailure("assertion".to_string()))
    }));

    let report = SpecRunner::new().run(spec, actions).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["db"], "release must run after a failed body");
    // La falla primaria no queda enmascarada por el cleanup
    assert_eq!(report.outcomes(), vec![Outcome::Failed]);
    assert!(report.features[0].cleanup_failures.is_empty());
}

#[test]
fn quiet_entries_release_but_stay_out_of_the_report() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let spec = Arc::new(SpecNode::new("quiet")
        .with_cleanup_target(recording_target("noisy", &order, true))
        .with_cleanup_target(recording_target("muted", &order, true))
        .with_modifier(Modifier::auto_cleanup("noisy"))
        .with_modifier(Modifier::auto_cleanup_with("muted", "close", true))
        .with_feature(FeatureNode::new("f1")));
    let actions = SpecActions::new().with_feature(FeatureActions::new().with_body(|| Ok(())));

    let report = SpecRunner::new().run(spec, actions).unwrap();

    // Ambas liberaron (orden inverso), pero solo la no-quiet se reporta
    assert_eq!(*order.lock().unwrap(), vec!["muted", "noisy"]);
    let failures = &report.features[0].cleanup_failures;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].owner, "noisy");
}

#[test]
fn missing_release_method_surfaces_lazily_as_configuration_error() {
    // El target existe pero no expone `shutdown`: se detecta recién al
    // liberar, no al construir la cadena
    let spec = Arc::new(SpecNode::new("misconfigured")
        .with_cleanup_target(CleanupTarget::new("db").with_method("close", || Ok(())))
        .with_modifier(Modifier::auto_cleanup_with("db", "shutdown", false))
        .with_feature(FeatureNode::new("f1")));
    let actions = SpecActions::new().with_feature(FeatureActions::new().with_body(|| Ok(())));

    let report = SpecRunner::new().run(spec, actions).unwrap();

    let failures = &report.features[0].cleanup_failures;
    assert_eq!(failures.len(), 1);
    assert!(failures[0].is_configuration());
    assert_eq!(report.outcomes(), vec![Outcome::Error]);
}

#[test]
fn entries_registered_during_a_phase_release_after_the_declared_ones() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let spec = Arc::new(SpecNode::new("dynamic")
        .with_cleanup_target(recording_target("declared", &order, false))
        .with_modifier(Modifier::auto_cleanup("declared"))
        .with_feature(FeatureNode::new("f1")));

    // La entrada dinámica se registra durante el body vía el registrar
    let dynamic_order = Arc::clone(&order);
    let spec_for_registry = Arc::clone(&spec);
    let chain = spec_core::ExtensionRegistry::build(&spec_for_registry, 0).unwrap();
    let registrar = chain.cleanup_registrar();
    let result = chain.run_phase(spec_core::PhaseKind::Feature, Box::new(move || {
                                     registrar.register(spec_core::CleanupEntry::new("dynamic", false, move || {
                                                            dynamic_order.lock().unwrap().push("dynamic".to_string());
                                                            Ok(())
                                                        }));
                                     Ok(())
                                 }));
    assert!(result.is_completed());

    let failures = chain.release_cleanups();
    assert!(failures.is_empty());
    // Registrada última, libera primera
    assert_eq!(*order.lock().unwrap(), vec!["dynamic", "declared"]);
}
