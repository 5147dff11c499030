use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use spec_core::{FeatureActions, SpecActions, SpecRunner};
use spec_domain::{FeatureNode, Modifier, Outcome, SpecNode, TimeUnit};

fn sleeping_body(sleep: Duration) -> FeatureActions {
    FeatureActions::new().with_body(move || {
        thread::sleep(sleep);
        Ok(())
    })
}

#[test]
fn one_second_timeout_over_five_second_body_fails_promptly() {
    // Escenario concreto de referencia: Timeout(1, SECONDS) sobre un body
    // que duerme 5 segundos -> FAILED con marca de timeout, retornando con
    // margen acotado sobre el segundo, no a los 5
    let spec = Arc::new(SpecNode::new("slow spec")
        .with_feature(FeatureNode::new("slow").with_modifier(Modifier::timeout(1, TimeUnit::Seconds))));
    let actions = SpecActions::new().with_feature(sleeping_body(Duration::from_secs(5)));

    let started = Instant::now();
    let report = SpecRunner::new().run(spec, actions).unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.outcomes(), vec![Outcome::Failed]);
    assert!(report.features[0].timed_out, "report must carry the TimeoutExceeded marker");
    assert!(elapsed < Duration::from_secs(3), "returned after {elapsed:?}, expected a bounded margin over 1s");
}

#[test]
fn method_level_timeout_replaces_class_level() {
    // Class scope dice 50ms, method scope dice 2s: el body de 300ms pasa
    let spec = Arc::new(SpecNode::new("overridden")
        .with_modifier(Modifier::timeout(50, TimeUnit::Millis))
        .with_feature(FeatureNode::new("patient")
            .with_modifier(Modifier::timeout(2, TimeUnit::Seconds))));
    let actions = SpecActions::new().with_feature(sleeping_body(Duration::from_millis(300)));

    let report = SpecRunner::new().run(spec, actions).unwrap();
    assert_eq!(report.outcomes(), vec![Outcome::Passed]);
}

#[test]
fn removing_the_method_level_makes_class_level_apply() {
    // El mismo spec sin el modifier de method scope: ahora rigen los 50ms
    let spec = Arc::new(SpecNode::new("inherited")
        .with_modifier(Modifier::timeout(50, TimeUnit::Millis))
        .with_feature(FeatureNode::new("patient")));
    let actions = SpecActions::new().with_feature(sleeping_body(Duration::from_millis(300)));

    let report = SpecRunner::new().run(spec, actions).unwrap();
    assert_eq!(report.outcomes(), vec![Outcome::Failed]);
    assert!(report.features[0].timed_out);
}

#[test]
fn timer_covers_the_body_only_not_fixtures() {
    // Setup y cleanup duermen más que el límite: el reloj no los mide
    let spec = Arc::new(SpecNode::new("fixture heavy")
        .with_feature(FeatureNode::new("quick body")
            .with_modifier(Modifier::timeout(100, TimeUnit::Millis))));
    let actions = SpecActions::new().with_feature(
        FeatureActions::new()
            .with_setup(|| {
                thread::sleep(Duration::from_millis(250));
                Ok(())
            })
            .with_body(|| Ok(()))
            .with_cleanup(|| {
                thread::sleep(Duration::from_millis(250));
                Ok(())
            }));

    let report = SpecRunner::new().run(spec, actions).unwrap();
    assert_eq!(report.outcomes(), vec![Outcome::Passed]);
}

#[test]
fn fixture_timeout_bounds_setup_spec() {
    let spec = Arc::new(SpecNode::new("slow fixture").with_feature(FeatureNode::new("f1")));
    let actions = SpecActions::new()
        .with_fixture_timeout(Duration::from_millis(100))
        .with_setup_spec(|| {
            thread::sleep(Duration::from_secs(2));
            Ok(())
        })
        .with_feature(FeatureActions::new().with_body(|| Ok(())));

    let started = Instant::now();
    let report = SpecRunner::new().run(spec, actions).unwrap();

    assert!(report.spec_failure.is_some(), "setup_spec overrun must surface as spec failure");
    assert_eq!(report.outcomes(), vec![Outcome::Skipped]);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn passing_features_are_unaffected_by_their_timeout() {
    let spec = Arc::new(SpecNode::new("fast")
        .with_feature(FeatureNode::new("quick").with_modifier(Modifier::timeout_secs(5))));
    let actions = SpecActions::new().with_feature(FeatureActions::new().with_body(|| Ok(())));

    let report = SpecRunner::new().run(spec, actions).unwrap();
    assert_eq!(report.outcomes(), vec![Outcome::Passed]);
    assert!(!report.features[0].timed_out);
}
