use std::sync::Arc;
use std::thread;
use std::time::Duration;

use spec_core::{EventStore, ExtensionError, FeatureActions, SpecActions, SpecRunner};
use spec_domain::{CleanupTarget, Condition, FeatureNode, Modifier, SpecNode, TimeUnit};

/// Demo mínima: arma un spec con varios modificadores, lo corre a través
/// de la capa de intercepción y muestra el reporte como JSON.
/// `main-core demo [--events]`
fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut show_events = false;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "demo" => {}
            "--events" => show_events = true,
            other => {
                eprintln!("[specflow] unknown argument: {other}");
                std::process::exit(2);
            }
        }
        i += 1;
    }

    let spec = Arc::new(
        SpecNode::new("DemoSpec")
            .with_modifier(Modifier::Stepwise)
            .with_modifier(Modifier::timeout(2, TimeUnit::Seconds))
            .with_cleanup_target(CleanupTarget::new("session").with_method("close", || Ok(())))
            .with_modifier(Modifier::auto_cleanup("session"))
            .with_feature(FeatureNode::new("passes quickly"))
            .with_feature(FeatureNode::new("skipped on this platform")
                .with_modifier(Modifier::Requires(Condition::new("running on the moon", |ctx| {
                    Ok(ctx.os == "moon")
                }))))
            .with_feature(FeatureNode::new("times out")
                .with_modifier(Modifier::timeout(1, TimeUnit::Millis)))
            .with_feature(FeatureNode::new("never reached")),
    );

    let actions = SpecActions::new()
        .with_feature(FeatureActions::new().with_body(|| Ok(())))
        .with_feature(FeatureActions::new().with_body(|| Ok(())))
        .with_feature(FeatureActions::new().with_body(|| {
            thread::sleep(Duration::from_millis(200));
            Ok(())
        }))
        .with_feature(FeatureActions::new().with_body(|| Ok(())));

    let mut runner = SpecRunner::new();
    let report = match runner.run(spec, actions) {
        Ok(r) => r,
        Err(e @ ExtensionError::Configuration(_)) => {
            eprintln!("[specflow] bad run configuration: {e}");
            std::process::exit(3);
        }
        Err(e) => {
            eprintln!("[specflow] run failed: {e}");
            std::process::exit(4);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("[specflow] cannot render report: {e}");
            std::process::exit(5);
        }
    }

    if show_events {
        for ev in runner.event_store().list(report.run_id) {
            println!("{:>3}  {:?}", ev.seq, ev.kind);
        }
    }
}
