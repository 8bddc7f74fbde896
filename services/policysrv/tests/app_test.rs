//! Service startup and run loop tests

#![allow(clippy::disallowed_methods)] // Integration test - unwrap is acceptable

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use policysrv::{app, Args};
use signal_policy::{Dispatcher, MemoryTransport, Value};
use tempfile::NamedTempFile;

const RULES: &str = r#"
- condition: wipers.front.on == true and speed > 0
  emit:
    signal: lights.external.headlights
    value: true
"#;

fn document(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn args(rules: &NamedTempFile, state: Option<&NamedTempFile>) -> Args {
    let mut argv = vec![
        "policysrv".to_string(),
        rules.path().display().to_string(),
    ];
    if let Some(state) = state {
        argv.push("--state".to_string());
        argv.push(state.path().display().to_string());
    }
    Args::parse_from(argv)
}

#[test]
fn test_prepare_loads_rules_and_state() {
    let rules = document(RULES);
    let state = document("- \"speed = 30\"\n");

    let (rules, state) = app::prepare(&args(&rules, Some(&state))).unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(state.get("speed"), Some(&Value::Int(30)));
}

#[test]
fn test_prepare_reports_bad_documents() {
    let rules = document("- condition: a ==\n  emit: { signal: s, value: 1 }\n");
    let err = app::prepare(&args(&rules, None)).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Failed to load rules"));
    assert!(message.contains("Rule #0 syntax error"));

    let good_rules = document(RULES);
    let mut missing = args(&good_rules, None);
    missing.state = Some(PathBuf::from("/nonexistent/state.yaml"));
    assert!(app::prepare(&missing).is_err());
}

#[test]
fn test_summary_lists_watched_signals() {
    let rules = document(RULES);
    let (rules, _) = app::prepare(&args(&rules, None)).unwrap();

    let summary = app::summary(&rules);
    assert!(summary.starts_with("1 rules OK, watching 2 signals"));
    assert!(summary.contains("  speed -> #0"));
    assert!(summary.contains("  wipers.front.on -> #0"));
}

#[tokio::test]
async fn test_serve_until_quit() {
    let rules = document(RULES);
    let state = document("- \"speed = 30\"\n");
    let (rules, state) = app::prepare(&args(&rules, Some(&state))).unwrap();

    let transport = Arc::new(MemoryTransport::new());
    transport.push_lines(["wipers.front.on=true", "quit"]);
    let mut dispatcher = Dispatcher::new(rules, state, transport.clone());

    app::serve(&mut dispatcher).await.unwrap();

    assert_eq!(
        transport.sent_lines(),
        vec!["lights.external.headlights=true".to_string(), String::new()]
    );
}

#[tokio::test]
async fn test_unknown_transport_fails_startup() {
    let rules = document(RULES);
    let mut config = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    config.write_all(b"log:\n  level: warn\n").unwrap();

    let args = Args::parse_from([
        "policysrv".to_string(),
        rules.path().display().to_string(),
        "--config".to_string(),
        config.path().display().to_string(),
        "--transport".to_string(),
        "can0".to_string(),
    ]);

    let err = app::run(args).await.unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Cannot start transport 'can0'"));
    assert!(message.contains("Unknown transport"));
}

#[test]
fn test_example_rules_compile() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/rules.example.yaml");
    let rules = signal_policy::load_rules(path).unwrap();
    assert_eq!(rules.len(), 3);
    assert!(rules.index().contains("charger.connected"));
}
