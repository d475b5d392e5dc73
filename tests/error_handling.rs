// tests/error_handling.rs

use std::io::Write;

use clap::Parser;
use elmdev::cli::CliArgs;
use elmdev::config::{load_and_validate, load_or_default};
use elmdev::dag::{TaskAction, TaskGraph, TaskSpec};
use elmdev::errors::ElmdevError;
use elmdev::types::TriggerWhileRunningBehaviour;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn partial_config_keeps_defaults() {
    let file = config_file(
        r#"
[paths]
elm = "app/**/*.elm"

[watch]
triggered_while_running_behaviour = "cancel"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.paths().elm, "app/**/*.elm");
    assert_eq!(cfg.paths().dest, "dist");
    assert_eq!(cfg.paths().statics, "stc/*.{html,css}");
    assert_eq!(cfg.compiler().program, "elm");
    assert_eq!(cfg.server().bind_addr(), "localhost:3000");
    assert_eq!(cfg.serve_root(), "dist");
    assert_eq!(
        cfg.watch().triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Cancel
    );
}

#[test]
fn invalid_toml_returns_toml_error() {
    let file = config_file("[paths\ndest = ");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(ElmdevError::TomlError(_))
    ));
}

#[test]
fn invalid_glob_returns_config_error() {
    let file = config_file("[paths]\nelm = \"src/[*.elm\"\n");
    match load_and_validate(file.path()) {
        Err(ElmdevError::ConfigError(msg)) => assert!(msg.contains("[paths].elm"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn port_zero_returns_config_error() {
    let file = config_file("[server]\nport = 0\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(ElmdevError::ConfigError(_))
    ));
}

#[test]
fn missing_default_config_uses_defaults_but_explicit_path_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Elmdev.toml");

    let cfg = load_or_default(&missing, true).unwrap();
    assert_eq!(cfg.server().port, 3000);

    assert!(matches!(
        load_or_default(&missing, false),
        Err(ElmdevError::IoError(_))
    ));
}

#[test]
fn graph_cycle_returns_structured_error() {
    let result = TaskGraph::new(vec![
        TaskSpec::new("a", TaskAction::Group).after("b"),
        TaskSpec::new("b", TaskAction::Group).after("a"),
    ]);

    match result {
        Err(ElmdevError::DagCycle(msg)) => assert!(msg.contains("cycle detected"), "{msg}"),
        other => panic!("expected DagCycle, got {other:?}"),
    }
}

#[test]
fn unknown_prerequisite_returns_config_error() {
    let result = TaskGraph::new(vec![TaskSpec::new("a", TaskAction::Group).after("ghost")]);
    assert!(matches!(result, Err(ElmdevError::ConfigError(_))));
}

#[tokio::test]
async fn unknown_target_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let args = CliArgs {
        task: "deploy".to_string(),
        config: Some(dir.path().join("Elmdev.toml").display().to_string()),
        log_level: None,
        dry_run: false,
        tasks: false,
    };
    std::fs::write(dir.path().join("Elmdev.toml"), "").unwrap();

    match elmdev::run(args).await {
        Err(ElmdevError::TaskNotFound(name)) => assert_eq!(name, "deploy"),
        other => panic!("expected TaskNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn dry_run_and_task_listing_do_not_execute() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("Elmdev.toml");
    std::fs::write(&config, "[paths]\ndest = \"out\"\n").unwrap();

    for (dry_run, tasks) in [(true, false), (false, true)] {
        let args = CliArgs {
            task: "build".to_string(),
            config: Some(config.display().to_string()),
            log_level: None,
            dry_run,
            tasks,
        };
        elmdev::run(args).await.unwrap();
    }

    assert!(!dir.path().join("out").exists());
}

#[tokio::test]
async fn explicit_config_must_exist_even_under_the_default_name() {
    assert!(!std::path::Path::new("Elmdev.toml").exists());
    let args = CliArgs::try_parse_from(["elmdev", "build", "--config", "Elmdev.toml"]).unwrap();

    match elmdev::run(args).await {
        Err(ElmdevError::IoError(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected a missing-file error, got {other:?}"),
    }
}
