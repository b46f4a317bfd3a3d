//! Configuration loading from files and environment overrides.

use std::io::Write;

use graphflow::Config;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "graphflow.toml",
        r#"
[execution]
timeout_ms = 1234
accept_partial_success = true
memory_limit_bytes = 1048576

[logging]
level = "debug"
"#,
    );

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.execution.timeout_ms, 1234);
    assert!(config.execution.accept_partial_success);
    assert_eq!(config.execution.memory_limit_bytes, 1_048_576);
    assert_eq!(config.logging.level, "debug");
    // unset fields keep their defaults
    assert!(config.execution.stable_filter_default);
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("does-not-exist.toml");
    let config = Config::from_file(&path.to_string_lossy()).unwrap();
    assert_eq!(config.execution.timeout_ms, 60_000);
}

#[test]
fn test_round_trip_through_toml() {
    let config = Config::default();
    let rendered = toml::to_string(&config).unwrap();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "rendered.toml", &rendered);
    let reloaded = Config::from_file(&path).unwrap();
    assert_eq!(reloaded.execution.timeout_ms, config.execution.timeout_ms);
    assert_eq!(reloaded.logging.level, config.logging.level);
}
