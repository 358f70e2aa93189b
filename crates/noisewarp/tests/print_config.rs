use std::fs;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn print_config(args: &[&str]) -> (bool, Value, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_noisewarp"))
        .env("RUST_LOG", "warn")
        .args(args)
        .arg("--print-config")
        .output()
        .expect("failed to run noisewarp --print-config");
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let json = if output.status.success() {
        serde_json::from_slice(&output.stdout).expect("stdout is JSON")
    } else {
        Value::Null
    };
    (output.status.success(), json, stderr)
}

#[test]
fn prints_defaults_without_a_config_file() {
    let (ok, json, stderr) = print_config(&[]);
    assert!(ok, "noisewarp failed: {stderr}");
    assert_eq!(json["version"], 1);
    assert_eq!(json["layout"], "single");
    assert_eq!(json["params"]["uSpeed"]["value"], 0.5);
    assert_eq!(json["params"]["uFrequency"]["value"], 2.0);
    assert_eq!(json["params"]["uStrength"]["value"], 1.0);
}

#[test]
fn command_line_overrides_config_file() {
    let root = TempDir::new().unwrap();
    let config_path = root.path().join("scene.toml");
    fs::write(
        &config_path,
        r#"
version = 1
layout = "triple"
image = "photo.png"
size = "800x600"
fps = 24

[params.uStrength]
value = 0.25
min = 0.0
max = 0.5
"#,
    )
    .unwrap();

    let config_arg = config_path.to_string_lossy().into_owned();
    let (ok, json, stderr) = print_config(&[&config_arg, "--variant", "ripple", "--still", "2"]);
    assert!(ok, "noisewarp failed: {stderr}");
    assert_eq!(json["layout"], "single");
    assert_eq!(json["variant"], "ripple");
    assert_eq!(json["size"], "800x600");
    assert_eq!(json["still"], "2s");
    assert_eq!(json["params"]["uStrength"]["value"], 0.25);

    let image = json["image"].as_str().unwrap();
    assert_eq!(image, root.path().join("photo.png").to_string_lossy());
}

#[test]
fn invalid_config_exits_with_error() {
    let root = TempDir::new().unwrap();
    let config_path = root.path().join("broken.toml");
    fs::write(&config_path, "version = 7\n").unwrap();

    let config_arg = config_path.to_string_lossy().into_owned();
    let (ok, _, stderr) = print_config(&[&config_arg]);
    assert!(!ok);
    assert!(stderr.contains("unsupported config version"), "{stderr}");
}

#[test]
fn rejects_malformed_size_flag() {
    let (ok, _, stderr) = print_config(&["--size", "wide"]);
    assert!(!ok);
    assert!(stderr.contains("WIDTHxHEIGHT"), "{stderr}");
}
