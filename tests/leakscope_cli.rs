use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn write_valid_config(dir: &Path, file_name: &str) -> PathBuf {
    let config_path = dir.join(file_name);
    fs::write(
        &config_path,
        r#"
name = "leakscope-cli-test"
env = "dev"

[bind.http]
domain_name = "localhost"
advertised_ip = "127.0.0.1"
ip = "127.0.0.1"
port = 39999

[probe]
timeout_ms = 3000
max_retries = 2

[probe.webrtc]
stun_servers = ["stun:stun.l.google.com:19302"]
gathering_secs = 5

[edge]
api_url = "https://edge.example.com"

[observability.log]
output = "console"
"#,
    )
    .expect("write valid config");

    config_path
}

fn write_warning_only_config(dir: &Path, file_name: &str) -> PathBuf {
    let config_path = dir.join(file_name);
    fs::write(
        &config_path,
        r#"
name = "leakscope-cli-warning-test"
env = "prod"

[probe.dns]
test_domains = []

[observability.log]
output = "console"
"#,
    )
    .expect("write warning-only config");

    config_path
}

fn write_validation_error_config(dir: &Path, file_name: &str) -> PathBuf {
    let config_path = dir.join(file_name);
    fs::write(
        &config_path,
        r#"
name = "leakscope-cli-validation-error-test"
env = "staging"

[probe]
max_retries = 0

[probe.webrtc]
stun_servers = ["stun.example.com:3478"]
"#,
    )
    .expect("write validation-error config");

    config_path
}

fn run_leakscope(args: &[&str], current_dir: Option<&Path>) -> Output {
    let mut cmd = Command::new(PathBuf::from(env!("CARGO_BIN_EXE_leakscope")));
    cmd.args(args);
    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }
    cmd.output().expect("run leakscope command")
}

#[test]
fn leakscope_test_command_accepts_explicit_valid_config() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_valid_config(temp.path(), "valid.toml");
    let output = run_leakscope(&["test", config_path.to_str().expect("utf8 path")], None);

    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn leakscope_test_command_finds_default_config_in_current_directory() {
    let temp = tempfile::tempdir().expect("temp dir");
    write_valid_config(temp.path(), "config.toml");
    let output = run_leakscope(&["test"], Some(temp.path()));

    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn leakscope_test_command_fails_for_missing_custom_config_path() {
    let temp = tempfile::tempdir().expect("temp dir");
    let missing_path = temp.path().join("missing.toml");
    let output = run_leakscope(&["test", missing_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(
        stderr.contains("Config file not found"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn leakscope_test_command_fails_for_invalid_config_content() {
    let temp = tempfile::tempdir().expect("temp dir");
    let bad_path = temp.path().join("bad.toml");
    fs::write(&bad_path, "name = \"broken\"\nenv = [\n").expect("write invalid toml");

    let output = run_leakscope(&["test", bad_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(stderr.contains("配置解析失败"), "unexpected stderr: {stderr}");
}

#[test]
fn leakscope_test_command_fails_for_validation_errors() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_validation_error_config(temp.path(), "validation-error.toml");
    let output = run_leakscope(&["test", config_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(
        stderr.contains("配置验证失败") && stderr.contains("Invalid environment"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn leakscope_test_command_succeeds_with_warning_only_config() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_warning_only_config(temp.path(), "warning.toml");
    let output = run_leakscope(&["test", config_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "warning-only config should succeed, stderr: {stderr}"
    );
    assert!(stderr.contains("Warning:"), "unexpected stderr: {stderr}");
}

#[test]
fn leakscope_serve_fails_when_no_default_config_exists() {
    let temp = tempfile::tempdir().expect("temp dir");
    let output = run_leakscope(&["serve"], Some(temp.path()));
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "serve should fail");
    assert!(
        stderr.contains("No configuration file found"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn leakscope_serve_fails_for_validation_errors() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_validation_error_config(temp.path(), "serve-validation-error.toml");
    let output = run_leakscope(
        &["serve", "--config", config_path.to_str().expect("utf8 path")],
        None,
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "serve should fail");
    assert!(stderr.contains("配置验证失败"), "unexpected stderr: {stderr}");
}

#[test]
fn leakscope_check_fails_for_missing_custom_config_flag() {
    let temp = tempfile::tempdir().expect("temp dir");
    let missing_path = temp.path().join("missing-check.toml");
    let output = run_leakscope(
        &["check", "--config", missing_path.to_str().expect("utf8 path")],
        None,
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "check should fail");
    assert!(
        stderr.contains("Config file not found"),
        "unexpected stderr: {stderr}"
    );
}
