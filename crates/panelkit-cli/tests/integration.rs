//! Integration tests for panelkit-cli.
//!
//! Runs the `panelkit` binary against temporary scripts and settings files.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use panelkit_config::Settings;
use tempfile::TempDir;

/// Helper to get the path to the `panelkit` binary built by cargo.
fn panelkit_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_panelkit"))
}

fn run(args: &[&str]) -> Output {
    panelkit_bin()
        .args(args)
        .output()
        .expect("failed to run panelkit")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_script(dir: &Path, text: &str) -> String {
    let path = dir.join("session.toml");
    fs::write(&path, text).unwrap();
    path.to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// `panelkit simulate`
// ---------------------------------------------------------------------------

#[test]
fn simulate_prints_status_and_summary() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "duration_ms = 450\n");

    let output = run(&["simulate", &script]);
    assert!(output.status.success(), "simulate failed: {output:?}");

    let text = stdout(&output);
    assert!(text.contains("PLAY B0 E0"), "missing play status:\n{text}");
    assert!(text.contains("--- 450 ms, 1353 blocks ---"), "{text}");
    assert!(text.contains("mode: PLAY"), "{text}");
}

#[test]
fn simulate_quiet_reports_events_only() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        dir.path(),
        "duration_ms = 300\n[[event]]\nat_ms = 10\naction = \"toggle\"\nedit = true\n",
    );

    let output = run(&["simulate", "--quiet", &script]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("EnterEdit"), "{text}");
    assert!(!text.contains("PARAM"), "{text}");
}

#[test]
fn simulate_persists_edits_to_settings_file() {
    let dir = TempDir::new().unwrap();
    let settings = dir.path().join("panel.toml");
    let script = write_script(
        dir.path(),
        r#"
        duration_ms = 3000

        [[event]]
        at_ms = 10
        action = "toggle"
        edit = true

        [[event]]
        at_ms = 20
        action = "press"

        [[event]]
        at_ms = 100
        action = "knob"
        index = 0
        value = 1.0

        [[event]]
        at_ms = 2900
        action = "toggle"
        edit = false
        "#,
    );

    let output = run(&[
        "simulate",
        "--quiet",
        "--settings",
        settings.to_str().unwrap(),
        &script,
    ]);
    assert!(output.status.success(), "simulate failed: {output:?}");
    assert!(stdout(&output).contains("settings: saved"));

    let saved: Settings = toml::from_str(&fs::read_to_string(&settings).unwrap()).unwrap();
    assert!(saved.decay > 0.9, "decay not persisted: {}", saved.decay);
}

#[test]
fn simulate_rejects_invalid_script() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        dir.path(),
        "duration_ms = 10\n[[event]]\nat_ms = 0\naction = \"knob\"\nindex = 9\nvalue = 0.5\n",
    );

    let output = run(&["simulate", &script]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("knob index 9"), "{stderr}");
}

// ---------------------------------------------------------------------------
// `panelkit settings`
// ---------------------------------------------------------------------------

#[test]
fn settings_show_missing_file_prints_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.toml");

    let output = run(&["settings", "show", "--settings", path.to_str().unwrap()]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("does not exist"));
    let shown: Settings = toml::from_str(&text).unwrap();
    assert_eq!(shown, Settings::default());
    assert!(!path.exists());
}

#[test]
fn settings_reset_writes_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("panel.toml");
    let edited = Settings {
        decay: 0.1,
        ..Settings::default()
    };
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, toml::to_string_pretty(&edited).unwrap()).unwrap();

    let output = run(&["settings", "reset", "--settings", path.to_str().unwrap()]);
    assert!(output.status.success());

    let reset: Settings = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reset, Settings::default());
}
