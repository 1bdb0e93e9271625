use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const PARTICLES: &str = r#"
version = 1
steps = 3
textures_max = 1

[size]
width = 16
height = 8

[[values]]
name = "position"
channels = 2
derives = ["position", "velocity"]

[[values]]
name = "velocity"
channels = 4
derives = ["velocity", { value = "position", past = 1 }]

[[values]]
name = "life"
channels = 1
derives = ["life"]
"#;

fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("sim.toml");
    fs::write(&path, contents).unwrap();
    path
}

fn stepplan(args: &[&str], file: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stepplan"))
        .env_remove("STEPPLAN_TEXTURES_MAX")
        .env("RUST_LOG", "error")
        .args(args)
        .arg(file)
        .output()
        .expect("failed to run stepplan")
}

#[test]
fn plan_prints_json_layout() {
    let dir = TempDir::new().unwrap();
    let file = write_config(&dir, PARTICLES);

    let output = stepplan(&["plan", "--json"], &file);
    assert!(output.status.success(), "{output:?}");

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["steps"], 3);
    assert_eq!(plan["width"], 16);
    let textures: Vec<_> = plan["textures"]
        .as_array()
        .unwrap()
        .iter()
        .map(|texture| texture["values"].clone())
        .collect();
    assert_eq!(
        textures,
        vec![
            serde_json::json!([0]),
            serde_json::json!([1]),
            serde_json::json!([2])
        ]
    );
    assert_eq!(plan["passes"].as_array().unwrap().len(), 3);
    assert_eq!(
        plan["passes"][1]["samples"],
        serde_json::json!([
            { "offset": 0, "texture": 1 },
            { "offset": 1, "texture": 0 }
        ])
    );
}

#[test]
fn overrides_repack_the_layout() {
    let dir = TempDir::new().unwrap();
    let file = write_config(&dir, PARTICLES);

    let output = stepplan(&["plan", "--json", "--textures-max", "4"], &file);
    assert!(output.status.success(), "{output:?}");
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["passes"].as_array().unwrap().len(), 1);

    let output = stepplan(&["plan", "--steps", "1"], &file);
    assert!(!output.status.success());
}

#[test]
fn run_prints_ring_slots_per_tick() {
    let dir = TempDir::new().unwrap();
    let file = write_config(&dir, PARTICLES);

    let output = stepplan(&["run", "--ticks", "4"], &file);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("allocated 9 textures and 9 targets of 16x8 over 3 steps"));
    assert!(stdout.contains("tick 3 time=4.0000 dt=1.0000"));
    // tick 1 writes slot 1; pass 0 reads its own texture from tick 0
    assert!(stdout.contains("pass #0 writes slot 1 reads [texture #0 slot 0, texture #1 slot 0]"));
}

#[test]
fn invalid_config_fails_with_a_readable_error() {
    let dir = TempDir::new().unwrap();
    let file = write_config(
        &dir,
        r#"
version = 1

[[values]]
name = "position"
channels = 4
derives = ["missing"]
"#,
    );

    let output = stepplan(&["plan"], &file);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("missing"), "{stderr}");
}
