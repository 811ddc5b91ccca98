use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(prefix: &str, ext: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("busloader-tests");
    let _ = std::fs::create_dir_all(&dir);

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    dir.join(format!("{}-{}.{}", prefix, nonce, ext))
}

fn run_session(input: &str, extra_args: &[&str]) -> std::process::Output {
    let input_path = temp_path("input", "txt");
    std::fs::write(&input_path, input).expect("Failed to write input script");

    let output = Command::new(env!("CARGO_BIN_EXE_busloader"))
        .arg("--input")
        .arg(input_path.to_str().unwrap())
        .args(extra_args)
        .output()
        .expect("Failed to execute busloader");

    let _ = std::fs::remove_file(&input_path);
    output
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_busloader"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("BusLoader Simulator"));
}

#[test]
fn test_cli_write_session_echoes_bytes() {
    let output = run_session("w 01 02 ff\n", &[]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Write: 01 02 ff"));
}

#[test]
fn test_cli_unknown_command_prints_summary() {
    let output = run_session("?\n", &[]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Commands:"));
    assert!(stdout.contains("store current program to flash"));
}

#[test]
fn test_cli_store_then_load_persists_across_runs() {
    let flash_path = temp_path("flash", "bin");

    let output = run_session(
        "w 01 02 ff\ns\n",
        &["--flash-image", flash_path.to_str().unwrap()],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Store: 01 02 ff"));
    assert!(flash_path.exists());

    // Second run on the same image: load echoes the persisted block.
    let output = run_session("l\n", &["--flash-image", flash_path.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Load: 01 02 ff"));

    let _ = std::fs::remove_file(&flash_path);
}

#[test]
fn test_cli_writes_snapshot() {
    let snapshot_path = temp_path("snapshot", "json");

    let output = run_session(
        "w 2a\n",
        &["--snapshot", snapshot_path.to_str().unwrap()],
    );
    assert!(output.status.success());
    assert!(snapshot_path.exists());

    let snapshot: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    let program = snapshot["program"].as_array().unwrap();
    assert_eq!(program.len(), 16);
    assert_eq!(program[0], 0x2a);
    assert_eq!(snapshot["catalog_cursor"], 3);
    assert!(snapshot["slept_ms"].as_u64().is_some());

    let _ = std::fs::remove_file(&snapshot_path);
}

#[test]
fn test_cli_button_press_drives_first_preset() {
    let snapshot_path = temp_path("snapshot-button", "json");

    let output = run_session(
        "",
        &[
            "--button-presses",
            "1",
            "--snapshot",
            snapshot_path.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());

    let snapshot: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    // One press moves the cursor off the flash slot onto preset 0.
    assert_eq!(snapshot["catalog_cursor"], 0);

    let _ = std::fs::remove_file(&snapshot_path);
}

#[test]
fn test_cli_missing_profile_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_busloader"))
        .args(["--profile", "does-not-exist.yaml", "--input", "/dev/null"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}
