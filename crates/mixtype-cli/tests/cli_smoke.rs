//! Runs the `mixtype` binary end to end
//!
//! Fonts are disabled through `MIXTYPE_FONT_DIRS` so the results do not
//! depend on the machine: every glyph renders as a box.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn mixtype() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_mixtype"));
    command.env("MIXTYPE_FONT_DIRS", "").env_remove("RUST_LOG");
    command
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("mixtype-cli-{}-{name}", std::process::id()))
}

fn run_with_stdin(command: &mut Command, input: &str) -> Output {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start mixtype");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("Failed to write stdin");
    child.wait_with_output().expect("Failed to wait for mixtype")
}

#[test]
fn help_lists_the_subcommands() {
    let output = mixtype().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["render", "fonts", "batch"] {
        assert!(stdout.contains(command), "help should mention {command}");
    }
}

#[test]
fn render_writes_a_png() {
    let path = temp_path("hello.png");
    let output = mixtype()
        .args(["render", "Hello", "--size", "20", "--metrics", "-o"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

    let metrics: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(metrics["metrics"]["line_count"], 1);
    assert_eq!(metrics["metrics"]["missing_glyphs"], 5);
    fs::remove_file(&path).unwrap();
}

#[test]
fn render_reads_stdin() {
    let path = temp_path("stdin.rgba");
    let output = run_with_stdin(
        mixtype()
            .args(["render", "--format", "rgba", "--size", "10", "-o"])
            .arg(&path),
        "ab\n",
    );
    assert!(output.status.success());
    // Two 5px boxes on a 10px line
    assert_eq!(fs::read(&path).unwrap().len(), 10 * 10 * 4);
    fs::remove_file(&path).unwrap();
}

#[test]
fn oversized_canvas_fails() {
    let path = temp_path("huge.png");
    let output = mixtype()
        .env("MIXTYPE_MAX_CANVAS", "64")
        .args(["render", "x", "--width", "100", "--height", "10", "-o"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ceiling"));
    assert!(!path.exists());
}

#[test]
fn fonts_prints_json() {
    let output = mixtype().args(["fonts", "--json", "--chains"]).output().unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["faces"].as_array().map(Vec::len), Some(0));
}

#[test]
fn batch_renders_each_line() {
    let dir = temp_path("batch");
    let output = run_with_stdin(
        mixtype().args(["batch", "--jobs", "2", "-o"]).arg(&dir),
        "{\"id\": \"one\", \"text\": \"a\"}\n\n{\"id\": \"two\", \"text\": \"b\"}\n",
    );
    assert!(
        output.status.success(),
        "batch failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let ids: Vec<String> = stdout
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .map(|result| result["id"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(ids, vec!["one", "two"]);
    assert!(dir.join("one.png").exists());
    assert!(dir.join("two.png").exists());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn batch_reports_failures() {
    let dir = temp_path("batch-fail");
    let output = run_with_stdin(
        mixtype().args(["batch", "-o"]).arg(&dir),
        "{\"text\": \"\"}\n",
    );
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"status\":\"error\""));
    let _ = fs::remove_dir_all(&dir);
}
