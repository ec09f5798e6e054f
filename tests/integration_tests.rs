use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

use serial_test::serial;

fn barscan() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_barscan"));
    cmd.env_remove("BARSCAN_READER")
        .env_remove("BARSCAN_WORKER_NAME")
        .env_remove("BARSCAN_EXTENSIONS");
    cmd
}

fn text(output: &Output) -> (String, String) {
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

fn write_png(path: &Path) {
    image::GrayImage::from_pixel(8, 8, image::Luma([255]))
        .save(path)
        .unwrap();
}

/// Shell script standing in for ZXingReader
#[cfg(unix)]
fn fake_reader(dir: &Path, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-reader.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Test help commands work
#[test]
#[serial]
fn test_help_commands() {
    let output = barscan().arg("--help").output().expect("Failed to run help");
    assert!(output.status.success(), "Help command failed");

    let (stdout, _) = text(&output);
    assert!(stdout.contains("barscan"), "Help should contain program name");
    assert!(stdout.contains("decode"), "Help should list decode command");
    assert!(stdout.contains("formats"), "Help should list formats command");
    assert!(stdout.contains("raw"), "Help should list raw command");
}

#[test]
#[serial]
fn test_formats_command() {
    let output = barscan().arg("formats").output().expect("Failed to run formats");
    assert!(output.status.success());

    let (stdout, _) = text(&output);
    let names: Vec<&str> = stdout.lines().collect();
    assert!(names.contains(&"QRCode"));
    assert!(names.contains(&"DataMatrix"));
    assert!(names.contains(&"UPC-A"));
}

#[test]
#[serial]
fn test_decode_nonexistent_path() {
    let output = barscan()
        .args(["decode", "/nonexistent/path/scan.png"])
        .output()
        .expect("Failed to run decode");
    assert!(!output.status.success());

    let (_, stderr) = text(&output);
    assert!(
        stderr.contains("Input does not exist"),
        "Expected missing input error, got: {stderr}"
    );
}

#[test]
#[serial]
fn test_decode_rejects_bad_option() {
    let temp_dir = TempDir::new().unwrap();
    write_png(&temp_dir.path().join("a.png"));

    let output = barscan()
        .args(["decode", temp_dir.path().to_str().unwrap(), "--option", "Formats=Nope"])
        .output()
        .expect("Failed to run decode");
    assert!(!output.status.success());

    let (_, stderr) = text(&output);
    assert!(stderr.contains("format \"Nope\" not found"), "got: {stderr}");
}

#[test]
#[serial]
fn test_raw_rejects_bad_depth() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("pixels.bin");
    fs::write(&file, vec![0u8; 8]).unwrap();

    let output = barscan()
        .args(["raw", "2", "2", "2", file.to_str().unwrap()])
        .output()
        .expect("Failed to run raw");
    assert!(!output.status.success());

    let (_, stderr) = text(&output);
    assert!(stderr.contains("unsupported image depth"), "got: {stderr}");
}

#[test]
#[serial]
fn test_decode_with_missing_reader_reports_error() {
    let temp_dir = TempDir::new().unwrap();
    write_png(&temp_dir.path().join("a.png"));

    let output = barscan()
        .env("BARSCAN_READER", "/nonexistent/ZXingReader")
        .args(["decode", temp_dir.path().to_str().unwrap(), "--json"])
        .output()
        .expect("Failed to run decode");
    assert!(!output.status.success());

    let (stdout, _) = text(&output);
    let report: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert!(report["source"].as_str().unwrap().ends_with("a.png"));
    assert!(report["error"]
        .as_str()
        .unwrap()
        .contains("/nonexistent/ZXingReader"));
}

#[cfg(unix)]
#[test]
#[serial]
fn test_decode_with_fake_reader() {
    let temp_dir = TempDir::new().unwrap();
    let images = temp_dir.path().join("images");
    fs::create_dir(&images).unwrap();
    write_png(&images.join("one.png"));
    write_png(&images.join("two.png"));
    fs::write(images.join("notes.txt"), "skip me").unwrap();

    let reader = fake_reader(
        temp_dir.path(),
        r#"cat <<'EOF'
Text:       "hello"
Bytes:      68 65 6C 6C 6F
Format:     QRCode
Identifier: ]Q1
Content:    Text
HasECI:     false
Position:   1x1 7x1 7x7 1x7
Rotation:   0 deg
IsMirrored: false
IsInverted: false
EC Level:   M
EOF"#,
    );

    let output = barscan()
        .env("BARSCAN_READER", &reader)
        .args(["decode", images.to_str().unwrap(), "--json"])
        .output()
        .expect("Failed to run decode");

    let (stdout, stderr) = text(&output);
    assert!(output.status.success(), "decode failed: {stderr}");

    let reports: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(reports.len(), 2, "Expected one report per image: {stdout}");

    for report in &reports {
        let barcode = &report["barcodes"][0];
        assert_eq!(barcode["text"], "hello");
        assert_eq!(barcode["format"], "QRCode");
        assert_eq!(barcode["position"], "1x1 7x1 7x7 1x7");
        assert_eq!(barcode["ecLevel"], "M");
        assert!(report["elapsed_ms"].is_u64());
    }
}

#[cfg(unix)]
#[test]
#[serial]
fn test_decode_no_barcode_found() {
    let temp_dir = TempDir::new().unwrap();
    let image = temp_dir.path().join("blank.png");
    write_png(&image);
    let reader = fake_reader(temp_dir.path(), "echo 'No barcode found'\nexit 1");

    let output = barscan()
        .env("BARSCAN_READER", &reader)
        .args(["decode", image.to_str().unwrap()])
        .output()
        .expect("Failed to run decode");

    let (stdout, stderr) = text(&output);
    assert!(output.status.success(), "decode failed: {stderr}");
    assert!(stdout.contains("no barcode found"), "got: {stdout}");
}
