use std::fs;
use std::io::Cursor;
use std::process::{Command, Output};

use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;

fn tearframe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tearframe"))
        .env("RUST_LOG", "error")
        .args(args)
        .output()
        .expect("failed to run tearframe")
}

fn write_png(path: &std::path::Path) {
    let image = RgbaImage::from_pixel(4, 4, Rgba([90, 60, 30, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    fs::write(path, bytes.into_inner()).unwrap();
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn help_lists_image_flags() {
    let output = tearframe(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--photo"));
    assert!(stdout.contains("--frame"));
    assert!(stdout.contains("--still"));
}

#[test]
fn missing_local_image_fails_before_opening_a_window() {
    let root = TempDir::new().unwrap();
    let frame = root.path().join("frame.png");
    write_png(&frame);
    let missing = root.path().join("no-such-photo.png");

    let output = tearframe(&[
        "--frame",
        frame.to_str().unwrap(),
        "--photo",
        missing.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    let stderr = stderr(&output);
    assert!(stderr.contains("failed to read"), "stderr: {stderr}");
    assert!(stderr.contains("no-such-photo.png"), "stderr: {stderr}");
}

#[test]
fn undecodable_frame_is_reported() {
    let root = TempDir::new().unwrap();
    let frame = root.path().join("frame.png");
    let photo = root.path().join("photo.png");
    fs::write(&frame, b"definitely not a png").unwrap();
    write_png(&photo);

    let output = tearframe(&[
        "--frame",
        frame.to_str().unwrap(),
        "--photo",
        photo.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    let stderr = stderr(&output);
    assert!(stderr.contains("failed to decode image"), "stderr: {stderr}");
    assert!(stderr.contains("loading frame image"), "stderr: {stderr}");
}

#[test]
fn invalid_size_is_rejected_by_the_parser() {
    let output = tearframe(&["--size", "0x720"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--size"));
}

#[test]
fn config_file_sources_are_used() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("tearframe.toml");
    let missing = root.path().join("from-config.png");
    fs::write(
        &config,
        format!(
            "frame = {:?}\nphoto = {:?}\nsize = \"640x480\"\n",
            missing.to_str().unwrap(),
            missing.to_str().unwrap()
        ),
    )
    .unwrap();

    let output = tearframe(&["--config", config.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = stderr(&output);
    assert!(stderr.contains("from-config.png"), "stderr: {stderr}");
}

#[test]
fn unknown_config_keys_are_rejected() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("tearframe.toml");
    fs::write(&config, "shader = \"nope\"\n").unwrap();

    let output = tearframe(&["--config", config.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to parse configuration"));
}

#[test]
fn unsupported_scheme_is_rejected() {
    let output = tearframe(&["--photo", "ftp://example.com/photo.png"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid image source"));
}
