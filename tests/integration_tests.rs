use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Once;
use tempfile::TempDir;

use serial_test::serial;

static INIT: Once = Once::new();

/// Build the binary once for all tests
fn build_vbatch() {
    INIT.call_once(|| {
        let build_output = Command::new("cargo")
            .args(["build", "--bin", "vbatch"])
            .output()
            .expect("Failed to build vbatch");
        assert!(
            build_output.status.success(),
            "Failed to build vbatch binary"
        );
    });
}

/// Write an executable shell script standing in for ffmpeg/ffprobe
fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
    }

    path
}

/// An encoder stub that answers -version, then streams a short progress
/// feed and succeeds
const HAPPY_FFMPEG: &str = r#"case "$*" in
  *-version*) echo 'ffmpeg version 6.0-stub'; exit 0;;
esac
echo 'out_time_us=1000000'
echo 'progress=end'
exit 0"#;

fn combined_output(output: &std::process::Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

/// Test help commands work
#[test]
#[serial]
fn test_help_lists_subcommands() {
    build_vbatch();
    let help_output = Command::new("./target/debug/vbatch")
        .arg("--help")
        .output()
        .expect("Failed to execute help command");

    assert!(help_output.status.success(), "Help command failed");
    let text = combined_output(&help_output);
    for subcommand in ["convert", "gif", "still", "presets"] {
        assert!(text.contains(subcommand), "Missing subcommand: {subcommand}");
    }
}

#[test]
#[serial]
fn test_convert_rejects_missing_directory() {
    build_vbatch();
    let output = Command::new("./target/debug/vbatch")
        .args(["convert", "/nonexistent/path"])
        .output()
        .expect("Failed to execute convert command");

    assert!(!output.status.success());
    assert!(combined_output(&output).contains("does not exist"));
}

#[test]
#[serial]
fn test_presets_lists_builtins() {
    build_vbatch();
    let output = Command::new("./target/debug/vbatch")
        .arg("presets")
        .output()
        .expect("Failed to execute presets command");

    assert!(output.status.success(), "Presets command failed");
    let text = combined_output(&output);
    for name in ["h265", "h265-cbr", "h264-compat"] {
        assert!(text.contains(name), "Missing preset: {name}");
    }
}

/// Full convert workflow against stub encoder binaries
#[test]
#[serial]
fn test_convert_full_batch_with_stub_encoder() {
    build_vbatch();
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let ffmpeg = write_stub(temp_path, "ffmpeg", HAPPY_FFMPEG);
    let ffprobe = write_stub(temp_path, "ffprobe", "echo '10.0'");

    let media = temp_path.join("media");
    fs::create_dir_all(&media).unwrap();
    fs::write(media.join("a.mov"), "").unwrap();
    fs::write(media.join("b.mkv"), "").unwrap();
    fs::write(media.join("notes.txt"), "").unwrap();

    let output = Command::new("./target/debug/vbatch")
        .args(["convert", media.to_str().unwrap(), "--preset", "h265"])
        .env("FFMPEG_PATH", &ffmpeg)
        .env("FFPROBE_PATH", &ffprobe)
        .output()
        .expect("Failed to execute convert command");

    let text = combined_output(&output);
    assert!(output.status.success(), "Convert failed: {text}");
    assert!(
        text.contains("2 succeeded, 0 failed"),
        "Unexpected summary, got: {text}"
    );
    assert!(media.join("converted").is_dir());
}

#[test]
#[serial]
fn test_convert_turbo_mode_with_stub_encoder() {
    build_vbatch();
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let ffmpeg = write_stub(temp_path, "ffmpeg", HAPPY_FFMPEG);
    let ffprobe = write_stub(temp_path, "ffprobe", "echo '10.0'");

    let media = temp_path.join("media");
    fs::create_dir_all(&media).unwrap();
    for name in ["a.mov", "b.mov", "c.mov"] {
        fs::write(media.join(name), "").unwrap();
    }

    let output = Command::new("./target/debug/vbatch")
        .args([
            "convert",
            media.to_str().unwrap(),
            "--turbo",
            "--jobs",
            "2",
        ])
        .env("FFMPEG_PATH", &ffmpeg)
        .env("FFPROBE_PATH", &ffprobe)
        .output()
        .expect("Failed to execute convert command");

    let text = combined_output(&output);
    assert!(output.status.success(), "Turbo convert failed: {text}");
    assert!(
        text.contains("3 succeeded, 0 failed"),
        "Unexpected summary, got: {text}"
    );
}

#[test]
#[serial]
fn test_convert_failure_yields_nonzero_exit() {
    build_vbatch();
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let ffmpeg = write_stub(
        temp_path,
        "ffmpeg",
        r#"case "$*" in
  *-version*) exit 0;;
esac
echo 'unsupported codec' 1>&2
exit 1"#,
    );
    let ffprobe = write_stub(temp_path, "ffprobe", "echo '10.0'");

    let media = temp_path.join("media");
    fs::create_dir_all(&media).unwrap();
    fs::write(media.join("a.mov"), "").unwrap();

    let output = Command::new("./target/debug/vbatch")
        .args(["convert", media.to_str().unwrap()])
        .env("FFMPEG_PATH", &ffmpeg)
        .env("FFPROBE_PATH", &ffprobe)
        .output()
        .expect("Failed to execute convert command");

    let text = combined_output(&output);
    assert!(!output.status.success(), "Expected failure, got: {text}");
    assert!(text.contains("unsupported codec"), "Diagnostic lost: {text}");
}

#[test]
#[serial]
fn test_gif_two_pass_with_stub_encoder() {
    build_vbatch();
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    // Pass one writes the palette file (its last argument) so the pipeline
    // proceeds to the render pass.
    let ffmpeg = write_stub(
        temp_path,
        "ffmpeg",
        r#"case "$*" in
  *-version*) exit 0;;
  *palettegen*) for last in "$@"; do :; done; printf 'x' > "$last"; exit 0;;
esac
exit 0"#,
    );
    let ffprobe = write_stub(temp_path, "ffprobe", "echo '10.0'");

    let input = temp_path.join("clip.mov");
    fs::write(&input, "").unwrap();

    let output = Command::new("./target/debug/vbatch")
        .args(["gif", input.to_str().unwrap(), "--duration", "2.0"])
        .env("FFMPEG_PATH", &ffmpeg)
        .env("FFPROBE_PATH", &ffprobe)
        .output()
        .expect("Failed to execute gif command");

    let text = combined_output(&output);
    assert!(output.status.success(), "Gif command failed: {text}");
    assert!(text.contains("Wrote"), "Missing completion log: {text}");
}

#[test]
#[serial]
fn test_still_with_stub_encoder() {
    build_vbatch();
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let ffmpeg = write_stub(temp_path, "ffmpeg", HAPPY_FFMPEG);
    let ffprobe = write_stub(temp_path, "ffprobe", "echo '10.0'");

    let input = temp_path.join("clip.mov");
    fs::write(&input, "").unwrap();

    let output = Command::new("./target/debug/vbatch")
        .args(["still", input.to_str().unwrap(), "--at", "2.5"])
        .env("FFMPEG_PATH", &ffmpeg)
        .env("FFPROBE_PATH", &ffprobe)
        .output()
        .expect("Failed to execute still command");

    let text = combined_output(&output);
    assert!(output.status.success(), "Still command failed: {text}");
}

#[test]
#[serial]
fn test_convert_with_custom_presets_file() {
    build_vbatch();
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let ffmpeg = write_stub(temp_path, "ffmpeg", HAPPY_FFMPEG);
    let ffprobe = write_stub(temp_path, "ffprobe", "echo '10.0'");

    let presets = temp_path.join("presets.json");
    fs::write(
        &presets,
        r#"[{
            "name": "archive",
            "video_codec": "libsvtav1",
            "audio_codec": "libopus",
            "container": "mkv",
            "crf": 30
        }]"#,
    )
    .unwrap();

    let media = temp_path.join("media");
    fs::create_dir_all(&media).unwrap();
    fs::write(media.join("a.mov"), "").unwrap();

    let output = Command::new("./target/debug/vbatch")
        .args([
            "convert",
            media.to_str().unwrap(),
            "--preset",
            "archive",
            "--presets-file",
            presets.to_str().unwrap(),
        ])
        .env("FFMPEG_PATH", &ffmpeg)
        .env("FFPROBE_PATH", &ffprobe)
        .output()
        .expect("Failed to execute convert command");

    let text = combined_output(&output);
    assert!(output.status.success(), "Convert failed: {text}");
    assert!(text.contains("1 succeeded"), "Unexpected summary: {text}");
}
