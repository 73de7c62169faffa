// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! End-to-end tests of the `sporenet` binary. External tools are replaced by
//! shell scripts on a private `PATH` that append their command line to a log.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sporenet"));
    cmd.arg("--non-interactive")
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("SPORENET_PORT")
        .env_remove("SPORENET_SCRIPTS_DIR");
    cmd
}

fn sporenet(dir: &Path, args: &[&str]) -> Output {
    command(dir, args).output().expect("failed to run sporenet")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

// --- build ---

#[test]
fn test_build_missing_model_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let out = sporenet(
        dir.path(),
        &["build", "--model", "missing.h5", "--framework", "tensorflow"],
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Model file not found: missing.h5"));
}

#[test]
fn test_build_without_model_non_interactive() {
    let dir = tempfile::tempdir().unwrap();
    let out = sporenet(dir.path(), &["build"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Model file is required: pass --model <FILE>"));
}

#[test]
fn test_build_missing_scripts_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("model.onnx"), b"onnx").unwrap();
    let out = sporenet(dir.path(), &["build", "--model", "model.onnx"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Script not found: scripts/convert.py"));
    assert!(!dir.path().join("build").exists());
}

// --- flash ---

#[test]
fn test_flash_missing_firmware_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let out = sporenet(dir.path(), &["flash", "--port", "/dev/ttyUSB0"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains(
        "Firmware not found: build/firmware/build/sporenet.bin. Run 'sporenet build' first."
    ));
}

#[test]
fn test_flash_reads_output_dir_from_config() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("sporenet.config.json"),
        r#"{ "name": "kws", "outputDir": "artifacts", "serial": { "port": "/dev/ttyACM0" } }"#,
    )
    .unwrap();
    let out = sporenet(dir.path(), &["flash"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Firmware not found: artifacts/firmware/build/sporenet.bin"));
}

#[test]
fn test_invalid_config_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("sporenet.config.json"), "{").unwrap();
    let out = sporenet(dir.path(), &["flash", "--port", "/dev/ttyUSB0"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("invalid config"));
}

// --- init ---

#[test]
fn test_init_creates_project() {
    let dir = tempfile::tempdir().unwrap();
    let out = sporenet(dir.path(), &["init", "kws"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("Created project 'kws'"));

    let project = dir.path().join("kws");
    for dir in ["models", "data", "build"] {
        assert!(project.join(dir).is_dir());
    }
    assert!(project.join("sporenet.config.json").is_file());
    assert!(project.join("README.md").is_file());
}

#[test]
fn test_init_twice_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(sporenet(dir.path(), &["init", "kws"]).status.success());

    let out = sporenet(dir.path(), &["init", "kws"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("already exists"));
}

// --- generate / header ---

#[test]
fn test_generate_writes_project() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("m.tflite"), [0u8; 4]).unwrap();
    let out = sporenet(dir.path(), &["generate", "--model", "m.tflite", "--output", "fw"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("(4 bytes)"));
    assert!(dir.path().join("fw/main/model_data.cpp").is_file());
}

#[test]
fn test_header_missing_model_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let out = sporenet(dir.path(), &["header", "none.tflite"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Model file not found: none.tflite"));
}

#[test]
fn test_header_written_next_to_model() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("m.tflite"), [1u8, 2]).unwrap();
    let out = sporenet(dir.path(), &["header", "m.tflite"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let header = fs::read_to_string(dir.path().join("m.h")).unwrap();
    assert!(header.contains("0x01,0x02,"));
}

// --- usage errors ---

#[test]
fn test_unknown_target_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = sporenet(dir.path(), &["build", "--target", "stm32"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("unknown target 'stm32'"));
}

// --- external tools ---

#[cfg(unix)]
mod fake_tools {
    use std::env;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::process::Output;

    use super::{command, stderr, stdout};

    const LOG_VAR: &str = "SPORENET_TOOL_LOG";

    /// Python stand-in: logs its arguments and creates whatever `--output`
    /// names, a file for the converter and a directory for the generator.
    const FAKE_PYTHON: &str = r#"echo "python3 $*" >> "$SPORENET_TOOL_LOG"
script="$1"
while [ $# -gt 0 ]; do
    if [ "$1" = "--output" ]; then
        case "$script" in
            *convert.py) : > "$2" ;;
            *generate_firmware.py) mkdir -p "$2" ;;
        esac
    fi
    shift
done
"#;

    struct Workspace {
        dir: tempfile::TempDir,
        bin: PathBuf,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let bin = dir.path().join("bin");
            fs::create_dir(&bin).unwrap();
            Self { dir, bin }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn tool(&self, name: &str, body: &str) {
            let path = self.bin.join(name);
            fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        fn logging_tool(&self, name: &str, exit_code: i32) {
            self.tool(
                name,
                &format!(
                    "echo \"{} $* in $(pwd)\" >> \"${}\"\nexit {}\n",
                    name, LOG_VAR, exit_code
                ),
            );
        }

        fn build_project(&self) {
            fs::write(self.path().join("model.onnx"), b"onnx").unwrap();
            let scripts = self.path().join("scripts");
            fs::create_dir(&scripts).unwrap();
            fs::write(scripts.join("convert.py"), "").unwrap();
            fs::write(scripts.join("generate_firmware.py"), "").unwrap();
            self.tool("python3", FAKE_PYTHON);
        }

        fn run(&self, args: &[&str]) -> Output {
            let dirs = [self.bin.as_path(), Path::new("/usr/bin"), Path::new("/bin")];
            let path = env::join_paths(dirs).unwrap();
            command(self.path(), args)
                .env("PATH", path)
                .env(LOG_VAR, self.path().join("tools.log"))
                .output()
                .expect("failed to run sporenet")
        }

        fn log(&self) -> Vec<String> {
            fs::read_to_string(self.path().join("tools.log"))
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    // --- build ---

    #[test]
    fn test_build_runs_steps_in_order_with_idf() {
        let ws = Workspace::new();
        ws.build_project();
        ws.logging_tool("idf.py", 0);
        ws.logging_tool("make", 0);

        let out = ws.run(&["build", "--model", "model.onnx", "--target", "esp32s3"]);
        assert!(out.status.success(), "stderr: {}", stderr(&out));
        assert!(stdout(&out).contains("Build complete!"));

        let log = ws.log();
        assert_eq!(log.len(), 3, "{:?}", log);
        assert!(log[0].starts_with("python3 scripts/convert.py --model model.onnx"));
        assert!(log[0].contains("--framework onnx"));
        assert!(log[0].ends_with("--quantize"));
        assert!(log[1].starts_with("python3 scripts/generate_firmware.py --target esp32 "));
        assert!(log[2].starts_with("idf.py -DIDF_TARGET=esp32s3 build in "));
        assert!(log[2].ends_with("build/firmware"));
    }

    #[test]
    fn test_build_falls_back_to_make_without_idf() {
        let ws = Workspace::new();
        ws.build_project();
        ws.logging_tool("make", 0);

        let out = ws.run(&["build", "--model", "model.onnx"]);
        assert!(out.status.success(), "stderr: {}", stderr(&out));
        assert!(stderr(&out).contains("idf.py not available, falling back to make"));

        let log = ws.log();
        assert_eq!(log.len(), 3, "{:?}", log);
        assert!(log[0].contains("convert.py"));
        assert!(log[1].contains("generate_firmware.py"));
        assert!(log[2].starts_with("make  in "));
        assert!(log[2].ends_with("build/firmware"));
    }

    #[test]
    fn test_build_failing_idf_is_not_retried_with_make() {
        let ws = Workspace::new();
        ws.build_project();
        ws.logging_tool("idf.py", 1);
        ws.logging_tool("make", 0);

        let out = ws.run(&["build", "--model", "model.onnx"]);
        assert_eq!(out.status.code(), Some(1));
        assert!(stderr(&out).contains("Build failed at step 'compile'"));
        assert!(!ws.log().iter().any(|l| l.starts_with("make")));
    }

    // --- monitor ---

    #[test]
    fn test_monitor_falls_back_to_miniterm() {
        let ws = Workspace::new();
        fs::create_dir(ws.path().join("fw")).unwrap();
        ws.logging_tool("idf.py", 1);
        ws.logging_tool("python3", 0);

        let out = ws.run(&["monitor", "--port", "/dev/null", "--firmware-dir", "fw"]);
        assert!(out.status.success(), "stderr: {}", stderr(&out));
        assert!(stdout(&out)
            .contains("Falling back to: python3 -m serial.tools.miniterm /dev/null 115200"));

        let log = ws.log();
        assert_eq!(log.len(), 2, "{:?}", log);
        assert!(log[0].starts_with("idf.py -p /dev/null -b 115200 monitor in "));
        assert!(log[0].ends_with("/fw"));
        assert!(log[1].starts_with("python3 -m serial.tools.miniterm /dev/null 115200"));
    }

    #[test]
    fn test_monitor_exits_1_when_both_fail() {
        let ws = Workspace::new();
        fs::create_dir(ws.path().join("fw")).unwrap();
        ws.logging_tool("idf.py", 1);
        ws.logging_tool("python3", 1);

        let out = ws.run(&["monitor", "--port", "/dev/null", "--firmware-dir", "fw"]);
        assert_eq!(out.status.code(), Some(1));
        assert!(stderr(&out).contains("Serial monitor failed"));
        assert_eq!(ws.log().len(), 2);
    }

    #[test]
    fn test_monitor_skips_idf_without_firmware_dir() {
        let ws = Workspace::new();
        ws.logging_tool("idf.py", 0);
        ws.logging_tool("python3", 0);

        let out = ws.run(&["monitor", "--port", "/dev/null"]);
        assert!(out.status.success(), "stderr: {}", stderr(&out));
        let log = ws.log();
        assert_eq!(log.len(), 1, "{:?}", log);
        assert!(log[0].starts_with("python3 -m serial.tools.miniterm"));
    }

    // --- setup ---

    #[test]
    fn test_setup_check_ignores_malformed_config() {
        let ws = Workspace::new();
        fs::write(ws.path().join("sporenet.config.json"), "{").unwrap();
        ws.logging_tool("python3", 0);
        ws.logging_tool("pip3", 0);

        let out = ws.run(&["setup", "--check-only"]);
        assert!(out.status.success(), "stderr: {}", stderr(&out));
        assert!(!stderr(&out).contains("invalid config"));
        assert!(stdout(&out).contains("Environment OK."));
        assert!(ws.log().is_empty());
    }
}
