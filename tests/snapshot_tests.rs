use std::fs;
use std::path::Path;
use std::process::Command;

/// Run syncmap in `working_dir` and return (stderr, exit_code)
fn run_syncmap(args: &[String], working_dir: &Path) -> (String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_syncmap"))
        .current_dir(working_dir)
        .args(args)
        .output()
        .expect("failed to execute syncmap");

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stderr, exit_code)
}

/// Run a single snapshot test described by a .args file
fn run_snapshot_test(args_path: &Path) {
    let base_path = args_path.with_extension("");
    let stem = base_path
        .file_name()
        .and_then(|name| name.to_str())
        .expect("snapshot file name");
    let out_name = format!("{}.go", stem);

    let args_content = fs::read_to_string(args_path)
        .unwrap_or_else(|e| panic!("Failed to read {:?}: {}", args_path, e));
    let mut args: Vec<String> = args_content
        .lines()
        .map(str::trim)
        .filter(|arg| !arg.is_empty() && !arg.starts_with('#'))
        .map(str::to_string)
        .collect();
    args.push("-o".to_string());
    args.push(out_name.clone());

    let work_dir = tempfile::tempdir().unwrap();
    let (actual_stderr, actual_exitcode) = run_syncmap(&args, work_dir.path());

    // Check stderr (partial match - expected must be contained in actual)
    let stderr_path = base_path.with_extension("stderr");
    if stderr_path.exists() {
        let expected_stderr = fs::read_to_string(&stderr_path)
            .unwrap_or_else(|e| panic!("Failed to read {:?}: {}", stderr_path, e));
        assert!(
            actual_stderr.contains(&expected_stderr),
            "stderr mismatch for {:?}\n--- expected (substring) ---\n{}\n--- actual ---\n{}",
            args_path,
            expected_stderr,
            actual_stderr
        );
    }

    // Check exit code (default: 0)
    let exitcode_path = base_path.with_extension("exitcode");
    let expected_exitcode = if exitcode_path.exists() {
        fs::read_to_string(&exitcode_path)
            .unwrap_or_else(|e| panic!("Failed to read {:?}: {}", exitcode_path, e))
            .trim()
            .parse::<i32>()
            .unwrap_or_else(|e| panic!("Invalid exitcode in {:?}: {}", exitcode_path, e))
    } else {
        0
    };
    assert_eq!(
        actual_exitcode, expected_exitcode,
        "exit code mismatch for {:?}: expected {}, got {}\n{}",
        args_path, expected_exitcode, actual_exitcode, actual_stderr
    );

    // Check the generated file (exact match); a failed run writes nothing
    let written = work_dir.path().join(&out_name);
    let expected_path = base_path.with_extension("go");
    if expected_exitcode != 0 {
        assert!(
            fs::read_dir(work_dir.path()).unwrap().next().is_none(),
            "failed run for {:?} left files behind",
            args_path
        );
    } else if expected_path.exists() {
        let expected = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read {:?}: {}", expected_path, e));
        let actual = fs::read_to_string(&written)
            .unwrap_or_else(|e| panic!("Failed to read {:?}: {}", written, e));
        assert_eq!(
            actual, expected,
            "output mismatch for {:?}\n--- expected ---\n{}\n--- actual ---\n{}",
            args_path, expected, actual
        );
    }
}

/// Discover and run all .args tests in a directory
fn run_snapshot_dir(dir: &str) {
    let dir_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
        .join(dir);

    let mut entries: Vec<_> = fs::read_dir(&dir_path)
        .unwrap_or_else(|e| panic!("Failed to read {:?}: {}", dir_path, e))
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "args"))
        .collect();
    entries.sort();
    assert!(!entries.is_empty(), "no snapshot tests in {:?}", dir_path);

    for path in entries {
        run_snapshot_test(&path);
    }
}

#[test]
fn snapshot_generate() {
    run_snapshot_dir("generate");
}
