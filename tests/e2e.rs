use std::fs;
use std::path::Path;
use std::process::Command;

fn run_syncmap(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_syncmap"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to execute syncmap");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();

    (stdout, stderr, success)
}

fn assert_success(dir: &Path, args: &[&str]) -> String {
    let (_, stderr, success) = run_syncmap(dir, args);
    assert!(success, "syncmap should succeed, stderr:\n{}", stderr);
    stderr
}

fn assert_failure(dir: &Path, args: &[&str]) -> String {
    let (_, stderr, success) = run_syncmap(dir, args);
    assert!(!success, "syncmap should fail");
    stderr
}

fn files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_default_output_name() {
    let dir = tempfile::tempdir().unwrap();
    assert_success(
        dir.path(),
        &["map[string]int", "--name", "IntMap", "--no-imports"],
    );

    assert_eq!(files(dir.path()), vec!["intmap.go"]);
    let source = fs::read_to_string(dir.path().join("intmap.go")).unwrap();
    assert!(source.starts_with("// Code generated by syncmap; DO NOT EDIT.\n\n"));
    assert!(source.contains("\npackage main\n"));
    assert!(source.contains("func (m *IntMap) Load(key string) (value int, ok bool) {"));
}

#[test]
fn test_out_and_package_flags() {
    let dir = tempfile::tempdir().unwrap();
    assert_success(
        dir.path(),
        &[
            "map[int64]*User",
            "-o",
            "users_gen.go",
            "--pkg",
            "users",
            "--name",
            "UserMap",
            "--no-imports",
        ],
    );

    let source = fs::read_to_string(dir.path().join("users_gen.go")).unwrap();
    assert!(source.contains("\npackage users\n"));
    assert!(source.contains("func (m *UserMap) Store(key int64, value *User) {"));
}

#[test]
fn test_config_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("syncmap.toml"),
        "[generate]\npackage = \"store\"\nname = \"Counts\"\nout = \"counts.go\"\n",
    )
    .unwrap();

    assert_success(
        dir.path(),
        &[
            "map[string]uint64",
            "--config",
            "syncmap.toml",
            "--name",
            "Totals",
            "--no-imports",
        ],
    );

    let source = fs::read_to_string(dir.path().join("counts.go")).unwrap();
    assert!(source.contains("\npackage store\n"));
    assert!(source.contains("type Totals struct {"));
}

#[test]
fn test_bad_config_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("syncmap.toml"), "[generate]\nnmae = \"X\"\n").unwrap();

    let stderr = assert_failure(
        dir.path(),
        &["map[string]int", "--config", "syncmap.toml", "--no-imports"],
    );
    assert!(stderr.starts_with("syncmap: failed to load config"), "{}", stderr);
    assert_eq!(files(dir.path()), vec!["syncmap.toml"]);
}

#[test]
fn test_invalid_map_type() {
    let dir = tempfile::tempdir().unwrap();
    let stderr = assert_failure(dir.path(), &["map[string]", "--no-imports"]);
    assert!(stderr.starts_with("syncmap: invalid map type `map[string]`"), "{}", stderr);
    assert!(files(dir.path()).is_empty());
}

#[test]
fn test_invalid_struct_name() {
    let dir = tempfile::tempdir().unwrap();
    let stderr = assert_failure(
        dir.path(),
        &["map[string]int", "--name", "func", "--no-imports"],
    );
    assert_eq!(stderr, "syncmap: invalid struct name `func`: reserved keyword\n");
}

#[test]
fn test_failing_normalizer_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let stderr = assert_failure(
        dir.path(),
        &["map[string]int", "--imports-cmd", "syncmap-no-such-normalizer"],
    );
    assert!(
        stderr.starts_with("syncmap: `syncmap-no-such-normalizer` failed"),
        "{}",
        stderr
    );
    assert!(files(dir.path()).is_empty());
}

#[test]
fn test_missing_template_file() {
    let dir = tempfile::tempdir().unwrap();
    let stderr = assert_failure(
        dir.path(),
        &["map[string]int", "--template", "nope.go", "--no-imports"],
    );
    assert!(stderr.starts_with("syncmap: failed to read template 'nope.go'"), "{}", stderr);
}

#[test]
fn test_missing_arguments_prints_usage() {
    let dir = tempfile::tempdir().unwrap();
    let stderr = assert_failure(dir.path(), &[]);
    assert!(stderr.contains("Usage: syncmap"), "{}", stderr);
    assert!(stderr.contains("--no-imports"), "{}", stderr);
}

#[test]
fn test_conflicting_flags() {
    let dir = tempfile::tempdir().unwrap();
    assert_failure(
        dir.path(),
        &["map[string]int", "--no-imports", "--imports-cmd", "gofmt"],
    );
}

#[test]
fn test_trace_and_timings() {
    let dir = tempfile::tempdir().unwrap();
    let stderr = assert_success(
        dir.path(),
        &["map[string]int", "--no-imports", "--trace", "--timings=json"],
    );

    assert!(stderr.contains("[specialize] function `Load`"), "{}", stderr);
    assert!(stderr.contains("[specialize] type `Map`"), "{}", stderr);
    assert!(stderr.contains("[specialize] value `expunged`"), "{}", stderr);
    assert!(stderr.contains("[emit] wrote map.go"), "{}", stderr);

    let json = stderr
        .lines()
        .find(|line| line.starts_with('{'))
        .expect("timings json line");
    let report: serde_json::Value = serde_json::from_str(json).unwrap();
    let stages: Vec<&str> = report["stages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|stage| stage["stage"].as_str().unwrap())
        .collect();
    assert_eq!(
        stages,
        vec!["read", "parse", "specialize", "validate", "rename", "print", "write"]
    );
}
