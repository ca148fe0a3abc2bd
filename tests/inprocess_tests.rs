//! In-process integration tests.
//!
//! These tests call the generator APIs directly instead of spawning a
//! separate process, so they are included in coverage measurement.

use std::fs;

use syncmap::syntax::ast::Expr;
use syncmap::syntax::parse_file;
use syncmap::syntax::visit::{VisitMut, walk_expr};
use syncmap::{GenConfig, GenError, Template, TemplateSource, Timings};

fn config(map_type: &str, name: &str) -> GenConfig {
    GenConfig {
        map_type: map_type.to_string(),
        name: name.to_string(),
        imports_cmd: None,
        ..GenConfig::default()
    }
}

fn generate(config: &GenConfig) -> Result<String, GenError> {
    let template = TemplateSource::Embedded.load()?;
    syncmap::generate(config, &template, &mut Timings::default())
}

fn generate_from(config: &GenConfig, source: String) -> Result<String, GenError> {
    let template = Template {
        name: "map.go".to_string(),
        source,
    };
    syncmap::generate(config, &template, &mut Timings::default())
}

struct CountEmptyInterfaces(usize);

impl VisitMut for CountEmptyInterfaces {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if expr.is_empty_interface() {
            self.0 += 1;
        }
        walk_expr(self, expr);
    }
}

// Generated API

#[test]
fn test_int_map_signatures() {
    let source = generate(&config("map[string]int", "IntMap")).unwrap();
    assert!(source.contains("type IntMap struct {"));
    assert!(source.contains("func (m *IntMap) Load(key string) (value int, ok bool) {"));
    assert!(source.contains("func (m *IntMap) Store(key string, value int) {"));
    assert!(source.contains(
        "func (m *IntMap) LoadOrStore(key string, value int) (actual int, loaded bool) {"
    ));
    assert!(source.contains("func (m *IntMap) Delete(key string) {"));
    assert!(source.contains("func (m *IntMap) Range(f func(key string, value int) bool) {"));
}

#[test]
fn test_companions_are_renamed() {
    let source = generate(&config("map[string]int", "IntMap")).unwrap();
    assert!(source.contains("type readOnlyIntMap struct {"));
    assert!(source.contains("type entryIntMap struct {"));
    assert!(source.contains("var expungedIntMap = unsafe.Pointer(new(int))"));
    assert!(source.contains("func newEntryIntMap(i int) *entryIntMap {"));
    assert!(!source.contains("*entry)"));
}

#[test]
fn test_sentinel_return_for_value_types() {
    let source = generate(&config("map[string]int", "IntMap")).unwrap();
    assert!(!source.contains("return nil, false"));
    assert!(source.contains("return value, false"));
    assert!(source.contains("return actual, false, false"));
}

#[test]
fn test_pointer_values_keep_nil() {
    let source = generate(&config("map[string]*Item", "ItemMap")).unwrap();
    assert!(source.contains("func (m *ItemMap) Load(key string) (value *Item, ok bool) {"));
    assert!(source.contains("return nil, false"));
}

#[test]
fn test_key_equals_value_collapses() {
    let source = generate(&config("map[string]string", "StringMap")).unwrap();
    assert!(source.contains("func (m *StringMap) Store(key, value string) {"));
    assert!(source.contains("func (m *StringMap) Range(f func(key, value string) bool) {"));
}

#[test]
fn test_package_and_imports() {
    let config = GenConfig {
        package: "cache".to_string(),
        ..config("map[int64]bool", "Flags")
    };
    let source = generate(&config).unwrap();
    assert!(source.starts_with("// Code generated by syncmap; DO NOT EDIT.\n\n"));
    assert!(source.contains("\npackage cache\n"));
    assert!(source.contains("\t\"sync\"\n"));
    assert!(source.contains("mu sync.Mutex"));
}

#[test]
fn test_no_placeholders_left() {
    let source = generate(&config("map[string]int", "IntMap")).unwrap();
    let mut file = parse_file("intmap.go", &source).unwrap();
    let mut count = CountEmptyInterfaces(0);
    count.visit_file(&mut file);
    assert_eq!(count.0, 0);
}

#[test]
fn test_output_reparses_with_same_declarations() {
    let source = generate(&config("map[[16]byte][]string", "Blobs16")).unwrap();
    let file = parse_file("blobs16.go", &source).unwrap();
    assert_eq!(file.name.name, "main");
    assert_eq!(file.decls.len(), 20);
    assert_eq!(file.scope.len(), 5);
}

#[test]
fn test_deterministic() {
    let config = config("map[string][]byte", "Blobs");
    assert_eq!(generate(&config).unwrap(), generate(&config).unwrap());
}

// Template integrity

#[test]
fn test_extra_declaration_fails() {
    let source = format!(
        "{}\nfunc (m *Map) Swap(key, value interface{{}}) {{\n}}\n",
        syncmap::template::EMBEDDED
    );
    let err = generate_from(&config("map[string]int", "IntMap"), source).unwrap_err();
    assert_eq!(err.to_string(), "unrecognized function `Swap`");
}

#[test]
fn test_missing_declaration_fails() {
    let source = syncmap::template::EMBEDDED.replace("var expunged", "var _");
    let err = generate_from(&config("map[string]int", "IntMap"), source).unwrap_err();
    assert_eq!(err.to_string(), "unrecognized value `_`");

    let start = syncmap::template::EMBEDDED
        .find("func (m *Map) missLocked()")
        .unwrap();
    let end = start + syncmap::template::EMBEDDED[start..].find("\n}\n").unwrap() + 3;
    let mut source = syncmap::template::EMBEDDED.to_string();
    source.replace_range(start..end, "");
    let err = generate_from(&config("map[string]int", "IntMap"), source).unwrap_err();
    assert_eq!(err.to_string(), "function `missLocked` was never matched");
}

#[test]
fn test_extra_declaration_writes_nothing() {
    let template_dir = tempfile::tempdir().unwrap();
    let template = template_dir.path().join("map.go");
    fs::write(
        &template,
        format!(
            "{}\nfunc (m *Map) Swap(key, value interface{{}}) {{\n}}\n",
            syncmap::template::EMBEDDED
        ),
    )
    .unwrap();

    let out_dir = tempfile::tempdir().unwrap();
    let config = GenConfig {
        out: Some(out_dir.path().join("intmap.go")),
        template: TemplateSource::File(template),
        ..config("map[string]int", "IntMap")
    };
    let err = syncmap::run(&config).unwrap_err();
    assert_eq!(err.to_string(), "unrecognized function `Swap`");
    assert_eq!(fs::read_dir(out_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_template_syntax_error() {
    let err = generate_from(
        &config("map[string]int", "IntMap"),
        "package sync\n\nfunc (m *Map) Load( {\n}\n".to_string(),
    )
    .unwrap_err();
    assert!(matches!(err, GenError::Syntax(_)));
    assert!(err.to_string().contains("--> map.go:3:"), "{}", err);
}

// Caller input

#[test]
fn test_invalid_map_literals() {
    for literal in ["", "map[string]", "[]int", "map[string]int extra"] {
        let err = generate(&config(literal, "IntMap")).unwrap_err();
        assert!(
            matches!(err, GenError::InvalidMapType { .. }),
            "{:?}: {}",
            literal,
            err
        );
    }
}

#[test]
fn test_invalid_names() {
    let err = generate(&config("map[string]int", "Int-Map")).unwrap_err();
    assert_eq!(err.to_string(), "invalid struct name `Int-Map`: not an identifier");

    let config = GenConfig {
        package: "go".to_string(),
        ..config("map[string]int", "IntMap")
    };
    let err = generate(&config).unwrap_err();
    assert_eq!(err.to_string(), "invalid package name `go`: reserved keyword");
}

// Writing

#[test]
fn test_run_writes_into_out_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = GenConfig {
        out: Some(dir.path().join("gen.go")),
        ..config("map[string]int", "IntMap")
    };
    let written = syncmap::run(&config).unwrap();
    assert_eq!(written, dir.path().join("gen.go"));
    let source = fs::read_to_string(&written).unwrap();
    assert!(source.contains("type IntMap struct {"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_run_with_template_file() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("map.go.tmpl");
    fs::write(&template, syncmap::template::EMBEDDED).unwrap();

    let config = GenConfig {
        out: Some(dir.path().join("out.go")),
        template: TemplateSource::File(template),
        ..config("map[int]string", "Names")
    };
    syncmap::run(&config).unwrap();
    let source = fs::read_to_string(dir.path().join("out.go")).unwrap();
    assert!(source.contains("func (m *Names) Load(key int) (value string, ok bool) {"));
}

#[test]
fn test_run_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = GenConfig {
        out: Some(dir.path().join("out.go")),
        ..config("map[string]", "IntMap")
    };
    assert!(syncmap::run(&config).is_err());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
