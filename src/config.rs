//! Generator configuration types.

use crate::error::GenError;
use crate::syntax::lexer::is_keyword;
use crate::template::TemplateSource;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Output format for `--timings`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimingsFormat {
    /// One line per stage
    #[default]
    Human,
    /// A single JSON object
    Json,
}

/// Configuration for one generator run
#[derive(Debug, Clone)]
pub struct GenConfig {
    /// The `map[K]V` literal to specialize for.
    pub map_type: String,
    pub package: String,
    /// Name of the generated struct.
    pub name: String,
    /// Output path (None = derived from `name`)
    pub out: Option<PathBuf>,
    pub template: TemplateSource,
    /// Import normalizer run on the written file (None = skip)
    pub imports_cmd: Option<String>,
    pub trace: bool,
    pub timings: Option<TimingsFormat>,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            map_type: String::new(),
            package: "main".to_string(),
            name: "Map".to_string(),
            out: None,
            template: TemplateSource::Embedded,
            imports_cmd: Some("goimports".to_string()),
            trace: false,
            timings: None,
        }
    }
}

impl GenConfig {
    /// Where the generated file goes: `out`, or the lowercased struct name
    /// with a `.go` extension.
    pub fn output_path(&self) -> PathBuf {
        match &self.out {
            Some(out) => out.clone(),
            None => PathBuf::from(format!("{}.go", self.name.to_lowercase())),
        }
    }

    /// Check the names that end up in the generated source.
    pub fn validate(&self) -> Result<(), GenError> {
        validate_identifier("package", &self.package)?;
        validate_identifier("struct", &self.name)?;
        Ok(())
    }
}

/// Reject anything that is not a usable Go identifier.
pub fn validate_identifier(what: &'static str, name: &str) -> Result<(), GenError> {
    let invalid = |reason| GenError::InvalidIdentifier {
        what,
        name: name.to_string(),
        reason,
    };

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(invalid("empty name"));
    };
    if !(first.is_alphabetic() || first == '_') || !chars.all(|c| c.is_alphanumeric() || c == '_') {
        return Err(invalid("not an identifier"));
    }
    if name == "_" {
        return Err(invalid("blank identifier"));
    }
    if is_keyword(name) {
        return Err(invalid("reserved keyword"));
    }
    Ok(())
}

/// Config file (`--config <FILE>`)
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub generate: GenerateSection,
}

/// The `[generate]` table. Every key is optional; a present key overrides
/// the built-in default and is itself overridden by the command line.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateSection {
    pub package: Option<String>,
    pub name: Option<String>,
    pub out: Option<PathBuf>,
    pub imports_cmd: Option<String>,
    pub template: Option<PathBuf>,
}

impl ConfigFile {
    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, GenError> {
        let content = fs::read_to_string(path).map_err(|e| GenError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse_from(path, &content)
    }

    /// Parse config text that did not come from a file.
    pub fn parse(content: &str) -> Result<Self, GenError> {
        Self::parse_from(Path::new("<inline>"), content)
    }

    fn parse_from(path: &Path, content: &str) -> Result<Self, GenError> {
        toml::from_str(content).map_err(|e| GenError::Config {
            path: path.to_path_buf(),
            reason: e.to_string().trim_end().to_string(),
        })
    }

    /// Layer the file's settings over `config`. Relative paths are resolved
    /// against `base`, the directory holding the file.
    pub fn apply(&self, config: &mut GenConfig, base: &Path) {
        let section = &self.generate;
        if let Some(package) = &section.package {
            config.package = package.clone();
        }
        if let Some(name) = &section.name {
            config.name = name.clone();
        }
        if let Some(out) = &section.out {
            config.out = Some(base.join(out));
        }
        if let Some(cmd) = &section.imports_cmd {
            config.imports_cmd = Some(cmd.clone());
        }
        if let Some(template) = &section.template {
            config.template = TemplateSource::File(base.join(template));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GenConfig::default();
        assert_eq!(config.package, "main");
        assert_eq!(config.name, "Map");
        assert_eq!(config.output_path(), PathBuf::from("map.go"));
        assert_eq!(config.imports_cmd.as_deref(), Some("goimports"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_path_follows_name() {
        let config = GenConfig {
            name: "IntMap".to_string(),
            ..GenConfig::default()
        };
        assert_eq!(config.output_path(), PathBuf::from("intmap.go"));

        let config = GenConfig {
            out: Some(PathBuf::from("gen/ints.go")),
            ..config
        };
        assert_eq!(config.output_path(), PathBuf::from("gen/ints.go"));
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("struct", "IntMap").is_ok());
        assert!(validate_identifier("struct", "_private2").is_ok());

        for (name, reason) in [
            ("", "empty name"),
            ("1st", "not an identifier"),
            ("my-map", "not an identifier"),
            ("_", "blank identifier"),
            ("func", "reserved keyword"),
        ] {
            match validate_identifier("struct", name) {
                Err(GenError::InvalidIdentifier { reason: got, .. }) => assert_eq!(got, reason),
                other => panic!("{:?}: unexpected {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_config_file_layers_over_defaults() {
        let file = ConfigFile::parse(
            r#"
[generate]
package = "cache"
name = "StringMap"
out = "gen/strings.go"
"#,
        )
        .unwrap();

        let mut config = GenConfig::default();
        file.apply(&mut config, Path::new("/work"));
        assert_eq!(config.package, "cache");
        assert_eq!(config.name, "StringMap");
        assert_eq!(config.out, Some(PathBuf::from("/work/gen/strings.go")));
        assert_eq!(config.imports_cmd.as_deref(), Some("goimports"));
        assert!(matches!(config.template, TemplateSource::Embedded));
    }

    #[test]
    fn test_config_file_template_path() {
        let file = ConfigFile::parse("[generate]\ntemplate = \"map.go.tmpl\"\n").unwrap();
        let mut config = GenConfig::default();
        file.apply(&mut config, Path::new("conf"));
        assert!(
            matches!(&config.template, TemplateSource::File(path) if path == Path::new("conf/map.go.tmpl"))
        );
    }

    #[test]
    fn test_config_file_rejects_unknown_keys() {
        let err = ConfigFile::parse("[generate]\npkg = \"x\"\n").unwrap_err();
        assert!(err.to_string().contains("unknown field"), "{}", err);
    }

    #[test]
    fn test_empty_config_file() {
        let file = ConfigFile::parse("").unwrap();
        let mut config = GenConfig::default();
        file.apply(&mut config, Path::new("."));
        assert_eq!(config.name, "Map");
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigFile::load(Path::new("/nonexistent/syncmap.toml")).unwrap_err();
        assert!(matches!(err, GenError::Config { .. }));
        assert!(err.to_string().contains("/nonexistent/syncmap.toml"));
    }
}
