//! The generator run, from template to written file.

use crate::config::{GenConfig, TimingsFormat};
use crate::emit;
use crate::error::GenError;
use crate::specialize::{MapTypes, RenameMap, Specializer, handlers, rename};
use crate::syntax::{self, LineTable};
use crate::template::Template;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Wall-clock time spent in each stage of a run, in first-seen order.
#[derive(Debug, Default)]
pub struct Timings {
    stages: Vec<(&'static str, Duration)>,
}

#[derive(Serialize)]
struct StageReport {
    stage: &'static str,
    ms: f64,
}

#[derive(Serialize)]
struct TimingsReport {
    stages: Vec<StageReport>,
    total_ms: f64,
}

impl Timings {
    /// Run `f`, adding its duration to `stage`.
    pub fn time<T>(&mut self, stage: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        match self.stages.iter_mut().find(|(name, _)| *name == stage) {
            Some((_, total)) => *total += elapsed,
            None => self.stages.push((stage, elapsed)),
        }
        result
    }

    pub fn stages(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stages.iter().map(|(name, _)| *name)
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(|(_, d)| *d).sum()
    }

    pub fn report(&self, format: TimingsFormat) -> String {
        match format {
            TimingsFormat::Human => {
                let mut out = String::new();
                for (name, duration) in &self.stages {
                    out.push_str(&format!("[timings] {:<10} {:>10.3} ms\n", name, ms(*duration)));
                }
                out.push_str(&format!("[timings] {:<10} {:>10.3} ms\n", "total", ms(self.total())));
                out
            }
            TimingsFormat::Json => {
                let report = TimingsReport {
                    stages: self
                        .stages
                        .iter()
                        .map(|&(stage, duration)| StageReport {
                            stage,
                            ms: ms(duration),
                        })
                        .collect(),
                    total_ms: ms(self.total()),
                };
                serde_json::to_string(&report).unwrap_or_default() + "\n"
            }
        }
    }
}

fn ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Specialize `template` for `config` and return the generated source.
pub fn generate(
    config: &GenConfig,
    template: &Template,
    timings: &mut Timings,
) -> Result<String, GenError> {
    config.validate()?;

    let (types, mut file) = timings.time("parse", || -> Result<_, GenError> {
        let types = MapTypes::parse(&config.map_type)?;
        let file = syntax::parse_file(&template.name, &template.source)?;
        Ok((types, file))
    })?;
    if config.trace {
        eprintln!(
            "[specialize] key `{}`, value `{}`",
            types.key.text(),
            types.value.text()
        );
    }

    let specializer = Specializer::new(types).with_trace(config.trace);
    let mut registry = handlers::sync_map();
    timings.time("specialize", || specializer.specialize(&mut file, &mut registry))?;
    let validated = timings.time("validate", || registry.finalize())?;

    let renamed = timings.time("rename", || {
        rename::rename(&mut file, &RenameMap::for_struct(&config.name))
    })?;
    if config.trace {
        eprintln!("[specialize] renamed {} identifiers", renamed);
    }

    file.name.name = config.package.clone();
    emit::add_import(&mut file, "sync");

    let lines = LineTable::new(&template.source);
    timings.time("print", || emit::render(&file, &lines, &validated))
}

/// Load the template, generate, and write the output file. Returns the path
/// written.
pub fn run(config: &GenConfig) -> Result<PathBuf, GenError> {
    let mut timings = Timings::default();
    let template = timings.time("read", || config.template.load())?;
    let source = generate(config, &template, &mut timings)?;

    let dest = config.output_path();
    let staged = timings.time("write", || emit::stage(&dest, &source))?;
    match &config.imports_cmd {
        Some(command) => timings.time("normalize", || staged.normalize(command, config.trace))?,
        None if config.trace => eprintln!("[emit] skipping import normalization"),
        None => {}
    }
    let written = timings.time("write", || staged.persist())?;
    if config.trace {
        eprintln!("[emit] wrote {}", written.display());
    }

    if let Some(format) = config.timings {
        eprint!("{}", timings.report(format));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateSource;

    fn config(map_type: &str) -> GenConfig {
        GenConfig {
            map_type: map_type.to_string(),
            ..GenConfig::default()
        }
    }

    fn generate_embedded(config: &GenConfig) -> Result<String, GenError> {
        let template = TemplateSource::Embedded.load()?;
        generate(config, &template, &mut Timings::default())
    }

    #[test]
    fn test_generate_header_and_package() {
        let source = generate_embedded(&config("map[string]int")).unwrap();
        assert!(source.starts_with("// Code generated by syncmap; DO NOT EDIT.\n\n"));
        assert!(source.contains("\npackage main\n"));
        assert!(source.contains("import (\n\t\"sync\"\n\t\"sync/atomic\"\n\t\"unsafe\"\n)\n"));
        assert!(source.contains("\tmu sync.Mutex\n"));
    }

    #[test]
    fn test_generate_is_deterministic() {
        let config = config("map[string]*Item");
        assert_eq!(
            generate_embedded(&config).unwrap(),
            generate_embedded(&config).unwrap()
        );
    }

    #[test]
    fn test_generate_rejects_bad_names() {
        let config = GenConfig {
            name: "type".to_string(),
            ..config("map[string]int")
        };
        let err = generate_embedded(&config).unwrap_err();
        assert_eq!(err.to_string(), "invalid struct name `type`: reserved keyword");
    }

    #[test]
    fn test_generate_rejects_bad_literal() {
        let err = generate_embedded(&config("[]int")).unwrap_err();
        assert!(matches!(err, GenError::InvalidMapType { .. }));
    }

    #[test]
    fn test_stages_recorded() {
        let template = TemplateSource::Embedded.load().unwrap();
        let mut timings = Timings::default();
        generate(&config("map[int]int"), &template, &mut timings).unwrap();
        assert_eq!(
            timings.stages().collect::<Vec<_>>(),
            vec!["parse", "specialize", "validate", "rename", "print"]
        );
    }

    #[test]
    fn test_timings_accumulate() {
        let mut timings = Timings::default();
        timings.time("write", || ());
        timings.time("normalize", || ());
        timings.time("write", || ());
        assert_eq!(timings.stages().collect::<Vec<_>>(), vec!["write", "normalize"]);
    }

    #[test]
    fn test_timings_reports() {
        let mut timings = Timings::default();
        timings.time("parse", || ());

        let human = timings.report(TimingsFormat::Human);
        assert!(human.starts_with("[timings] parse"));
        assert!(human.contains("[timings] total"));

        let json: serde_json::Value =
            serde_json::from_str(&timings.report(TimingsFormat::Json)).unwrap();
        assert_eq!(json["stages"][0]["stage"], "parse");
        assert!(json["total_ms"].is_number());
    }

    #[test]
    fn test_run_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = GenConfig {
            name: "IntMap".to_string(),
            out: Some(dir.path().join("intmap.go")),
            imports_cmd: None,
            ..config("map[string]int")
        };
        let written = run(&config).unwrap();
        let source = std::fs::read_to_string(&written).unwrap();
        assert!(source.contains("type IntMap struct {"));
    }

    #[test]
    fn test_run_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = GenConfig {
            out: Some(dir.path().join("map.go")),
            imports_cmd: Some("syncmap-no-such-normalizer".to_string()),
            ..config("map[string]int")
        };
        assert!(run(&config).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
