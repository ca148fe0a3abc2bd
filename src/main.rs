use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use syncmap::{ConfigFile, GenConfig, GenError, TemplateSource, TimingsFormat};

// Wrapper type for clap ValueEnum support
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum TimingsFormatArg {
    #[default]
    Human,
    Json,
}

impl From<TimingsFormatArg> for TimingsFormat {
    fn from(arg: TimingsFormatArg) -> Self {
        match arg {
            TimingsFormatArg::Human => TimingsFormat::Human,
            TimingsFormatArg::Json => TimingsFormat::Json,
        }
    }
}

#[derive(Parser)]
#[command(name = "syncmap")]
#[command(about = "Generate a type-specialized sync.Map", long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Map type to specialize for, e.g. map[string]int
    #[arg(value_name = "MAP_TYPE")]
    map_type: String,

    /// Output file (defaults to the lowercased struct name with .go)
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Package name of the generated file [default: main]
    #[arg(long = "pkg", value_name = "NAME")]
    package: Option<String>,

    /// Name of the generated struct [default: Map]
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// Specialize this file instead of the built-in sync/map.go
    #[arg(long, value_name = "FILE", conflicts_with = "goroot")]
    template: Option<PathBuf>,

    /// Specialize $GOROOT/src/sync/map.go of the local Go installation
    #[arg(long)]
    goroot: bool,

    /// Read defaults from a TOML file with a [generate] table
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Import normalizer run as `<CMD> -w <file>` [default: goimports]
    #[arg(long, value_name = "CMD")]
    imports_cmd: Option<String>,

    /// Do not run the import normalizer
    #[arg(long, conflicts_with = "imports_cmd")]
    no_imports: bool,

    /// Trace each specialized declaration and output stage
    #[arg(long)]
    trace: bool,

    /// Print stage timings (human or json format)
    #[arg(long, value_enum, require_equals = true, num_args = 0..=1, default_missing_value = "human")]
    timings: Option<TimingsFormatArg>,
}

impl Cli {
    /// Defaults, then the config file, then flags.
    fn into_config(self) -> Result<GenConfig, GenError> {
        let mut config = GenConfig {
            map_type: self.map_type,
            ..GenConfig::default()
        };

        if let Some(path) = &self.config {
            let base = path.parent().unwrap_or(Path::new(""));
            ConfigFile::load(path)?.apply(&mut config, base);
        }

        if let Some(package) = self.package {
            config.package = package;
        }
        if let Some(name) = self.name {
            config.name = name;
        }
        if let Some(out) = self.out {
            config.out = Some(out);
        }
        if let Some(template) = self.template {
            config.template = TemplateSource::File(template);
        } else if self.goroot {
            config.template = TemplateSource::GoRoot;
        }
        if let Some(cmd) = self.imports_cmd {
            config.imports_cmd = Some(cmd);
        }
        if self.no_imports {
            config.imports_cmd = None;
        }
        config.trace = self.trace;
        config.timings = self.timings.map(Into::into);
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match cli.into_config().and_then(|config| syncmap::run(&config)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("syncmap: {}", e);
            ExitCode::FAILURE
        }
    }
}
