//! Where the `sync.Map` source to specialize comes from.

use crate::error::GenError;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The Go 1.9 `sync/map.go`, the layout the declaration rules are written for.
pub const EMBEDDED: &str = include_str!("../templates/sync_map.go");

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateSource {
    /// The copy compiled into the binary.
    #[default]
    Embedded,
    File(PathBuf),
    /// `$GOROOT/src/sync/map.go` of the local Go installation.
    GoRoot,
}

/// Template text and the name errors are reported against.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub source: String,
}

impl TemplateSource {
    pub fn load(&self) -> Result<Template, GenError> {
        match self {
            TemplateSource::Embedded => Ok(Template {
                name: "sync/map.go".to_string(),
                source: EMBEDDED.to_string(),
            }),
            TemplateSource::File(path) => read_template(path),
            TemplateSource::GoRoot => read_template(&map_source_in(&goroot()?)),
        }
    }
}

fn read_template(path: &Path) -> Result<Template, GenError> {
    let source = fs::read_to_string(path).map_err(|source| GenError::TemplateRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Template {
        name: path.display().to_string(),
        source,
    })
}

/// Path of `sync/map.go` inside a Go installation.
pub fn map_source_in(goroot: &Path) -> PathBuf {
    goroot.join("src").join("sync").join("map.go")
}

/// `$GOROOT` if set, else whatever `go env GOROOT` reports.
fn goroot() -> Result<PathBuf, GenError> {
    if let Some(root) = env::var_os("GOROOT").filter(|root| !root.is_empty()) {
        return Ok(PathBuf::from(root));
    }

    let output = Command::new("go")
        .args(["env", "GOROOT"])
        .output()
        .map_err(|e| GenError::GoRoot(format!("failed to run `go env GOROOT`: {}", e)))?;
    if !output.status.success() {
        return Err(GenError::GoRoot(format!(
            "`go env GOROOT` exited with {}",
            output.status
        )));
    }
    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if root.is_empty() {
        return Err(GenError::GoRoot("`go env GOROOT` printed nothing".to_string()));
    }
    Ok(PathBuf::from(root))
}
