//! Writing the generated file.
//!
//! Output goes to a temporary file next to its destination. The import
//! normalizer runs on that file, and only when it succeeds is the file
//! moved into place, so a failed run never leaves a partial artifact.

use crate::error::GenError;
use crate::specialize::Validated;
use crate::specialize::position::SetPos;
use crate::syntax::ast::{BasicLit, Decl, File, GenDecl, GenKind, ImportSpec, LitKind, Spec};
use crate::syntax::{LineTable, Pos, format_file};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;

pub const HEADER: &str = "// Code generated by syncmap; DO NOT EDIT.\n\n";

/// Import `path` unless the file already does. The new spec goes into the
/// first import declaration, in sorted position; a file with no imports gets
/// a new declaration after the package clause. Returns whether an import was
/// added.
pub fn add_import(file: &mut File, path: &str) -> bool {
    if file.imports().any(|import| import.path_value() == path) {
        return false;
    }

    let import_decl = file.decls.iter_mut().find_map(|decl| match decl {
        Decl::Gen(gen_decl) if gen_decl.kind == GenKind::Import => Some(gen_decl),
        _ => None,
    });

    match import_decl {
        Some(gen_decl) => {
            let index = gen_decl
                .specs
                .iter()
                .position(|spec| matches!(spec, Spec::Import(import) if import.path_value() > path))
                .unwrap_or(gen_decl.specs.len());
            let anchor = match gen_decl.specs.get(index) {
                Some(next) => next.pos(),
                None => gen_decl.end(),
            };
            if gen_decl.lparen.is_none() {
                gen_decl.lparen = Some(gen_decl.pos);
                gen_decl.rparen = Some(gen_decl.end());
            }
            gen_decl.specs.insert(index, import_spec(path, anchor));
        }
        None => {
            let anchor = file.name.pos;
            let gen_decl = GenDecl {
                kind: GenKind::Import,
                pos: anchor,
                lparen: None,
                specs: vec![import_spec(path, anchor)],
                rparen: None,
            };
            file.decls.insert(0, Decl::Gen(gen_decl));
        }
    }
    true
}

fn import_spec(path: &str, anchor: Pos) -> Spec {
    let mut spec = Spec::Import(ImportSpec {
        name: None,
        path: BasicLit {
            kind: LitKind::String,
            value: format!("\"{}\"", path),
            pos: Pos::NONE,
        },
    });
    spec.set_pos(anchor);
    spec
}

/// Print the specialized file behind the generated-code header.
pub fn render(file: &File, lines: &LineTable, _validated: &Validated) -> Result<String, GenError> {
    Ok(format!("{}{}", HEADER, format_file(file, lines)?))
}

/// Generated source written to a temporary file, not yet at its destination.
pub struct Staged {
    temp: NamedTempFile,
    dest: PathBuf,
}

/// Write `contents` to a temporary file in the directory of `dest`.
pub fn stage(dest: &Path, contents: &str) -> Result<Staged, GenError> {
    let write_err = |source| GenError::Write {
        path: dest.to_path_buf(),
        source,
    };

    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::Builder::new()
        .prefix(".syncmap-")
        .suffix(".go")
        .tempfile_in(dir)
        .map_err(write_err)?;
    temp.write_all(contents.as_bytes()).map_err(write_err)?;
    temp.flush().map_err(write_err)?;

    Ok(Staged {
        temp,
        dest: dest.to_path_buf(),
    })
}

impl Staged {
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Run `command -w <file>` on the staged file. `command` may carry its
    /// own arguments, separated by whitespace.
    pub fn normalize(&self, command: &str, trace: bool) -> Result<(), GenError> {
        let fail = |reason: String| GenError::PostProcess {
            command: command.to_string(),
            reason,
        };

        let mut words = command.split_whitespace();
        let program = words.next().ok_or_else(|| fail("empty command".to_string()))?;
        if trace {
            eprintln!("[emit] running {} -w {}", command, self.path().display());
        }

        let output = Command::new(program)
            .args(words)
            .arg("-w")
            .arg(self.path())
            .output()
            .map_err(|e| fail(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            return Err(fail(if stderr.is_empty() {
                output.status.to_string()
            } else {
                format!("{}: {}", output.status, stderr)
            }));
        }
        Ok(())
    }

    /// Move the staged file to its destination.
    pub fn persist(self) -> Result<PathBuf, GenError> {
        let Staged { temp, dest } = self;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(temp.path(), std::fs::Permissions::from_mode(0o644)).map_err(
                |source| GenError::Write {
                    path: dest.clone(),
                    source,
                },
            )?;
        }
        temp.persist(&dest).map_err(|e| GenError::Write {
            path: dest.clone(),
            source: e.error,
        })?;
        Ok(dest)
    }
}
