//! Specialization of the `sync.Map` template.
//!
//! Every top-level declaration of the template is looked up in a
//! [`Registry`] and handed to its handler, which retypes the placeholders in
//! the parts of the declaration that hold keys or values. Afterwards the
//! registry must be empty, and the declared names are rewritten for the
//! generated struct.

pub mod handlers;
pub mod position;
pub mod registry;
pub mod rename;
pub mod substitute;
pub mod typeexpr;

pub use registry::{Registry, RegistryState, Validated};
pub use rename::RenameMap;
pub use typeexpr::{MapTypes, TypeExpression};

use crate::error::{DeclKind, GenError};
use crate::syntax::ast::{Decl, FieldList, File, FuncDecl, Spec};
use crate::syntax::visit::Visitable;

/// Applies declaration handlers for one pair of key and value types.
pub struct Specializer {
    types: MapTypes,
    trace: bool,
}

impl Specializer {
    pub fn new(types: MapTypes) -> Self {
        Self {
            types,
            trace: false,
        }
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn types(&self) -> &MapTypes {
        &self.types
    }

    /// Dispatch every declaration of `file` to its handler. The first
    /// failure aborts `registry`.
    pub fn specialize(&self, file: &mut File, registry: &mut Registry) -> Result<(), GenError> {
        let result = self.dispatch(file, registry);
        if result.is_err() {
            registry.abort();
        }
        result
    }

    fn dispatch(&self, file: &mut File, registry: &mut Registry) -> Result<(), GenError> {
        for decl in &mut file.decls {
            match decl {
                Decl::Func(func) => {
                    let handler = registry.take_func(&func.name.name)?;
                    self.trace(DeclKind::Function, &func.name.name);
                    handler(self, func)?;
                }
                Decl::Gen(gen_decl) => {
                    for spec in &mut gen_decl.specs {
                        match spec {
                            Spec::Import(_) => {}
                            Spec::Type(type_spec) => {
                                let handler = registry.take_type(&type_spec.name.name)?;
                                self.trace(DeclKind::Type, &type_spec.name.name);
                                handler(self, type_spec)?;
                            }
                            Spec::Value(value) => {
                                let [name] = value.names.as_slice() else {
                                    return Err(GenError::ValueArity(value.names.len()));
                                };
                                let handler = registry.take_value(&name.name)?;
                                self.trace(DeclKind::Value, &name.name);
                                handler(self, value)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn trace(&self, kind: DeclKind, name: &str) {
        if self.trace {
            eprintln!("[specialize] {} `{}`", kind, name);
        }
    }

    /// Retype the placeholders under `node` with the key type.
    pub fn replace_key<N: Visitable>(&self, decl: &str, node: &mut N) -> Result<(), GenError> {
        expect_placeholders(decl, substitute::replace(node, &self.types.key))
    }

    /// Retype the placeholders under `node` with the value type.
    pub fn replace_value<N: Visitable>(&self, decl: &str, node: &mut N) -> Result<(), GenError> {
        expect_placeholders(decl, substitute::replace(node, &self.types.value))
    }

    pub fn split_pair(&self, decl: &str, list: &mut FieldList) -> Result<(), GenError> {
        substitute::split_pair(decl, list, &self.types)
    }

    pub fn rewrite_sentinel(&self, func: &mut FuncDecl) -> Result<(), GenError> {
        let decl = func.name.name.clone();
        substitute::rewrite_sentinel(&decl, func, &self.types.value)?;
        Ok(())
    }

    /// Accept a declaration that holds neither keys nor values.
    pub fn untouched<N: Visitable>(&self, decl: &str, node: &mut N) -> Result<(), GenError> {
        match substitute::count_placeholders(node) {
            0 => Ok(()),
            n => Err(GenError::shape(
                decl,
                format!("{} placeholder(s) in a declaration that is not specialized", n),
            )),
        }
    }
}

fn expect_placeholders(decl: &str, replaced: usize) -> Result<(), GenError> {
    if replaced == 0 {
        return Err(GenError::shape(decl, "no placeholder to specialize"));
    }
    Ok(())
}
