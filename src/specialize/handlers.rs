//! Declaration rules for the Go 1.9 `sync.Map`.
//!
//! Every declaration of `sync/map.go` is listed here with the parts of it
//! that hold keys or values. Declarations that hold neither are still listed,
//! so a template that gains or loses a declaration fails instead of
//! producing a half-specialized map.

use crate::error::{DeclKind, GenError};
use crate::specialize::Specializer;
use crate::specialize::registry::{DeclTable, FuncHandler, Registry, TypeHandler, ValueHandler};
use crate::syntax::Pos;
use crate::syntax::ast::{Expr, FieldList, FuncDecl, Ident, TypeSpec, ValueSpec};

pub fn sync_map() -> Registry {
    let funcs = DeclTable::new(DeclKind::Function)
        .with("Load", load as FuncHandler)
        .with("load", entry_load)
        .with("Store", store)
        .with("tryStore", value_func)
        .with("unexpungeLocked", untouched_func)
        .with("storeLocked", value_func)
        .with("LoadOrStore", load_or_store)
        .with("tryLoadOrStore", try_load_or_store)
        .with("Delete", key_func)
        .with("delete", untouched_func)
        .with("Range", range)
        .with("missLocked", untouched_func)
        .with("dirtyLocked", key_func)
        .with("tryExpungeLocked", untouched_func)
        .with("newEntry", value_func);
    let types = DeclTable::new(DeclKind::Type)
        .with("Map", map_struct as TypeHandler)
        .with("readOnly", key_type)
        .with("entry", untouched_type);
    let values = DeclTable::new(DeclKind::Value).with("expunged", value_var as ValueHandler);
    Registry::new(funcs, types, values)
}

fn results<'a>(name: &str, func: &'a mut FuncDecl) -> Result<&'a mut FieldList, GenError> {
    func.ty
        .results
        .as_mut()
        .ok_or_else(|| GenError::shape(name, "expected results"))
}

/// `Load(key) (value, ok)`
fn load(s: &Specializer, func: &mut FuncDecl) -> Result<(), GenError> {
    let name = func.name.name.clone();
    s.replace_key(&name, &mut func.ty.params)?;
    s.replace_value(&name, results(&name, func)?)?;
    s.rewrite_sentinel(func)
}

/// `(e *entry) load() (value, ok)`
fn entry_load(s: &Specializer, func: &mut FuncDecl) -> Result<(), GenError> {
    let name = func.name.name.clone();
    s.replace_value(&name, func)?;
    s.rewrite_sentinel(func)
}

/// `Store(key, value)`
fn store(s: &Specializer, func: &mut FuncDecl) -> Result<(), GenError> {
    let name = func.name.name.clone();
    s.split_pair(&name, &mut func.ty.params)
}

/// `LoadOrStore(key, value) (actual, loaded)`
fn load_or_store(s: &Specializer, func: &mut FuncDecl) -> Result<(), GenError> {
    let name = func.name.name.clone();
    s.split_pair(&name, &mut func.ty.params)?;
    s.replace_value(&name, results(&name, func)?)
}

/// `(e *entry) tryLoadOrStore(i) (actual, loaded, ok)`
fn try_load_or_store(s: &Specializer, func: &mut FuncDecl) -> Result<(), GenError> {
    let name = func.name.name.clone();
    s.replace_value(&name, func)?;
    s.rewrite_sentinel(func)
}

/// `Range(f func(key, value) bool)`
fn range(s: &Specializer, func: &mut FuncDecl) -> Result<(), GenError> {
    let name = func.name.name.clone();
    match func.ty.params.list.first_mut().map(|field| &mut field.ty) {
        Some(Expr::FuncType(callback)) => s.split_pair(&name, &mut callback.params),
        _ => Err(GenError::shape(&name, "expected a callback as the first parameter")),
    }
}

fn key_func(s: &Specializer, func: &mut FuncDecl) -> Result<(), GenError> {
    let name = func.name.name.clone();
    s.replace_key(&name, func)
}

fn value_func(s: &Specializer, func: &mut FuncDecl) -> Result<(), GenError> {
    let name = func.name.name.clone();
    s.replace_value(&name, func)
}

fn untouched_func(s: &Specializer, func: &mut FuncDecl) -> Result<(), GenError> {
    let name = func.name.name.clone();
    s.untouched(&name, func)
}

/// The struct itself. Its mutex is the package-internal `Mutex`, which is
/// `sync.Mutex` once the code lives outside package `sync`.
fn map_struct(s: &Specializer, spec: &mut TypeSpec) -> Result<(), GenError> {
    let name = spec.name.name.clone();
    let Expr::StructType(st) = &mut spec.ty else {
        return Err(GenError::shape(&name, "expected a struct type"));
    };
    match st.fields.list.first_mut() {
        Some(field) if matches!(&field.ty, Expr::Ident(ident) if ident.name == "Mutex") => {
            field.ty = sync_mutex(field.ty.pos());
        }
        _ => return Err(GenError::shape(&name, "expected `Mutex` as the first field")),
    }
    s.replace_key(&name, spec)
}

fn sync_mutex(anchor: Pos) -> Expr {
    Expr::Selector {
        x: Box::new(Expr::ident("sync", anchor)),
        sel: Ident::new("Mutex", anchor),
    }
}

fn key_type(s: &Specializer, spec: &mut TypeSpec) -> Result<(), GenError> {
    let name = spec.name.name.clone();
    s.replace_key(&name, spec)
}

fn untouched_type(s: &Specializer, spec: &mut TypeSpec) -> Result<(), GenError> {
    let name = spec.name.name.clone();
    s.untouched(&name, spec)
}

fn value_var(s: &Specializer, spec: &mut ValueSpec) -> Result<(), GenError> {
    let name = spec.names.first().map(|n| n.name.clone()).unwrap_or_default();
    s.replace_value(&name, spec)
}
