//! Mutable traversal over the syntax tree.
//!
//! Every `visit_*` method defaults to the matching `walk_*` function, which
//! descends into all children. The walks match exhaustively, so adding a
//! node kind fails to compile until each traversal handles it.

use crate::syntax::ast::*;

pub trait VisitMut {
    fn visit_file(&mut self, file: &mut File) {
        walk_file(self, file);
    }

    fn visit_decl(&mut self, decl: &mut Decl) {
        walk_decl(self, decl);
    }

    fn visit_gen_decl(&mut self, gen_decl: &mut GenDecl) {
        walk_gen_decl(self, gen_decl);
    }

    fn visit_spec(&mut self, spec: &mut Spec) {
        walk_spec(self, spec);
    }

    fn visit_func_decl(&mut self, func: &mut FuncDecl) {
        walk_func_decl(self, func);
    }

    fn visit_func_type(&mut self, ty: &mut FuncType) {
        walk_func_type(self, ty);
    }

    fn visit_field_list(&mut self, list: &mut FieldList) {
        walk_field_list(self, list);
    }

    fn visit_field(&mut self, field: &mut Field) {
        walk_field(self, field);
    }

    fn visit_block(&mut self, block: &mut Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_case_clause(&mut self, clause: &mut CaseClause) {
        walk_case_clause(self, clause);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr(self, expr);
    }

    /// An identifier that may resolve in the file scope: references,
    /// top-level declaration names and local bindings.
    fn visit_ident(&mut self, _ident: &mut Ident) {}

    /// A name that never resolves in the file scope: selector names, struct
    /// fields, method names, import names and labels.
    fn visit_member(&mut self, _ident: &mut Ident) {}
}

/// A node a traversal can start from.
pub trait Visitable {
    fn accept<V: VisitMut + ?Sized>(&mut self, v: &mut V);
}

impl Visitable for File {
    fn accept<V: VisitMut + ?Sized>(&mut self, v: &mut V) {
        v.visit_file(self);
    }
}

impl Visitable for FuncDecl {
    fn accept<V: VisitMut + ?Sized>(&mut self, v: &mut V) {
        v.visit_func_decl(self);
    }
}

impl Visitable for FuncType {
    fn accept<V: VisitMut + ?Sized>(&mut self, v: &mut V) {
        v.visit_func_type(self);
    }
}

impl Visitable for FieldList {
    fn accept<V: VisitMut + ?Sized>(&mut self, v: &mut V) {
        v.visit_field_list(self);
    }
}

impl Visitable for Field {
    fn accept<V: VisitMut + ?Sized>(&mut self, v: &mut V) {
        v.visit_field(self);
    }
}

impl Visitable for Expr {
    fn accept<V: VisitMut + ?Sized>(&mut self, v: &mut V) {
        v.visit_expr(self);
    }
}

impl Visitable for Block {
    fn accept<V: VisitMut + ?Sized>(&mut self, v: &mut V) {
        v.visit_block(self);
    }
}

impl Visitable for TypeSpec {
    fn accept<V: VisitMut + ?Sized>(&mut self, v: &mut V) {
        walk_type_spec(v, self);
    }
}

impl Visitable for ValueSpec {
    fn accept<V: VisitMut + ?Sized>(&mut self, v: &mut V) {
        walk_value_spec(v, self);
    }
}

pub fn walk_file<V: VisitMut + ?Sized>(v: &mut V, file: &mut File) {
    for decl in &mut file.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<V: VisitMut + ?Sized>(v: &mut V, decl: &mut Decl) {
    match decl {
        Decl::Gen(gen_decl) => v.visit_gen_decl(gen_decl),
        Decl::Func(func) => v.visit_func_decl(func),
    }
}

pub fn walk_gen_decl<V: VisitMut + ?Sized>(v: &mut V, gen_decl: &mut GenDecl) {
    for spec in &mut gen_decl.specs {
        v.visit_spec(spec);
    }
}

pub fn walk_spec<V: VisitMut + ?Sized>(v: &mut V, spec: &mut Spec) {
    match spec {
        Spec::Import(import) => {
            if let Some(name) = &mut import.name {
                v.visit_member(name);
            }
        }
        Spec::Type(type_spec) => walk_type_spec(v, type_spec),
        Spec::Value(value) => walk_value_spec(v, value),
    }
}

pub fn walk_type_spec<V: VisitMut + ?Sized>(v: &mut V, type_spec: &mut TypeSpec) {
    v.visit_ident(&mut type_spec.name);
    v.visit_expr(&mut type_spec.ty);
}

pub fn walk_value_spec<V: VisitMut + ?Sized>(v: &mut V, value: &mut ValueSpec) {
    for name in &mut value.names {
        v.visit_ident(name);
    }
    if let Some(ty) = &mut value.ty {
        v.visit_expr(ty);
    }
    for expr in &mut value.values {
        v.visit_expr(expr);
    }
}

pub fn walk_func_decl<V: VisitMut + ?Sized>(v: &mut V, func: &mut FuncDecl) {
    if let Some(recv) = &mut func.recv {
        v.visit_field_list(recv);
        v.visit_member(&mut func.name);
    } else {
        v.visit_ident(&mut func.name);
    }
    v.visit_func_type(&mut func.ty);
    if let Some(body) = &mut func.body {
        v.visit_block(body);
    }
}

pub fn walk_func_type<V: VisitMut + ?Sized>(v: &mut V, ty: &mut FuncType) {
    v.visit_field_list(&mut ty.params);
    if let Some(results) = &mut ty.results {
        v.visit_field_list(results);
    }
}

pub fn walk_field_list<V: VisitMut + ?Sized>(v: &mut V, list: &mut FieldList) {
    for field in &mut list.list {
        v.visit_field(field);
    }
}

/// Field names are visited as identifiers; struct and interface walks
/// visit their member names themselves.
pub fn walk_field<V: VisitMut + ?Sized>(v: &mut V, field: &mut Field) {
    for name in &mut field.names {
        v.visit_ident(name);
    }
    v.visit_expr(&mut field.ty);
}

fn walk_member_fields<V: VisitMut + ?Sized>(v: &mut V, list: &mut FieldList) {
    for field in &mut list.list {
        for name in &mut field.names {
            v.visit_member(name);
        }
        v.visit_expr(&mut field.ty);
    }
}

pub fn walk_block<V: VisitMut + ?Sized>(v: &mut V, block: &mut Block) {
    for stmt in &mut block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_case_clause<V: VisitMut + ?Sized>(v: &mut V, clause: &mut CaseClause) {
    for expr in &mut clause.list {
        v.visit_expr(expr);
    }
    for stmt in &mut clause.body {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match stmt {
        Stmt::Decl(gen_decl) => v.visit_gen_decl(gen_decl),
        Stmt::Empty { .. } => {}
        Stmt::Expr(expr) => v.visit_expr(expr),
        Stmt::Send { chan, value, .. } => {
            v.visit_expr(chan);
            v.visit_expr(value);
        }
        Stmt::IncDec { x, .. } => v.visit_expr(x),
        Stmt::Assign { lhs, rhs, .. } => {
            for expr in lhs {
                v.visit_expr(expr);
            }
            for expr in rhs {
                v.visit_expr(expr);
            }
        }
        Stmt::Go { call, .. } | Stmt::Defer { call, .. } => v.visit_expr(call),
        Stmt::Return { results, .. } => {
            for expr in results {
                v.visit_expr(expr);
            }
        }
        Stmt::Branch { label, .. } => {
            if let Some(label) = label {
                v.visit_member(label);
            }
        }
        Stmt::Block(block) => v.visit_block(block),
        Stmt::If {
            init,
            cond,
            body,
            els,
            ..
        } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            v.visit_expr(cond);
            v.visit_block(body);
            if let Some(els) = els {
                v.visit_stmt(els);
            }
        }
        Stmt::Switch {
            init, tag, clauses, ..
        } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(tag) = tag {
                v.visit_stmt(tag);
            }
            for clause in clauses {
                v.visit_case_clause(clause);
            }
        }
        Stmt::For {
            init,
            cond,
            post,
            body,
            ..
        } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            if let Some(post) = post {
                v.visit_stmt(post);
            }
            v.visit_block(body);
        }
        Stmt::Range {
            key,
            value,
            x,
            body,
            ..
        } => {
            if let Some(key) = key {
                v.visit_expr(key);
            }
            if let Some(value) = value {
                v.visit_expr(value);
            }
            v.visit_expr(x);
            v.visit_block(body);
        }
    }
}

pub fn walk_expr<V: VisitMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match expr {
        Expr::Ident(ident) => v.visit_ident(ident),
        Expr::BasicLit(_) => {}
        Expr::CompositeLit { ty, elts, .. } => {
            if let Some(ty) = ty {
                v.visit_expr(ty);
            }
            for elt in elts {
                v.visit_expr(elt);
            }
        }
        Expr::FuncLit { ty, body } => {
            v.visit_func_type(ty);
            v.visit_block(body);
        }
        Expr::Paren { x, .. } => v.visit_expr(x),
        Expr::Selector { x, sel } => {
            v.visit_expr(x);
            v.visit_member(sel);
        }
        Expr::Index { x, index, .. } => {
            v.visit_expr(x);
            v.visit_expr(index);
        }
        Expr::Slice {
            x, low, high, max, ..
        } => {
            v.visit_expr(x);
            for part in [low, high, max].into_iter().flatten() {
                v.visit_expr(part);
            }
        }
        Expr::TypeAssert { x, ty, .. } => {
            v.visit_expr(x);
            if let Some(ty) = ty {
                v.visit_expr(ty);
            }
        }
        Expr::Call { fun, args, .. } => {
            v.visit_expr(fun);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::Star { x, .. } | Expr::Unary { x, .. } => v.visit_expr(x),
        Expr::Binary { x, y, .. } => {
            v.visit_expr(x);
            v.visit_expr(y);
        }
        Expr::KeyValue { key, value, .. } => {
            v.visit_expr(key);
            v.visit_expr(value);
        }
        Expr::Ellipsis { elt, .. } => {
            if let Some(elt) = elt {
                v.visit_expr(elt);
            }
        }
        Expr::ArrayType { len, elt, .. } => {
            if let Some(len) = len {
                v.visit_expr(len);
            }
            v.visit_expr(elt);
        }
        Expr::StructType(st) => walk_member_fields(v, &mut st.fields),
        Expr::FuncType(ft) => v.visit_func_type(ft),
        Expr::InterfaceType(it) => walk_member_fields(v, &mut it.methods),
        Expr::MapType { key, value, .. } => {
            v.visit_expr(key);
            v.visit_expr(value);
        }
        Expr::ChanType { value, .. } => v.visit_expr(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_file;

    #[derive(Default)]
    struct Names {
        idents: Vec<String>,
        members: Vec<String>,
    }

    impl VisitMut for Names {
        fn visit_ident(&mut self, ident: &mut Ident) {
            self.idents.push(ident.name.clone());
        }

        fn visit_member(&mut self, ident: &mut Ident) {
            self.members.push(ident.name.clone());
        }
    }

    #[test]
    fn test_idents_and_members_are_separated() {
        let mut file = parse_file(
            "test.go",
            "package p\ntype T struct {\n\tf int\n}\nfunc (t *T) M() int {\n\treturn t.f\n}\n",
        )
        .unwrap();
        let mut names = Names::default();
        names.visit_file(&mut file);

        assert_eq!(names.idents, vec!["T", "int", "t", "T", "int", "t"]);
        assert_eq!(names.members, vec!["f", "M", "f"]);
    }

    struct Upcase;

    impl VisitMut for Upcase {
        fn visit_ident(&mut self, ident: &mut Ident) {
            ident.name = ident.name.to_uppercase();
        }
    }

    #[test]
    fn test_visit_mut_rewrites_nested_nodes() {
        let mut file = parse_file(
            "test.go",
            "package p\nfunc f() {\n\tfor k, e := range m {\n\t\tif g(func() { x++ }) {\n\t\t}\n\t}\n}\n",
        )
        .unwrap();
        let mut names = Names::default();
        Upcase.visit_file(&mut file);
        names.visit_file(&mut file);

        assert_eq!(names.idents, vec!["F", "K", "E", "M", "G", "X"]);
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

    #[test]
    fn test_template_placeholders_are_reachable() {
        let mut file = parse_file("map.go", include_str!("../../templates/sync_map.go")).unwrap();
        let mut count = CountEmptyInterfaces(0);
        count.visit_file(&mut file);
        assert_eq!(count.0, 20);
    }
}
