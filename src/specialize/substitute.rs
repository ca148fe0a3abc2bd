//! Tree rewrites applied by the declaration handlers.

use crate::error::GenError;
use crate::specialize::typeexpr::{MapTypes, TypeExpression};
use crate::syntax::ast::{Expr, Field, FieldList, FuncDecl, Stmt};
use crate::syntax::visit::{VisitMut, Visitable, walk_expr, walk_stmt};

/// Replaces every placeholder with a fresh splice of a type expression.
struct Substitute<'a> {
    target: Option<&'a TypeExpression>,
    count: usize,
}

impl VisitMut for Substitute<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if !expr.is_empty_interface() {
            walk_expr(self, expr);
            return;
        }
        self.count += 1;
        if let Some(target) = self.target {
            *expr = target.splice(expr.pos());
        }
    }
}

/// Substitute `ty` for every placeholder under `node`; returns how many
/// were replaced.
pub fn replace<N: Visitable>(node: &mut N, ty: &TypeExpression) -> usize {
    let mut substitute = Substitute {
        target: Some(ty),
        count: 0,
    };
    node.accept(&mut substitute);
    substitute.count
}

/// Count the placeholders under `node` without touching them.
pub fn count_placeholders<N: Visitable>(node: &mut N) -> usize {
    let mut substitute = Substitute {
        target: None,
        count: 0,
    };
    node.accept(&mut substitute);
    substitute.count
}

/// Retype a leading `key, value interface{}` field.
///
/// When key and value print the same the field stays whole and is retyped
/// once. Otherwise it becomes two fields, `key K` then `value V`, both
/// anchored where the placeholder was.
pub fn split_pair(decl: &str, list: &mut FieldList, types: &MapTypes) -> Result<(), GenError> {
    let is_pair = list
        .list
        .first()
        .is_some_and(|f| f.names.len() == 2 && f.ty.is_empty_interface());
    if !is_pair {
        return Err(GenError::shape(
            decl,
            "expected a leading `key, value interface{}` field",
        ));
    }

    if types.same() {
        replace(&mut list.list[0], &types.key);
        return Ok(());
    }

    let Field { names, ty, .. } = list.list.remove(0);
    let anchor = ty.pos();
    let split: Vec<Field> = names
        .into_iter()
        .zip([&types.key, &types.value])
        .map(|(name, ty)| Field {
            names: vec![name],
            ty: ty.splice(anchor),
            tag: None,
        })
        .collect();
    list.list.splice(0..0, split);
    Ok(())
}

/// Renames every `nil` operand of each `return` in one function body.
struct NilReturns<'a> {
    result: &'a str,
    count: usize,
}

impl VisitMut for NilReturns<'_> {
    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        if let Stmt::Return { results, .. } = stmt {
            for operand in results.iter_mut() {
                if let Expr::Ident(ident) = operand {
                    if ident.name == "nil" {
                        ident.name = self.result.to_string();
                        self.count += 1;
                    }
                }
            }
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        // Returns inside a function literal belong to the literal.
        if !matches!(expr, Expr::FuncLit { .. }) {
            walk_expr(self, expr);
        }
    }
}

/// Make `return nil, ...` well-typed for a value type without `nil`.
///
/// Each `nil` operand, in any position, is replaced by the function's first
/// named result, which at that point still holds its zero value. Types that accept `nil` are left
/// alone. Returns the number of operands rewritten.
pub fn rewrite_sentinel(
    decl: &str,
    func: &mut FuncDecl,
    value: &TypeExpression,
) -> Result<usize, GenError> {
    if value.accepts_nil() {
        return Ok(0);
    }

    let result = func
        .ty
        .results
        .as_ref()
        .and_then(|results| results.list.first())
        .and_then(|field| field.names.first())
        .map(|name| name.name.clone())
        .ok_or_else(|| GenError::shape(decl, "expected a named first result"))?;

    let mut rewrite = NilReturns {
        result: &result,
        count: 0,
    };
    if let Some(body) = &mut func.body {
        rewrite.visit_block(body);
    }
    Ok(rewrite.count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::Decl;
    use crate::syntax::{format_expr, parse_file};

    fn func(source: &str) -> FuncDecl {
        let file = parse_file("test.go", &format!("package p\n\n{}", source)).unwrap();
        match file.decls.into_iter().next() {
            Some(Decl::Func(func)) => func,
            other => panic!("expected a function, found {:?}", other),
        }
    }

    fn params(func: &FuncDecl) -> Vec<String> {
        func.ty
            .params
            .list
            .iter()
            .map(|f| {
                let names: Vec<&str> = f.names.iter().map(|n| n.name.as_str()).collect();
                format!("{} {}", names.join(", "), format_expr(&f.ty).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_replace_counts_and_anchors() {
        let mut f = func("func f(a interface{}, b []interface{}) map[interface{}]int {\n\treturn nil\n}\n");
        let types = MapTypes::parse("map[string]int").unwrap();
        let anchor = f.ty.params.list[0].ty.pos();

        assert_eq!(replace(&mut f, &types.key), 3);
        assert_eq!(count_placeholders(&mut f), 0);
        assert_eq!(f.ty.params.list[0].ty.pos(), anchor);
        assert_eq!(params(&f), vec!["a string", "b []string"]);
    }

    #[test]
    fn test_interfaces_with_methods_are_kept() {
        let mut f = func("func f(a interface{ M() }, b interface{}) {\n}\n");
        let types = MapTypes::parse("map[int]int").unwrap();
        assert_eq!(replace(&mut f, &types.key), 1);
        assert!(f.ty.params.list[0].ty.pos().is_valid());
        assert!(!f.ty.params.list[0].ty.is_empty_interface());
        assert_eq!(params(&f)[1], "b int");
    }

    #[test]
    fn test_split_pair_distinct_types() {
        let mut f = func("func f(key, value interface{}, n int) {\n}\n");
        let types = MapTypes::parse("map[string]*T").unwrap();
        split_pair("f", &mut f.ty.params, &types).unwrap();
        assert_eq!(params(&f), vec!["key string", "value *T", "n int"]);
    }

    #[test]
    fn test_split_pair_same_types() {
        let mut f = func("func f(key, value interface{}) {\n}\n");
        let types = MapTypes::parse("map[string]string").unwrap();
        split_pair("f", &mut f.ty.params, &types).unwrap();
        assert_eq!(params(&f), vec!["key, value string"]);
    }

    #[test]
    fn test_split_pair_rejects_other_shapes() {
        let types = MapTypes::parse("map[string]int").unwrap();
        for source in [
            "func f() {\n}\n",
            "func f(key interface{}) {\n}\n",
            "func f(key, value int) {\n}\n",
        ] {
            let mut f = func(source);
            let err = split_pair("f", &mut f.ty.params, &types).unwrap_err();
            assert!(matches!(err, GenError::UnexpectedShape { .. }), "{}", source);
        }
    }

    #[test]
    fn test_rewrite_sentinel_only_direct_operands() {
        let mut f = func(
            "func f() (value int, ok bool) {\n\tif x == nil {\n\t\treturn nil, false\n\t}\n\tg(func() interface{} {\n\t\treturn nil\n\t})\n\treturn h(nil), true\n}\n",
        );
        let types = MapTypes::parse("map[int]int").unwrap();
        assert_eq!(rewrite_sentinel("f", &mut f, &types.value).unwrap(), 1);

        let body = f.body.as_ref().unwrap();
        let Stmt::If { body: then, cond, .. } = &body.stmts[0] else {
            panic!("expected if");
        };
        assert_eq!(format_expr(cond).unwrap(), "x == nil");
        let Stmt::Return { results, .. } = &then.stmts[0] else {
            panic!("expected return");
        };
        assert_eq!(format_expr(&results[0]).unwrap(), "value");

        let Stmt::Expr(call) = &body.stmts[1] else {
            panic!("expected call");
        };
        assert!(format_expr(call).unwrap().contains("return nil"));

        let Stmt::Return { results, .. } = &body.stmts[2] else {
            panic!("expected return");
        };
        assert_eq!(format_expr(&results[0]).unwrap(), "h(nil)");
    }

    #[test]
    fn test_rewrite_sentinel_every_operand() {
        let mut f = func(
            "func f() (value int, other int) {\n\treturn 0, nil\n}\n",
        );
        let types = MapTypes::parse("map[int]int").unwrap();
        assert_eq!(rewrite_sentinel("f", &mut f, &types.value).unwrap(), 1);

        let body = f.body.as_ref().unwrap();
        let Stmt::Return { results, .. } = &body.stmts[0] else {
            panic!("expected return");
        };
        let operands: Vec<String> = results.iter().map(|e| format_expr(e).unwrap()).collect();
        assert_eq!(operands, vec!["0", "value"]);
    }

    #[test]
    fn test_rewrite_sentinel_skips_nilable_values() {
        let mut f = func("func f() (value *T) {\n\treturn nil\n}\n");
        let types = MapTypes::parse("map[int]*T").unwrap();
        assert_eq!(rewrite_sentinel("f", &mut f, &types.value).unwrap(), 0);
    }

    #[test]
    fn test_rewrite_sentinel_needs_named_result() {
        let mut f = func("func f() int {\n\treturn nil\n}\n");
        let types = MapTypes::parse("map[int]int").unwrap();
        let err = rewrite_sentinel("f", &mut f, &types.value).unwrap_err();
        assert_eq!(err.to_string(), "unexpected shape of `f`: expected a named first result");
    }
}
