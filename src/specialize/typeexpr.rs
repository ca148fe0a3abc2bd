//! Caller-supplied key and value types.

use crate::error::GenError;
use crate::specialize::position::{self, SetPos};
use crate::syntax::ast::Expr;
use crate::syntax::{Pos, format_expr, parse_type};

/// A type expression with no position of its own.
///
/// Every splice yields a fresh copy anchored at the node it replaces, so the
/// same expression can be inserted any number of times.
#[derive(Debug, Clone)]
pub struct TypeExpression {
    text: String,
    expr: Expr,
}

impl TypeExpression {
    fn from_expr(mut expr: Expr) -> Result<Self, GenError> {
        let text = format_expr(&expr)?;
        position::clear(&mut expr);
        Ok(Self { text, expr })
    }

    /// Canonical source text, as the printer writes it.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// A copy of the expression with every position set to `anchor`.
    pub fn splice(&self, anchor: Pos) -> Expr {
        let mut expr = self.expr.clone();
        expr.set_pos(anchor);
        expr
    }

    /// Whether `nil` is a value of this type, judged from its syntax alone.
    /// Named types other than `error` and `unsafe.Pointer` are assumed not
    /// to accept it.
    pub fn accepts_nil(&self) -> bool {
        accepts_nil(&self.expr)
    }
}

fn accepts_nil(expr: &Expr) -> bool {
    match expr {
        Expr::Star { .. }
        | Expr::MapType { .. }
        | Expr::ChanType { .. }
        | Expr::FuncType(_)
        | Expr::InterfaceType(_) => true,
        Expr::ArrayType { len, .. } => len.is_none(),
        Expr::Ident(ident) => ident.name == "error",
        Expr::Selector { x, sel } => {
            matches!(&**x, Expr::Ident(pkg) if pkg.name == "unsafe") && sel.name == "Pointer"
        }
        Expr::Paren { x, .. } => accepts_nil(x),
        _ => false,
    }
}

/// The key and value types of a `map[K]V` literal.
#[derive(Debug, Clone)]
pub struct MapTypes {
    pub key: TypeExpression,
    pub value: TypeExpression,
}

impl MapTypes {
    pub fn parse(literal: &str) -> Result<Self, GenError> {
        let invalid = |reason: String| GenError::InvalidMapType {
            literal: literal.to_string(),
            reason,
        };

        let expr = parse_type("<map type>", literal).map_err(|e| invalid(e.message))?;
        match expr {
            Expr::MapType { key, value, .. } => Ok(Self {
                key: TypeExpression::from_expr(*key)?,
                value: TypeExpression::from_expr(*value)?,
            }),
            other => Err(invalid(format!(
                "expected a map type, found `{}`",
                format_expr(&other)?
            ))),
        }
    }

    /// Key and value print the same, so a `key, value` pair can stay one field.
    pub fn same(&self) -> bool {
        self.key.text == self.value.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_map_literal() {
        let types = MapTypes::parse("map[string]int").unwrap();
        assert_eq!(types.key.text(), "string");
        assert_eq!(types.value.text(), "int");
        assert!(!types.same());
    }

    #[test]
    fn test_canonical_text() {
        let types = MapTypes::parse("map[ [2]  pkg.Key ]map[string]  *  Value").unwrap();
        assert_eq!(types.key.text(), "[2]pkg.Key");
        assert_eq!(types.value.text(), "map[string]*Value");
    }

    #[test]
    fn test_same_types() {
        assert!(MapTypes::parse("map[string]string").unwrap().same());
        assert!(MapTypes::parse("map[ string ]string").unwrap().same());
    }

    #[test]
    fn test_rejects_malformed_literals() {
        for literal in [
            "",
            "int",
            "map[string]",
            "map[string]int junk",
            "map[]int",
            "map[string]int{",
            "map[string]int;",
        ] {
            let err = MapTypes::parse(literal).unwrap_err();
            assert!(
                matches!(err, GenError::InvalidMapType { .. }),
                "{:?}: {:?}",
                literal,
                err
            );
        }
    }

    #[test]
    fn test_not_a_map_type() {
        let err = MapTypes::parse("[]int").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid map type `[]int`: expected a map type, found `[]int`"
        );
    }

    #[test]
    fn test_splice_anchors_positions() {
        let types = MapTypes::parse("map[string]*T").unwrap();
        let anchor = Pos::new(10);
        let expr = types.value.splice(anchor);
        assert_eq!(expr.pos(), anchor);
        assert_eq!(expr.end(), anchor);
        assert_eq!(format_expr(&expr).unwrap(), "*T");
    }

    #[test]
    fn test_accepts_nil() {
        let cases = [
            ("map[int]*T", true),
            ("map[int][]byte", true),
            ("map[int]map[string]int", true),
            ("map[int]chan int", true),
            ("map[int]func()", true),
            ("map[int]interface{ M() }", true),
            ("map[int]error", true),
            ("map[int]unsafe.Pointer", true),
            ("map[int]int", false),
            ("map[int]string", false),
            ("map[int][4]byte", false),
            ("map[int]struct{}", false),
            ("map[int]pkg.T", false),
        ];
        for (literal, expected) in cases {
            let types = MapTypes::parse(literal).unwrap();
            assert_eq!(types.value.accepts_nil(), expected, "{}", literal);
        }
    }
}
