//! Position synthesis for spliced subtrees.
//!
//! A subtree built outside the template (a caller's type expression, the
//! `sync.Mutex` field type, an added import) has no place in the template's
//! source. Before it is attached, every position it carries is set to an
//! anchor taken from the node it replaces, so the printer can order it
//! against the template's comments. Optional positions that are absent stay
//! absent.

use crate::syntax::Pos;
use crate::syntax::ast::*;

pub trait SetPos {
    /// Set every position in this subtree to `pos`.
    fn set_pos(&mut self, pos: Pos);
}

/// Strip every position from a subtree, leaving it ready to be anchored.
pub fn clear<T: SetPos + ?Sized>(node: &mut T) {
    node.set_pos(Pos::NONE);
}

fn set_opt(slot: &mut Option<Pos>, pos: Pos) {
    if slot.is_some() {
        *slot = Some(pos);
    }
}

impl<T: SetPos> SetPos for Box<T> {
    fn set_pos(&mut self, pos: Pos) {
        (**self).set_pos(pos);
    }
}

impl<T: SetPos> SetPos for Option<T> {
    fn set_pos(&mut self, pos: Pos) {
        if let Some(node) = self {
            node.set_pos(pos);
        }
    }
}

impl<T: SetPos> SetPos for Vec<T> {
    fn set_pos(&mut self, pos: Pos) {
        for node in self {
            node.set_pos(pos);
        }
    }
}

impl SetPos for Ident {
    fn set_pos(&mut self, pos: Pos) {
        self.pos = pos;
    }
}

impl SetPos for BasicLit {
    fn set_pos(&mut self, pos: Pos) {
        self.pos = pos;
    }
}

impl SetPos for Field {
    fn set_pos(&mut self, pos: Pos) {
        self.names.set_pos(pos);
        self.ty.set_pos(pos);
        self.tag.set_pos(pos);
    }
}

impl SetPos for FieldList {
    fn set_pos(&mut self, pos: Pos) {
        set_opt(&mut self.opening, pos);
        self.list.set_pos(pos);
        set_opt(&mut self.closing, pos);
    }
}

impl SetPos for FuncType {
    fn set_pos(&mut self, pos: Pos) {
        set_opt(&mut self.func, pos);
        self.params.set_pos(pos);
        self.results.set_pos(pos);
    }
}

impl SetPos for StructType {
    fn set_pos(&mut self, pos: Pos) {
        self.pos = pos;
        self.fields.set_pos(pos);
    }
}

impl SetPos for InterfaceType {
    fn set_pos(&mut self, pos: Pos) {
        self.pos = pos;
        self.methods.set_pos(pos);
    }
}

impl SetPos for Expr {
    fn set_pos(&mut self, pos: Pos) {
        match self {
            Expr::Ident(ident) => ident.set_pos(pos),
            Expr::BasicLit(lit) => lit.set_pos(pos),
            Expr::CompositeLit {
                ty,
                lbrace,
                elts,
                rbrace,
            } => {
                ty.set_pos(pos);
                *lbrace = pos;
                elts.set_pos(pos);
                *rbrace = pos;
            }
            Expr::FuncLit { ty, body } => {
                ty.set_pos(pos);
                body.set_pos(pos);
            }
            Expr::Paren { lparen, x, rparen } => {
                *lparen = pos;
                x.set_pos(pos);
                *rparen = pos;
            }
            Expr::Selector { x, sel } => {
                x.set_pos(pos);
                sel.set_pos(pos);
            }
            Expr::Index {
                x,
                lbrack,
                index,
                rbrack,
            } => {
                x.set_pos(pos);
                *lbrack = pos;
                index.set_pos(pos);
                *rbrack = pos;
            }
            Expr::Slice {
                x,
                lbrack,
                low,
                high,
                max,
                rbrack,
            } => {
                x.set_pos(pos);
                *lbrack = pos;
                low.set_pos(pos);
                high.set_pos(pos);
                max.set_pos(pos);
                *rbrack = pos;
            }
            Expr::TypeAssert {
                x,
                lparen,
                ty,
                rparen,
            } => {
                x.set_pos(pos);
                *lparen = pos;
                ty.set_pos(pos);
                *rparen = pos;
            }
            Expr::Call {
                fun,
                lparen,
                args,
                ellipsis,
                rparen,
            } => {
                fun.set_pos(pos);
                *lparen = pos;
                args.set_pos(pos);
                set_opt(ellipsis, pos);
                *rparen = pos;
            }
            Expr::Star { pos: star, x } => {
                *star = pos;
                x.set_pos(pos);
            }
            Expr::Unary { pos: op_pos, x, .. } => {
                *op_pos = pos;
                x.set_pos(pos);
            }
            Expr::Binary {
                x, pos: op_pos, y, ..
            } => {
                x.set_pos(pos);
                *op_pos = pos;
                y.set_pos(pos);
            }
            Expr::KeyValue { key, colon, value } => {
                key.set_pos(pos);
                *colon = pos;
                value.set_pos(pos);
            }
            Expr::Ellipsis { pos: dots, elt } => {
                *dots = pos;
                elt.set_pos(pos);
            }
            Expr::ArrayType { lbrack, len, elt } => {
                *lbrack = pos;
                len.set_pos(pos);
                elt.set_pos(pos);
            }
            Expr::StructType(st) => st.set_pos(pos),
            Expr::FuncType(ft) => ft.set_pos(pos),
            Expr::InterfaceType(it) => it.set_pos(pos),
            Expr::MapType {
                pos: map,
                key,
                value,
            } => {
                *map = pos;
                key.set_pos(pos);
                value.set_pos(pos);
            }
            Expr::ChanType {
                pos: chan,
                arrow,
                value,
                ..
            } => {
                *chan = pos;
                set_opt(arrow, pos);
                value.set_pos(pos);
            }
        }
    }
}

impl SetPos for Block {
    fn set_pos(&mut self, pos: Pos) {
        self.lbrace = pos;
        self.stmts.set_pos(pos);
        self.rbrace = pos;
    }
}

impl SetPos for CaseClause {
    fn set_pos(&mut self, pos: Pos) {
        self.pos = pos;
        self.list.set_pos(pos);
        self.colon = pos;
        self.body.set_pos(pos);
    }
}

impl SetPos for Stmt {
    fn set_pos(&mut self, pos: Pos) {
        match self {
            Stmt::Decl(gen_decl) => gen_decl.set_pos(pos),
            Stmt::Empty { pos: semi } => *semi = pos,
            Stmt::Expr(expr) => expr.set_pos(pos),
            Stmt::Send { chan, arrow, value } => {
                chan.set_pos(pos);
                *arrow = pos;
                value.set_pos(pos);
            }
            Stmt::IncDec { x, pos: op, .. } => {
                x.set_pos(pos);
                *op = pos;
            }
            Stmt::Assign {
                lhs, pos: op, rhs, ..
            } => {
                lhs.set_pos(pos);
                *op = pos;
                rhs.set_pos(pos);
            }
            Stmt::Go { pos: kw, call } | Stmt::Defer { pos: kw, call } => {
                *kw = pos;
                call.set_pos(pos);
            }
            Stmt::Return { pos: kw, results } => {
                *kw = pos;
                results.set_pos(pos);
            }
            Stmt::Branch { pos: kw, label, .. } => {
                *kw = pos;
                label.set_pos(pos);
            }
            Stmt::Block(block) => block.set_pos(pos),
            Stmt::If {
                pos: kw,
                init,
                cond,
                body,
                els,
            } => {
                *kw = pos;
                init.set_pos(pos);
                cond.set_pos(pos);
                body.set_pos(pos);
                els.set_pos(pos);
            }
            Stmt::Switch {
                pos: kw,
                init,
                tag,
                lbrace,
                clauses,
                rbrace,
            } => {
                *kw = pos;
                init.set_pos(pos);
                tag.set_pos(pos);
                *lbrace = pos;
                clauses.set_pos(pos);
                *rbrace = pos;
            }
            Stmt::For {
                pos: kw,
                init,
                cond,
                post,
                body,
            } => {
                *kw = pos;
                init.set_pos(pos);
                cond.set_pos(pos);
                post.set_pos(pos);
                body.set_pos(pos);
            }
            Stmt::Range {
                pos: kw,
                key,
                value,
                x,
                body,
                ..
            } => {
                *kw = pos;
                key.set_pos(pos);
                value.set_pos(pos);
                x.set_pos(pos);
                body.set_pos(pos);
            }
        }
    }
}

impl SetPos for ImportSpec {
    fn set_pos(&mut self, pos: Pos) {
        self.name.set_pos(pos);
        self.path.set_pos(pos);
    }
}

impl SetPos for Spec {
    fn set_pos(&mut self, pos: Pos) {
        match self {
            Spec::Import(import) => import.set_pos(pos),
            Spec::Type(type_spec) => {
                type_spec.name.set_pos(pos);
                set_opt(&mut type_spec.assign, pos);
                type_spec.ty.set_pos(pos);
            }
            Spec::Value(value) => {
                value.names.set_pos(pos);
                value.ty.set_pos(pos);
                value.values.set_pos(pos);
            }
        }
    }
}

impl SetPos for GenDecl {
    fn set_pos(&mut self, pos: Pos) {
        self.pos = pos;
        set_opt(&mut self.lparen, pos);
        self.specs.set_pos(pos);
        set_opt(&mut self.rparen, pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::{Expr, Ident};
    use crate::syntax::parse_type;
    use crate::syntax::visit::{VisitMut, walk_expr};

    /// Collects every identifier position, including member names.
    #[derive(Default)]
    struct IdentPositions(Vec<Pos>);

    impl VisitMut for IdentPositions {
        fn visit_ident(&mut self, ident: &mut Ident) {
            self.0.push(ident.pos);
        }

        fn visit_member(&mut self, ident: &mut Ident) {
            self.0.push(ident.pos);
        }

        fn visit_expr(&mut self, expr: &mut Expr) {
            self.0.push(expr.pos());
            self.0.push(expr.end());
            walk_expr(self, expr);
        }
    }

    fn positions(expr: &mut Expr) -> Vec<Pos> {
        let mut collected = IdentPositions::default();
        collected.visit_expr(expr);
        collected.0
    }

    #[test]
    fn test_clear_reaches_every_kind() {
        let mut ty = parse_type(
            "t",
            "map[pkg.Key]func(a []int, b ...*[4]chan<- struct{ x <-chan interface{ M() error } }) (bool, error)",
        )
        .unwrap();
        assert!(positions(&mut ty).iter().all(|p| p.is_valid()));

        clear(&mut ty);
        assert!(positions(&mut ty).iter().all(|p| !p.is_valid()));
    }

    #[test]
    fn test_anchor_sets_a_single_position() {
        let mut ty = parse_type("t", "map[string][]*T").unwrap();
        clear(&mut ty);
        let anchor = Pos::new(42);
        ty.set_pos(anchor);
        assert!(positions(&mut ty).iter().all(|p| *p == anchor));
    }

    #[test]
    fn test_absent_optional_positions_stay_absent() {
        let mut ty = parse_type("t", "func() int").unwrap();
        ty.set_pos(Pos::new(1));
        let Expr::FuncType(ft) = &ty else {
            panic!("expected function type");
        };
        let results = ft.results.as_ref().unwrap();
        assert_eq!(results.opening, None);
        assert_eq!(ft.params.opening, Some(Pos::new(1)));
    }
}
