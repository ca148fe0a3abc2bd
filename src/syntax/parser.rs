use crate::syntax::SyntaxError;
use crate::syntax::ast::*;
use crate::syntax::lexer::{LineTable, Pos, Token, TokenKind};

/// Result of a simple statement in a `for` header, which may turn out to be
/// a range clause.
enum SimpleStmt {
    Stmt(Stmt),
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        op: AssignOp,
        x: Expr,
    },
}

/// A recursive descent parser for the Go subset.
pub struct Parser<'a> {
    filename: &'a str,
    lines: LineTable,
    tokens: Vec<Token>,
    current: usize,
    /// Below zero inside `if`, `for` and `switch` headers, where `T {`
    /// opens the body rather than a composite literal.
    expr_level: i32,
}

impl<'a> Parser<'a> {
    pub fn new(filename: &'a str, source: &str, tokens: Vec<Token>) -> Self {
        Self {
            filename,
            lines: LineTable::new(source),
            tokens,
            current: 0,
            expr_level: 0,
        }
    }

    pub fn parse_file(&mut self, comments: Vec<Comment>) -> Result<File, SyntaxError> {
        let package = self.expect(&TokenKind::Package)?;
        let name = self.expect_ident()?;
        self.expect_semi()?;

        let mut decls = Vec::new();
        while self.check(&TokenKind::Import) {
            decls.push(Decl::Gen(self.gen_decl()?));
            self.expect_semi()?;
        }

        while !self.is_at_end() {
            let decl = match self.peek_kind() {
                Some(TokenKind::Const | TokenKind::Type | TokenKind::Var) => {
                    Decl::Gen(self.gen_decl()?)
                }
                Some(TokenKind::Func) => Decl::Func(self.func_decl()?),
                Some(TokenKind::Import) => {
                    return Err(self.error("imports must appear before other declarations"));
                }
                _ => return Err(self.error("expected declaration")),
            };
            decls.push(decl);
            if !self.is_at_end() {
                self.expect_semi()?;
            }
        }

        let scope = Scope::collect(&decls).map_err(|dup| {
            let pos = decls
                .iter()
                .rev()
                .find_map(|decl| declared_pos(decl, &dup))
                .unwrap_or(package);
            self.error_at(pos, &format!("`{}` redeclared in this block", dup))
        })?;

        Ok(File {
            package,
            name,
            decls,
            comments,
            scope,
        })
    }

    /// Parse a lone type followed only by the end of input.
    pub fn parse_standalone_type(&mut self) -> Result<Expr, SyntaxError> {
        let ty = self.parse_type()?;
        if self.peek().is_some_and(|t| t.kind == TokenKind::Semi && t.implicit) {
            self.advance();
        }
        if !self.is_at_end() {
            return Err(self.error(&format!("unexpected {:?} after type", self.kind_or_eof())));
        }
        Ok(ty)
    }

    // Declarations

    fn gen_decl(&mut self) -> Result<GenDecl, SyntaxError> {
        let pos = self.current_pos();
        let kind = match self.peek_kind() {
            Some(TokenKind::Import) => GenKind::Import,
            Some(TokenKind::Const) => GenKind::Const,
            Some(TokenKind::Type) => GenKind::Type,
            Some(TokenKind::Var) => GenKind::Var,
            _ => return Err(self.error("expected declaration keyword")),
        };
        self.advance();

        if self.check(&TokenKind::LParen) {
            let lparen = self.bump();
            let mut specs = Vec::new();
            while !self.check(&TokenKind::RParen) && !self.is_at_end() {
                specs.push(self.spec(kind)?);
                if !self.check(&TokenKind::RParen) {
                    self.expect_semi()?;
                }
            }
            let rparen = self.expect(&TokenKind::RParen)?;
            Ok(GenDecl {
                kind,
                pos,
                lparen: Some(lparen),
                specs,
                rparen: Some(rparen),
            })
        } else {
            let spec = self.spec(kind)?;
            Ok(GenDecl {
                kind,
                pos,
                lparen: None,
                specs: vec![spec],
                rparen: None,
            })
        }
    }

    fn spec(&mut self, kind: GenKind) -> Result<Spec, SyntaxError> {
        match kind {
            GenKind::Import => {
                let name = if self.check(&TokenKind::Dot) {
                    let pos = self.bump();
                    Some(Ident::new(".", pos))
                } else if self.check_ident() {
                    Some(self.expect_ident()?)
                } else {
                    None
                };
                let pos = self.current_pos();
                let Some(TokenKind::Str(value)) = self.peek_kind().cloned() else {
                    return Err(self.error("expected import path"));
                };
                self.advance();
                Ok(Spec::Import(ImportSpec {
                    name,
                    path: BasicLit {
                        kind: LitKind::String,
                        value,
                        pos,
                    },
                }))
            }
            GenKind::Type => {
                let name = self.expect_ident()?;
                let assign = if self.check(&TokenKind::Eq) {
                    Some(self.bump())
                } else {
                    None
                };
                let ty = self.parse_type()?;
                Ok(Spec::Type(TypeSpec { name, assign, ty }))
            }
            GenKind::Const | GenKind::Var => {
                let names = self.ident_list()?;
                let ty = if !self.check(&TokenKind::Eq)
                    && !self.check(&TokenKind::Semi)
                    && !self.check(&TokenKind::RParen)
                {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                let values = if self.match_token(&TokenKind::Eq) {
                    self.expr_list()?
                } else {
                    Vec::new()
                };
                Ok(Spec::Value(ValueSpec { names, ty, values }))
            }
        }
    }

    fn func_decl(&mut self) -> Result<FuncDecl, SyntaxError> {
        let func = self.expect(&TokenKind::Func)?;

        let recv = if self.check(&TokenKind::LParen) {
            Some(self.parameters()?)
        } else {
            None
        };

        let name = self.expect_ident()?;
        let params = self.parameters()?;
        let results = self.results()?;

        let body = if self.check(&TokenKind::LBrace) {
            Some(self.block()?)
        } else {
            None
        };

        Ok(FuncDecl {
            recv,
            name,
            ty: FuncType {
                func: Some(func),
                params,
                results,
            },
            body,
        })
    }

    /// `(a, b T, c U)` or `(T, U)`.
    fn parameters(&mut self) -> Result<FieldList, SyntaxError> {
        let opening = self.expect(&TokenKind::LParen)?;
        let mut unnamed: Vec<Expr> = Vec::new();
        let mut named: Vec<Field> = Vec::new();

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            let ty = self.param_type()?;

            if !self.check(&TokenKind::Comma) && !self.check(&TokenKind::RParen) {
                // What was read so far were names.
                let mut names = Vec::new();
                for expr in unnamed.drain(..).chain(std::iter::once(ty)) {
                    match expr {
                        Expr::Ident(ident) => names.push(ident),
                        other => return Err(self.error_at(other.pos(), "expected parameter name")),
                    }
                }
                let ty = self.param_type()?;
                named.push(Field {
                    names,
                    ty,
                    tag: None,
                });

                while self.match_token(&TokenKind::Comma) {
                    if self.check(&TokenKind::RParen) {
                        break;
                    }
                    let names = self.ident_list()?;
                    let ty = self.param_type()?;
                    named.push(Field {
                        names,
                        ty,
                        tag: None,
                    });
                }
                break;
            }

            unnamed.push(ty);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        let closing = self.expect(&TokenKind::RParen)?;

        let list = if named.is_empty() {
            unnamed
                .into_iter()
                .map(|ty| Field {
                    names: Vec::new(),
                    ty,
                    tag: None,
                })
                .collect()
        } else {
            named
        };

        Ok(FieldList {
            opening: Some(opening),
            list,
            closing: Some(closing),
        })
    }

    fn param_type(&mut self) -> Result<Expr, SyntaxError> {
        if self.check(&TokenKind::Ellipsis) {
            let pos = self.bump();
            let elt = self.parse_type()?;
            return Ok(Expr::Ellipsis {
                pos,
                elt: Some(Box::new(elt)),
            });
        }
        self.parse_type()
    }

    fn results(&mut self) -> Result<Option<FieldList>, SyntaxError> {
        if self.check(&TokenKind::LParen) {
            return Ok(Some(self.parameters()?));
        }
        if self.begins_type() {
            let ty = self.parse_type()?;
            return Ok(Some(FieldList {
                opening: None,
                list: vec![Field {
                    names: Vec::new(),
                    ty,
                    tag: None,
                }],
                closing: None,
            }));
        }
        Ok(None)
    }

    // Types

    fn begins_type(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(
                TokenKind::Ident(_)
                    | TokenKind::LBracket
                    | TokenKind::Struct
                    | TokenKind::Star
                    | TokenKind::Func
                    | TokenKind::Interface
                    | TokenKind::Map
                    | TokenKind::Chan
                    | TokenKind::LParen
                    | TokenKind::Arrow
            )
        )
    }

    fn parse_type(&mut self) -> Result<Expr, SyntaxError> {
        let pos = self.current_pos();
        match self.peek_kind() {
            Some(TokenKind::Ident(_)) => self.type_name(),
            Some(TokenKind::LBracket) => self.array_type(),
            Some(TokenKind::Struct) => Ok(Expr::StructType(self.struct_type()?)),
            Some(TokenKind::Star) => {
                self.advance();
                let x = self.parse_type()?;
                Ok(Expr::Star {
                    pos,
                    x: Box::new(x),
                })
            }
            Some(TokenKind::Func) => Ok(Expr::FuncType(self.func_type()?)),
            Some(TokenKind::Interface) => Ok(Expr::InterfaceType(self.interface_type()?)),
            Some(TokenKind::Map) => self.map_type(),
            Some(TokenKind::Chan | TokenKind::Arrow) => self.chan_type(),
            Some(TokenKind::LParen) => {
                let lparen = self.bump();
                let x = self.parse_type()?;
                let rparen = self.expect(&TokenKind::RParen)?;
                Ok(Expr::Paren {
                    lparen,
                    x: Box::new(x),
                    rparen,
                })
            }
            _ => Err(self.error(&format!("expected type, found {:?}", self.kind_or_eof()))),
        }
    }

    /// `T` or `pkg.T`.
    fn type_name(&mut self) -> Result<Expr, SyntaxError> {
        let ident = self.expect_ident()?;
        if self.check(&TokenKind::Dot) {
            self.advance();
            let sel = self.expect_ident()?;
            return Ok(Expr::Selector {
                x: Box::new(Expr::Ident(ident)),
                sel,
            });
        }
        Ok(Expr::Ident(ident))
    }

    fn array_type(&mut self) -> Result<Expr, SyntaxError> {
        let lbrack = self.expect(&TokenKind::LBracket)?;
        let len = if self.check(&TokenKind::RBracket) {
            None
        } else if self.check(&TokenKind::Ellipsis) {
            let pos = self.bump();
            Some(Box::new(Expr::Ellipsis { pos, elt: None }))
        } else {
            self.expr_level += 1;
            let len = self.expression();
            self.expr_level -= 1;
            Some(Box::new(len?))
        };
        self.expect(&TokenKind::RBracket)?;
        let elt = self.parse_type()?;
        Ok(Expr::ArrayType {
            lbrack,
            len,
            elt: Box::new(elt),
        })
    }

    fn struct_type(&mut self) -> Result<StructType, SyntaxError> {
        let pos = self.expect(&TokenKind::Struct)?;
        let opening = self.expect(&TokenKind::LBrace)?;

        let mut list = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let embedded = !self.check_ident()
                || matches!(
                    self.peek_kind_ahead(1),
                    Some(TokenKind::Dot | TokenKind::Semi | TokenKind::RBrace | TokenKind::Str(_))
                );

            let (names, ty) = if embedded {
                (Vec::new(), self.parse_type()?)
            } else {
                let names = self.ident_list()?;
                (names, self.parse_type()?)
            };

            let tag = match self.peek_kind().cloned() {
                Some(TokenKind::Str(value)) => {
                    let pos = self.bump();
                    Some(BasicLit {
                        kind: LitKind::String,
                        value,
                        pos,
                    })
                }
                _ => None,
            };

            list.push(Field { names, ty, tag });
            if !self.check(&TokenKind::RBrace) {
                self.expect_semi()?;
            }
        }

        let closing = self.expect(&TokenKind::RBrace)?;
        Ok(StructType {
            pos,
            fields: FieldList {
                opening: Some(opening),
                list,
                closing: Some(closing),
            },
        })
    }

    fn interface_type(&mut self) -> Result<InterfaceType, SyntaxError> {
        let pos = self.expect(&TokenKind::Interface)?;
        let opening = self.expect(&TokenKind::LBrace)?;

        let mut list = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.check_ident() && self.check_ahead(&TokenKind::LParen, 1) {
                let name = self.expect_ident()?;
                let params = self.parameters()?;
                let results = self.results()?;
                list.push(Field {
                    names: vec![name],
                    ty: Expr::FuncType(FuncType {
                        func: None,
                        params,
                        results,
                    }),
                    tag: None,
                });
            } else {
                list.push(Field {
                    names: Vec::new(),
                    ty: self.parse_type()?,
                    tag: None,
                });
            }
            if !self.check(&TokenKind::RBrace) {
                self.expect_semi()?;
            }
        }

        let closing = self.expect(&TokenKind::RBrace)?;
        Ok(InterfaceType {
            pos,
            methods: FieldList {
                opening: Some(opening),
                list,
                closing: Some(closing),
            },
        })
    }

    fn func_type(&mut self) -> Result<FuncType, SyntaxError> {
        let func = self.expect(&TokenKind::Func)?;
        let params = self.parameters()?;
        let results = self.results()?;
        Ok(FuncType {
            func: Some(func),
            params,
            results,
        })
    }

    fn map_type(&mut self) -> Result<Expr, SyntaxError> {
        let pos = self.expect(&TokenKind::Map)?;
        self.expect(&TokenKind::LBracket)?;
        let key = self.parse_type()?;
        self.expect(&TokenKind::RBracket)?;
        let value = self.parse_type()?;
        Ok(Expr::MapType {
            pos,
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    fn chan_type(&mut self) -> Result<Expr, SyntaxError> {
        let pos = self.current_pos();
        let (arrow, dir) = if self.check(&TokenKind::Arrow) {
            let arrow = self.bump();
            self.expect(&TokenKind::Chan)?;
            (Some(arrow), ChanDir::Recv)
        } else {
            self.expect(&TokenKind::Chan)?;
            if self.check(&TokenKind::Arrow) {
                (Some(self.bump()), ChanDir::Send)
            } else {
                (None, ChanDir::Both)
            }
        };
        let value = self.parse_type()?;
        Ok(Expr::ChanType {
            pos,
            arrow,
            dir,
            value: Box::new(value),
        })
    }

    // Statements

    fn block(&mut self) -> Result<Block, SyntaxError> {
        let lbrace = self.expect(&TokenKind::LBrace)?;
        let stmts = self.stmt_list()?;
        let rbrace = self.expect(&TokenKind::RBrace)?;
        Ok(Block {
            lbrace,
            stmts,
            rbrace,
        })
    }

    fn stmt_list(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace)
            && !self.check(&TokenKind::Case)
            && !self.check(&TokenKind::Default)
            && !self.is_at_end()
        {
            if self.match_token(&TokenKind::Semi) {
                continue;
            }
            stmts.push(self.statement()?);
            if !self.check(&TokenKind::RBrace)
                && !self.check(&TokenKind::Case)
                && !self.check(&TokenKind::Default)
            {
                self.expect_semi()?;
            }
        }
        Ok(stmts)
    }

    fn statement(&mut self) -> Result<Stmt, SyntaxError> {
        let pos = self.current_pos();
        match self.peek_kind() {
            Some(TokenKind::Const | TokenKind::Type | TokenKind::Var) => {
                Ok(Stmt::Decl(self.gen_decl()?))
            }
            Some(TokenKind::Go) => {
                self.advance();
                let call = self.expression()?;
                Ok(Stmt::Go { pos, call })
            }
            Some(TokenKind::Defer) => {
                self.advance();
                let call = self.expression()?;
                Ok(Stmt::Defer { pos, call })
            }
            Some(TokenKind::Return) => {
                self.advance();
                let results = if self.check(&TokenKind::Semi) || self.check(&TokenKind::RBrace) {
                    Vec::new()
                } else {
                    self.expr_list()?
                };
                Ok(Stmt::Return { pos, results })
            }
            Some(TokenKind::Break | TokenKind::Continue | TokenKind::Goto | TokenKind::Fallthrough) => {
                let kind = match self.peek_kind() {
                    Some(TokenKind::Break) => BranchKind::Break,
                    Some(TokenKind::Continue) => BranchKind::Continue,
                    Some(TokenKind::Goto) => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                self.advance();
                let label = if kind != BranchKind::Fallthrough && self.check_ident() {
                    Some(self.expect_ident()?)
                } else {
                    None
                };
                Ok(Stmt::Branch { pos, kind, label })
            }
            Some(TokenKind::LBrace) => Ok(Stmt::Block(self.block()?)),
            Some(TokenKind::If) => self.if_stmt(),
            Some(TokenKind::Switch) => self.switch_stmt(),
            Some(TokenKind::For) => self.for_stmt(),
            Some(TokenKind::Select) => Err(self.error("select statements are not supported")),
            _ => match self.simple_stmt(false)? {
                SimpleStmt::Stmt(stmt) => Ok(stmt),
                SimpleStmt::Range { .. } => Err(self.error_at(pos, "unexpected range clause")),
            },
        }
    }

    fn simple_stmt(&mut self, range_ok: bool) -> Result<SimpleStmt, SyntaxError> {
        let mut lhs = self.expr_list()?;

        let op = match self.peek_kind() {
            Some(TokenKind::Define) => Some(AssignOp::Define),
            Some(TokenKind::Eq) => Some(AssignOp::Assign),
            Some(TokenKind::OpAssign(op)) => Some(AssignOp::Op(*op)),
            _ => None,
        };

        if let Some(op) = op {
            let pos = self.bump();
            if range_ok && self.check(&TokenKind::Range) && !matches!(op, AssignOp::Op(_)) {
                self.advance();
                let x = self.expression()?;
                if lhs.len() > 2 {
                    return Err(self.error_at(pos, "range clause permits at most two iteration variables"));
                }
                let mut vars = lhs.into_iter();
                return Ok(SimpleStmt::Range {
                    key: vars.next(),
                    value: vars.next(),
                    op,
                    x,
                });
            }
            let rhs = self.expr_list()?;
            return Ok(SimpleStmt::Stmt(Stmt::Assign { lhs, pos, op, rhs }));
        }

        if lhs.len() > 1 {
            return Err(self.error(&format!("expected 1 expression, found {}", lhs.len())));
        }
        let Some(x) = lhs.pop() else {
            return Err(self.error("expected expression"));
        };

        match self.peek_kind() {
            Some(TokenKind::Arrow) => {
                let arrow = self.bump();
                let value = self.expression()?;
                Ok(SimpleStmt::Stmt(Stmt::Send {
                    chan: x,
                    arrow,
                    value,
                }))
            }
            Some(TokenKind::Inc | TokenKind::Dec) => {
                let inc = self.check(&TokenKind::Inc);
                let pos = self.bump();
                Ok(SimpleStmt::Stmt(Stmt::IncDec { x, pos, inc }))
            }
            _ => Ok(SimpleStmt::Stmt(Stmt::Expr(x))),
        }
    }

    fn plain_simple_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        match self.simple_stmt(false)? {
            SimpleStmt::Stmt(stmt) => Ok(stmt),
            SimpleStmt::Range { .. } => Err(self.error("unexpected range clause")),
        }
    }

    fn if_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        let pos = self.expect(&TokenKind::If)?;

        let outer = self.expr_level;
        self.expr_level = -1;
        let header = self.if_header();
        self.expr_level = outer;
        let (init, cond) = header?;

        let body = self.block()?;

        let els = if self.match_token(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                Some(Box::new(self.if_stmt()?))
            } else if self.check(&TokenKind::LBrace) {
                Some(Box::new(Stmt::Block(self.block()?)))
            } else {
                return Err(self.error("expected if statement or block after else"));
            }
        } else {
            None
        };

        Ok(Stmt::If {
            pos,
            init,
            cond,
            body,
            els,
        })
    }

    fn if_header(&mut self) -> Result<(Option<Box<Stmt>>, Expr), SyntaxError> {
        if self.check(&TokenKind::LBrace) {
            return Err(self.error("missing condition in if statement"));
        }

        let first = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.plain_simple_stmt()?)
        };

        if self.match_token(&TokenKind::Semi) {
            let cond = self.expression()?;
            return Ok((first.map(Box::new), cond));
        }

        match first {
            Some(Stmt::Expr(cond)) => Ok((None, cond)),
            _ => Err(self.error("expected condition in if statement")),
        }
    }

    fn switch_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        let pos = self.expect(&TokenKind::Switch)?;

        let outer = self.expr_level;
        self.expr_level = -1;
        let header = self.switch_header();
        self.expr_level = outer;
        let (init, tag) = header?;

        let lbrace = self.expect(&TokenKind::LBrace)?;
        let mut clauses = Vec::new();
        while self.check(&TokenKind::Case) || self.check(&TokenKind::Default) {
            let clause_pos = self.current_pos();
            let list = if self.match_token(&TokenKind::Case) {
                self.expr_list()?
            } else {
                self.advance();
                Vec::new()
            };
            let colon = self.expect(&TokenKind::Colon)?;
            let body = self.stmt_list()?;
            clauses.push(CaseClause {
                pos: clause_pos,
                list,
                colon,
                body,
            });
        }
        let rbrace = self.expect(&TokenKind::RBrace)?;

        Ok(Stmt::Switch {
            pos,
            init,
            tag,
            lbrace,
            clauses,
            rbrace,
        })
    }

    #[allow(clippy::type_complexity)]
    fn switch_header(&mut self) -> Result<(Option<Box<Stmt>>, Option<Box<Stmt>>), SyntaxError> {
        if self.check(&TokenKind::LBrace) {
            return Ok((None, None));
        }

        let first = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.plain_simple_stmt()?)
        };

        if self.match_token(&TokenKind::Semi) {
            let tag = if self.check(&TokenKind::LBrace) {
                None
            } else {
                Some(self.plain_simple_stmt()?)
            };
            return Ok((first.map(Box::new), tag.map(Box::new)));
        }

        Ok((None, first.map(Box::new)))
    }

    fn for_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        let pos = self.expect(&TokenKind::For)?;

        let outer = self.expr_level;
        self.expr_level = -1;
        let header = self.for_header();
        self.expr_level = outer;
        let header = header?;

        let body = self.block()?;

        Ok(match header {
            ForHeader::Range { key, value, op, x } => Stmt::Range {
                pos,
                key,
                value,
                op,
                x,
                body,
            },
            ForHeader::Loop { init, cond, post } => Stmt::For {
                pos,
                init,
                cond,
                post,
                body,
            },
        })
    }

    fn for_header(&mut self) -> Result<ForHeader, SyntaxError> {
        if self.check(&TokenKind::LBrace) {
            return Ok(ForHeader::Loop {
                init: None,
                cond: None,
                post: None,
            });
        }

        if self.match_token(&TokenKind::Range) {
            let x = self.expression()?;
            return Ok(ForHeader::Range {
                key: None,
                value: None,
                op: None,
                x,
            });
        }

        let first = if self.check(&TokenKind::Semi) {
            None
        } else {
            match self.simple_stmt(true)? {
                SimpleStmt::Range { key, value, op, x } => {
                    return Ok(ForHeader::Range {
                        key,
                        value,
                        op: Some(op),
                        x,
                    });
                }
                SimpleStmt::Stmt(stmt) => Some(stmt),
            }
        };

        if self.match_token(&TokenKind::Semi) {
            let cond = if self.check(&TokenKind::Semi) {
                None
            } else {
                Some(self.expression()?)
            };
            self.expect(&TokenKind::Semi)?;
            let post = if self.check(&TokenKind::LBrace) {
                None
            } else {
                Some(Box::new(self.plain_simple_stmt()?))
            };
            return Ok(ForHeader::Loop {
                init: first.map(Box::new),
                cond,
                post,
            });
        }

        match first {
            Some(Stmt::Expr(cond)) => Ok(ForHeader::Loop {
                init: None,
                cond: Some(cond),
                post: None,
            }),
            _ => Err(self.error("expected for loop condition")),
        }
    }

    // Expressions

    fn expr_list(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut list = vec![self.expression()?];
        while self.match_token(&TokenKind::Comma) {
            list.push(self.expression()?);
        }
        Ok(list)
    }

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_expr(1)
    }

    fn binary_expr(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let mut x = self.unary_expr()?;

        while let Some(op) = self.peek_kind().and_then(binary_op) {
            if op.precedence() < min_prec {
                break;
            }
            let pos = self.bump();
            let y = self.binary_expr(op.precedence() + 1)?;
            x = Expr::Binary {
                x: Box::new(x),
                op,
                pos,
                y: Box::new(y),
            };
        }

        Ok(x)
    }

    fn unary_expr(&mut self) -> Result<Expr, SyntaxError> {
        let pos = self.current_pos();
        let op = match self.peek_kind() {
            Some(TokenKind::Plus) => Some(UnaryOp::Pos),
            Some(TokenKind::Minus) => Some(UnaryOp::Neg),
            Some(TokenKind::Bang) => Some(UnaryOp::Not),
            Some(TokenKind::Caret) => Some(UnaryOp::Xor),
            Some(TokenKind::Amp) => Some(UnaryOp::Addr),
            Some(TokenKind::Arrow) if !self.check_ahead(&TokenKind::Chan, 1) => Some(UnaryOp::Recv),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let x = self.unary_expr()?;
            return Ok(Expr::Unary {
                op,
                pos,
                x: Box::new(x),
            });
        }

        if self.match_token(&TokenKind::Star) {
            let x = self.unary_expr()?;
            return Ok(Expr::Star {
                pos,
                x: Box::new(x),
            });
        }

        self.primary_expr()
    }

    fn primary_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut x = self.operand()?;

        loop {
            match self.peek_kind() {
                Some(TokenKind::Dot) => {
                    self.advance();
                    if self.check(&TokenKind::LParen) {
                        let lparen = self.bump();
                        let ty = if self.match_token(&TokenKind::Type) {
                            None
                        } else {
                            Some(Box::new(self.parse_type()?))
                        };
                        let rparen = self.expect(&TokenKind::RParen)?;
                        x = Expr::TypeAssert {
                            x: Box::new(x),
                            lparen,
                            ty,
                            rparen,
                        };
                    } else {
                        let sel = self.expect_ident()?;
                        x = Expr::Selector {
                            x: Box::new(x),
                            sel,
                        };
                    }
                }
                Some(TokenKind::LBracket) => {
                    self.expr_level += 1;
                    let indexed = self.index_or_slice(x);
                    self.expr_level -= 1;
                    x = indexed?;
                }
                Some(TokenKind::LParen) => {
                    self.expr_level += 1;
                    let call = self.call(x);
                    self.expr_level -= 1;
                    x = call?;
                }
                Some(TokenKind::LBrace)
                    if is_literal_type(&x) && (self.expr_level >= 0 || !is_type_name(&x)) =>
                {
                    x = self.composite_lit(Some(x))?;
                }
                _ => break,
            }
        }

        Ok(x)
    }

    fn index_or_slice(&mut self, x: Expr) -> Result<Expr, SyntaxError> {
        let lbrack = self.expect(&TokenKind::LBracket)?;

        let low = if self.check(&TokenKind::Colon) {
            None
        } else {
            Some(Box::new(self.expression()?))
        };

        if !self.match_token(&TokenKind::Colon) {
            let rbrack = self.expect(&TokenKind::RBracket)?;
            let Some(index) = low else {
                return Err(self.error_at(rbrack, "expected operand"));
            };
            return Ok(Expr::Index {
                x: Box::new(x),
                lbrack,
                index,
                rbrack,
            });
        }

        let high = if self.check(&TokenKind::Colon) || self.check(&TokenKind::RBracket) {
            None
        } else {
            Some(Box::new(self.expression()?))
        };
        let max = if self.match_token(&TokenKind::Colon) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        let rbrack = self.expect(&TokenKind::RBracket)?;

        Ok(Expr::Slice {
            x: Box::new(x),
            lbrack,
            low,
            high,
            max,
            rbrack,
        })
    }

    fn call(&mut self, fun: Expr) -> Result<Expr, SyntaxError> {
        let lparen = self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        let mut ellipsis = None;

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            args.push(self.expression()?);
            if self.check(&TokenKind::Ellipsis) {
                ellipsis = Some(self.bump());
            }
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        let rparen = self.expect(&TokenKind::RParen)?;
        Ok(Expr::Call {
            fun: Box::new(fun),
            lparen,
            args,
            ellipsis,
            rparen,
        })
    }

    fn composite_lit(&mut self, ty: Option<Expr>) -> Result<Expr, SyntaxError> {
        let lbrace = self.expect(&TokenKind::LBrace)?;
        self.expr_level += 1;
        let elts = self.elements();
        self.expr_level -= 1;
        let elts = elts?;
        let rbrace = self.expect(&TokenKind::RBrace)?;
        Ok(Expr::CompositeLit {
            ty: ty.map(Box::new),
            lbrace,
            elts,
            rbrace,
        })
    }

    fn elements(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut elts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let key = self.element()?;
            let elt = if self.check(&TokenKind::Colon) {
                let colon = self.bump();
                let value = self.element()?;
                Expr::KeyValue {
                    key: Box::new(key),
                    colon,
                    value: Box::new(value),
                }
            } else {
                key
            };
            elts.push(elt);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        Ok(elts)
    }

    fn element(&mut self) -> Result<Expr, SyntaxError> {
        if self.check(&TokenKind::LBrace) {
            return self.composite_lit(None);
        }
        self.expression()
    }

    fn operand(&mut self) -> Result<Expr, SyntaxError> {
        let pos = self.current_pos();

        let lit = match self.peek_kind() {
            Some(TokenKind::Int(v)) => Some((LitKind::Int, v.clone())),
            Some(TokenKind::Float(v)) => Some((LitKind::Float, v.clone())),
            Some(TokenKind::Imag(v)) => Some((LitKind::Imag, v.clone())),
            Some(TokenKind::Char(v)) => Some((LitKind::Char, v.clone())),
            Some(TokenKind::Str(v)) => Some((LitKind::String, v.clone())),
            _ => None,
        };
        if let Some((kind, value)) = lit {
            self.advance();
            return Ok(Expr::BasicLit(BasicLit { kind, value, pos }));
        }

        match self.peek_kind() {
            Some(TokenKind::Ident(_)) => Ok(Expr::Ident(self.expect_ident()?)),
            Some(TokenKind::LParen) => {
                let lparen = self.bump();
                self.expr_level += 1;
                let x = self.expression();
                self.expr_level -= 1;
                let x = x?;
                let rparen = self.expect(&TokenKind::RParen)?;
                Ok(Expr::Paren {
                    lparen,
                    x: Box::new(x),
                    rparen,
                })
            }
            Some(TokenKind::Func) => {
                let ty = self.func_type()?;
                if self.check(&TokenKind::LBrace) {
                    let outer = self.expr_level;
                    self.expr_level = 0;
                    let body = self.block();
                    self.expr_level = outer;
                    Ok(Expr::FuncLit { ty, body: body? })
                } else {
                    Ok(Expr::FuncType(ty))
                }
            }
            Some(
                TokenKind::LBracket
                | TokenKind::Struct
                | TokenKind::Map
                | TokenKind::Chan
                | TokenKind::Interface
                | TokenKind::Arrow,
            ) => self.parse_type(),
            _ => Err(self.error(&format!("expected expression, found {:?}", self.kind_or_eof()))),
        }
    }

    fn ident_list(&mut self) -> Result<Vec<Ident>, SyntaxError> {
        let mut names = vec![self.expect_ident()?];
        while self.match_token(&TokenKind::Comma) {
            names.push(self.expect_ident()?);
        }
        Ok(names)
    }

    // Helper methods

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_kind_ahead(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(|t| &t.kind)
    }

    fn kind_or_eof(&self) -> TokenKind {
        self.peek_kind().cloned().unwrap_or(TokenKind::Eof)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn check_ident(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Ident(_)))
    }

    fn check_ahead(&self, kind: &TokenKind, offset: usize) -> bool {
        self.peek_kind_ahead(offset) == Some(kind)
    }

    fn advance(&mut self) -> Option<&Token> {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.tokens.get(self.current - 1)
    }

    /// Consume the current token and return its position.
    fn bump(&mut self) -> Pos {
        let pos = self.current_pos();
        self.advance();
        pos
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Pos, SyntaxError> {
        if self.check(kind) {
            Ok(self.bump())
        } else {
            Err(self.error(&format!("expected {:?}, found {:?}", kind, self.kind_or_eof())))
        }
    }

    /// A statement or declaration terminator; may be omitted before a
    /// closing `)` or `}`.
    fn expect_semi(&mut self) -> Result<(), SyntaxError> {
        if self.match_token(&TokenKind::Semi)
            || self.check(&TokenKind::RParen)
            || self.check(&TokenKind::RBrace)
        {
            return Ok(());
        }
        Err(self.error(&format!("expected ';', found {:?}", self.kind_or_eof())))
    }

    fn expect_ident(&mut self) -> Result<Ident, SyntaxError> {
        if let Some(TokenKind::Ident(name)) = self.peek_kind() {
            let name = name.clone();
            let pos = self.bump();
            Ok(Ident::new(name, pos))
        } else {
            Err(self.error(&format!("expected identifier, found {:?}", self.kind_or_eof())))
        }
    }

    fn current_pos(&self) -> Pos {
        self.peek().map(|t| t.pos).unwrap_or(Pos::NONE)
    }

    fn error(&self, message: &str) -> SyntaxError {
        self.error_at(self.current_pos(), message)
    }

    fn error_at(&self, pos: Pos, message: &str) -> SyntaxError {
        let (line, column) = self.lines.line_col(pos);
        SyntaxError::new(message, self.filename, line, column)
    }
}

enum ForHeader {
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        op: Option<AssignOp>,
        x: Expr,
    },
    Loop {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
    },
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Quo,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::Amp => BinaryOp::And,
        TokenKind::Pipe => BinaryOp::Or,
        TokenKind::Caret => BinaryOp::Xor,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::AndNot => BinaryOp::AndNot,
        TokenKind::AndAnd => BinaryOp::LAnd,
        TokenKind::OrOr => BinaryOp::LOr,
        TokenKind::EqEq => BinaryOp::Eql,
        TokenKind::NotEq => BinaryOp::Neq,
        TokenKind::Lt => BinaryOp::Lss,
        TokenKind::Le => BinaryOp::Leq,
        TokenKind::Gt => BinaryOp::Gtr,
        TokenKind::Ge => BinaryOp::Geq,
        _ => return None,
    })
}

fn is_type_name(x: &Expr) -> bool {
    match x {
        Expr::Ident(_) => true,
        Expr::Selector { x, .. } => matches!(x.as_ref(), Expr::Ident(_)),
        _ => false,
    }
}

fn is_literal_type(x: &Expr) -> bool {
    is_type_name(x)
        || matches!(
            x,
            Expr::ArrayType { .. } | Expr::MapType { .. } | Expr::StructType(_)
        )
}

/// Position of the top-level declaration of `name` in `decl`, if any.
fn declared_pos(decl: &Decl, name: &str) -> Option<Pos> {
    match decl {
        Decl::Func(func) if !func.is_method() && func.name.name == name => Some(func.name.pos),
        Decl::Func(_) => None,
        Decl::Gen(gen_decl) => gen_decl.specs.iter().find_map(|spec| match spec {
            Spec::Type(type_spec) if type_spec.name.name == name => Some(type_spec.name.pos),
            Spec::Value(value) => value.names.iter().find(|n| n.name == name).map(|n| n.pos),
            _ => None,
        }),
    }
}
