//! Syntax tree for the Go subset the template is written in.
//!
//! Types and expressions share the `Expr` enum the way Go's own `go/ast`
//! does: `*T` is a `Star`, `map[K]V` is a `MapType`, and so on. Every node
//! carries the positions of the tokens it was built from; synthesized nodes
//! receive their positions from `specialize::position`.

use crate::syntax::lexer::Pos;
use std::collections::BTreeMap;
use std::fmt;

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct File {
    /// Position of the `package` keyword.
    pub package: Pos,
    pub name: Ident,
    pub decls: Vec<Decl>,
    /// Every comment in the file, in source order.
    pub comments: Vec<Comment>,
    /// Top-level names declared by `decls`.
    pub scope: Scope,
}

impl File {
    /// Iterate over every import spec in the file.
    pub fn imports(&self) -> impl Iterator<Item = &ImportSpec> {
        self.decls
            .iter()
            .flat_map(|decl| {
                let specs: &[Spec] = match decl {
                    Decl::Gen(gen_decl) if gen_decl.kind == GenKind::Import => &gen_decl.specs,
                    _ => &[],
                };
                specs
            })
            .filter_map(|spec| match spec {
                Spec::Import(import) => Some(import),
                _ => None,
            })
    }
}

/// A `//` or `/* */` comment, including its delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub pos: Pos,
    pub text: String,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub pos: Pos,
}

impl Ident {
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }
}

/// Literal kinds, kept as raw source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicLit {
    pub kind: LitKind,
    /// Raw text, quotes included for strings and chars.
    pub value: String,
    pub pos: Pos,
}

/// Top-level declarations.
#[derive(Debug, Clone)]
pub enum Decl {
    Gen(GenDecl),
    Func(FuncDecl),
}

impl Decl {
    pub fn pos(&self) -> Pos {
        match self {
            Decl::Gen(gen_decl) => gen_decl.pos,
            Decl::Func(func) => func.ty.func.unwrap_or(func.name.pos),
        }
    }

    pub fn end(&self) -> Pos {
        match self {
            Decl::Gen(gen_decl) => gen_decl.end(),
            Decl::Func(func) => match &func.body {
                Some(body) => body.rbrace,
                None => func.ty.end(),
            },
        }
    }
}

/// Keyword introducing a generic declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenKind {
    Import,
    Const,
    Type,
    Var,
}

impl GenKind {
    pub fn keyword(self) -> &'static str {
        match self {
            GenKind::Import => "import",
            GenKind::Const => "const",
            GenKind::Type => "type",
            GenKind::Var => "var",
        }
    }
}

/// `import`, `const`, `type` or `var` declaration, possibly grouped.
#[derive(Debug, Clone)]
pub struct GenDecl {
    pub kind: GenKind,
    pub pos: Pos,
    pub lparen: Option<Pos>,
    pub specs: Vec<Spec>,
    pub rparen: Option<Pos>,
}

impl GenDecl {
    pub fn end(&self) -> Pos {
        if let Some(rparen) = self.rparen {
            return rparen;
        }
        self.specs.last().map(Spec::end).unwrap_or(self.pos)
    }
}

#[derive(Debug, Clone)]
pub enum Spec {
    Import(ImportSpec),
    Type(TypeSpec),
    Value(ValueSpec),
}

impl Spec {
    pub fn pos(&self) -> Pos {
        match self {
            Spec::Import(import) => import.pos(),
            Spec::Type(type_spec) => type_spec.name.pos,
            Spec::Value(value) => value.names.first().map(|n| n.pos).unwrap_or(Pos::NONE),
        }
    }

    pub fn end(&self) -> Pos {
        match self {
            Spec::Import(import) => import.path.pos,
            Spec::Type(type_spec) => type_spec.ty.end(),
            Spec::Value(value) => match (value.values.last(), &value.ty) {
                (Some(last), _) => last.end(),
                (None, Some(ty)) => ty.end(),
                (None, None) => value.names.last().map(|n| n.pos).unwrap_or(Pos::NONE),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportSpec {
    pub name: Option<Ident>,
    pub path: BasicLit,
}

impl ImportSpec {
    pub fn pos(&self) -> Pos {
        self.name.as_ref().map(|n| n.pos).unwrap_or(self.path.pos)
    }

    /// Import path without quotes.
    pub fn path_value(&self) -> &str {
        self.path.value.trim_matches(|c| c == '"' || c == '`')
    }
}

#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: Ident,
    /// Position of `=` for alias declarations.
    pub assign: Option<Pos>,
    pub ty: Expr,
}

#[derive(Debug, Clone)]
pub struct ValueSpec {
    pub names: Vec<Ident>,
    pub ty: Option<Expr>,
    pub values: Vec<Expr>,
}

/// A function or method declaration.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub recv: Option<FieldList>,
    pub name: Ident,
    pub ty: FuncType,
    pub body: Option<Block>,
}

impl FuncDecl {
    pub fn is_method(&self) -> bool {
        self.recv.is_some()
    }
}

/// Parameter, result, struct field or interface method list.
#[derive(Debug, Clone)]
pub struct FieldList {
    /// `(` or `{`; absent for a single unparenthesized result.
    pub opening: Option<Pos>,
    pub list: Vec<Field>,
    pub closing: Option<Pos>,
}

impl FieldList {
    pub fn end(&self) -> Pos {
        if let Some(closing) = self.closing {
            return closing;
        }
        self.list.last().map(|f| f.ty.end()).unwrap_or(Pos::NONE)
    }

    /// Number of declared slots, counting each name separately.
    pub fn num_fields(&self) -> usize {
        self.list.iter().map(|f| f.names.len().max(1)).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub names: Vec<Ident>,
    pub ty: Expr,
    pub tag: Option<BasicLit>,
}

impl Field {
    pub fn pos(&self) -> Pos {
        self.names.first().map(|n| n.pos).unwrap_or_else(|| self.ty.pos())
    }

    pub fn end(&self) -> Pos {
        self.tag.as_ref().map(|t| t.pos).unwrap_or_else(|| self.ty.end())
    }
}

#[derive(Debug, Clone)]
pub struct FuncType {
    /// Position of `func`; absent for interface methods.
    pub func: Option<Pos>,
    pub params: FieldList,
    pub results: Option<FieldList>,
}

impl FuncType {
    pub fn end(&self) -> Pos {
        match &self.results {
            Some(results) => results.end(),
            None => self.params.end(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StructType {
    pub pos: Pos,
    pub fields: FieldList,
}

#[derive(Debug, Clone)]
pub struct InterfaceType {
    pub pos: Pos,
    pub methods: FieldList,
}

impl InterfaceType {
    /// `interface{}`: the unconstrained type.
    pub fn is_empty(&self) -> bool {
        self.methods.list.is_empty()
    }
}

/// Channel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// Expressions and types.
#[derive(Debug, Clone)]
pub enum Expr {
    Ident(Ident),
    BasicLit(BasicLit),
    /// `T{elts}`; `ty` is absent for elided element types.
    CompositeLit {
        ty: Option<Box<Expr>>,
        lbrace: Pos,
        elts: Vec<Expr>,
        rbrace: Pos,
    },
    FuncLit {
        ty: FuncType,
        body: Block,
    },
    Paren {
        lparen: Pos,
        x: Box<Expr>,
        rparen: Pos,
    },
    Selector {
        x: Box<Expr>,
        sel: Ident,
    },
    Index {
        x: Box<Expr>,
        lbrack: Pos,
        index: Box<Expr>,
        rbrack: Pos,
    },
    Slice {
        x: Box<Expr>,
        lbrack: Pos,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
        max: Option<Box<Expr>>,
        rbrack: Pos,
    },
    /// `x.(T)`, or `x.(type)` in a type switch when `ty` is `None`.
    TypeAssert {
        x: Box<Expr>,
        lparen: Pos,
        ty: Option<Box<Expr>>,
        rparen: Pos,
    },
    Call {
        fun: Box<Expr>,
        lparen: Pos,
        args: Vec<Expr>,
        /// Position of a trailing `...`.
        ellipsis: Option<Pos>,
        rparen: Pos,
    },
    /// Dereference or pointer type.
    Star {
        pos: Pos,
        x: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        pos: Pos,
        x: Box<Expr>,
    },
    Binary {
        x: Box<Expr>,
        op: BinaryOp,
        pos: Pos,
        y: Box<Expr>,
    },
    KeyValue {
        key: Box<Expr>,
        colon: Pos,
        value: Box<Expr>,
    },
    /// `...T` in a variadic parameter, or `...` as an array length.
    Ellipsis {
        pos: Pos,
        elt: Option<Box<Expr>>,
    },
    /// `[len]elt`, or `[]elt` for slices.
    ArrayType {
        lbrack: Pos,
        len: Option<Box<Expr>>,
        elt: Box<Expr>,
    },
    StructType(StructType),
    FuncType(FuncType),
    InterfaceType(InterfaceType),
    MapType {
        pos: Pos,
        key: Box<Expr>,
        value: Box<Expr>,
    },
    ChanType {
        pos: Pos,
        /// Position of `<-`, for directional channels.
        arrow: Option<Pos>,
        dir: ChanDir,
        value: Box<Expr>,
    },
}

impl Expr {
    pub fn ident(name: impl Into<String>, pos: Pos) -> Expr {
        Expr::Ident(Ident::new(name, pos))
    }

    /// Position of the first token.
    pub fn pos(&self) -> Pos {
        match self {
            Expr::Ident(ident) => ident.pos,
            Expr::BasicLit(lit) => lit.pos,
            Expr::CompositeLit { ty, lbrace, .. } => ty.as_ref().map(|t| t.pos()).unwrap_or(*lbrace),
            Expr::FuncLit { ty, body } => ty.func.unwrap_or(body.lbrace),
            Expr::Paren { lparen, .. } => *lparen,
            Expr::Selector { x, .. }
            | Expr::Index { x, .. }
            | Expr::Slice { x, .. }
            | Expr::TypeAssert { x, .. }
            | Expr::Binary { x, .. } => x.pos(),
            Expr::Call { fun, .. } => fun.pos(),
            Expr::Star { pos, .. } | Expr::Unary { pos, .. } | Expr::Ellipsis { pos, .. } => *pos,
            Expr::KeyValue { key, .. } => key.pos(),
            Expr::ArrayType { lbrack, .. } => *lbrack,
            Expr::StructType(st) => st.pos,
            Expr::FuncType(ft) => ft.func.unwrap_or(ft.params.opening.unwrap_or(Pos::NONE)),
            Expr::InterfaceType(it) => it.pos,
            Expr::MapType { pos, .. } => *pos,
            Expr::ChanType { pos, .. } => *pos,
        }
    }

    /// Position of the last token.
    pub fn end(&self) -> Pos {
        match self {
            Expr::Ident(ident) => ident.pos,
            Expr::BasicLit(lit) => lit.pos,
            Expr::CompositeLit { rbrace, .. } => *rbrace,
            Expr::FuncLit { body, .. } => body.rbrace,
            Expr::Paren { rparen, .. } => *rparen,
            Expr::Selector { sel, .. } => sel.pos,
            Expr::Index { rbrack, .. } | Expr::Slice { rbrack, .. } => *rbrack,
            Expr::TypeAssert { rparen, .. } | Expr::Call { rparen, .. } => *rparen,
            Expr::Star { x, .. } | Expr::Unary { x, .. } => x.end(),
            Expr::Binary { y, .. } => y.end(),
            Expr::KeyValue { value, .. } => value.end(),
            Expr::Ellipsis { pos, elt } => elt.as_ref().map(|e| e.end()).unwrap_or(*pos),
            Expr::ArrayType { elt, .. } => elt.end(),
            Expr::StructType(st) => st.fields.end(),
            Expr::FuncType(ft) => ft.end(),
            Expr::InterfaceType(it) => it.methods.end(),
            Expr::MapType { value, .. } | Expr::ChanType { value, .. } => value.end(),
        }
    }

    /// The placeholder type of the template: an interface with no methods.
    pub fn is_empty_interface(&self) -> bool {
        matches!(self, Expr::InterfaceType(it) if it.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `+x`
    Pos,
    /// `-x`
    Neg,
    /// `!x`
    Not,
    /// `^x`
    Xor,
    /// `&x`
    Addr,
    /// `<-x`
    Recv,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Pos => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Xor => "^",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Quo => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::AndNot => "&^",
            BinaryOp::LAnd => "&&",
            BinaryOp::LOr => "||",
            BinaryOp::Eql => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lss => "<",
            BinaryOp::Leq => "<=",
            BinaryOp::Gtr => ">",
            BinaryOp::Geq => ">=",
        }
    }

    /// Go operator precedence, 5 binds tightest.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::LOr => 1,
            BinaryOp::LAnd => 2,
            BinaryOp::Eql
            | BinaryOp::Neq
            | BinaryOp::Lss
            | BinaryOp::Leq
            | BinaryOp::Gtr
            | BinaryOp::Geq => 3,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Or | BinaryOp::Xor => 4,
            BinaryOp::Mul
            | BinaryOp::Quo
            | BinaryOp::Rem
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::And
            | BinaryOp::AndNot => 5,
        }
    }
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `:=`
    Define,
    /// `+=`, `-=`, ...
    Op(BinaryOp),
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignOp::Assign => write!(f, "="),
            AssignOp::Define => write!(f, ":="),
            AssignOp::Op(op) => write!(f, "{}=", op.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

impl BranchKind {
    pub fn keyword(self) -> &'static str {
        match self {
            BranchKind::Break => "break",
            BranchKind::Continue => "continue",
            BranchKind::Goto => "goto",
            BranchKind::Fallthrough => "fallthrough",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub lbrace: Pos,
    pub stmts: Vec<Stmt>,
    pub rbrace: Pos,
}

/// A `case` or `default` clause of a switch.
#[derive(Debug, Clone)]
pub struct CaseClause {
    pub pos: Pos,
    /// Empty for `default`.
    pub list: Vec<Expr>,
    pub colon: Pos,
    pub body: Vec<Stmt>,
}

/// Statements.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum Stmt {
    Decl(GenDecl),
    Empty {
        pos: Pos,
    },
    Expr(Expr),
    Send {
        chan: Expr,
        arrow: Pos,
        value: Expr,
    },
    IncDec {
        x: Expr,
        pos: Pos,
        inc: bool,
    },
    Assign {
        lhs: Vec<Expr>,
        pos: Pos,
        op: AssignOp,
        rhs: Vec<Expr>,
    },
    Go {
        pos: Pos,
        call: Expr,
    },
    Defer {
        pos: Pos,
        call: Expr,
    },
    Return {
        pos: Pos,
        results: Vec<Expr>,
    },
    Branch {
        pos: Pos,
        kind: BranchKind,
        label: Option<Ident>,
    },
    Block(Block),
    If {
        pos: Pos,
        init: Option<Box<Stmt>>,
        cond: Expr,
        body: Block,
        /// Either another `If` or a `Block`.
        els: Option<Box<Stmt>>,
    },
    /// Expression switch, or type switch when `tag` holds a `.(type)` assertion.
    Switch {
        pos: Pos,
        init: Option<Box<Stmt>>,
        tag: Option<Box<Stmt>>,
        lbrace: Pos,
        clauses: Vec<CaseClause>,
        rbrace: Pos,
    },
    For {
        pos: Pos,
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Block,
    },
    Range {
        pos: Pos,
        key: Option<Expr>,
        value: Option<Expr>,
        /// `:=` or `=`; absent for `for range x`.
        op: Option<AssignOp>,
        x: Expr,
        body: Block,
    },
}

impl Stmt {
    pub fn pos(&self) -> Pos {
        match self {
            Stmt::Decl(gen_decl) => gen_decl.pos,
            Stmt::Empty { pos } => *pos,
            Stmt::Expr(expr) => expr.pos(),
            Stmt::Send { chan, .. } => chan.pos(),
            Stmt::IncDec { x, .. } => x.pos(),
            Stmt::Assign { lhs, pos, .. } => lhs.first().map(|e| e.pos()).unwrap_or(*pos),
            Stmt::Go { pos, .. }
            | Stmt::Defer { pos, .. }
            | Stmt::Return { pos, .. }
            | Stmt::Branch { pos, .. }
            | Stmt::If { pos, .. }
            | Stmt::Switch { pos, .. }
            | Stmt::For { pos, .. }
            | Stmt::Range { pos, .. } => *pos,
            Stmt::Block(block) => block.lbrace,
        }
    }

    /// Position of the last token.
    pub fn end(&self) -> Pos {
        match self {
            Stmt::Decl(gen_decl) => gen_decl.end(),
            Stmt::Empty { pos } => *pos,
            Stmt::Expr(expr) => expr.end(),
            Stmt::Send { value, .. } => value.end(),
            Stmt::IncDec { pos, .. } => *pos,
            Stmt::Assign { rhs, pos, .. } => rhs.last().map(|e| e.end()).unwrap_or(*pos),
            Stmt::Go { call, .. } | Stmt::Defer { call, .. } => call.end(),
            Stmt::Return { pos, results } => results.last().map(|e| e.end()).unwrap_or(*pos),
            Stmt::Branch { pos, label, .. } => label.as_ref().map(|l| l.pos).unwrap_or(*pos),
            Stmt::Block(block) => block.rbrace,
            Stmt::If { body, els, .. } => match els {
                Some(els) => els.end(),
                None => body.rbrace,
            },
            Stmt::Switch { rbrace, .. } => *rbrace,
            Stmt::For { body, .. } | Stmt::Range { body, .. } => body.rbrace,
        }
    }
}

/// Kind of a top-level object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjKind {
    Const,
    Type,
    Var,
    Func,
}

impl fmt::Display for ObjKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjKind::Const => "const",
            ObjKind::Type => "type",
            ObjKind::Var => "var",
            ObjKind::Func => "func",
        };
        write!(f, "{}", name)
    }
}

/// File scope: the names declared at top level and what they denote.
///
/// Built from the declarations rather than shared with them, so a rename
/// pass only has to rebuild it afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    objects: BTreeMap<String, ObjKind>,
}

impl Scope {
    /// Collect the top-level names of `decls`. Methods, `init` functions and
    /// blank identifiers are not part of the file scope.
    ///
    /// Returns the first name declared twice as the error.
    pub fn collect(decls: &[Decl]) -> Result<Scope, String> {
        let mut objects = BTreeMap::new();
        let mut declare = |name: &str, kind: ObjKind| -> Result<(), String> {
            if name == "_" {
                return Ok(());
            }
            if objects.insert(name.to_string(), kind).is_some() {
                return Err(name.to_string());
            }
            Ok(())
        };

        for decl in decls {
            match decl {
                Decl::Func(func) => {
                    if !func.is_method() && func.name.name != "init" {
                        declare(&func.name.name, ObjKind::Func)?;
                    }
                }
                Decl::Gen(gen_decl) => {
                    for spec in &gen_decl.specs {
                        match spec {
                            Spec::Import(_) => {}
                            Spec::Type(type_spec) => declare(&type_spec.name.name, ObjKind::Type)?,
                            Spec::Value(value) => {
                                let kind = if gen_decl.kind == GenKind::Const {
                                    ObjKind::Const
                                } else {
                                    ObjKind::Var
                                };
                                for name in &value.names {
                                    declare(&name.name, kind)?;
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(Scope { objects })
    }

    pub fn lookup(&self, name: &str) -> Option<ObjKind> {
        self.objects.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }
}
