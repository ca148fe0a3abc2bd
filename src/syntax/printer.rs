//! Go source printer.
//!
//! Turns a syntax tree back into gofmt-style text. Comments are interleaved
//! by position: a comment that starts before a node is written on its own
//! line ahead of it, and one on the same line as a node's last token is
//! appended to that line. Blank lines between statements, fields and
//! comments are kept as they were in the source.
//!
//! Every node must carry a valid position. A node without one is reported
//! as [`PrintError::MissingPosition`] rather than printed, since it could
//! not be ordered against the comments around it.

use crate::syntax::ast::*;
use crate::syntax::lexer::{LineTable, Pos};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrintError {
    #[error("missing position for {0}")]
    MissingPosition(&'static str),
}

/// One struct field laid out for column alignment.
struct FieldRow {
    leading: Vec<Comment>,
    blank_before: bool,
    blank_after_comments: bool,
    names: String,
    ty: String,
    trailing: Option<Comment>,
}

pub struct Printer<'a> {
    lines: &'a LineTable,
    comments: &'a [Comment],
    next_comment: usize,
    output: String,
    indent: usize,
    at_line_start: bool,
    /// Source line of the last token or comment written.
    last_line: usize,
}

impl<'a> Printer<'a> {
    pub fn new(lines: &'a LineTable, comments: &'a [Comment]) -> Self {
        Self {
            lines,
            comments,
            next_comment: 0,
            output: String::new(),
            indent: 0,
            at_line_start: true,
            last_line: 0,
        }
    }

    pub fn print_file(mut self, file: &File) -> Result<String, PrintError> {
        self.check(file.package, "package clause")?;
        self.leading_comments(file.package, true);
        self.separate(file.package, false);
        self.write("package ");
        self.ident(&file.name)?;
        self.mark(file.name.pos);
        self.trailing_comment(file.name.pos);

        for decl in &file.decls {
            let pos = decl.pos();
            self.check(pos, "declaration")?;
            self.blank_line();
            if self.leading_comments(pos, true) {
                self.separate(pos, false);
            }
            self.decl(decl)?;
            let end = decl.end();
            self.mark(end);
            self.trailing_comment(end);
        }

        self.line_break();
        while self.next_comment < self.comments.len() {
            let comment = self.comments[self.next_comment].clone();
            self.next_comment += 1;
            self.own_line_comment(&comment, false);
        }

        self.line_break();
        Ok(self.output)
    }

    // Declarations

    fn decl(&mut self, decl: &Decl) -> Result<(), PrintError> {
        match decl {
            Decl::Gen(gen_decl) => self.gen_decl(gen_decl),
            Decl::Func(func) => self.func_decl(func),
        }
    }

    fn gen_decl(&mut self, gen_decl: &GenDecl) -> Result<(), PrintError> {
        self.check(gen_decl.pos, "declaration keyword")?;
        self.write(gen_decl.kind.keyword());
        self.write(" ");

        let Some(lparen) = gen_decl.lparen else {
            return match gen_decl.specs.first() {
                Some(spec) => self.spec(spec),
                None => Ok(()),
            };
        };

        self.check(lparen, "declaration group")?;
        self.write("(");
        self.mark(lparen);
        self.indent += 1;
        for (i, spec) in gen_decl.specs.iter().enumerate() {
            let pos = spec.pos();
            self.check(pos, "spec")?;
            self.line_break();
            let had_comments = self.leading_comments(pos, i == 0);
            self.separate(pos, i == 0 && !had_comments);
            self.spec(spec)?;
            let end = spec.end();
            self.mark(end);
            self.trailing_comment(end);
        }
        let rparen = gen_decl.rparen.unwrap_or(lparen);
        self.check(rparen, "declaration group")?;
        self.line_break();
        self.leading_comments(rparen, gen_decl.specs.is_empty());
        self.indent -= 1;
        self.line_break();
        self.write(")");
        self.mark(rparen);
        Ok(())
    }

    fn spec(&mut self, spec: &Spec) -> Result<(), PrintError> {
        match spec {
            Spec::Import(import) => {
                if let Some(name) = &import.name {
                    self.ident(name)?;
                    self.write(" ");
                }
                self.basic_lit(&import.path)
            }
            Spec::Type(type_spec) => {
                self.ident(&type_spec.name)?;
                match type_spec.assign {
                    Some(assign) => {
                        self.check(assign, "type alias")?;
                        self.write(" = ");
                    }
                    None => self.write(" "),
                }
                self.expr(&type_spec.ty)
            }
            Spec::Value(value) => {
                self.ident_list(&value.names)?;
                if let Some(ty) = &value.ty {
                    self.write(" ");
                    self.expr(ty)?;
                }
                if !value.values.is_empty() {
                    self.write(" = ");
                    self.expr_list(&value.values)?;
                }
                Ok(())
            }
        }
    }

    fn func_decl(&mut self, func: &FuncDecl) -> Result<(), PrintError> {
        self.check_opt(func.ty.func, "func keyword")?;
        self.write("func ");
        if let Some(recv) = &func.recv {
            self.params(recv)?;
            self.write(" ");
        }
        self.ident(&func.name)?;
        self.signature(&func.ty)?;
        if let Some(body) = &func.body {
            self.write(" ");
            self.block(body)?;
        }
        Ok(())
    }

    fn signature(&mut self, ty: &FuncType) -> Result<(), PrintError> {
        self.params(&ty.params)?;
        let Some(results) = &ty.results else {
            return Ok(());
        };
        self.write(" ");
        let bare = results.opening.is_none()
            && results.list.len() == 1
            && results.list[0].names.is_empty();
        if bare {
            self.expr(&results.list[0].ty)
        } else {
            self.params(results)
        }
    }

    fn params(&mut self, list: &FieldList) -> Result<(), PrintError> {
        self.check_opt(list.opening, "parameter list")?;
        self.check_opt(list.closing, "parameter list")?;
        self.write("(");
        for (i, field) in list.list.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            if !field.names.is_empty() {
                self.ident_list(&field.names)?;
                self.write(" ");
            }
            self.expr(&field.ty)?;
        }
        self.write(")");
        Ok(())
    }

    // Statements

    fn block(&mut self, block: &Block) -> Result<(), PrintError> {
        self.check(block.lbrace, "block")?;
        self.check(block.rbrace, "block")?;
        if block.stmts.is_empty() && !self.has_comment_before(block.rbrace) {
            let one_line = self.lines.line(block.lbrace) == self.lines.line(block.rbrace);
            self.write(if one_line { "{}" } else { "{\n" });
            if !one_line {
                self.at_line_start = true;
                self.write("}");
            }
            self.mark(block.rbrace);
            return Ok(());
        }

        self.write("{");
        self.mark(block.lbrace);
        self.indent += 1;
        self.stmt_list(&block.stmts)?;
        self.line_break();
        self.leading_comments(block.rbrace, block.stmts.is_empty());
        self.indent -= 1;
        self.line_break();
        self.write("}");
        self.mark(block.rbrace);
        Ok(())
    }

    fn stmt_list(&mut self, stmts: &[Stmt]) -> Result<(), PrintError> {
        for (i, stmt) in stmts.iter().enumerate() {
            let pos = stmt.pos();
            self.check(pos, "statement")?;
            self.line_break();
            let had_comments = self.leading_comments(pos, i == 0);
            self.separate(pos, i == 0 && !had_comments);
            self.stmt(stmt)?;
            let end = stmt.end();
            self.mark(end);
            self.trailing_comment(end);
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), PrintError> {
        match stmt {
            Stmt::Decl(gen_decl) => self.gen_decl(gen_decl)?,
            Stmt::Empty { pos } => self.check(*pos, "empty statement")?,
            Stmt::Expr(expr) => self.expr(expr)?,
            Stmt::Send { chan, arrow, value } => {
                self.check(*arrow, "send statement")?;
                self.expr(chan)?;
                self.write(" <- ");
                self.expr(value)?;
            }
            Stmt::IncDec { x, pos, inc } => {
                self.check(*pos, "inc/dec statement")?;
                self.expr(x)?;
                self.write(if *inc { "++" } else { "--" });
            }
            Stmt::Assign { lhs, pos, op, rhs } => {
                self.check(*pos, "assignment")?;
                self.expr_list(lhs)?;
                self.write(&format!(" {} ", op));
                self.expr_list(rhs)?;
            }
            Stmt::Go { pos, call } => {
                self.check(*pos, "go statement")?;
                self.write("go ");
                self.expr(call)?;
            }
            Stmt::Defer { pos, call } => {
                self.check(*pos, "defer statement")?;
                self.write("defer ");
                self.expr(call)?;
            }
            Stmt::Return { pos, results } => {
                self.check(*pos, "return statement")?;
                self.write("return");
                if !results.is_empty() {
                    self.write(" ");
                    self.expr_list(results)?;
                }
            }
            Stmt::Branch { pos, kind, label } => {
                self.check(*pos, "branch statement")?;
                self.write(kind.keyword());
                if let Some(label) = label {
                    self.write(" ");
                    self.ident(label)?;
                }
            }
            Stmt::Block(block) => self.block(block)?,
            Stmt::If {
                pos,
                init,
                cond,
                body,
                els,
            } => {
                self.check(*pos, "if statement")?;
                self.write("if ");
                if let Some(init) = init {
                    self.stmt(init)?;
                    self.write("; ");
                }
                self.expr(cond)?;
                self.write(" ");
                self.block(body)?;
                if let Some(els) = els {
                    self.write(" else ");
                    self.stmt(els)?;
                }
            }
            Stmt::Switch {
                pos,
                init,
                tag,
                lbrace,
                clauses,
                rbrace,
            } => {
                self.check(*pos, "switch statement")?;
                self.check(*lbrace, "switch statement")?;
                self.check(*rbrace, "switch statement")?;
                self.write("switch ");
                if let Some(init) = init {
                    self.stmt(init)?;
                    self.write("; ");
                }
                if let Some(tag) = tag {
                    self.stmt(tag)?;
                    self.write(" ");
                }
                self.write("{");
                self.mark(*lbrace);
                for clause in clauses {
                    self.check(clause.pos, "case clause")?;
                    self.check(clause.colon, "case clause")?;
                    self.line_break();
                    self.leading_comments(clause.pos, false);
                    if clause.list.is_empty() {
                        self.write("default:");
                    } else {
                        self.write("case ");
                        self.expr_list(&clause.list)?;
                        self.write(":");
                    }
                    self.mark(clause.colon);
                    self.trailing_comment(clause.colon);
                    self.indent += 1;
                    self.stmt_list(&clause.body)?;
                    self.indent -= 1;
                }
                self.line_break();
                self.indent += 1;
                self.leading_comments(*rbrace, false);
                self.indent -= 1;
                self.line_break();
                self.write("}");
                self.mark(*rbrace);
            }
            Stmt::For {
                pos,
                init,
                cond,
                post,
                body,
            } => {
                self.check(*pos, "for statement")?;
                self.write("for ");
                if init.is_some() || post.is_some() {
                    if let Some(init) = init {
                        self.stmt(init)?;
                    }
                    self.write("; ");
                    if let Some(cond) = cond {
                        self.expr(cond)?;
                    }
                    self.write("; ");
                    if let Some(post) = post {
                        self.stmt(post)?;
                        self.write(" ");
                    }
                } else if let Some(cond) = cond {
                    self.expr(cond)?;
                    self.write(" ");
                }
                self.block(body)?;
            }
            Stmt::Range {
                pos,
                key,
                value,
                op,
                x,
                body,
            } => {
                self.check(*pos, "range statement")?;
                self.write("for ");
                if let (Some(key), Some(op)) = (key, op) {
                    self.expr(key)?;
                    if let Some(value) = value {
                        self.write(", ");
                        self.expr(value)?;
                    }
                    self.write(&format!(" {} ", op));
                }
                self.write("range ");
                self.expr(x)?;
                self.write(" ");
                self.block(body)?;
            }
        }
        Ok(())
    }

    // Expressions

    fn expr_list(&mut self, list: &[Expr]) -> Result<(), PrintError> {
        for (i, expr) in list.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expr(expr)?;
        }
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> Result<(), PrintError> {
        match expr {
            Expr::Binary { .. } => {
                let cutoff = binary_cutoff(expr);
                self.binary(expr, cutoff)
            }
            _ => self.operand(expr),
        }
    }

    /// Operators binding tighter than `cutoff` are written without blanks.
    fn binary(&mut self, expr: &Expr, cutoff: u8) -> Result<(), PrintError> {
        let Expr::Binary { x, op, pos, y } = expr else {
            return self.operand(expr);
        };
        self.check(*pos, "binary expression")?;
        self.binary(x, cutoff)?;
        if op.precedence() < cutoff {
            self.write(&format!(" {} ", op.as_str()));
        } else {
            self.write(op.as_str());
        }
        self.binary(y, cutoff)
    }

    fn operand(&mut self, expr: &Expr) -> Result<(), PrintError> {
        match expr {
            Expr::Ident(ident) => self.ident(ident)?,
            Expr::BasicLit(lit) => self.basic_lit(lit)?,
            Expr::CompositeLit {
                ty,
                lbrace,
                elts,
                rbrace,
            } => {
                self.check(*lbrace, "composite literal")?;
                self.check(*rbrace, "composite literal")?;
                if let Some(ty) = ty {
                    self.expr(ty)?;
                }
                self.composite_elements(*lbrace, elts, *rbrace)?;
            }
            Expr::FuncLit { ty, body } => {
                self.check_opt(ty.func, "function literal")?;
                self.write("func");
                self.signature(ty)?;
                self.write(" ");
                self.func_lit_body(body)?;
            }
            Expr::Paren { lparen, x, rparen } => {
                self.check(*lparen, "parenthesized expression")?;
                self.check(*rparen, "parenthesized expression")?;
                self.write("(");
                self.expr(x)?;
                self.write(")");
            }
            Expr::Selector { x, sel } => {
                self.expr(x)?;
                self.write(".");
                self.ident(sel)?;
            }
            Expr::Index {
                x,
                lbrack,
                index,
                rbrack,
            } => {
                self.check(*lbrack, "index expression")?;
                self.check(*rbrack, "index expression")?;
                self.expr(x)?;
                self.write("[");
                self.expr(index)?;
                self.write("]");
            }
            Expr::Slice {
                x,
                lbrack,
                low,
                high,
                max,
                rbrack,
            } => {
                self.check(*lbrack, "slice expression")?;
                self.check(*rbrack, "slice expression")?;
                self.expr(x)?;
                self.write("[");
                if let Some(low) = low {
                    self.expr(low)?;
                }
                self.write(":");
                if let Some(high) = high {
                    self.expr(high)?;
                }
                if let Some(max) = max {
                    self.write(":");
                    self.expr(max)?;
                }
                self.write("]");
            }
            Expr::TypeAssert {
                x,
                lparen,
                ty,
                rparen,
            } => {
                self.check(*lparen, "type assertion")?;
                self.check(*rparen, "type assertion")?;
                self.expr(x)?;
                self.write(".(");
                match ty {
                    Some(ty) => self.expr(ty)?,
                    None => self.write("type"),
                }
                self.write(")");
            }
            Expr::Call {
                fun,
                lparen,
                args,
                ellipsis,
                rparen,
            } => {
                self.check(*lparen, "call")?;
                self.check(*rparen, "call")?;
                self.check_opt(*ellipsis, "variadic call")?;
                self.expr(fun)?;
                self.write("(");
                self.expr_list(args)?;
                if ellipsis.is_some() {
                    self.write("...");
                }
                self.write(")");
            }
            Expr::Star { pos, x } => {
                self.check(*pos, "star expression")?;
                self.write("*");
                self.expr(x)?;
            }
            Expr::Unary { op, pos, x } => {
                self.check(*pos, "unary expression")?;
                self.write(op.as_str());
                self.expr(x)?;
            }
            Expr::Binary { .. } => {
                let cutoff = binary_cutoff(expr);
                self.binary(expr, cutoff)?;
            }
            Expr::KeyValue { key, colon, value } => {
                self.check(*colon, "key-value pair")?;
                self.expr(key)?;
                self.write(": ");
                self.expr(value)?;
            }
            Expr::Ellipsis { pos, elt } => {
                self.check(*pos, "ellipsis")?;
                self.write("...");
                if let Some(elt) = elt {
                    self.expr(elt)?;
                }
            }
            Expr::ArrayType { lbrack, len, elt } => {
                self.check(*lbrack, "array type")?;
                self.write("[");
                if let Some(len) = len {
                    self.expr(len)?;
                }
                self.write("]");
                self.expr(elt)?;
            }
            Expr::StructType(st) => {
                self.check(st.pos, "struct type")?;
                self.write("struct");
                self.struct_fields(&st.fields)?;
            }
            Expr::FuncType(ft) => {
                self.check_opt(ft.func, "function type")?;
                self.write("func");
                self.signature(ft)?;
            }
            Expr::InterfaceType(it) => {
                self.check(it.pos, "interface type")?;
                self.write("interface");
                self.interface_methods(&it.methods)?;
            }
            Expr::MapType { pos, key, value } => {
                self.check(*pos, "map type")?;
                self.write("map[");
                self.expr(key)?;
                self.write("]");
                self.expr(value)?;
            }
            Expr::ChanType {
                pos,
                arrow,
                dir,
                value,
            } => {
                self.check(*pos, "channel type")?;
                self.check_opt(*arrow, "channel direction")?;
                self.write(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.expr(value)?;
            }
        }
        Ok(())
    }

    fn composite_elements(&mut self, lbrace: Pos, elts: &[Expr], rbrace: Pos) -> Result<(), PrintError> {
        let multi_line = self.lines.line(lbrace) != self.lines.line(rbrace);
        self.write("{");
        if !multi_line {
            self.expr_list(elts)?;
            self.write("}");
            return Ok(());
        }

        self.mark(lbrace);
        self.indent += 1;
        for (i, elt) in elts.iter().enumerate() {
            let pos = elt.pos();
            self.check(pos, "composite element")?;
            self.line_break();
            let had_comments = self.leading_comments(pos, i == 0);
            self.separate(pos, i == 0 && !had_comments);
            self.expr(elt)?;
            self.write(",");
            let end = elt.end();
            self.mark(end);
            self.trailing_comment(end);
        }
        self.line_break();
        self.leading_comments(rbrace, elts.is_empty());
        self.indent -= 1;
        self.line_break();
        self.write("}");
        self.mark(rbrace);
        Ok(())
    }

    /// Function literal bodies written on one source line stay on one line.
    fn func_lit_body(&mut self, body: &Block) -> Result<(), PrintError> {
        self.check(body.lbrace, "block")?;
        self.check(body.rbrace, "block")?;
        let one_line = self.lines.line(body.lbrace) == self.lines.line(body.rbrace);
        if !one_line || body.stmts.is_empty() {
            return self.block(body);
        }

        self.write("{ ");
        for (i, stmt) in body.stmts.iter().enumerate() {
            if i > 0 {
                self.write("; ");
            }
            self.stmt(stmt)?;
        }
        self.write(" }");
        self.mark(body.rbrace);
        Ok(())
    }

    fn struct_fields(&mut self, list: &FieldList) -> Result<(), PrintError> {
        let opening = list.opening.unwrap_or(Pos::NONE);
        let closing = list.closing.unwrap_or(Pos::NONE);
        self.check(opening, "struct fields")?;
        self.check(closing, "struct fields")?;

        let one_line = self.lines.line(opening) == self.lines.line(closing);
        if list.list.is_empty() && !self.has_comment_before(closing) {
            self.write("{}");
            return Ok(());
        }
        if one_line && !self.has_comment_before(closing) {
            self.write("{ ");
            for (i, field) in list.list.iter().enumerate() {
                if i > 0 {
                    self.write("; ");
                }
                self.field(field)?;
            }
            self.write(" }");
            return Ok(());
        }

        self.write(" {");
        self.mark(opening);
        self.indent += 1;

        let mut rows = Vec::with_capacity(list.list.len());
        let mut last_line = self.last_line;
        for (i, field) in list.list.iter().enumerate() {
            let pos = field.pos();
            self.check(pos, "struct field")?;
            let leading = self.take_comments_before(pos);
            let first_line = leading
                .first()
                .map(|c| self.lines.line(c.pos))
                .unwrap_or_else(|| self.lines.line(pos));
            let blank_before = i > 0 && first_line > last_line + 1;
            let blank_after_comments = leading
                .last()
                .is_some_and(|c| self.lines.line(pos) > self.comment_end_line(c) + 1);

            let names = self.capture(|p| p.ident_list(&field.names))?;
            let mut ty = self.capture(|p| p.expr(&field.ty))?;
            if let Some(tag) = &field.tag {
                self.check(tag.pos, "struct tag")?;
                ty.push(' ');
                ty.push_str(&tag.value);
            }

            let end = field.end();
            let trailing = self.take_trailing_comment(end);
            last_line = trailing
                .as_ref()
                .map(|c| self.comment_end_line(c))
                .unwrap_or_else(|| self.lines.line(end));

            rows.push(FieldRow {
                leading,
                blank_before,
                blank_after_comments,
                names,
                ty,
                trailing,
            });
        }

        self.write_field_rows(&rows);
        self.last_line = last_line;

        self.line_break();
        self.leading_comments(closing, list.list.is_empty());
        self.indent -= 1;
        self.line_break();
        self.write("}");
        self.mark(closing);
        Ok(())
    }

    /// Write struct fields, aligning names and trailing comments in columns
    /// across runs of adjacent fields.
    fn write_field_rows(&mut self, rows: &[FieldRow]) {
        let mut start = 0;
        while start < rows.len() {
            let mut end = start + 1;
            while end < rows.len() && !rows[end].blank_before && rows[end].leading.is_empty() {
                end += 1;
            }
            let section = &rows[start..end];

            let name_width = section.iter().map(|r| r.names.len()).max().unwrap_or(0);

            let mut i = 0;
            while i < section.len() {
                let mut j = i;
                while j < section.len() && section[j].trailing.is_some() {
                    j += 1;
                }
                let type_width = section[i..j].iter().map(|r| r.ty.len()).max().unwrap_or(0);

                for row in &section[i..j.max(i + 1)] {
                    self.write_field_row(row, name_width, type_width);
                }
                i = j.max(i + 1);
            }
            start = end;
        }
    }

    fn write_field_row(&mut self, row: &FieldRow, name_width: usize, type_width: usize) {
        self.line_break();
        if row.blank_before {
            self.blank_line();
        }
        for (k, comment) in row.leading.iter().enumerate() {
            if k > 0 {
                let prev = &row.leading[k - 1];
                if self.lines.line(comment.pos) > self.comment_end_line(prev) + 1 {
                    self.blank_line();
                }
            }
            self.write(&comment.text);
            self.line_break();
        }
        if row.blank_after_comments {
            self.blank_line();
        }

        if !row.names.is_empty() {
            self.write(&format!("{:<width$} ", row.names, width = name_width));
        }
        match &row.trailing {
            Some(comment) => {
                self.write(&format!("{:<width$} ", row.ty, width = type_width));
                self.write(&comment.text);
            }
            None => self.write(&row.ty),
        }
    }

    fn interface_methods(&mut self, list: &FieldList) -> Result<(), PrintError> {
        let opening = list.opening.unwrap_or(Pos::NONE);
        let closing = list.closing.unwrap_or(Pos::NONE);
        self.check(opening, "interface methods")?;
        self.check(closing, "interface methods")?;

        if list.list.is_empty() && !self.has_comment_before(closing) {
            self.write("{}");
            return Ok(());
        }
        if self.lines.line(opening) == self.lines.line(closing) {
            self.write("{ ");
            for (i, field) in list.list.iter().enumerate() {
                if i > 0 {
                    self.write("; ");
                }
                self.method(field)?;
            }
            self.write(" }");
            return Ok(());
        }

        self.write(" {");
        self.mark(opening);
        self.indent += 1;
        for (i, field) in list.list.iter().enumerate() {
            let pos = field.pos();
            self.check(pos, "interface method")?;
            self.line_break();
            let had_comments = self.leading_comments(pos, i == 0);
            self.separate(pos, i == 0 && !had_comments);
            self.method(field)?;
            let end = field.end();
            self.mark(end);
            self.trailing_comment(end);
        }
        self.line_break();
        self.leading_comments(closing, list.list.is_empty());
        self.indent -= 1;
        self.line_break();
        self.write("}");
        self.mark(closing);
        Ok(())
    }

    fn method(&mut self, field: &Field) -> Result<(), PrintError> {
        match (&field.names[..], &field.ty) {
            ([name], Expr::FuncType(ft)) => {
                self.ident(name)?;
                self.signature(ft)
            }
            _ => self.expr(&field.ty),
        }
    }

    fn field(&mut self, field: &Field) -> Result<(), PrintError> {
        if !field.names.is_empty() {
            self.ident_list(&field.names)?;
            self.write(" ");
        }
        self.expr(&field.ty)?;
        if let Some(tag) = &field.tag {
            self.write(" ");
            self.basic_lit(tag)?;
        }
        Ok(())
    }

    fn ident_list(&mut self, names: &[Ident]) -> Result<(), PrintError> {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.ident(name)?;
        }
        Ok(())
    }

    fn ident(&mut self, ident: &Ident) -> Result<(), PrintError> {
        self.check(ident.pos, "identifier")?;
        self.write(&ident.name);
        Ok(())
    }

    fn basic_lit(&mut self, lit: &BasicLit) -> Result<(), PrintError> {
        self.check(lit.pos, "literal")?;
        self.write(&lit.value);
        Ok(())
    }

    // Comments

    fn has_comment_before(&self, pos: Pos) -> bool {
        self.comments
            .get(self.next_comment)
            .is_some_and(|c| c.pos < pos)
    }

    fn take_comments_before(&mut self, pos: Pos) -> Vec<Comment> {
        let mut taken = Vec::new();
        while self.has_comment_before(pos) {
            taken.push(self.comments[self.next_comment].clone());
            self.next_comment += 1;
        }
        taken
    }

    /// The next comment, if it starts after `end` on the same line.
    fn take_trailing_comment(&mut self, end: Pos) -> Option<Comment> {
        let comment = self.comments.get(self.next_comment)?;
        if comment.pos > end && self.lines.line(comment.pos) == self.lines.line(end) {
            self.next_comment += 1;
            return Some(comment.clone());
        }
        None
    }

    /// Write every pending comment that starts before `pos` on its own line.
    /// Returns whether any was written.
    fn leading_comments(&mut self, pos: Pos, first_in_list: bool) -> bool {
        let comments = self.take_comments_before(pos);
        for (i, comment) in comments.iter().enumerate() {
            self.own_line_comment(comment, first_in_list && i == 0);
        }
        !comments.is_empty()
    }

    fn own_line_comment(&mut self, comment: &Comment, first_in_list: bool) {
        self.line_break();
        if !first_in_list && self.last_line > 0 && self.lines.line(comment.pos) > self.last_line + 1 {
            self.blank_line();
        }
        self.write(&comment.text);
        self.last_line = self.comment_end_line(comment);
        self.line_break();
    }

    fn trailing_comment(&mut self, end: Pos) {
        if let Some(comment) = self.take_trailing_comment(end) {
            self.write(" ");
            self.write(&comment.text);
            self.last_line = self.comment_end_line(&comment);
        }
    }

    fn comment_end_line(&self, comment: &Comment) -> usize {
        self.lines.line(comment.pos) + comment.text.matches('\n').count()
    }

    // Output helpers

    fn check(&self, pos: Pos, node: &'static str) -> Result<(), PrintError> {
        if pos.is_valid() {
            Ok(())
        } else {
            Err(PrintError::MissingPosition(node))
        }
    }

    fn check_opt(&self, pos: Option<Pos>, node: &'static str) -> Result<(), PrintError> {
        match pos {
            Some(pos) => self.check(pos, node),
            None => Ok(()),
        }
    }

    /// Record that output has reached the source line of `pos`.
    fn mark(&mut self, pos: Pos) {
        self.last_line = self.last_line.max(self.lines.line(pos));
    }

    /// Keep a blank line before `pos` when the source had one.
    fn separate(&mut self, pos: Pos, first_in_list: bool) {
        if !first_in_list && self.last_line > 0 && self.lines.line(pos) > self.last_line + 1 {
            self.blank_line();
        }
    }

    /// Run `f` against a scratch buffer and return what it wrote.
    fn capture<F>(&mut self, f: F) -> Result<String, PrintError>
    where
        F: FnOnce(&mut Self) -> Result<(), PrintError>,
    {
        let saved = std::mem::take(&mut self.output);
        let saved_start = self.at_line_start;
        self.at_line_start = false;
        let result = f(self);
        let captured = std::mem::replace(&mut self.output, saved);
        self.at_line_start = saved_start;
        result.map(|()| captured)
    }

    fn write(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        if self.at_line_start {
            for _ in 0..self.indent {
                self.output.push('\t');
            }
            self.at_line_start = false;
        }
        self.output.push_str(s);
    }

    fn line_break(&mut self) {
        if !self.at_line_start {
            self.output.push('\n');
            self.at_line_start = true;
        }
    }

    fn blank_line(&mut self) {
        self.line_break();
        if !self.output.is_empty() && !self.output.ends_with("\n\n") {
            self.output.push('\n');
        }
    }
}

/// gofmt drops the blanks around the tightest operators only when an
/// expression mixes additive and multiplicative ones.
fn binary_cutoff(expr: &Expr) -> u8 {
    fn walk(expr: &Expr, has4: &mut bool, has5: &mut bool) {
        if let Expr::Binary { x, op, y, .. } = expr {
            match op.precedence() {
                4 => *has4 = true,
                5 => *has5 = true,
                _ => {}
            }
            walk(x, has4, has5);
            walk(y, has4, has5);
        }
    }

    let (mut has4, mut has5) = (false, false);
    walk(expr, &mut has4, &mut has5);
    if has4 && has5 { 5 } else { 6 }
}

/// Print a file, interleaving the comments of `lines`' source.
pub fn format_file(file: &File, lines: &LineTable) -> Result<String, PrintError> {
    Printer::new(lines, &file.comments).print_file(file)
}

/// Print a standalone expression or type on one line.
pub fn format_expr(expr: &Expr) -> Result<String, PrintError> {
    let lines = LineTable::new("");
    let mut printer = Printer::new(&lines, &[]);
    printer.expr(expr)?;
    Ok(printer.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse_file, parse_type};

    fn round_trip(source: &str) -> String {
        let file = parse_file("test.go", source).unwrap();
        format_file(&file, &LineTable::new(source)).unwrap()
    }

    #[test]
    fn test_template_round_trips() {
        let source = include_str!("../../templates/sync_map.go");
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let source = "// Package doc.\npackage p\n\n// F does things.\nfunc F() {\n\tx := 1 // one\n\n\t// then y\n\ty := 2\n\t_, _ = x, y\n}\n";
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn test_blank_lines_after_open_brace_are_dropped() {
        let source = "package p\n\nfunc F() {\n\n\tx()\n}\n";
        assert_eq!(round_trip(source), "package p\n\nfunc F() {\n\tx()\n}\n");
    }

    #[test]
    fn test_struct_alignment() {
        let source = "package p\n\ntype T struct {\n\ta int\n\tlonger string // c\n\tb bool // d\n}\n";
        let expected = "package p\n\ntype T struct {\n\ta      int\n\tlonger string // c\n\tb      bool   // d\n}\n";
        assert_eq!(round_trip(source), expected);
    }

    #[test]
    fn test_statements() {
        let source = "package p\n\nfunc F(xs []int, c chan<- int) (n int) {\n\tfor i := 0; i < len(xs); i++ {\n\t\tn += xs[i]\n\t}\n\tswitch n {\n\tcase 0, 1:\n\t\tc <- n\n\tdefault:\n\t\tgo g(xs[1:]...)\n\t}\n\tdefer func() { n-- }()\n\treturn\n}\n";
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn test_binary_spacing() {
        let ty = parse_file("t.go", "package p\nvar x = a + b*c\nvar y = a == b || c\n").unwrap();
        let printed = format_file(&ty, &LineTable::new("package p\nvar x = a + b*c\nvar y = a == b || c\n")).unwrap();
        assert!(printed.contains("var x = a + b*c"));
        assert!(printed.contains("var y = a == b || c"));
    }

    #[test]
    fn test_format_expr() {
        let ty = parse_type("t", "map[string]*struct{ a []int }").unwrap();
        assert_eq!(format_expr(&ty).unwrap(), "map[string]*struct{ a []int }");
        let ty = parse_type("t", "func(int) (string, error)").unwrap();
        assert_eq!(format_expr(&ty).unwrap(), "func(int) (string, error)");
        let ty = parse_type("t", "<-chan interface{}").unwrap();
        assert_eq!(format_expr(&ty).unwrap(), "<-chan interface{}");
    }

    #[test]
    fn test_missing_position_is_an_error() {
        let source = "package p\n\nvar x int\n";
        let mut file = parse_file("test.go", source).unwrap();
        let Decl::Gen(gen_decl) = &mut file.decls[0] else {
            panic!("expected var declaration");
        };
        let Spec::Value(value) = &mut gen_decl.specs[0] else {
            panic!("expected value spec");
        };
        value.ty = Some(Expr::ident("string", Pos::NONE));

        let err = format_file(&file, &LineTable::new(source)).unwrap_err();
        assert_eq!(err, PrintError::MissingPosition("identifier"));
        assert_eq!(err.to_string(), "missing position for identifier");
    }
}
