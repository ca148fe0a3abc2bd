use crate::syntax::SyntaxError;
use crate::syntax::ast::{BinaryOp, Comment};

/// Token kinds for the Go subset.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Break,
    Case,
    Chan,
    Const,
    Continue,
    Default,
    Defer,
    Else,
    Fallthrough,
    For,
    Func,
    Go,
    Goto,
    If,
    Import,
    Interface,
    Map,
    Package,
    Range,
    Return,
    Select,
    Struct,
    Switch,
    Type,
    Var,

    // Literals, kept as raw source text
    Ident(String),
    Int(String),
    Float(String),
    Imag(String),
    Char(String),
    Str(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    AndNot,
    /// `+=`, `<<=`, `&^=`, ...
    OpAssign(BinaryOp),
    AndAnd,
    OrOr,
    Arrow, // <-
    Inc,
    Dec,
    EqEq,
    Lt,
    Gt,
    Eq,
    Bang,
    NotEq,
    Le,
    Ge,
    Define, // :=
    Ellipsis,
    Tilde,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    /// Explicit `;` or one inserted at a line end.
    Semi,
    Colon,

    // Special
    Eof,
}

impl TokenKind {
    /// Whether a newline after this token terminates the statement.
    fn inserts_semi(&self) -> bool {
        matches!(
            self,
            TokenKind::Ident(_)
                | TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::Imag(_)
                | TokenKind::Char(_)
                | TokenKind::Str(_)
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Fallthrough
                | TokenKind::Return
                | TokenKind::Inc
                | TokenKind::Dec
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        )
    }
}

/// Source position: byte offset plus one, so that zero can mean "unset".
///
/// Nodes parsed from the template carry real positions; nodes spliced in
/// later must be given one before the tree is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pos(u32);

impl Pos {
    pub const NONE: Pos = Pos(0);

    pub fn new(offset: usize) -> Self {
        Pos(offset as u32 + 1)
    }

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    pub fn offset(self) -> Option<usize> {
        if self.is_valid() {
            Some(self.0 as usize - 1)
        } else {
            None
        }
    }
}

/// Maps positions of one source text to line numbers.
#[derive(Debug, Clone, Default)]
pub struct LineTable {
    line_starts: Vec<usize>,
}

impl LineTable {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    /// 1-based line of `pos`, or 0 for an unset position.
    pub fn line(&self, pos: Pos) -> usize {
        match pos.offset() {
            Some(offset) => self.line_starts.partition_point(|&start| start <= offset),
            None => 0,
        }
    }

    /// 1-based (line, column) of `pos`.
    pub fn line_col(&self, pos: Pos) -> (usize, usize) {
        let line = self.line(pos);
        match pos.offset() {
            Some(offset) if line > 0 => (line, offset - self.line_starts[line - 1] + 1),
            _ => (0, 0),
        }
    }
}

/// A token with its kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
    /// Set on a `Semi` inserted at a line end or at the end of input.
    pub implicit: bool,
}

impl Token {
    pub fn new(kind: TokenKind, pos: Pos) -> Self {
        Self {
            kind,
            pos,
            implicit: false,
        }
    }

    pub fn implicit_semi(pos: Pos) -> Self {
        Self {
            kind: TokenKind::Semi,
            pos,
            implicit: true,
        }
    }
}

/// The lexer for Go source text.
pub struct Lexer<'a> {
    filename: &'a str,
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    column: usize,
    insert_semi: bool,
    comments: Vec<Comment>,
}

impl<'a> Lexer<'a> {
    pub fn new(filename: &'a str, source: &'a str) -> Self {
        Self {
            filename,
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            insert_semi: false,
            comments: Vec::new(),
        }
    }

    pub fn scan_tokens(&mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();

        loop {
            if let Some(pos) = self.skip_whitespace_and_comments()? {
                tokens.push(Token::implicit_semi(pos));
                self.insert_semi = false;
                continue;
            }

            let pos = self.pos();

            let Some((_, ch)) = self.peek() else {
                if self.insert_semi {
                    tokens.push(Token::implicit_semi(pos));
                }
                tokens.push(Token::new(TokenKind::Eof, pos));
                break;
            };

            let kind = match ch {
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                ',' => self.single(TokenKind::Comma),
                ';' => self.single(TokenKind::Semi),
                '~' => self.single(TokenKind::Tilde),
                ':' => {
                    self.advance();
                    if self.match_char('=') {
                        TokenKind::Define
                    } else {
                        TokenKind::Colon
                    }
                }
                '.' => {
                    if self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
                        self.scan_number()?
                    } else {
                        self.advance();
                        if self.peek_char() == Some('.') && self.peek_second() == Some('.') {
                            self.advance();
                            self.advance();
                            TokenKind::Ellipsis
                        } else {
                            TokenKind::Dot
                        }
                    }
                }
                '+' => {
                    self.advance();
                    if self.match_char('+') {
                        TokenKind::Inc
                    } else {
                        self.op_or_assign(BinaryOp::Add, TokenKind::Plus)
                    }
                }
                '-' => {
                    self.advance();
                    if self.match_char('-') {
                        TokenKind::Dec
                    } else {
                        self.op_or_assign(BinaryOp::Sub, TokenKind::Minus)
                    }
                }
                '*' => {
                    self.advance();
                    self.op_or_assign(BinaryOp::Mul, TokenKind::Star)
                }
                '/' => {
                    self.advance();
                    self.op_or_assign(BinaryOp::Quo, TokenKind::Slash)
                }
                '%' => {
                    self.advance();
                    self.op_or_assign(BinaryOp::Rem, TokenKind::Percent)
                }
                '^' => {
                    self.advance();
                    self.op_or_assign(BinaryOp::Xor, TokenKind::Caret)
                }
                '&' => {
                    self.advance();
                    if self.match_char('&') {
                        TokenKind::AndAnd
                    } else if self.match_char('^') {
                        self.op_or_assign(BinaryOp::AndNot, TokenKind::AndNot)
                    } else {
                        self.op_or_assign(BinaryOp::And, TokenKind::Amp)
                    }
                }
                '|' => {
                    self.advance();
                    if self.match_char('|') {
                        TokenKind::OrOr
                    } else {
                        self.op_or_assign(BinaryOp::Or, TokenKind::Pipe)
                    }
                }
                '<' => {
                    self.advance();
                    if self.match_char('-') {
                        TokenKind::Arrow
                    } else if self.match_char('<') {
                        self.op_or_assign(BinaryOp::Shl, TokenKind::Shl)
                    } else if self.match_char('=') {
                        TokenKind::Le
                    } else {
                        TokenKind::Lt
                    }
                }
                '>' => {
                    self.advance();
                    if self.match_char('>') {
                        self.op_or_assign(BinaryOp::Shr, TokenKind::Shr)
                    } else if self.match_char('=') {
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    }
                }
                '=' => {
                    self.advance();
                    if self.match_char('=') {
                        TokenKind::EqEq
                    } else {
                        TokenKind::Eq
                    }
                }
                '!' => {
                    self.advance();
                    if self.match_char('=') {
                        TokenKind::NotEq
                    } else {
                        TokenKind::Bang
                    }
                }
                '"' => self.scan_string()?,
                '`' => self.scan_raw_string()?,
                '\'' => self.scan_char()?,
                '0'..='9' => self.scan_number()?,
                c if c == '_' || c.is_alphabetic() => self.scan_identifier(),
                _ => return Err(self.error(&format!("unexpected character '{}'", ch))),
            };

            self.insert_semi = kind.inserts_semi();
            tokens.push(Token::new(kind, pos));
        }

        Ok(tokens)
    }

    /// Comments collected by `scan_tokens`, in source order.
    pub fn into_comments(self) -> Vec<Comment> {
        self.comments
    }

    fn pos(&mut self) -> Pos {
        let offset = self.peek().map(|(i, _)| i).unwrap_or(self.source.len());
        Pos::new(offset)
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.peek().map(|(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.chars.clone();
        chars.next();
        chars.peek().map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((_, ch)) = result {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        result
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn op_or_assign(&mut self, op: BinaryOp, plain: TokenKind) -> TokenKind {
        if self.match_char('=') {
            TokenKind::OpAssign(op)
        } else {
            plain
        }
    }

    /// Skip blanks and record comments. Returns the position of an implicit
    /// semicolon when a line ends after a token that terminates a statement.
    fn skip_whitespace_and_comments(&mut self) -> Result<Option<Pos>, SyntaxError> {
        loop {
            match self.peek() {
                Some((i, '\n')) => {
                    self.advance();
                    if self.insert_semi {
                        return Ok(Some(Pos::new(i)));
                    }
                }
                Some((_, ' ' | '\t' | '\r')) => {
                    self.advance();
                }
                Some((start, '/')) => match self.peek_second() {
                    Some('/') => {
                        while let Some((_, ch)) = self.peek() {
                            if ch == '\n' {
                                break;
                            }
                            self.advance();
                        }
                        let end = self.peek().map(|(i, _)| i).unwrap_or(self.source.len());
                        self.push_comment(start, end);
                    }
                    Some('*') => {
                        self.advance(); // '/'
                        self.advance(); // '*'
                        let mut closed = false;
                        let mut multiline = false;
                        while let Some((_, ch)) = self.advance() {
                            if ch == '\n' {
                                multiline = true;
                            }
                            if ch == '*' && self.peek_char() == Some('/') {
                                self.advance();
                                closed = true;
                                break;
                            }
                        }
                        if !closed {
                            return Err(self.error("comment not terminated"));
                        }
                        let end = self.peek().map(|(i, _)| i).unwrap_or(self.source.len());
                        self.push_comment(start, end);
                        if multiline && self.insert_semi {
                            return Ok(Some(Pos::new(start)));
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        Ok(None)
    }

    fn push_comment(&mut self, start: usize, end: usize) {
        self.comments.push(Comment {
            pos: Pos::new(start),
            text: self.source[start..end].trim_end().to_string(),
        });
    }

    fn scan_number(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.peek().map(|(i, _)| i).unwrap_or(0);
        let mut is_float = false;

        let prefixed = self.peek_char() == Some('0')
            && matches!(
                self.peek_second(),
                Some('x' | 'X' | 'b' | 'B' | 'o' | 'O')
            );

        if prefixed {
            self.advance(); // '0'
            self.advance(); // base letter
            while let Some(ch) = self.peek_char() {
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    self.advance();
                } else {
                    break;
                }
            }
        } else {
            self.digits();
            if self.peek_char() == Some('.') {
                is_float = true;
                self.advance();
                self.digits();
            }
            if matches!(self.peek_char(), Some('e' | 'E')) {
                is_float = true;
                self.advance();
                if matches!(self.peek_char(), Some('+' | '-')) {
                    self.advance();
                }
                if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.error("exponent has no digits"));
                }
                self.digits();
            }
        }

        let imaginary = self.match_char('i');
        let end = self.peek().map(|(i, _)| i).unwrap_or(self.source.len());
        let text = self.source[start..end].to_string();

        Ok(if imaginary {
            TokenKind::Imag(text)
        } else if is_float {
            TokenKind::Float(text)
        } else {
            TokenKind::Int(text)
        })
    }

    fn digits(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_string(&mut self) -> Result<TokenKind, SyntaxError> {
        let text = self.scan_quoted('"', "string literal not terminated")?;
        Ok(TokenKind::Str(text))
    }

    fn scan_char(&mut self) -> Result<TokenKind, SyntaxError> {
        let text = self.scan_quoted('\'', "rune literal not terminated")?;
        if text.len() <= 2 {
            return Err(self.error("empty rune literal"));
        }
        Ok(TokenKind::Char(text))
    }

    /// Scan an interpreted literal, returning its raw text with quotes.
    fn scan_quoted(&mut self, quote: char, unterminated: &str) -> Result<String, SyntaxError> {
        let start = self.peek().map(|(i, _)| i).unwrap_or(0);
        self.advance(); // opening quote

        loop {
            match self.peek_char() {
                None | Some('\n') => return Err(self.error(unterminated)),
                Some('\\') => {
                    self.advance();
                    if matches!(self.peek_char(), None | Some('\n')) {
                        return Err(self.error(unterminated));
                    }
                    self.advance();
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }

        let end = self.peek().map(|(i, _)| i).unwrap_or(self.source.len());
        Ok(self.source[start..end].to_string())
    }

    fn scan_raw_string(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.peek().map(|(i, _)| i).unwrap_or(0);
        self.advance(); // opening backtick

        loop {
            match self.advance() {
                None => return Err(self.error("raw string literal not terminated")),
                Some((_, '`')) => break,
                Some(_) => {}
            }
        }

        let end = self.peek().map(|(i, _)| i).unwrap_or(self.source.len());
        Ok(TokenKind::Str(self.source[start..end].to_string()))
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.peek().map(|(i, _)| i).unwrap_or(0);

        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let end = self.peek().map(|(i, _)| i).unwrap_or(self.source.len());
        let ident = &self.source[start..end];

        match ident {
            "break" => TokenKind::Break,
            "case" => TokenKind::Case,
            "chan" => TokenKind::Chan,
            "const" => TokenKind::Const,
            "continue" => TokenKind::Continue,
            "default" => TokenKind::Default,
            "defer" => TokenKind::Defer,
            "else" => TokenKind::Else,
            "fallthrough" => TokenKind::Fallthrough,
            "for" => TokenKind::For,
            "func" => TokenKind::Func,
            "go" => TokenKind::Go,
            "goto" => TokenKind::Goto,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "interface" => TokenKind::Interface,
            "map" => TokenKind::Map,
            "package" => TokenKind::Package,
            "range" => TokenKind::Range,
            "return" => TokenKind::Return,
            "select" => TokenKind::Select,
            "struct" => TokenKind::Struct,
            "switch" => TokenKind::Switch,
            "type" => TokenKind::Type,
            "var" => TokenKind::Var,
            _ => TokenKind::Ident(ident.to_string()),
        }
    }

    fn error(&self, message: &str) -> SyntaxError {
        SyntaxError::new(message, self.filename, self.line, self.column)
    }
}

/// Whether `word` is a Go keyword.
pub fn is_keyword(word: &str) -> bool {
    matches!(
        word,
        "break"
            | "case"
            | "chan"
            | "const"
            | "continue"
            | "default"
            | "defer"
            | "else"
            | "fallthrough"
            | "for"
            | "func"
            | "go"
            | "goto"
            | "if"
            | "import"
            | "interface"
            | "map"
            | "package"
            | "range"
            | "return"
            | "select"
            | "struct"
            | "switch"
            | "type"
            | "var"
    )
}
