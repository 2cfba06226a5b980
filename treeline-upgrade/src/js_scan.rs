//! Minimal JavaScript scanner for the structural staleness detectors.
//!
//! Produces a flat token stream (comments dropped; regexes, numbers, and
//! template text collapsed to [`Token::Literal`]) and then splits
//! identifiers into the names a file binds itself and the names it reads
//! from the enclosing scope. Bracket balance and literal termination are
//! enforced; a file that fails either check would not load, which callers
//! report as indeterminate.

use std::collections::HashSet;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Ident(String),
    Punct(char),
    Arrow,
    /// String literal contents, escapes resolved to the escaped character.
    Str(String),
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unterminated {kind} starting on line {line}")]
    Unterminated { kind: &'static str, line: usize },

    #[error("unbalanced '{found}' on line {line}")]
    Unbalanced { found: char, line: usize },

    #[error("unclosed '{open}' at end of file")]
    Unclosed { open: char },
}

const KEYWORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "let", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with", "yield", "await",
];

/// Keywords after which a `/` starts a regular expression.
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case",
    "do", "else", "yield", "await",
];

pub(crate) fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Paren,
    Bracket,
    Brace,
    TemplateExpr,
}

impl Open {
    fn char(self) -> char {
        match self {
            Open::Paren => '(',
            Open::Bracket => '[',
            Open::Brace | Open::TemplateExpr => '{',
        }
    }
}

/// Tokens of one file, with a flag per token for a preceding line break.
#[derive(Debug)]
pub(crate) struct Scanned {
    pub tokens: Vec<Token>,
    pub line_break_before: Vec<bool>,
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    /// Line the token being scanned starts on.
    token_line: usize,
    /// Line the previous token ended on.
    end_line: usize,
    tokens: Vec<Token>,
    breaks: Vec<bool>,
    open: Vec<Open>,
}

pub(crate) fn scan(source: &str) -> Result<Scanned, ScanError> {
    let scanner = Scanner {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        token_line: 1,
        end_line: 1,
        tokens: Vec::new(),
        breaks: Vec::new(),
        open: Vec::new(),
    };
    scanner.run()
}

impl Scanner {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, token: Token) {
        self.breaks.push(self.token_line > self.end_line);
        self.tokens.push(token);
        self.end_line = self.line;
    }

    fn run(mut self) -> Result<Scanned, ScanError> {
        // Shebang lines are legal in Node entry points.
        if self.peek() == Some('#') && self.peek_at(1) == Some('!') {
            self.skip_line_comment();
        }

        while let Some(c) = self.peek() {
            self.token_line = self.line;
            match c {
                '\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                c if c.is_whitespace() => self.pos += 1,
                '/' if self.peek_at(1) == Some('/') => self.skip_line_comment(),
                '/' if self.peek_at(1) == Some('*') => self.skip_block_comment()?,
                '/' if self.regex_allowed() => {
                    self.skip_regex()?;
                    self.push(Token::Literal);
                }
                '"' | '\'' => {
                    let text = self.scan_string(c)?;
                    self.push(Token::Str(text));
                }
                '`' => {
                    self.pos += 1;
                    self.scan_template()?;
                }
                c if is_ident_start(c) => self.scan_ident(),
                c if c.is_ascii_digit() => self.scan_number(),
                '=' if self.peek_at(1) == Some('>') => {
                    self.pos += 2;
                    self.push(Token::Arrow);
                }
                '(' | '[' | '{' => {
                    self.open.push(match c {
                        '(' => Open::Paren,
                        '[' => Open::Bracket,
                        _ => Open::Brace,
                    });
                    self.push(Token::Punct(c));
                    self.pos += 1;
                }
                ')' | ']' | '}' => self.close(c)?,
                _ => {
                    self.push(Token::Punct(c));
                    self.pos += 1;
                }
            }
        }

        match self.open.last() {
            Some(Open::TemplateExpr) => Err(ScanError::Unterminated {
                kind: "template literal",
                line: self.line,
            }),
            Some(open) => Err(ScanError::Unclosed { open: open.char() }),
            None => Ok(Scanned {
                tokens: self.tokens,
                line_break_before: self.breaks,
            }),
        }
    }

    fn close(&mut self, c: char) -> Result<(), ScanError> {
        let expected = match c {
            ')' => Open::Paren,
            ']' => Open::Bracket,
            _ => Open::Brace,
        };
        match self.open.pop() {
            Some(Open::TemplateExpr) if c == '}' => {
                self.pos += 1;
                self.scan_template()
            }
            Some(open) if open == expected => {
                self.push(Token::Punct(c));
                self.pos += 1;
                Ok(())
            }
            _ => Err(ScanError::Unbalanced {
                found: c,
                line: self.line,
            }),
        }
    }

    fn regex_allowed(&self) -> bool {
        match self.tokens.last() {
            None | Some(Token::Arrow) => true,
            Some(Token::Literal | Token::Str(_)) => false,
            Some(Token::Ident(name)) => REGEX_PREFIX_KEYWORDS.contains(&name.as_str()),
            Some(Token::Punct(p)) => !matches!(p, ')' | ']' | '}'),
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ScanError> {
        let start = self.line;
        self.pos += 2;
        loop {
            match self.peek() {
                None => {
                    return Err(ScanError::Unterminated {
                        kind: "block comment",
                        line: start,
                    })
                }
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.pos += 2;
                    return Ok(());
                }
                Some('\n') => {
                    self.line += 1;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<String, ScanError> {
        let start = self.line;
        let mut text = String::new();
        self.pos += 1;
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(ScanError::Unterminated {
                        kind: "string literal",
                        line: start,
                    })
                }
                Some('\\') => {
                    match self.peek_at(1) {
                        Some('\n') => self.line += 1,
                        Some(escaped) => text.push(escaped),
                        None => {}
                    }
                    self.pos += 2;
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(text);
                }
                Some(c) => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn skip_regex(&mut self) -> Result<(), ScanError> {
        let start = self.line;
        let mut in_class = false;
        self.pos += 1;
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(ScanError::Unterminated {
                        kind: "regular expression",
                        line: start,
                    })
                }
                Some('\\') => self.pos += 2,
                Some('[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some('/') if !in_class => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        Ok(())
    }

    /// Scan template text up to the closing backtick or the next `${`.
    fn scan_template(&mut self) -> Result<(), ScanError> {
        let start = self.line;
        loop {
            match self.peek() {
                None => {
                    return Err(ScanError::Unterminated {
                        kind: "template literal",
                        line: start,
                    })
                }
                Some('\\') => self.pos += 2,
                Some('`') => {
                    self.pos += 1;
                    self.push(Token::Literal);
                    return Ok(());
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    self.pos += 2;
                    self.push(Token::Literal);
                    self.open.push(Open::TemplateExpr);
                    return Ok(());
                }
                Some('\n') => {
                    self.line += 1;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn scan_ident(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        self.push(Token::Ident(name));
    }

    fn scan_number(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
        {
            self.pos += 1;
        }
        self.push(Token::Literal);
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

// ---------------------------------------------------------------------------
// Binding analysis
// ---------------------------------------------------------------------------

/// Names a file declares anywhere, and names it reads without a qualifier.
///
/// Scopes are flattened: a name bound anywhere in the file counts as bound
/// everywhere. That can only turn a stale verdict into a current one, never
/// the other way round.
#[derive(Debug, Default)]
pub(crate) struct Bindings {
    pub declared: HashSet<String>,
    pub references: HashSet<String>,
}

impl Bindings {
    /// `true` when `name` is read but never bound by the file.
    pub fn is_free(&self, name: &str) -> bool {
        self.references.contains(name) && !self.declared.contains(name)
    }
}

pub(crate) fn analyze(tokens: &[Token]) -> Bindings {
    let mut bindings = Bindings::default();

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Ident(name) if is_keyword(name) => match name.as_str() {
                "var" | "let" | "const" => declare_variables(tokens, i + 1, &mut bindings),
                "function" => declare_function(tokens, i + 1, &mut bindings),
                "class" => {
                    if let Some(Token::Ident(class_name)) = tokens.get(i + 1) {
                        bindings.declared.insert(class_name.clone());
                    }
                }
                "catch" => {
                    if tokens.get(i + 1) == Some(&Token::Punct('(')) {
                        declare_group(tokens, i + 1, &mut bindings);
                    }
                }
                _ => {}
            },
            Token::Ident(name) => classify_ident(tokens, i, name, &mut bindings),
            Token::Arrow => {
                if i > 0 && tokens[i - 1] == Token::Punct(')') {
                    if let Some(open) = matching_open(tokens, i - 1) {
                        declare_group(tokens, open, &mut bindings);
                    }
                }
            }
            _ => {}
        }
    }

    bindings
}

fn classify_ident(tokens: &[Token], i: usize, name: &str, bindings: &mut Bindings) {
    let prev = i.checked_sub(1).and_then(|p| tokens.get(p));
    let next = tokens.get(i + 1);

    if prev == Some(&Token::Punct('.')) {
        // `global._ = require('lodash')` installs the global explicitly.
        let owner = i.checked_sub(2).and_then(|p| tokens.get(p));
        let is_global_owner = matches!(
            owner,
            Some(Token::Ident(o)) if o == "global" || o == "globalThis" || o == "window"
        );
        let is_assignment =
            next == Some(&Token::Punct('=')) && tokens.get(i + 2) != Some(&Token::Punct('='));
        if is_global_owner && is_assignment {
            bindings.declared.insert(name.to_string());
        }
        return;
    }

    if next == Some(&Token::Arrow) {
        bindings.declared.insert(name.to_string());
        return;
    }

    let is_object_key = next == Some(&Token::Punct(':'))
        && matches!(prev, Some(Token::Punct('{')) | Some(Token::Punct(',')));
    if is_object_key {
        return;
    }

    // Shorthand method definition: `name(a, b) { ... }`.
    if next == Some(&Token::Punct('(')) {
        if let Some(close) = matching_close(tokens, i + 1) {
            if tokens.get(close + 1) == Some(&Token::Punct('{')) {
                declare_group(tokens, i + 1, bindings);
                return;
            }
        }
    }

    bindings.references.insert(name.to_string());
}

/// Declare the names introduced by `var` / `let` / `const` starting at `start`.
fn declare_variables(tokens: &[Token], start: usize, bindings: &mut Bindings) {
    let mut i = start;
    let mut expect_name = true;
    let mut depth = 0usize;

    while let Some(token) = tokens.get(i) {
        match token {
            Token::Ident(name) if expect_name && depth == 0 && !is_keyword(name) => {
                bindings.declared.insert(name.clone());
                expect_name = false;
            }
            Token::Punct('{') | Token::Punct('[') if expect_name && depth == 0 => {
                let end = declare_group(tokens, i, bindings);
                expect_name = false;
                i = end;
            }
            Token::Punct('(') | Token::Punct('[') | Token::Punct('{') => {
                depth += 1;
                expect_name = false;
            }
            Token::Punct(')') | Token::Punct(']') | Token::Punct('}') => {
                if depth == 0 {
                    return;
                }
                depth -= 1;
            }
            Token::Punct(',') if depth == 0 => expect_name = true,
            Token::Punct(';') if depth == 0 => return,
            Token::Ident(name) if depth == 0 && (name == "in" || name == "of") => return,
            _ => expect_name = false,
        }
        i += 1;
    }
}

fn declare_function(tokens: &[Token], start: usize, bindings: &mut Bindings) {
    let mut i = start;
    if tokens.get(i) == Some(&Token::Punct('*')) {
        i += 1;
    }
    if let Some(Token::Ident(name)) = tokens.get(i) {
        bindings.declared.insert(name.clone());
        i += 1;
    }
    if tokens.get(i) == Some(&Token::Punct('(')) {
        declare_group(tokens, i, bindings);
    }
}

/// Declare every identifier inside the bracket group opening at `open`.
/// Returns the index of the matching close token.
fn declare_group(tokens: &[Token], open: usize, bindings: &mut Bindings) -> usize {
    let close = matching_close(tokens, open).unwrap_or(tokens.len());
    for token in &tokens[open + 1..close.min(tokens.len())] {
        if let Token::Ident(name) = token {
            if !is_keyword(name) {
                bindings.declared.insert(name.clone());
            }
        }
    }
    close
}

pub(crate) fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, token) in tokens[open..].iter().enumerate() {
        match token {
            Token::Punct('(') | Token::Punct('[') | Token::Punct('{') => depth += 1,
            Token::Punct(')') | Token::Punct(']') | Token::Punct('}') => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn matching_open(tokens: &[Token], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        match tokens[i] {
            Token::Punct(')') | Token::Punct(']') | Token::Punct('}') => depth += 1,
            Token::Punct('(') | Token::Punct('[') | Token::Punct('{') => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
