//! Follows a module load and one call of its exported function along the
//! path that certainly runs when the call argument is absent.
//!
//! Only straight-line code is followed. Nested functions are never entered
//! and calls are assumed to return. An `if` whose test depends only on the
//! absent argument is decided; every other branch, loop, `try`, or
//! short-circuit operand is opaque, and the walk stops at opaque code that
//! could leave the function, throw, or read a missing global.

use std::collections::HashSet;
use std::ops::ControlFlow;

use crate::js_scan::{is_keyword, matching_close, Bindings, Scanned, Token};

/// Where the traced execution ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Trace {
    /// Loading the module reads a global nobody defines.
    LoadError(String),
    /// The call reads a global nobody defines before anything else stops it.
    Undefined(String),
    /// The call returns, throws something else, or leaves the followed path.
    Settled,
}

#[derive(Debug)]
enum Halt {
    Undefined(String),
    Stopped,
}

type Step<T = ()> = ControlFlow<Halt, T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Truth {
    Holds,
    Fails,
    Unknown,
}

/// Tests that hold when the argument is absent, rendered by [`render_test`].
const HOLDS_WHEN_ABSENT: &[&str] = &[
    "!@",
    "@===undefined",
    "@==undefined",
    "@==null",
    "undefined===@",
    "undefined==@",
    "null==@",
    "@===void 0",
    "typeof @==='undefined'",
    "typeof @=='undefined'",
];

const FAILS_WHEN_ABSENT: &[&str] = &[
    "@",
    "!!@",
    "@!==undefined",
    "@!=undefined",
    "@!=null",
    "undefined!==@",
    "undefined!=@",
    "null!=@",
    "@===null",
    "@!==void 0",
    "typeof @!=='undefined'",
    "typeof @!='undefined'",
];

/// Keywords that start a new statement when semicolons are omitted.
const STATEMENT_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "try", "return", "throw", "var", "let",
    "const",
];

/// Trace loading `source` as a module and calling its export with no argument.
///
/// `provided` names the globals the runtime defines.
pub(crate) fn trace_invocation(
    source: &Scanned,
    bindings: &Bindings,
    provided: &dyn Fn(&str) -> bool,
) -> Trace {
    let src = Source {
        tokens: &source.tokens,
        breaks: &source.line_break_before,
    };
    let mut walker = Walker {
        src,
        bindings,
        provided,
        assigned: HashSet::new(),
        absent: None,
    };
    if let ControlFlow::Break(Halt::Undefined(name)) = walker.block(0, src.tokens.len()) {
        return Trace::LoadError(name);
    }

    let Some(export) = find_export(src) else {
        return Trace::Settled;
    };
    walker.absent = export.first_param;
    let flow = match export.body {
        Body::Block { start, end } => walker.block(start, end),
        Body::Expr { start, end } => walker.expression(start, end),
    };
    match flow {
        ControlFlow::Break(Halt::Undefined(name)) => Trace::Undefined(name),
        _ => Trace::Settled,
    }
}

/// Tokens plus their line-break flags.
#[derive(Clone, Copy)]
struct Source<'a> {
    tokens: &'a [Token],
    breaks: &'a [bool],
}

struct Walker<'a> {
    src: Source<'a>,
    bindings: &'a Bindings,
    provided: &'a dyn Fn(&str) -> bool,
    /// Names written without a declaration; sloppy mode makes them globals.
    assigned: HashSet<String>,
    /// Parameter known to hold `undefined`.
    absent: Option<String>,
}

impl Walker<'_> {
    fn block(&mut self, start: usize, end: usize) -> Step {
        let mut i = start;
        while i < end {
            i = self.statement(i, end)?;
        }
        ControlFlow::Continue(())
    }

    /// Run the statement starting at `i`; yields the index after it.
    fn statement(&mut self, i: usize, end: usize) -> Step<usize> {
        let src = self.src;
        match &src.tokens[i] {
            Token::Punct(';') => ControlFlow::Continue(i + 1),
            Token::Punct('{') => {
                let next = past_group(src.tokens, i, end);
                self.block(i + 1, next.saturating_sub(1).max(i + 1))?;
                ControlFlow::Continue(next)
            }
            Token::Ident(keyword) => match keyword.as_str() {
                "if" => self.if_statement(i, end),
                "return" | "throw" => {
                    // `return` followed by a line break returns undefined.
                    let stop = if keyword == "return" && src.break_before(i + 1) {
                        i + 1
                    } else {
                        expression_end(src, i + 1, end)
                    };
                    self.expression(i + 1, stop)?;
                    ControlFlow::Break(Halt::Stopped)
                }
                "function" | "class" => ControlFlow::Continue(skip_statement(src, i, end)),
                "for" | "while" | "do" | "switch" | "try" | "with" => {
                    let next = skip_statement(src, i, end);
                    self.opaque(i, next)?;
                    ControlFlow::Continue(next)
                }
                _ => self.expression_statement(i, end),
            },
            _ => self.expression_statement(i, end),
        }
    }

    fn expression_statement(&mut self, i: usize, end: usize) -> Step<usize> {
        let stop = expression_end(self.src, i, end);
        self.expression(i, stop)?;
        ControlFlow::Continue(stop)
    }

    fn if_statement(&mut self, i: usize, end: usize) -> Step<usize> {
        let src = self.src;
        let open = i + 1;
        if open >= end || src.tokens[open] != Token::Punct('(') {
            let next = skip_statement(src, i, end);
            self.opaque(i, next)?;
            return ControlFlow::Continue(next);
        }

        let then_start = past_group(src.tokens, open, end);
        let test_end = then_start.saturating_sub(1).max(open + 1);
        self.expression(open + 1, test_end)?;
        let truth = self.test_truth(open + 1, test_end);

        let then_end = skip_statement(src, then_start, end);
        let has_else = ident_at(src.tokens, then_end, end, "else");
        let else_end = if has_else {
            skip_statement(src, then_end + 1, end)
        } else {
            then_end
        };

        match truth {
            Truth::Holds => self.block(then_start, then_end)?,
            Truth::Fails if has_else => self.block(then_end + 1, else_end)?,
            Truth::Fails => {}
            Truth::Unknown => self.opaque(then_start, else_end)?,
        }
        ControlFlow::Continue(else_end)
    }

    /// Evaluate the operands in `start..end` left to right.
    fn expression(&mut self, start: usize, end: usize) -> Step {
        let tokens = self.src.tokens;
        let mut k = start;
        while k < end {
            match &tokens[k] {
                Token::Ident(name) if name == "function" || name == "class" => {
                    k = past_function(tokens, k, end);
                    continue;
                }
                Token::Arrow => {
                    // Parameters were passed over already; the body never runs.
                    if k + 1 < end && tokens[k + 1] == Token::Punct('{') {
                        k = past_group(tokens, k + 1, end);
                        continue;
                    }
                    return ControlFlow::Continue(());
                }
                Token::Punct('&') if tokens.get(k + 1) == Some(&Token::Punct('&')) => {
                    return self.opaque(k, end)
                }
                Token::Punct('|') if tokens.get(k + 1) == Some(&Token::Punct('|')) => {
                    return self.opaque(k, end)
                }
                Token::Punct('?') => return self.opaque(k, end),
                Token::Ident(name) if !is_keyword(name) => {
                    if let Some(body_end) = method_body_end(tokens, k, end) {
                        k = body_end;
                        continue;
                    }
                    self.operand(k, name)?;
                }
                _ => {}
            }
            k += 1;
        }
        ControlFlow::Continue(())
    }

    fn operand(&mut self, k: usize, name: &str) -> Step {
        let tokens = self.src.tokens;
        if !is_read(tokens, k) {
            return ControlFlow::Continue(());
        }
        if self.dereferences_absent(k, name) {
            // TypeError: cannot read properties of undefined.
            return ControlFlow::Break(Halt::Stopped);
        }
        if is_assignment(tokens, k + 1) {
            if self.absent.as_deref() == Some(name) {
                self.absent = None;
            }
            self.assigned.insert(name.to_string());
            return ControlFlow::Continue(());
        }
        if self.is_missing(name) {
            return ControlFlow::Break(Halt::Undefined(name.to_string()));
        }
        ControlFlow::Continue(())
    }

    /// Code that may or may not run. Passable only when it can neither end
    /// the call nor read a missing global.
    fn opaque(&self, start: usize, end: usize) -> Step {
        let tokens = self.src.tokens;
        for k in start..end.min(tokens.len()) {
            if let Token::Ident(name) = &tokens[k] {
                let leaves = name == "return" || name == "throw";
                let fails = !is_keyword(name)
                    && is_read(tokens, k)
                    && (self.is_missing(name) || self.dereferences_absent(k, name));
                if leaves || fails {
                    return ControlFlow::Break(Halt::Stopped);
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn is_missing(&self, name: &str) -> bool {
        self.bindings.is_free(name) && !self.assigned.contains(name) && !(self.provided)(name)
    }

    fn dereferences_absent(&self, k: usize, name: &str) -> bool {
        self.absent.as_deref() == Some(name)
            && matches!(self.src.tokens.get(k + 1), Some(Token::Punct('.' | '[')))
    }

    fn test_truth(&self, start: usize, end: usize) -> Truth {
        let Some(absent) = self.absent.as_deref() else {
            return Truth::Unknown;
        };
        let text = render_test(&self.src.tokens[start..end], absent);
        if HOLDS_WHEN_ABSENT.contains(&text.as_str()) {
            Truth::Holds
        } else if FAILS_WHEN_ABSENT.contains(&text.as_str()) {
            Truth::Fails
        } else {
            Truth::Unknown
        }
    }
}

/// Compact source text of a test with the absent argument written as `@`.
fn render_test(tokens: &[Token], absent: &str) -> String {
    let mut out = String::new();
    let mut prev_word = false;
    for token in tokens {
        let (piece, word) = match token {
            Token::Ident(name) if name == absent => ("@".to_string(), true),
            Token::Ident(name) => (name.clone(), true),
            Token::Str(text) => (format!("'{text}'"), false),
            Token::Literal => ("0".to_string(), true),
            Token::Punct(c) => (c.to_string(), false),
            Token::Arrow => ("=>".to_string(), false),
        };
        if word && prev_word {
            out.push(' ');
        }
        out.push_str(&piece);
        prev_word = word;
    }
    out
}

// ---------------------------------------------------------------------------
// Export lookup
// ---------------------------------------------------------------------------

struct Export {
    first_param: Option<String>,
    body: Body,
}

enum Body {
    Block { start: usize, end: usize },
    Expr { start: usize, end: usize },
}

/// The function assigned to `module.exports` at the top level.
fn find_export(src: Source<'_>) -> Option<Export> {
    let tokens = src.tokens;
    let mut depth = 0usize;
    for i in 0..tokens.len() {
        match &tokens[i] {
            Token::Punct('(' | '[' | '{') => depth += 1,
            Token::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
            Token::Ident(name) if depth == 0 && name == "module" => {
                let assigns = tokens.get(i + 1) == Some(&Token::Punct('.'))
                    && is_ident(tokens.get(i + 2), "exports")
                    && is_assignment(tokens, i + 3);
                if assigns {
                    return function_at(src, i + 4);
                }
            }
            _ => {}
        }
    }
    None
}

fn function_at(src: Source<'_>, mut j: usize) -> Option<Export> {
    let tokens = src.tokens;
    if is_ident(tokens.get(j), "async") {
        j += 1;
    }
    match tokens.get(j)? {
        Token::Ident(keyword) if keyword == "function" => {
            j += 1;
            if tokens.get(j) == Some(&Token::Punct('*')) {
                j += 1;
            }
            if matches!(tokens.get(j), Some(Token::Ident(_))) {
                j += 1;
            }
            if tokens.get(j) != Some(&Token::Punct('(')) {
                return None;
            }
            let close = matching_close(tokens, j)?;
            Some(Export {
                first_param: first_param(tokens, j, close),
                body: block_body(tokens, close + 1)?,
            })
        }
        Token::Punct('(') => {
            let close = matching_close(tokens, j)?;
            if tokens.get(close + 1) != Some(&Token::Arrow) {
                return None;
            }
            Some(Export {
                first_param: first_param(tokens, j, close),
                body: arrow_body(src, close + 2)?,
            })
        }
        Token::Ident(param) if tokens.get(j + 1) == Some(&Token::Arrow) => Some(Export {
            first_param: Some(param.clone()),
            body: arrow_body(src, j + 2)?,
        }),
        Token::Ident(name) if !is_keyword(name) => declared_function(src, name),
        _ => None,
    }
}

/// A top-level `function <name>(...)` declaration.
fn declared_function(src: Source<'_>, name: &str) -> Option<Export> {
    let tokens = src.tokens;
    let mut depth = 0usize;
    for i in 0..tokens.len() {
        match &tokens[i] {
            Token::Punct('(' | '[' | '{') => depth += 1,
            Token::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
            Token::Ident(keyword)
                if depth == 0 && keyword == "function" && is_ident(tokens.get(i + 1), name) =>
            {
                return function_at(src, i);
            }
            _ => {}
        }
    }
    None
}

fn first_param(tokens: &[Token], open: usize, close: usize) -> Option<String> {
    match tokens.get(open + 1) {
        Some(Token::Ident(name)) if open + 1 < close && !is_keyword(name) => {
            // A default value means the parameter is never undefined.
            if tokens.get(open + 2) == Some(&Token::Punct('=')) {
                None
            } else {
                Some(name.clone())
            }
        }
        _ => None,
    }
}

fn block_body(tokens: &[Token], open: usize) -> Option<Body> {
    if tokens.get(open) != Some(&Token::Punct('{')) {
        return None;
    }
    let close = matching_close(tokens, open)?;
    Some(Body::Block {
        start: open + 1,
        end: close,
    })
}

fn arrow_body(src: Source<'_>, start: usize) -> Option<Body> {
    if src.tokens.get(start) == Some(&Token::Punct('{')) {
        return block_body(src.tokens, start);
    }
    Some(Body::Expr {
        start,
        end: expression_end(src, start, src.tokens.len()),
    })
}

// ---------------------------------------------------------------------------
// Token helpers
// ---------------------------------------------------------------------------

impl Source<'_> {
    fn break_before(&self, k: usize) -> bool {
        self.breaks.get(k).copied().unwrap_or(false)
    }
}

fn is_ident(token: Option<&Token>, name: &str) -> bool {
    matches!(token, Some(Token::Ident(ident)) if ident == name)
}

fn ident_at(tokens: &[Token], k: usize, end: usize, name: &str) -> bool {
    k < end && is_ident(tokens.get(k), name)
}

/// `true` when the token at `k` is a plain `=`.
fn is_assignment(tokens: &[Token], k: usize) -> bool {
    tokens.get(k) == Some(&Token::Punct('=')) && tokens.get(k + 1) != Some(&Token::Punct('='))
}

/// `true` when the identifier at `k` is evaluated as a variable: not a
/// property name, an object key, or the operand of `typeof`.
fn is_read(tokens: &[Token], k: usize) -> bool {
    let prev = k.checked_sub(1).and_then(|p| tokens.get(p));
    let next = tokens.get(k + 1);
    if matches!(prev, Some(Token::Punct('.'))) || is_ident(prev, "typeof") {
        return false;
    }
    let object_key =
        next == Some(&Token::Punct(':')) && matches!(prev, Some(Token::Punct('{' | ',')));
    !object_key
}

fn ends_operand(token: &Token) -> bool {
    match token {
        Token::Ident(name) => {
            !is_keyword(name) || matches!(name.as_str(), "this" | "true" | "false" | "null" | "super")
        }
        Token::Str(_) | Token::Literal => true,
        Token::Punct(c) => matches!(c, ')' | ']' | '}'),
        Token::Arrow => false,
    }
}

fn starts_operand(token: &Token) -> bool {
    match token {
        Token::Ident(name) => !matches!(name.as_str(), "in" | "instanceof" | "of"),
        Token::Str(_) | Token::Literal => true,
        Token::Punct(_) | Token::Arrow => false,
    }
}

/// Index just past the bracket group opening at `open`, or `open` itself
/// when no group opens there.
fn past_group(tokens: &[Token], open: usize, end: usize) -> usize {
    if open >= end {
        return end;
    }
    match tokens[open] {
        Token::Punct('(' | '[' | '{') => {
            matching_close(tokens, open).map_or(end, |close| (close + 1).min(end))
        }
        _ => open,
    }
}

/// Index past a `function` or `class` starting at `k`, body included.
fn past_function(tokens: &[Token], k: usize, end: usize) -> usize {
    let mut j = k + 1;
    while j < end && tokens[j] != Token::Punct('{') {
        j = if tokens[j] == Token::Punct('(') {
            past_group(tokens, j, end).max(j + 1)
        } else {
            j + 1
        };
    }
    past_group(tokens, j, end).max(k + 1)
}

/// Shorthand method `name(...) { ... }`: index past its body.
fn method_body_end(tokens: &[Token], k: usize, end: usize) -> Option<usize> {
    if tokens.get(k + 1) != Some(&Token::Punct('(')) {
        return None;
    }
    let close = matching_close(tokens, k + 1)?;
    if close + 1 < end && tokens[close + 1] == Token::Punct('{') {
        Some(past_group(tokens, close + 1, end))
    } else {
        None
    }
}

/// End of the expression statement starting at `start`: just past its `;`,
/// or where the next statement begins.
fn expression_end(src: Source<'_>, start: usize, end: usize) -> usize {
    let tokens = src.tokens;
    let mut depth = 0usize;
    let mut i = start;
    while i < end {
        let token = &tokens[i];
        if depth == 0 && i > start {
            let keyword = matches!(token, Token::Ident(name) if STATEMENT_KEYWORDS.contains(&name.as_str()))
                && tokens[i - 1] != Token::Punct('.');
            let inserted_semicolon =
                src.break_before(i) && ends_operand(&tokens[i - 1]) && starts_operand(token);
            if keyword || inserted_semicolon {
                break;
            }
        }
        match token {
            Token::Punct('(' | '[' | '{') => depth += 1,
            Token::Punct(')' | ']' | '}') => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Token::Punct(';') if depth == 0 => {
                i += 1;
                break;
            }
            _ => {}
        }
        i += 1;
    }
    i.max(start + 1).min(end)
}

/// Index past the statement starting at `i`, without running it.
fn skip_statement(src: Source<'_>, i: usize, end: usize) -> usize {
    let tokens = src.tokens;
    if i >= end {
        return end;
    }
    let next = match &tokens[i] {
        Token::Punct('{') => past_group(tokens, i, end),
        Token::Ident(keyword) => match keyword.as_str() {
            "if" => {
                let after = skip_statement(src, past_group(tokens, i + 1, end), end);
                if ident_at(tokens, after, end, "else") {
                    skip_statement(src, after + 1, end)
                } else {
                    after
                }
            }
            "for" | "while" | "with" => skip_statement(src, past_group(tokens, i + 1, end), end),
            "switch" => past_group(tokens, past_group(tokens, i + 1, end), end),
            "do" => {
                let body = skip_statement(src, i + 1, end);
                let after = if ident_at(tokens, body, end, "while") {
                    past_group(tokens, body + 1, end)
                } else {
                    body
                };
                if after < end && tokens[after] == Token::Punct(';') {
                    after + 1
                } else {
                    after
                }
            }
            "try" => {
                let mut k = past_group(tokens, i + 1, end);
                if ident_at(tokens, k, end, "catch") {
                    k += 1;
                    if k < end && tokens[k] == Token::Punct('(') {
                        k = past_group(tokens, k, end);
                    }
                    k = past_group(tokens, k, end);
                }
                if ident_at(tokens, k, end, "finally") {
                    k = past_group(tokens, k + 1, end);
                }
                k
            }
            "function" | "class" => past_function(tokens, i, end),
            _ => expression_end(src, i, end),
        },
        _ => expression_end(src, i, end),
    };
    next.max(i + 1).min(end)
}
