//! Recursive-descent parser producing the shared source tree.
//!
//! Tag and script syntax arrive as one token stream (the lexer switches
//! modes), and both are parsed into the same `bx_core::ast` node set.
//! Statement-level failures are recorded as diagnostics and the parser
//! resynchronizes at the next statement boundary, so one pass reports every
//! independent error.

use bx_core::ast::{Ident, Program, ProgramKind, Script};
use bx_core::diagnostics::Diagnostic;
use bx_core::source::SourceFile;
use bx_core::span::Span;
use bx_core::stack::StackBudget;
use thiserror::Error;

use crate::lexer::{Keyword, Token, TokenKind};

mod expr;
mod items;
mod stmt;
mod tags;

const DEFAULT_MAX_DEPTH: usize = 128;

/// Knobs for a single parse.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maximum nesting of statements and expressions before the parse is
    /// abandoned with a diagnostic.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    /// Set when the parse cannot continue at all (nesting limit).
    pub fatal: bool,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            fatal: false,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.message.clone())
            .with_span(self.span)
            .with_code("syntax")
    }
}

pub(crate) type PResult<T> = Result<T, SyntaxError>;

pub struct Parser<'a> {
    source: &'a SourceFile,
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    depth: usize,
    stack: StackBudget,
    options: &'a ParseOptions,
    aborted: bool,
    /// Set while parsing tag markup, cleared inside `<cfscript>`.
    template: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a SourceFile, tokens: Vec<Token>, options: &'a ParseOptions) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
            depth: 0,
            stack: StackBudget::default(),
            options,
            aborted: false,
            template: false,
        }
    }

    /// Parses the whole token stream. The program is only meaningful when no
    /// diagnostics were reported.
    pub fn parse_program(mut self) -> (Option<Program>, Vec<Diagnostic>) {
        let kind = if self.is_template() {
            self.parse_template_file()
        } else {
            self.parse_script_file()
        };
        let end = self.peek().span;
        let span = Span::new(
            self.source.id,
            0,
            end.hi,
            bx_core::span::LineCol::START,
            end.end,
        );
        let program = kind.map(|kind| Program {
            kind,
            source_name: (!self.source.is_anonymous()).then(|| self.source.name.clone()),
            span,
        });
        (program, self.diagnostics)
    }

    fn is_template(&self) -> bool {
        matches!(
            self.tokens.first().map(|t| t.kind),
            Some(TokenKind::TagOpen | TokenKind::TagClose | TokenKind::Text)
        )
    }

    fn parse_script_file(&mut self) -> Option<ProgramKind> {
        let imports = self.parse_imports();
        if self.at_component_start() {
            let component = self.guard(|p| p.parse_script_component(imports));
            return match component {
                Some(component) => {
                    if !self.at_eof() {
                        let err = SyntaxError::new(
                            "a component must be the only top-level declaration in its file",
                            self.peek().span,
                        );
                        self.report(err);
                    }
                    Some(ProgramKind::Component(component))
                }
                None => None,
            };
        }
        let body = self.parse_statements(|_| false);
        Some(ProgramKind::Script(Script { imports, body }))
    }

    /// Runs `f`, turning an error into a diagnostic.
    fn guard<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> Option<T> {
        match f(self) {
            Ok(value) => Some(value),
            Err(err) => {
                self.report(err);
                None
            }
        }
    }

    pub(crate) fn report(&mut self, err: SyntaxError) {
        // Everything after a fatal error is fallout from the abort.
        if self.aborted {
            return;
        }
        if err.fatal {
            self.aborted = true;
        }
        tracing::trace!(message = %err.message, span = %err.span, "syntax error");
        self.diagnostics.push(err.to_diagnostic());
    }

    // ----- token cursor -----

    pub(crate) fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    pub(crate) fn peek_at(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    pub(crate) fn prev_span(&self) -> Span {
        if self.pos == 0 {
            return self.peek().span;
        }
        self.tokens[(self.pos - 1).min(self.tokens.len() - 1)].span
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof || self.aborted
    }

    pub(crate) fn at_symbol(&self, symbol: &str) -> bool {
        self.peek().is_symbol(symbol)
    }

    pub(crate) fn eat_symbol(&mut self, symbol: &str) -> bool {
        if self.at_symbol(symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_symbol(&mut self, symbol: &str) -> PResult<Span> {
        if self.at_symbol(symbol) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&format!("`{}`", symbol)))
        }
    }

    pub(crate) fn at_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_keyword(keyword)
    }

    pub(crate) fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_keyword(&mut self, keyword: Keyword, text: &str) -> PResult<Span> {
        if self.at_keyword(keyword) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&format!("`{}`", text)))
        }
    }

    pub(crate) fn at_kind(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(crate) fn expect_kind(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.at_kind(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    pub(crate) fn expect_ident(&mut self) -> PResult<Ident> {
        if self.at_kind(TokenKind::Ident) {
            let token = self.advance();
            Ok(Ident::new(token.lexeme, token.span))
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    /// Identifier or keyword, for positions such as member names where
    /// reserved words are allowed.
    pub(crate) fn expect_name(&mut self) -> PResult<Ident> {
        if matches!(self.peek().kind, TokenKind::Ident | TokenKind::Keyword(_)) {
            let token = self.advance();
            Ok(Ident::new(token.lexeme, token.span))
        } else {
            Err(self.unexpected("name"))
        }
    }

    /// Statement terminator. A missing `;` is tolerated right before a
    /// closing brace, a closing tag, or the end of input.
    pub(crate) fn expect_semi(&mut self) -> PResult<()> {
        if self.eat_symbol(";") {
            return Ok(());
        }
        if self.at_symbol("}") || self.at_kind(TokenKind::TagClose) || self.at_eof() {
            return Ok(());
        }
        Err(self.unexpected("`;`"))
    }

    pub(crate) fn unexpected(&self, expected: &str) -> SyntaxError {
        let token = self.peek();
        SyntaxError::new(
            format!("expected {}, found {}", expected, token.describe()),
            token.span,
        )
    }

    pub(crate) fn span_from(&self, start: Span) -> Span {
        start.to(self.prev_span())
    }

    // ----- nesting guard -----

    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= self.options.max_depth || self.stack.exhausted() {
            return Err(SyntaxError {
                message: format!(
                    "nesting too deep: more than {} levels",
                    self.depth.min(self.options.max_depth)
                ),
                span: self.peek().span,
                fatal: true,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ----- recovery -----

    /// Skips to the next statement boundary: past a `;`, or up to a `}` that
    /// closes the enclosing block, or up to the next tag.
    pub(crate) fn recover_statement(&mut self) {
        let mut braces = 0usize;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof | TokenKind::TagOpen | TokenKind::TagClose | TokenKind::Text
                    if braces == 0 =>
                {
                    return
                }
                TokenKind::Eof => return,
                TokenKind::Symbol if token.lexeme == ";" && braces == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::Symbol if token.lexeme == "{" => braces += 1,
                TokenKind::Symbol if token.lexeme == "}" => {
                    if braces == 0 {
                        return;
                    }
                    braces -= 1;
                    if braces == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Parses statements until `stop` matches or input ends, recovering
    /// from each failing statement individually.
    pub(crate) fn parse_statements(
        &mut self,
        stop: impl Fn(&Token) -> bool,
    ) -> Vec<bx_core::ast::Stmt> {
        let mut stmts = Vec::new();
        while !self.at_eof() && !stop(self.peek()) {
            let start = self.pos;
            let item = if self.template {
                self.nested(|p| p.parse_template_item())
            } else {
                self.parse_statement().map(|stmt| stmt.into_iter().collect())
            };
            match item {
                Ok(items) => stmts.extend(items),
                Err(err) => {
                    let fatal = err.fatal;
                    self.report(err);
                    if fatal {
                        break;
                    }
                    self.recover_statement();
                    if self.pos == start {
                        self.advance();
                    }
                }
            }
        }
        stmts
    }
}

#[cfg(test)]
mod tests;
