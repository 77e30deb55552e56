use bx_core::diagnostics::Diagnostic;
use bx_core::source::{LineIndex, SourceFile};
use bx_core::span::Span;
use thiserror::Error;
use winnow::error::{ContextError, ErrMode};
use winnow::Parser;

use super::token::{Keyword, Token, TokenKind};
use super::winnow::{
    attribute_word, identifier, is_ident_start, number, starts_with_ignore_case, symbol,
    tag_comment, tag_name, whitespace, ws,
};

/// Tags whose body up to `>` is a script expression rather than attributes.
const EXPRESSION_TAGS: &[&str] = &["set", "if", "elseif", "return"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
    #[error("unterminated {0}")]
    Unterminated(&'static str),
    #[error("malformed closing tag `</cf{0}`")]
    MalformedCloseTag(String),
    #[error("lexer error: {0}")]
    Message(String),
}

impl From<ContextError> for LexErrorKind {
    fn from(err: ContextError) -> Self {
        LexErrorKind::Message(err.to_string())
    }
}

impl From<ErrMode<ContextError>> for LexErrorKind {
    fn from(err: ErrMode<ContextError>) -> Self {
        match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => LexErrorKind::from(ctx),
            ErrMode::Incomplete(_) => LexErrorKind::Message("incomplete input".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.kind.to_string())
            .with_span(self.span)
            .with_code("lex")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Markup text between tags.
    Template,
    /// Brace-delimited statements. `embedded` is set inside `<cfscript>`.
    Script { embedded: bool },
    /// Script tokens up to the `>` closing a `<cfset>`-style tag.
    TagExpr { depth: u32 },
    /// `name=value` pairs up to `>` or `/>`.
    TagAttrs,
    Str { quote: char },
    /// Expression between `#` delimiters.
    Interp { depth: u32 },
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    mode: Mode,
    opened_at: usize,
}

/// How the mode stack starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartMode {
    /// Template mode when the first character after blanks and leading
    /// `<!--- --->` comments is `<`, otherwise script mode.
    #[default]
    Detect,
    Template,
    Script,
}

/// Tokenizes a whole file, detecting the starting mode.
pub fn lex(source: &SourceFile) -> Result<Vec<Token>, LexError> {
    lex_with(source, StartMode::Detect)
}

pub fn lex_with(source: &SourceFile, start: StartMode) -> Result<Vec<Token>, LexError> {
    Lexer::new(source, start).run()
}

/// Skips blanks and complete tag comments at the start of `text`.
fn skip_leading_comments(mut text: &str) -> &str {
    loop {
        let trimmed = text.trim_start();
        let mut rest = trimmed;
        if !trimmed.starts_with("<!---") || tag_comment.parse_next(&mut rest).is_err() {
            return trimmed;
        }
        text = rest;
    }
}

struct Lexer<'a> {
    source: &'a SourceFile,
    text: &'a str,
    input: &'a str,
    index: LineIndex,
    modes: Vec<Frame>,
    tokens: Vec<Token>,
    output_depth: u32,
    open_tag: Option<String>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a SourceFile, start: StartMode) -> Self {
        let text = source.text.as_str();
        let body = text.trim_start_matches('\u{feff}');
        let script = Mode::Script { embedded: false };
        // Script mode has no tag comments, so leading ones are dropped here.
        let (mode, input) = match start {
            StartMode::Template => (Mode::Template, body),
            StartMode::Script => (script, skip_leading_comments(body)),
            StartMode::Detect => {
                let rest = skip_leading_comments(body);
                if rest.starts_with('<') {
                    (Mode::Template, body)
                } else {
                    (script, rest)
                }
            }
        };
        Self {
            source,
            text,
            input,
            index: LineIndex::new(text),
            modes: vec![Frame {
                mode,
                opened_at: text.len() - input.len(),
            }],
            tokens: Vec::new(),
            output_depth: 0,
            open_tag: None,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(frame) = self.modes.last().copied() {
            if self.input.is_empty() {
                if self.modes.len() == 1
                    && matches!(frame.mode, Mode::Template | Mode::Script { embedded: false })
                {
                    break;
                }
                return Err(self.unterminated(frame));
            }
            match frame.mode {
                Mode::Template => self.lex_template()?,
                Mode::Script { embedded } => self.lex_script(embedded)?,
                Mode::TagExpr { depth } => self.lex_tag_expr(depth)?,
                Mode::TagAttrs => self.lex_tag_attrs()?,
                Mode::Str { quote } => self.lex_string(quote)?,
                Mode::Interp { depth } => self.lex_interp(depth)?,
            }
        }
        let end = self.text.len();
        self.push(TokenKind::Eof, "", end, end);
        tracing::trace!(
            file = %self.source.name,
            tokens = self.tokens.len(),
            "lexed source"
        );
        Ok(self.tokens)
    }

    fn offset(&self) -> usize {
        self.text.len() - self.input.len()
    }

    fn span(&self, lo: usize, hi: usize) -> Span {
        self.index.span(self.source.id, self.text, lo, hi)
    }

    fn push(&mut self, kind: TokenKind, lexeme: impl Into<String>, lo: usize, hi: usize) {
        let span = self.span(lo, hi);
        self.tokens.push(Token::new(kind, lexeme, span));
    }

    fn advance(&mut self, bytes: usize) {
        self.input = &self.input[bytes..];
    }

    fn error(&self, kind: LexErrorKind, lo: usize, hi: usize) -> LexError {
        LexError {
            kind,
            span: self.span(lo, hi),
        }
    }

    fn unexpected_char(&self) -> LexError {
        let lo = self.offset();
        let ch = self.input.chars().next().unwrap_or('\0');
        self.error(LexErrorKind::UnexpectedChar(ch), lo, lo + ch.len_utf8())
    }

    fn unterminated(&self, frame: Frame) -> LexError {
        let what = match frame.mode {
            Mode::Script { .. } => "<cfscript> block",
            Mode::TagExpr { .. } | Mode::TagAttrs => "tag",
            Mode::Str { .. } => "string literal",
            Mode::Interp { .. } => "interpolation",
            Mode::Template => "template",
        };
        self.error(LexErrorKind::Unterminated(what), frame.opened_at, self.offset())
    }

    fn push_mode(&mut self, mode: Mode, opened_at: usize) {
        self.modes.push(Frame { mode, opened_at });
    }

    fn set_depth(&mut self, new_depth: u32) {
        if let Some(frame) = self.modes.last_mut() {
            match &mut frame.mode {
                Mode::TagExpr { depth } | Mode::Interp { depth } => *depth = new_depth,
                _ => {}
            }
        }
    }

    fn lex_template(&mut self) -> Result<(), LexError> {
        let start = self.offset();
        if self.input.starts_with("<!---") {
            return tag_comment
                .parse_next(&mut self.input)
                .map_err(|_| self.error(LexErrorKind::Unterminated("comment"), start, self.text.len()));
        }
        if let Some(prefix) = close_tag_prefix(self.input) {
            return self.lex_close_tag(prefix);
        }
        if let Some(prefix) = open_tag_prefix(self.input) {
            return self.lex_open_tag(prefix);
        }
        if self.output_depth > 0 && self.input.starts_with('#') && !self.input.starts_with("##") {
            self.advance(1);
            self.push(TokenKind::HashOpen, "#", start, start + 1);
            self.push_mode(Mode::Interp { depth: 0 }, start);
            return Ok(());
        }

        let mut text = String::new();
        while let Some(ch) = self.input.chars().next() {
            if self.input.starts_with("<!---")
                || open_tag_prefix(self.input).is_some()
                || close_tag_prefix(self.input).is_some()
            {
                break;
            }
            if self.output_depth > 0 && ch == '#' {
                if self.input.starts_with("##") {
                    text.push('#');
                    self.advance(2);
                    continue;
                }
                break;
            }
            text.push(ch);
            self.advance(ch.len_utf8());
        }
        let end = self.offset();
        self.push(TokenKind::Text, text, start, end);
        Ok(())
    }

    fn lex_open_tag(&mut self, prefix: usize) -> Result<(), LexError> {
        let start = self.offset();
        self.advance(prefix);
        let name = tag_name
            .parse_next(&mut self.input)
            .map_err(|e| self.error(e.into(), start, self.offset()))?
            .to_ascii_lowercase();
        let end = self.offset();
        self.push(TokenKind::TagOpen, name.clone(), start, end);
        let mode = if EXPRESSION_TAGS.contains(&name.as_str()) {
            Mode::TagExpr { depth: 0 }
        } else {
            Mode::TagAttrs
        };
        self.open_tag = Some(name);
        self.push_mode(mode, start);
        Ok(())
    }

    fn lex_close_tag(&mut self, prefix: usize) -> Result<(), LexError> {
        let start = self.offset();
        self.advance(prefix);
        let name = tag_name
            .parse_next(&mut self.input)
            .map_err(|e| self.error(e.into(), start, self.offset()))?
            .to_ascii_lowercase();
        let _ = whitespace.parse_next(&mut self.input);
        if !self.input.starts_with('>') {
            return Err(self.error(
                LexErrorKind::MalformedCloseTag(name),
                start,
                self.offset(),
            ));
        }
        self.advance(1);
        let end = self.offset();
        if name == "output" {
            self.output_depth = self.output_depth.saturating_sub(1);
        }
        self.push(TokenKind::TagClose, name, start, end);
        Ok(())
    }

    /// Called once the `>` or `/>` of an opening tag has been emitted.
    fn finish_tag(&mut self, self_closed: bool) {
        let Some(name) = self.open_tag.take() else {
            return;
        };
        if self_closed {
            return;
        }
        match name.as_str() {
            "script" => {
                let at = self.offset();
                self.push_mode(Mode::Script { embedded: true }, at);
            }
            "output" => self.output_depth += 1,
            _ => {}
        }
    }

    /// Emits `TagEnd`/`TagSelfClose` when the input is at the end of a tag.
    fn try_tag_end(&mut self) -> bool {
        let start = self.offset();
        let (kind, len, lexeme) = if self.input.starts_with("/>") {
            (TokenKind::TagSelfClose, 2, "/>")
        } else if self.input.starts_with('>') {
            (TokenKind::TagEnd, 1, ">")
        } else {
            return false;
        };
        self.advance(len);
        self.push(kind, lexeme, start, start + len);
        self.modes.pop();
        self.finish_tag(kind == TokenKind::TagSelfClose);
        true
    }

    fn lex_tag_expr(&mut self, depth: u32) -> Result<(), LexError> {
        let _ = whitespace.parse_next(&mut self.input);
        if self.input.is_empty() {
            return Ok(());
        }
        if depth == 0 && self.try_tag_end() {
            return Ok(());
        }
        self.lex_code_token(depth)
    }

    fn lex_tag_attrs(&mut self) -> Result<(), LexError> {
        let _ = whitespace.parse_next(&mut self.input);
        if self.input.is_empty() || self.try_tag_end() {
            return Ok(());
        }
        let start = self.offset();
        let Some(ch) = self.input.chars().next() else {
            return Ok(());
        };
        match ch {
            '=' => {
                self.advance(1);
                self.push(TokenKind::Symbol, "=", start, start + 1);
            }
            '"' | '\'' => self.open_string(ch),
            '#' => {
                self.advance(1);
                self.push(TokenKind::HashOpen, "#", start, start + 1);
                self.push_mode(Mode::Interp { depth: 0 }, start);
            }
            c if is_ident_start(c) => {
                let word = attribute_word
                    .parse_next(&mut self.input)
                    .map_err(|e| self.error(e.into(), start, self.offset()))?;
                let end = self.offset();
                self.push(TokenKind::Ident, word, start, end);
            }
            c if c.is_ascii_digit() => {
                let digits = number
                    .parse_next(&mut self.input)
                    .map_err(|e| self.error(e.into(), start, self.offset()))?;
                let end = self.offset();
                self.push(TokenKind::Number, digits, start, end);
            }
            _ => return Err(self.unexpected_char()),
        }
        Ok(())
    }

    fn lex_script(&mut self, embedded: bool) -> Result<(), LexError> {
        let start = self.offset();
        ws.parse_next(&mut self.input)
            .map_err(|_| self.error(LexErrorKind::Unterminated("comment"), start, self.text.len()))?;
        if self.input.is_empty() {
            return Ok(());
        }
        if embedded {
            let prefix = if starts_with_ignore_case(self.input, "</cfscript") {
                Some(4)
            } else if starts_with_ignore_case(self.input, "</bx:script") {
                Some(5)
            } else {
                None
            };
            if let Some(prefix) = prefix {
                self.lex_close_tag(prefix)?;
                self.modes.pop();
                return Ok(());
            }
        }
        // Script mode has no bracket bookkeeping.
        self.lex_code_token(0)
    }

    fn lex_interp(&mut self, depth: u32) -> Result<(), LexError> {
        let _ = whitespace.parse_next(&mut self.input);
        if self.input.is_empty() {
            return Ok(());
        }
        if depth == 0 && self.input.starts_with('#') {
            let start = self.offset();
            self.advance(1);
            self.push(TokenKind::HashClose, "#", start, start + 1);
            self.modes.pop();
            return Ok(());
        }
        self.lex_code_token(depth)
    }

    /// One script-level token: literal, name, keyword or operator.
    fn lex_code_token(&mut self, depth: u32) -> Result<(), LexError> {
        let start = self.offset();
        let Some(ch) = self.input.chars().next() else {
            return Ok(());
        };
        if ch == '"' || ch == '\'' {
            self.open_string(ch);
            return Ok(());
        }
        if ch == '#' {
            self.advance(1);
            self.push(TokenKind::HashOpen, "#", start, start + 1);
            self.push_mode(Mode::Interp { depth: 0 }, start);
            return Ok(());
        }
        if ch.is_ascii_digit() {
            let digits = number
                .parse_next(&mut self.input)
                .map_err(|e| self.error(e.into(), start, self.offset()))?;
            let end = self.offset();
            self.push(TokenKind::Number, digits, start, end);
            return Ok(());
        }
        if is_ident_start(ch) {
            let word = identifier
                .parse_next(&mut self.input)
                .map_err(|e| self.error(e.into(), start, self.offset()))?;
            let kind = Keyword::from_lexeme(word)
                .map(TokenKind::Keyword)
                .unwrap_or(TokenKind::Ident);
            let end = self.offset();
            self.push(kind, word, start, end);
            return Ok(());
        }
        let sym = symbol
            .parse_next(&mut self.input)
            .map_err(|_| self.unexpected_char())?;
        let end = self.offset();
        match sym {
            "(" | "[" | "{" => self.set_depth(depth + 1),
            ")" | "]" | "}" => self.set_depth(depth.saturating_sub(1)),
            _ => {}
        }
        self.push(TokenKind::Symbol, sym, start, end);
        Ok(())
    }

    fn open_string(&mut self, quote: char) {
        let start = self.offset();
        self.advance(1);
        self.push(TokenKind::StringStart, quote.to_string(), start, start + 1);
        self.push_mode(Mode::Str { quote }, start);
    }

    fn lex_string(&mut self, quote: char) -> Result<(), LexError> {
        let start = self.offset();
        let mut text = String::new();
        while let Some(ch) = self.input.chars().next() {
            let doubled = self.input[ch.len_utf8()..].starts_with(ch);
            if ch == quote || ch == '#' {
                if doubled {
                    text.push(ch);
                    self.advance(2);
                    continue;
                }
                let at = self.offset();
                if !text.is_empty() {
                    self.push(TokenKind::StringText, std::mem::take(&mut text), start, at);
                }
                self.advance(1);
                if ch == quote {
                    self.push(TokenKind::StringEnd, quote.to_string(), at, at + 1);
                    self.modes.pop();
                } else {
                    self.push(TokenKind::HashOpen, "#", at, at + 1);
                    self.push_mode(Mode::Interp { depth: 0 }, at);
                }
                return Ok(());
            }
            text.push(ch);
            self.advance(ch.len_utf8());
        }
        if !text.is_empty() {
            let end = self.offset();
            self.push(TokenKind::StringText, text, start, end);
        }
        Ok(())
    }
}

/// Length of `<cf`/`<bx:` when a tag name follows.
fn open_tag_prefix(input: &str) -> Option<usize> {
    tag_prefix(input, &["<cf", "<bx:"])
}

fn close_tag_prefix(input: &str) -> Option<usize> {
    tag_prefix(input, &["</cf", "</bx:"])
}

fn tag_prefix(input: &str, prefixes: &[&str]) -> Option<usize> {
    prefixes.iter().find_map(|prefix| {
        let follows_name = input
            .get(prefix.len()..)
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_alphabetic()));
        (starts_with_ignore_case(input, prefix) && follows_name).then_some(prefix.len())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(text: &str) -> Vec<(TokenKind, String)> {
        lex(&SourceFile::anonymous(text))
            .unwrap_or_else(|e| panic!("lex failed: {e}"))
            .into_iter()
            .map(|t| (t.kind, t.lexeme))
            .collect()
    }

    fn tok(kind: TokenKind, lexeme: &str) -> (TokenKind, String) {
        (kind, lexeme.to_string())
    }

    #[test]
    fn script_statement_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("var x = a.b + 1.5;"),
            vec![
                tok(Keyword(super::Keyword::Var), "var"),
                tok(Ident, "x"),
                tok(Symbol, "="),
                tok(Ident, "a"),
                tok(Symbol, "."),
                tok(Ident, "b"),
                tok(Symbol, "+"),
                tok(Number, "1.5"),
                tok(Symbol, ";"),
                tok(Eof, ""),
            ]
        );
    }

    #[test]
    fn string_interpolation_nests_expression_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds(r#"x = "Hi #name#, ""ok"" ##1";"#),
            vec![
                tok(Ident, "x"),
                tok(Symbol, "="),
                tok(StringStart, "\""),
                tok(StringText, "Hi "),
                tok(HashOpen, "#"),
                tok(Ident, "name"),
                tok(HashClose, "#"),
                tok(StringText, ", \"ok\" #1"),
                tok(StringEnd, "\""),
                tok(Symbol, ";"),
                tok(Eof, ""),
            ]
        );
    }

    #[test]
    fn tag_modes_switch_between_attributes_and_expressions() {
        use TokenKind::*;
        assert_eq!(
            kinds(r#"<cfset x = 1><cfloop from="1" to=#n# index="i"/>"#),
            vec![
                tok(TagOpen, "set"),
                tok(Ident, "x"),
                tok(Symbol, "="),
                tok(Number, "1"),
                tok(TagEnd, ">"),
                tok(TagOpen, "loop"),
                tok(Ident, "from"),
                tok(Symbol, "="),
                tok(StringStart, "\""),
                tok(StringText, "1"),
                tok(StringEnd, "\""),
                tok(Ident, "to"),
                tok(Symbol, "="),
                tok(HashOpen, "#"),
                tok(Ident, "n"),
                tok(HashClose, "#"),
                tok(Ident, "index"),
                tok(Symbol, "="),
                tok(StringStart, "\""),
                tok(StringText, "i"),
                tok(StringEnd, "\""),
                tok(TagSelfClose, "/>"),
                tok(Eof, ""),
            ]
        );
    }

    #[test]
    fn hashes_only_interpolate_inside_output() {
        use TokenKind::*;
        assert_eq!(
            kinds("<p>#a#</p><cfoutput>#b# ##</cfoutput>"),
            vec![
                tok(Text, "<p>#a#</p>"),
                tok(TagOpen, "output"),
                tok(TagEnd, ">"),
                tok(HashOpen, "#"),
                tok(Ident, "b"),
                tok(HashClose, "#"),
                tok(Text, " #"),
                tok(TagClose, "output"),
                tok(Eof, ""),
            ]
        );
    }

    #[test]
    fn cfscript_switches_to_script_until_close_tag() {
        use TokenKind::*;
        assert_eq!(
            kinds("<cfscript>if (a < b) { x++; }</cfscript>"),
            vec![
                tok(TagOpen, "script"),
                tok(TagEnd, ">"),
                tok(Keyword(super::Keyword::If), "if"),
                tok(Symbol, "("),
                tok(Ident, "a"),
                tok(Symbol, "<"),
                tok(Ident, "b"),
                tok(Symbol, ")"),
                tok(Symbol, "{"),
                tok(Ident, "x"),
                tok(Symbol, "++"),
                tok(Symbol, ";"),
                tok(Symbol, "}"),
                tok(TagClose, "script"),
                tok(Eof, ""),
            ]
        );
    }

    #[test]
    fn tag_comments_produce_no_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("<!--- note ---><cfbreak>"),
            vec![tok(TagOpen, "break"), tok(TagEnd, ">"), tok(Eof, "")]
        );
    }

    #[test]
    fn leading_comments_do_not_decide_the_mode() {
        use TokenKind::*;
        assert_eq!(
            kinds("<!--- doc --->\n<!--- more ---> x = 1;"),
            vec![
                tok(Ident, "x"),
                tok(Symbol, "="),
                tok(Number, "1"),
                tok(Symbol, ";"),
                tok(Eof, ""),
            ]
        );
        assert_eq!(kinds("<!--- doc ---><cfbreak>")[0], tok(TagOpen, "break"));
    }

    #[test]
    fn forced_template_mode_keeps_leading_text() {
        use TokenKind::*;
        let source = SourceFile::anonymous("Hello <cfoutput>#name#</cfoutput>");
        let tokens: Vec<_> = lex_with(&source, StartMode::Template)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.lexeme))
            .collect();
        assert_eq!(tokens[0], tok(Text, "Hello "));
        assert_eq!(tokens[1], tok(TagOpen, "output"));

        let source = SourceFile::anonymous("<!--- x ---> a = b;");
        let tokens = lex_with(&source, StartMode::Script).unwrap();
        assert_eq!(tokens[0].lexeme, "a");
        assert_eq!(tokens[0].span.start.column, 14);
    }

    #[test]
    fn keywords_ignore_case() {
        let tokens = kinds("IF Function");
        assert_eq!(tokens[0].0, TokenKind::Keyword(Keyword::If));
        assert_eq!(tokens[1].0, TokenKind::Keyword(Keyword::Function));
        assert_eq!(tokens[1].1, "Function");
    }

    #[test]
    fn spans_carry_lines_and_columns() {
        let tokens = lex(&SourceFile::anonymous("a =\n  bb;")).unwrap();
        let bb = &tokens[2];
        assert_eq!(bb.lexeme, "bb");
        assert_eq!((bb.span.start.line, bb.span.start.column), (2, 3));
        assert_eq!((bb.span.end.line, bb.span.end.column), (2, 5));
    }

    #[test]
    fn unterminated_constructs_are_fatal() {
        let err = lex(&SourceFile::anonymous("x = \"abc")).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::Unterminated("string literal"));
        assert_eq!(err.span.start.column, 5);

        let err = lex(&SourceFile::anonymous("<cfset x = 1")).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::Unterminated("tag"));

        let err = lex(&SourceFile::anonymous("x = \"#a")).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::Unterminated("interpolation"));
    }

    #[test]
    fn stray_characters_are_reported() {
        let err = lex(&SourceFile::anonymous("x = 1 @ 2;")).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnexpectedChar('@'));
        assert_eq!(err.span.start.column, 7);
    }
}
