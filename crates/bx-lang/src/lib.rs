//! CFML / BoxLang frontend: a mode-switching lexer and a recovering
//! recursive-descent parser producing [`bx_core::ast::Program`].

use bx_core::ast::{Program, ProgramKind};
use bx_core::diagnostics::{Diagnostic, DiagnosticRecord};
use bx_core::source::SourceFile;
use bx_core::span::Span;
use lexer::StartMode;

pub mod lexer;
pub mod parser;

pub use parser::{ParseOptions, Parser, SyntaxError};

/// Canonical identifier for the CFML source language.
pub const CFML: &str = "cfml";

/// Extensions that must hold exactly one component.
const COMPONENT_EXTENSIONS: &[&str] = &["cfc", "bx"];
/// Extensions that must not declare a component.
const TEMPLATE_EXTENSIONS: &[&str] = &["cfm", "cfml", "bxs", "bxm"];

/// Outcome of a parse. A program is only produced when there were no errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    Correct(Program),
    Failed(Vec<Diagnostic>),
}

impl ParseResult {
    pub fn is_correct(&self) -> bool {
        matches!(self, ParseResult::Correct(_))
    }

    pub fn program(&self) -> Option<&Program> {
        match self {
            ParseResult::Correct(program) => Some(program),
            ParseResult::Failed(_) => None,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            ParseResult::Correct(_) => &[],
            ParseResult::Failed(diagnostics) => diagnostics,
        }
    }

    /// `{message, span}` records with the file name filled in.
    pub fn records(&self, source: &SourceFile) -> Vec<DiagnosticRecord> {
        self.diagnostics()
            .iter()
            .map(|diagnostic| diagnostic.to_record(source))
            .collect()
    }

    pub fn into_result(self) -> Result<Program, Vec<Diagnostic>> {
        match self {
            ParseResult::Correct(program) => Ok(program),
            ParseResult::Failed(diagnostics) => Err(diagnostics),
        }
    }
}

/// Parses text that did not come from a file.
pub fn parse(text: &str) -> ParseResult {
    parse_source(&SourceFile::anonymous(text), &ParseOptions::default())
}

/// Parses a named file and checks that its shape matches its extension.
pub fn parse_file(source: &SourceFile) -> ParseResult {
    parse_file_with(source, &ParseOptions::default())
}

pub fn parse_file_with(source: &SourceFile, options: &ParseOptions) -> ParseResult {
    let result = parse_with_mode(source, start_mode(source), options);
    let ParseResult::Correct(program) = result else {
        return result;
    };
    match check_file_shape(source, &program) {
        Some(diagnostic) => ParseResult::Failed(vec![diagnostic]),
        None => ParseResult::Correct(program),
    }
}

/// Lexes and parses without any file-name conventions.
pub fn parse_source(source: &SourceFile, options: &ParseOptions) -> ParseResult {
    parse_with_mode(source, StartMode::Detect, options)
}

/// `.bxm` is always markup and `.bxs` always script. A `.cfm` page is markup
/// when it starts with a tag or contains one anywhere.
fn start_mode(source: &SourceFile) -> StartMode {
    match source.extension().as_deref() {
        Some("bxm") => StartMode::Template,
        Some("bxs") => StartMode::Script,
        Some("cfm" | "cfml") if contains_tag(&source.text) => StartMode::Template,
        _ => StartMode::Detect,
    }
}

fn contains_tag(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    ["<cf", "</cf"].iter().any(|open| {
        lower.match_indices(open).any(|(at, _)| {
            lower[at + open.len()..].starts_with(|c: char| c.is_ascii_alphabetic())
        })
    }) || lower.contains("<bx:")
        || lower.contains("</bx:")
}

fn parse_with_mode(source: &SourceFile, mode: StartMode, options: &ParseOptions) -> ParseResult {
    let tokens = match lexer::lex_with(source, mode) {
        Ok(tokens) => tokens,
        Err(err) => {
            tracing::debug!(file = %source.name, error = %err, "lexing failed");
            return ParseResult::Failed(vec![err.to_diagnostic()]);
        }
    };
    let (program, diagnostics) = Parser::new(source, tokens, options).parse_program();
    tracing::debug!(
        file = %source.name,
        diagnostics = diagnostics.len(),
        "parsed source"
    );
    match program {
        Some(program) if diagnostics.is_empty() => ParseResult::Correct(program),
        _ if !diagnostics.is_empty() => ParseResult::Failed(diagnostics),
        _ => ParseResult::Failed(vec![Diagnostic::error("parser produced no program")
            .with_span(Span::null())
            .with_code("syntax")]),
    }
}

fn check_file_shape(source: &SourceFile, program: &Program) -> Option<Diagnostic> {
    let extension = source.extension()?;
    let is_component = matches!(program.kind, ProgramKind::Component(_));
    let message = if COMPONENT_EXTENSIONS.contains(&extension.as_str()) && !is_component {
        format!("a .{} file must declare exactly one component", extension)
    } else if TEMPLATE_EXTENSIONS.contains(&extension.as_str()) && is_component {
        format!(
            "a .{} file cannot declare a component; use a .cfc or .bx file",
            extension
        )
    } else {
        return None;
    };
    Some(
        Diagnostic::error(message)
            .with_span(program.span)
            .with_code("file-shape"),
    )
}

/// A source language the transpiler can read.
pub trait SourceFrontend {
    fn language(&self) -> &'static str;

    fn extensions(&self) -> &'static [&'static str];

    fn parse(&self, source: &SourceFile) -> ParseResult;

    fn supports(&self, source: &SourceFile) -> bool {
        source
            .extension()
            .is_some_and(|ext| self.extensions().contains(&ext.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CfmlFrontend {
    options: ParseOptions,
}

impl CfmlFrontend {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }
}

impl SourceFrontend for CfmlFrontend {
    fn language(&self) -> &'static str {
        CFML
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cfc", "cfm", "cfml", "bx", "bxs", "bxm"]
    }

    fn parse(&self, source: &SourceFile) -> ParseResult {
        parse_file_with(source, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn script_file_must_not_be_component() {
        let source = SourceFile::new(1, "page.cfm", "component { }");
        let result = parse_file(&source);
        let records = result.records(&source);
        assert_eq!(records.len(), 1);
        assert!(records[0].message.contains(".cfm"));
        assert_eq!(records[0].span.as_ref().map(|s| s.file.as_str()), Some("page.cfm"));
    }

    #[test]
    fn component_file_must_declare_component() {
        let source = SourceFile::new(1, "User.cfc", "x = 1;");
        assert!(!parse_file(&source).is_correct());

        let source = SourceFile::new(1, "User.cfc", "component { }");
        assert!(parse_file(&source).is_correct());
    }

    #[test]
    fn pages_with_leading_text_are_markup() {
        let source = SourceFile::new(1, "E.cfm", "Hello <cfoutput>#name#</cfoutput>");
        assert!(parse_file(&source).is_correct(), "{:?}", parse_file(&source));

        let source = SourceFile::new(1, "E.bxm", "Hello #name#");
        assert!(parse_file(&source).is_correct());

        let source = SourceFile::new(1, "run.cfm", "x = 1;\nwriteOutput(x);");
        assert!(parse_file(&source).is_correct());
    }

    #[test]
    fn leading_comment_before_component() {
        let source = SourceFile::new(1, "G.cfc", "<!--- doc --->\ncomponent { }");
        assert!(parse_file(&source).is_correct(), "{:?}", parse_file(&source));

        let source = SourceFile::new(1, "s.bxs", "<!--- doc ---> x = 1;");
        assert!(parse_file(&source).is_correct());
    }

    #[test]
    fn frontend_reports_supported_extensions() {
        let frontend = CfmlFrontend::default();
        assert_eq!(frontend.language(), "cfml");
        assert!(frontend.supports(&SourceFile::new(0, "a/B.bx", "")));
        assert!(!frontend.supports(&SourceFile::new(0, "a/B.java", "")));
    }
}
