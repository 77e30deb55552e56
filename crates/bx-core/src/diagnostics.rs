use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::source::SourceFile;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

impl Display for DiagnosticLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            DiagnosticLevel::Info => "info",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Error => "error",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub span: Option<Span>,
    pub suggestions: Vec<String>,
    pub code: Option<String>,
}

impl Diagnostic {
    fn with_level(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            span: None,
            suggestions: Vec::new(),
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Info, message)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    /// Serializable `{message, span}` shape handed to external tooling.
    pub fn to_record(&self, source: &SourceFile) -> DiagnosticRecord {
        DiagnosticRecord {
            message: self.message.clone(),
            span: self.span.map(|span| SpanRecord::new(&source.name, span)),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{}: {}: {}", span.start, self.level, self.message),
            None => write!(f, "{}: {}", self.level, self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanRecord {
    pub file: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SpanRecord {
    pub fn new(file: &str, span: Span) -> Self {
        Self {
            file: file.to_string(),
            start_line: span.start.line,
            start_column: span.start.column,
            end_line: span.end.line,
            end_column: span.end.column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<SpanRecord>,
}

impl Display for DiagnosticRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.span {
            Some(span) => write!(
                f,
                "{}:{}:{}: {}",
                span.file, span.start_line, span.start_column, self.message
            ),
            None => f.write_str(&self.message),
        }
    }
}

/// How diagnostics are turned into terminal lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticTemplate {
    #[default]
    Pretty,
    Plain,
}

pub fn render(diagnostic: &Diagnostic, source: &SourceFile, template: DiagnosticTemplate) -> Vec<String> {
    match template {
        DiagnosticTemplate::Pretty => render_pretty(diagnostic, source),
        DiagnosticTemplate::Plain => render_plain(diagnostic, source),
    }
}

/// One line per diagnostic: `file:line:col: level: message (code)`.
pub fn render_plain(diagnostic: &Diagnostic, source: &SourceFile) -> Vec<String> {
    let location = match &diagnostic.span {
        Some(span) => format!("{}:{}:{}", source.name, span.start.line, span.start.column),
        None => source.name.clone(),
    };
    let header = match diagnostic.code.as_ref() {
        Some(code) => format!(
            "{}: {}: {} ({})",
            location, diagnostic.level, diagnostic.message, code
        ),
        None => format!("{}: {}: {}", location, diagnostic.level, diagnostic.message),
    };
    let mut lines = vec![header];
    lines.extend(
        diagnostic
            .suggestions
            .iter()
            .map(|suggestion| format!("   help: {}", suggestion)),
    );
    lines
}

/// Plain header followed by the offending source line and a caret marker.
pub fn render_pretty(diagnostic: &Diagnostic, source: &SourceFile) -> Vec<String> {
    let mut lines = render_plain(diagnostic, source);
    let Some(span) = diagnostic.span else {
        return lines;
    };
    let Some(text) = source.line(span.start.line) else {
        return lines;
    };
    let gutter = span.start.line.to_string();
    let pad = " ".repeat(gutter.len());
    let width = if span.end.line == span.start.line {
        span.end.column.saturating_sub(span.start.column).max(1)
    } else {
        (text.chars().count() as u32 + 1)
            .saturating_sub(span.start.column)
            .max(1)
    };
    let marker = format!(
        "{}{}",
        " ".repeat(span.start.column.saturating_sub(1) as usize),
        "^".repeat(width as usize)
    );
    let header = lines.remove(0);
    let mut out = vec![header, format!("{} |", pad), format!("{} | {}", gutter, text)];
    out.push(format!("{} | {}", pad, marker));
    out.extend(lines);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::LineCol;
    use pretty_assertions::assert_eq;

    fn sample() -> (Diagnostic, SourceFile) {
        let source = SourceFile::new(0, "app/index.cfm", "<cfset x = >\n");
        let span = Span::new(0, 11, 12, LineCol::new(1, 12), LineCol::new(1, 13));
        let diagnostic = Diagnostic::error("expected expression").with_span(span);
        (diagnostic, source)
    }

    #[test]
    fn plain_rendering_is_file_locatable() {
        let (diagnostic, source) = sample();
        assert_eq!(
            render_plain(&diagnostic, &source),
            vec!["app/index.cfm:1:12: error: expected expression".to_string()]
        );
    }

    #[test]
    fn pretty_rendering_points_at_the_column() {
        let (diagnostic, source) = sample();
        let lines = render_pretty(&diagnostic, &source);
        assert_eq!(lines[2], "1 | <cfset x = >");
        assert_eq!(lines[3], "  |            ^");
    }

    #[test]
    fn record_uses_camel_case_fields() {
        let (diagnostic, source) = sample();
        let json = serde_json::to_value(diagnostic.to_record(&source)).unwrap();
        assert_eq!(json["span"]["startLine"], 1);
        assert_eq!(json["span"]["startColumn"], 12);
        assert_eq!(json["span"]["file"], "app/index.cfm");
    }
}
