//! Diagnostic and error reporting utilities

use bx_core::diagnostics::{render_plain, Diagnostic};
use bx_core::source::SourceFile;
use miette::{NamedSource, SourceSpan};
use thiserror::Error;

use crate::cli::DiagnosticStyle;
use crate::Result;

/// Set up enhanced error reporting with miette
pub fn setup_error_reporting() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(false)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .map_err(|e| crate::CliError::Config(format!("Failed to setup error reporting: {}", e)))?;
    Ok(())
}

/// A [`Diagnostic`] attached to the text it points into, in the shape miette
/// renders.
#[derive(Error, Debug, miette::Diagnostic)]
#[error("{message}")]
pub struct SourceReport {
    message: String,
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: Option<SourceSpan>,
    #[help]
    help: Option<String>,
}

impl SourceReport {
    pub fn new(diagnostic: &Diagnostic, source: &SourceFile) -> Self {
        let message = match &diagnostic.code {
            Some(code) => format!("{} [{}]", diagnostic.message, code),
            None => diagnostic.message.clone(),
        };
        let span = diagnostic
            .span
            .filter(|span| (span.hi as usize) <= source.text.len())
            .map(|span| SourceSpan::new((span.lo as usize).into(), span.len()));
        let help = if diagnostic.suggestions.is_empty() {
            None
        } else {
            Some(diagnostic.suggestions.join("\n"))
        };
        Self {
            message,
            src: NamedSource::new(&source.name, source.text.clone()),
            span,
            help,
        }
    }
}

/// Writes every diagnostic for `source` to stderr.
pub fn report(diagnostics: &[Diagnostic], source: &SourceFile, style: DiagnosticStyle) {
    for diagnostic in diagnostics {
        match style {
            DiagnosticStyle::Fancy => {
                let report = miette::Report::new(SourceReport::new(diagnostic, source));
                eprintln!("{:?}", report);
            }
            DiagnosticStyle::Plain => {
                for line in render_plain(diagnostic, source) {
                    eprintln!("{}", line);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bx_core::span::{LineCol, Span};
    use miette::Diagnostic as _;
    use pretty_assertions::assert_eq;

    #[test]
    fn report_carries_label_and_code() {
        let source = SourceFile::new(0, "page.cfm", "x = ;");
        let diagnostic = Diagnostic::error("expected expression")
            .with_span(Span::new(0, 4, 5, LineCol::new(1, 5), LineCol::new(1, 6)))
            .with_code("syntax")
            .with_suggestion("add a value");
        let report = SourceReport::new(&diagnostic, &source);

        assert_eq!(report.to_string(), "expected expression [syntax]");
        assert_eq!(report.help().map(|help| help.to_string()).as_deref(), Some("add a value"));
        let labels: Vec<_> = report.labels().into_iter().flatten().collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].offset(), 4);
        assert_eq!(labels[0].len(), 1);
    }

    #[test]
    fn out_of_range_span_is_dropped() {
        let source = SourceFile::new(0, "page.cfm", "");
        let diagnostic = Diagnostic::error("boom")
            .with_span(Span::new(0, 3, 9, LineCol::new(1, 4), LineCol::new(1, 10)));
        let report = SourceReport::new(&diagnostic, &source);
        assert_eq!(report.labels().into_iter().flatten().count(), 0);
    }
}
