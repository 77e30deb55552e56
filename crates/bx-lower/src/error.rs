use bx_core::diagnostics::Diagnostic;
use bx_core::span::Span;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LowerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerErrorKind {
    #[error("unsupported {node}")]
    Unsupported { node: String },

    #[error("unresolved reference `{name}`")]
    Unresolved { name: String },

    #[error("`arguments.{name}` does not name a parameter")]
    UnknownArgument { name: String },

    #[error("local variable `{name}` is read before it is declared")]
    UndeclaredLocal { name: String },

    #[error("nesting too deep to lower")]
    DepthExceeded,

    #[error("cannot lower a failed parse")]
    NotCorrect,
}

/// A construct that could not be lowered, with the span it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct LowerError {
    pub kind: LowerErrorKind,
    pub span: Span,
}

impl LowerError {
    pub fn new(kind: LowerErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn unsupported(node: impl Into<String>, span: Span) -> Self {
        Self::new(LowerErrorKind::Unsupported { node: node.into() }, span)
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.kind.to_string())
            .with_span(self.span)
            .with_code("lower")
    }
}

impl From<LowerError> for bx_core::Error {
    fn from(err: LowerError) -> Self {
        bx_core::Error::Diagnostic(err.to_diagnostic())
    }
}
