//! Parse, lower and print, configured once from a [`CliConfig`].

use bx_core::diagnostics::Diagnostic;
use bx_core::source::SourceFile;
use bx_java::ast::CompilationUnit;
use bx_java::JavaPrinter;
use bx_lang::{CfmlFrontend, ParseOptions, ParseResult, SourceFrontend};
use bx_lower::{lower_result, LowerOptions, ResolverKind};

use crate::cli::CliConfig;
use crate::Result;

/// Per-invocation overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub package: Option<String>,
    pub resolver: Option<ResolverKind>,
    pub pretty: bool,
}

/// Output of a successful transpile.
#[derive(Debug, Clone)]
pub struct Transpiled {
    pub class_name: String,
    pub unit: CompilationUnit,
    pub java: String,
}

pub struct Pipeline {
    frontend: CfmlFrontend,
    lower: LowerOptions,
    printer: JavaPrinter,
}

impl Pipeline {
    pub fn new(config: &CliConfig, overrides: &Overrides) -> Result<Self> {
        let parse = ParseOptions {
            max_depth: config.parse.max_depth,
        };
        let resolver = match overrides.resolver {
            Some(kind) => kind,
            None => config.resolver_kind()?,
        };
        let mut lower = LowerOptions::default().with_resolver(resolver);
        lower.package = overrides
            .package
            .clone()
            .or_else(|| config.transpile.package.clone());
        lower.runtime_package = config.runtime.package.clone();
        lower.runtime_class = config.runtime.class.clone();
        lower.max_depth = config.transpile.max_depth;
        let printer = if overrides.pretty || config.transpile.pretty {
            JavaPrinter::pretty()
        } else {
            JavaPrinter::canonical()
        };
        Ok(Self {
            frontend: CfmlFrontend::new(parse),
            lower,
            printer,
        })
    }

    pub fn frontend(&self) -> &dyn SourceFrontend {
        &self.frontend
    }

    pub fn parse(&self, source: &SourceFile) -> ParseResult {
        self.frontend.parse(source)
    }

    /// Runs every stage; on failure returns the diagnostics to report.
    pub fn transpile(&self, source: &SourceFile) -> std::result::Result<Transpiled, Vec<Diagnostic>> {
        let parsed = self.parse(source);
        if let ParseResult::Failed(diagnostics) = &parsed {
            return Err(diagnostics.clone());
        }
        let unit = lower_result(&parsed, &self.lower).map_err(|err| vec![err.to_diagnostic()])?;
        let class_name = unit
            .types
            .first()
            .map(|decl| decl.name.clone())
            .unwrap_or_default();
        let java = self.printer.print(&unit);
        tracing::debug!(file = %source.name, class = %class_name, "transpiled");
        Ok(Transpiled {
            class_name,
            unit,
            java,
        })
    }
}
