//! Lowering of the CFML source tree into a Java compilation unit.
//!
//! The pass is pure: the same [`Program`] and [`LowerOptions`] always yield
//! the same [`CompilationUnit`], and a failure yields no tree at all.

use bx_core::ast::Program;
use bx_core::span::Span;
use bx_core::stack::StackBudget;
use bx_java::ast::{CompilationUnit, JStmt};
use bx_lang::ParseResult;

mod class;
pub mod error;
mod expr;
pub mod options;
pub mod resolve;
pub mod runtime;
pub mod scope;
mod stmt;
pub mod types;

pub use error::{LowerError, LowerErrorKind, Result};
pub use options::LowerOptions;
pub use resolve::{CallArgs, DynamicLookup, ExternalResolver, ResolverKind, StaticReference, Strict};

use crate::runtime::RuntimeSupport;
use crate::scope::{FunctionScope, MemberTable};

/// Lowers with default options.
pub fn lower(program: &Program) -> Result<CompilationUnit> {
    lower_with(program, &LowerOptions::default())
}

pub fn lower_with(program: &Program, options: &LowerOptions) -> Result<CompilationUnit> {
    Lowerer::new(options).lower_program(program)
}

/// Lowers a parse outcome; a failed parse is rejected with
/// [`LowerErrorKind::NotCorrect`] at the first diagnostic.
pub fn lower_result(result: &ParseResult, options: &LowerOptions) -> Result<CompilationUnit> {
    match result {
        ParseResult::Correct(program) => lower_with(program, options),
        ParseResult::Failed(diagnostics) => {
            let span = diagnostics
                .first()
                .and_then(|diagnostic| diagnostic.span)
                .unwrap_or_else(Span::null);
            Err(LowerError::new(LowerErrorKind::NotCorrect, span))
        }
    }
}

/// Where the statements being lowered live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyContext {
    /// Component pseudo-constructor or template body: unscoped names that
    /// are assigned live in the shared variables scope, i.e. fields.
    TopLevel,
    Function,
}

/// State for lowering one program.
pub struct Lowerer<'a> {
    options: &'a LowerOptions,
    support: RuntimeSupport,
    members: MemberTable,
    scope: FunctionScope,
    /// Declarations moved to the top of the body being lowered.
    hoisted: Vec<JStmt>,
    /// Java names of the enclosing `catch` variables, innermost last.
    catch_vars: Vec<String>,
    /// `(query key, row variable)` of the enclosing query loops, innermost last.
    query_rows: Vec<(String, String)>,
    context: BodyContext,
    depth: usize,
    stack: StackBudget,
}

impl<'a> Lowerer<'a> {
    pub fn new(options: &'a LowerOptions) -> Self {
        Self {
            options,
            support: RuntimeSupport::new(&options.runtime_package, &options.runtime_class),
            members: MemberTable::default(),
            scope: FunctionScope::new(),
            hoisted: Vec::new(),
            catch_vars: Vec::new(),
            query_rows: Vec::new(),
            context: BodyContext::TopLevel,
            depth: 0,
            stack: StackBudget::default(),
        }
    }

    pub fn lower_program(mut self, program: &Program) -> Result<CompilationUnit> {
        let decl = self.lower_type_decl(program)?;
        tracing::debug!(
            source = program.source_name.as_deref().unwrap_or("<input>"),
            class = %decl.name,
            members = decl.members.len(),
            "lowered program"
        );
        Ok(CompilationUnit {
            package: self.options.package.clone(),
            imports: self.support.into_imports(),
            types: vec![decl],
        })
    }

    /// Runs `f` one nesting level deeper, failing past `max_depth`.
    pub(crate) fn nested<T>(&mut self, span: Span, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.options.max_depth || self.stack.exhausted() {
            return Err(LowerError::new(LowerErrorKind::DepthExceeded, span));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}
