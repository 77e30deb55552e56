//! Program-level lowering: one source file becomes one public class.

use std::collections::HashMap;

use bx_core::ast::visit::{walk_block, walk_expr, walk_stmt, Visitor};
use bx_core::ast::{
    find_attribute, Access, Attribute, Closure, Component, Expr, ExprKind, Function, Import,
    Program, ProgramKind, Script, Stmt, StmtKind,
};
use bx_core::span::Span;
use bx_java::ast::{
    Block as JBlock, ConstructorDecl, FieldDecl, JAssignOp, JBinaryOp, JExpr, JStmt,
    JType, Member, MethodDecl, Modifier, Param as JParam, TypeDecl,
};
use itertools::Itertools;

use crate::error::{LowerError, Result};
use crate::expr::Qualifier;
use crate::scope::{FunctionScope, MethodSig};
use crate::types::{lower_type, param_type};
use crate::{BodyContext, Lowerer};

const DEFAULT_COMPONENT_NAME: &str = "Component";
const DEFAULT_TEMPLATE_NAME: &str = "Template";
const TEMPLATE_ENTRY: &str = "run";

impl Lowerer<'_> {
    pub(crate) fn lower_type_decl(&mut self, program: &Program) -> Result<TypeDecl> {
        match &program.kind {
            ProgramKind::Component(component) => self.lower_component(program, component),
            ProgramKind::Script(script) => self.lower_script(program, script),
        }
    }

    fn lower_component(&mut self, program: &Program, component: &Component) -> Result<TypeDecl> {
        let explicit = component
            .attribute("name")
            .or_else(|| component.attribute("displayname"))
            .and_then(|attr| attr.text())
            .map(|name| name.rsplit('.').next().unwrap_or(name).to_string());
        let mut decl = TypeDecl::class(self.class_name(program, explicit, DEFAULT_COMPONENT_NAME));
        decl.doc = component
            .attribute("hint")
            .and_then(|attr| attr.text())
            .map(str::to_string);
        decl.extends = component
            .extends
            .as_ref()
            .map(|name| JType::class(name.text.clone()));
        decl.implements = component
            .implements
            .iter()
            .map(|name| JType::class(name.text.clone()))
            .collect();
        self.record_imports(&component.imports);

        for property in &component.properties {
            self.members.add_field(&property.name.name, false);
            let ty = lower_type(property.type_hint.as_ref(), &mut self.support);
            let init = match &property.default {
                Some(default) => Some(self.lower_expr(default)?),
                None => None,
            };
            decl.members.push(Member::Field(FieldDecl {
                doc: hint(&property.attributes),
                modifiers: vec![Modifier::Private],
                ty,
                name: property.name.name.clone(),
                init,
            }));
        }

        let mut collector = FieldCollector::default();
        for stmt in &component.body {
            collector.visit_stmt(stmt);
        }
        for function in &component.functions {
            collector.visit_function(function);
        }
        self.push_discovered_fields(collector, &mut decl);

        let functions: Vec<&Function> = component.functions.iter().collect();
        self.register_methods(&functions);

        if !component.body.is_empty() {
            let body = self.lower_top_level(&component.body)?;
            decl.members.push(Member::Constructor(ConstructorDecl {
                doc: None,
                modifiers: vec![Modifier::Public],
                name: decl.name.clone(),
                params: Vec::new(),
                body,
            }));
        }
        for function in functions {
            decl.members.push(Member::Method(self.lower_function(function)?));
        }
        Ok(decl)
    }

    fn lower_script(&mut self, program: &Program, script: &Script) -> Result<TypeDecl> {
        let mut decl = TypeDecl::class(self.class_name(program, None, DEFAULT_TEMPLATE_NAME));
        self.record_imports(&script.imports);

        let (functions, body): (Vec<&Stmt>, Vec<&Stmt>) = script
            .body
            .iter()
            .partition(|stmt| matches!(stmt.kind, StmtKind::Function(_)));
        let functions: Vec<&Function> = functions
            .into_iter()
            .filter_map(|stmt| match &stmt.kind {
                StmtKind::Function(function) => Some(function.as_ref()),
                _ => None,
            })
            .collect();

        let mut collector = FieldCollector::default();
        for stmt in &script.body {
            collector.visit_stmt(stmt);
        }
        self.push_discovered_fields(collector, &mut decl);
        self.register_methods(&functions);

        let body = self.lower_top_level(body)?;
        decl.members.push(Member::Method(MethodDecl {
            doc: None,
            modifiers: vec![Modifier::Public],
            return_type: JType::Void,
            name: TEMPLATE_ENTRY.to_string(),
            params: Vec::new(),
            body,
        }));
        for function in functions {
            decl.members.push(Member::Method(self.lower_function(function)?));
        }
        Ok(decl)
    }

    /// Explicit name, then file stem, then the configured name, then `fallback`.
    fn class_name(&self, program: &Program, explicit: Option<String>, fallback: &str) -> String {
        let stem = program
            .source_name
            .as_deref()
            .and_then(|name| std::path::Path::new(name).file_stem())
            .and_then(|stem| stem.to_str())
            .map(str::to_string);
        let name = explicit
            .or(stem)
            .or_else(|| self.options.class_name.clone())
            .unwrap_or_else(|| fallback.to_string());
        java_identifier(&name)
    }

    fn record_imports(&mut self, imports: &[Import]) {
        for import in imports {
            self.support.import(import.path.text.clone());
        }
    }

    fn push_discovered_fields(&mut self, collector: FieldCollector, decl: &mut TypeDecl) {
        for (_, name, public) in collector.found.into_iter().sorted_by_key(|field| field.0) {
            if !self.members.add_field(&name, public) {
                continue;
            }
            let modifier = if public {
                Modifier::Public
            } else {
                Modifier::Private
            };
            decl.members.push(Member::Field(FieldDecl {
                doc: None,
                modifiers: vec![modifier],
                ty: JType::object(),
                name,
                init: None,
            }));
        }
    }

    /// Settles every method's return kind up front, so calls between
    /// methods know whether they produce a value.
    fn register_methods(&mut self, functions: &[&Function]) {
        let mut returns = ReturnAnalysis::new(functions);
        for function in functions {
            let returns_value = returns.returns_value(&function.name.key());
            self.members.add_method(MethodSig {
                name: function.name.name.clone(),
                params: function.params.iter().map(|param| param.name.key()).collect(),
                returns_value,
            });
        }
    }

    fn lower_top_level<'s>(&mut self, stmts: impl IntoIterator<Item = &'s Stmt>) -> Result<JBlock> {
        self.context = BodyContext::TopLevel;
        self.scope = FunctionScope::new();
        self.start_body();
        let mut out = Vec::new();
        for stmt in stmts {
            self.lower_stmt(stmt, &mut out)?;
        }
        self.finish_body(0, out)
    }

    fn start_body(&mut self) {
        self.hoisted.clear();
        self.catch_vars.clear();
        self.query_rows.clear();
    }

    /// Places hoisted declarations after the first `prologue` statements.
    pub(crate) fn finish_body(&mut self, prologue: usize, mut body: Vec<JStmt>) -> Result<JBlock> {
        if let Some((name, span)) = self.scope.reassigned_capture() {
            return Err(LowerError::unsupported(
                format!("closure capture of `{}`, which is reassigned", name),
                span,
            ));
        }
        let hoisted = std::mem::take(&mut self.hoisted);
        let at = prologue.min(body.len());
        body.splice(at..at, hoisted);
        Ok(JBlock::new(body))
    }

    fn lower_function(&mut self, function: &Function) -> Result<MethodDecl> {
        tracing::trace!(function = %function.name, "lowering function");
        self.context = BodyContext::Function;
        self.scope = FunctionScope::with_params(function.params.iter().map(|param| &param.name));
        self.start_body();

        let mut params = Vec::with_capacity(function.params.len());
        let mut body = Vec::new();
        for param in &function.params {
            let ty = param_type(param.type_hint.as_ref(), param.default.is_some(), &mut self.support);
            params.push(JParam::new(ty, param.name.name.clone()));
            if let Some(default) = &param.default {
                let default = self.lower_expr(default)?;
                self.scope.note_assigned(&param.name.name);
                body.push(default_prologue(&param.name.name, default));
            }
        }
        let prologue = body.len();

        let returns_value = self
            .members
            .method(&function.name.name)
            .map(|sig| sig.returns_value)
            .unwrap_or(false);
        let return_type = match &function.return_type {
            Some(_) => lower_type(function.return_type.as_ref(), &mut self.support),
            None if returns_value => JType::object(),
            None => JType::Void,
        };

        let stmts = &function.body.stmts;
        let implicit = match stmts.last() {
            Some(last) if !return_type.is_void() => self.implicit_return(last),
            _ => None,
        };
        match implicit {
            Some(value) => {
                self.lower_stmts(&stmts[..stmts.len() - 1], &mut body)?;
                let value = self.lower_expr(value)?;
                body.push(JStmt::Return(Some(value)));
            }
            None => self.lower_stmts(stmts, &mut body)?,
        }

        Ok(MethodDecl {
            doc: hint(&function.attributes),
            modifiers: vec![access_modifier(function.access)],
            return_type,
            name: function.name.name.clone(),
            params,
            body: self.finish_body(prologue, body)?,
        })
    }

    /// `Runtime.closure((Object a) -> { ... })`. The body sees the enclosing
    /// locals read-only and always returns a value.
    pub(crate) fn lower_closure(&mut self, closure: &Closure) -> Result<JExpr> {
        let names = self.scope.enter(closure.params.iter().map(|param| &param.name));
        let hoisted = std::mem::take(&mut self.hoisted);
        let catch_vars = std::mem::take(&mut self.catch_vars);
        let context = std::mem::replace(&mut self.context, BodyContext::Function);
        let body = self.lower_closure_body(closure, &names);
        self.scope.leave();
        self.hoisted = hoisted;
        self.catch_vars = catch_vars;
        self.context = context;

        let params = names
            .into_iter()
            .map(|name| JParam::new(JType::object(), name))
            .collect();
        Ok(self.support.call("closure", vec![JExpr::lambda(params, body?)]))
    }

    fn lower_closure_body(&mut self, closure: &Closure, names: &[String]) -> Result<JBlock> {
        let mut body = Vec::new();
        for (param, name) in closure.params.iter().zip(names) {
            if let Some(default) = &param.default {
                let default = self.lower_expr(default)?;
                self.scope.note_assigned(name);
                body.push(default_prologue(name, default));
            }
        }
        let prologue = body.len();
        let stmts = &closure.body.stmts;
        let implicit = stmts
            .split_last()
            .and_then(|(last, rest)| Some((self.implicit_return(last)?, rest)));
        match implicit {
            Some((value, rest)) => {
                self.lower_stmts(rest, &mut body)?;
                let value = self.lower_expr(value)?;
                body.push(JStmt::Return(Some(value)));
            }
            None => self.lower_stmts(stmts, &mut body)?,
        }
        let mut block = self.finish_body(prologue, body)?;
        if block.completes_normally() {
            block.stmts.push(JStmt::Return(Some(JExpr::null())));
        }
        Ok(block)
    }

    /// Value a trailing statement implicitly returns, if any.
    fn implicit_return<'s>(&self, stmt: &'s Stmt) -> Option<&'s Expr> {
        let StmtKind::Expr(expr) = &stmt.kind else {
            return None;
        };
        if !yields_value(expr) {
            return None;
        }
        match member_callee(expr) {
            Some(name) => self
                .members
                .method(name)
                .filter(|sig| !sig.returns_value)
                .map_or(Some(expr), |_| None),
            None => Some(expr),
        }
    }
}

/// Expression statements that are not pure side effects.
fn yields_value(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Assign { .. } => false,
        ExprKind::Unary { op, .. } => !op.is_update(),
        _ => true,
    }
}

/// Name of the member function `expr` calls: `f()`, `this.f()` or `variables.f()`.
fn member_callee(expr: &Expr) -> Option<&str> {
    let ExprKind::Call { callee, .. } = &expr.kind else {
        return None;
    };
    match &callee.kind {
        ExprKind::Ident(ident) => Some(ident.name.as_str()),
        ExprKind::Member { object, name }
            if matches!(
                Qualifier::of(object),
                Some(Qualifier::This) | Some(Qualifier::Variables)
            ) =>
        {
            Some(name.name.as_str())
        }
        _ => None,
    }
}

/// Decides which untyped functions return a value. A function does if it
/// has a `return <expr>` or ends in an implicit return; an implicit return
/// of another member's call depends on that member in turn.
struct ReturnAnalysis<'f> {
    functions: HashMap<String, &'f Function>,
    settled: HashMap<String, bool>,
    visiting: Vec<String>,
}

impl<'f> ReturnAnalysis<'f> {
    fn new(functions: &[&'f Function]) -> Self {
        Self {
            functions: functions
                .iter()
                .map(|function| (function.name.key(), *function))
                .collect(),
            settled: HashMap::new(),
            visiting: Vec::new(),
        }
    }

    fn returns_value(&mut self, key: &str) -> bool {
        if let Some(settled) = self.settled.get(key) {
            return *settled;
        }
        let Some(function) = self.functions.get(key).copied() else {
            return false;
        };
        // Mutual recursion through implicit returns: assume a value.
        if self.visiting.iter().any(|visiting| visiting == key) {
            return true;
        }
        self.visiting.push(key.to_string());
        let result = match &function.return_type {
            Some(hint) => !hint.is("void"),
            None => has_value_return(function) || self.ends_in_value(function),
        };
        self.visiting.pop();
        self.settled.insert(key.to_string(), result);
        result
    }

    fn ends_in_value(&mut self, function: &Function) -> bool {
        let Some(Stmt {
            kind: StmtKind::Expr(expr),
            ..
        }) = function.body.stmts.last()
        else {
            return false;
        };
        if !yields_value(expr) {
            return false;
        }
        match member_callee(expr) {
            Some(name) if !function.params.iter().any(|param| param.name.is(name)) => {
                let key = name.to_ascii_lowercase();
                if self.functions.contains_key(&key) {
                    self.returns_value(&key)
                } else {
                    true
                }
            }
            _ => true,
        }
    }
}

fn has_value_return(function: &Function) -> bool {
    struct Finder(bool);

    impl Visitor for Finder {
        fn visit_stmt(&mut self, stmt: &Stmt) {
            if matches!(stmt.kind, StmtKind::Return(Some(_))) {
                self.0 = true;
            }
            walk_stmt(self, stmt);
        }

        fn visit_expr(&mut self, _expr: &Expr) {}

        // Returns inside nested declarations belong to them.
        fn visit_function(&mut self, _function: &Function) {}
    }

    let mut finder = Finder(false);
    walk_block(&mut finder, &function.body);
    finder.0
}

/// Finds names that live in the variables or `this` scope: assignments
/// through `variables.`/`this.` anywhere, plus unscoped assignments and
/// `var` declarations outside functions.
#[derive(Default)]
struct FieldCollector {
    in_function: usize,
    /// `(offset, name, public)` in discovery order.
    found: Vec<(u32, String, bool)>,
}

impl FieldCollector {
    fn record(&mut self, span: Span, name: &str, public: bool) {
        self.found.push((span.lo, name.to_string(), public));
    }
}

impl Visitor for FieldCollector {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let StmtKind::VarDecl { name, .. } = &stmt.kind {
            if self.in_function == 0 {
                self.record(name.span, &name.name, false);
            }
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        let target = match &expr.kind {
            ExprKind::Assign { target, .. } => Some(target.as_ref()),
            ExprKind::Unary { op, operand } if op.is_update() => Some(operand.as_ref()),
            _ => None,
        };
        if let Some(target) = target {
            match &target.kind {
                ExprKind::Member { object, name } => match Qualifier::of(object) {
                    Some(Qualifier::Variables) => self.record(name.span, &name.name, false),
                    Some(Qualifier::This) => self.record(name.span, &name.name, true),
                    _ => {}
                },
                ExprKind::Ident(ident)
                    if self.in_function == 0 && Qualifier::from_name(&ident.name).is_none() =>
                {
                    self.record(ident.span, &ident.name, false)
                }
                _ => {}
            }
        }
        walk_expr(self, expr);
    }

    fn visit_function(&mut self, function: &Function) {
        self.in_function += 1;
        for param in &function.params {
            if let Some(default) = &param.default {
                self.visit_expr(default);
            }
        }
        walk_block(self, &function.body);
        self.in_function -= 1;
    }

    fn visit_closure(&mut self, closure: &Closure) {
        self.in_function += 1;
        for param in &closure.params {
            if let Some(default) = &param.default {
                self.visit_expr(default);
            }
        }
        walk_block(self, &closure.body);
        self.in_function -= 1;
    }
}

/// `if (p == null) { p = default; }`
fn default_prologue(name: &str, default: JExpr) -> JStmt {
    let param = JExpr::name(name);
    let cond = JExpr::binary(JBinaryOp::Eq, param.clone(), JExpr::null());
    let assign = JExpr::assign(JAssignOp::Assign, param, default);
    JStmt::If {
        cond,
        then_block: JBlock::new(vec![JStmt::Expr(assign)]),
        else_branch: None,
    }
}

fn access_modifier(access: Option<Access>) -> Modifier {
    match access {
        Some(Access::Private) => Modifier::Private,
        Some(Access::Package) => Modifier::Protected,
        Some(Access::Public) | Some(Access::Remote) | None => Modifier::Public,
    }
}

fn hint(attributes: &[Attribute]) -> Option<String> {
    find_attribute(attributes, "hint")
        .and_then(|attr| attr.text())
        .map(str::to_string)
}

/// Replaces characters Java does not allow in identifiers.
fn java_identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identifiers_are_sanitized() {
        assert_eq!(java_identifier("my-page"), "my_page");
        assert_eq!(java_identifier("404"), "_404");
        assert_eq!(java_identifier("User"), "User");
    }

    #[test]
    fn access_maps_to_modifiers() {
        assert_eq!(access_modifier(Some(Access::Package)), Modifier::Protected);
        assert_eq!(access_modifier(Some(Access::Remote)), Modifier::Public);
        assert_eq!(access_modifier(None), Modifier::Public);
    }
}
