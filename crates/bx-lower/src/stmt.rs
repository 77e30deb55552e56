use bx_core::ast::{
    AssignOp, BinaryOp, Block, CatchClause, ElseBranch, Expr, ExprKind, ForInit, Ident, Stmt, StmtKind,
    SwitchCase, TagInvocation,
};
use bx_java::ast::{
    Block as JBlock, JAssignOp, JCatch, JElse, JExpr, JForInit, JStmt, JSwitchCase, JType,
};

use crate::error::{LowerError, Result};
use crate::expr::{query_key, Qualifier};
use crate::types::catch_type;
use crate::{BodyContext, Lowerer};

const DEFAULT_ROW_NAME: &str = "row";
const DISCARDED_NAME: &str = "discarded";

impl Lowerer<'_> {
    /// Lowers a braced block in its own binding frame.
    pub(crate) fn lower_block(&mut self, block: &Block) -> Result<JBlock> {
        self.scope.push_frame();
        let mut stmts = Vec::new();
        let result = self.lower_stmts(&block.stmts, &mut stmts);
        self.scope.pop_frame();
        result.map(|()| JBlock::new(stmts))
    }

    pub(crate) fn lower_stmts(&mut self, stmts: &[Stmt], out: &mut Vec<JStmt>) -> Result<()> {
        for stmt in stmts {
            self.lower_stmt(stmt, out)?;
        }
        Ok(())
    }

    pub(crate) fn lower_stmt(&mut self, stmt: &Stmt, out: &mut Vec<JStmt>) -> Result<()> {
        self.nested(stmt.span, |this| this.lower_stmt_inner(stmt, out))
    }

    fn lower_stmt_inner(&mut self, stmt: &Stmt, out: &mut Vec<JStmt>) -> Result<()> {
        match &stmt.kind {
            StmtKind::Expr(expr) => match self.declared_target(expr) {
                Some((ident, value)) => {
                    let value = self.lower_expr(value)?;
                    self.declare_body_local(ident, Some(value), out);
                }
                None => {
                    let lowered = self.lower_expr(expr)?;
                    self.push_expr_stmt(lowered, out);
                }
            },
            StmtKind::VarDecl { name, init } => self.lower_var_decl(name, init.as_ref(), out)?,
            StmtKind::If { .. } => out.push(self.lower_if(stmt)?),
            StmtKind::While { cond, body } => {
                let cond = self.lower_expr(cond)?;
                let body = self.lower_block(body)?;
                out.push(JStmt::While { cond, body });
            }
            StmtKind::DoWhile { body, cond } => {
                let body = self.lower_block(body)?;
                let cond = self.lower_expr(cond)?;
                out.push(JStmt::DoWhile { body, cond });
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                let lowered = self.lower_for(init.as_ref(), cond.as_ref(), step.as_ref(), body, out)?;
                out.push(lowered);
            }
            StmtKind::ForIn {
                var,
                collection,
                body,
                ..
            } => {
                let iterable = self.lower_expr(collection)?;
                out.push(self.lower_for_each(var, iterable, body, None)?);
            }
            StmtKind::QueryLoop { query, item, body } => {
                let key = query_key(query);
                let query = self.lower_expr(query)?;
                let iterable = self.support.call("queryRows", vec![query]);
                let var = item
                    .clone()
                    .unwrap_or_else(|| Ident::new(DEFAULT_ROW_NAME, stmt.span));
                out.push(self.lower_for_each(&var, iterable, body, key)?);
            }
            StmtKind::Switch { subject, cases } => {
                let subject = self.lower_expr(subject)?;
                let cases = cases
                    .iter()
                    .map(|case| self.lower_case(case))
                    .collect::<Result<Vec<_>>>()?;
                out.push(JStmt::Switch { subject, cases });
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => {
                let body = self.lower_block(body)?;
                let catches = catches
                    .iter()
                    .map(|catch| self.lower_catch(catch))
                    .collect::<Result<Vec<_>>>()?;
                let finally = finally
                    .as_ref()
                    .map(|block| self.lower_block(block))
                    .transpose()?;
                out.push(JStmt::Try {
                    body,
                    catches,
                    finally,
                });
            }
            StmtKind::Throw(message) => {
                let args = match message {
                    Some(message) => vec![self.lower_message(message)?],
                    None => Vec::new(),
                };
                out.push(JStmt::Throw(JExpr::new_object(
                    JType::class("RuntimeException"),
                    args,
                )));
            }
            StmtKind::Rethrow => {
                let Some(var) = self.catch_vars.last() else {
                    return Err(LowerError::unsupported("rethrow outside a catch", stmt.span));
                };
                out.push(JStmt::Throw(JExpr::name(var.clone())));
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(value) => Some(self.lower_expr(value)?),
                    // A closure always yields a value.
                    None if self.scope.is_closure() => Some(JExpr::null()),
                    None => None,
                };
                out.push(JStmt::Return(value));
            }
            StmtKind::Break => out.push(JStmt::Break),
            StmtKind::Continue => out.push(JStmt::Continue),
            StmtKind::Output(expr) => {
                let value = self.lower_expr(expr)?;
                out.push(JStmt::Expr(print_call(value)));
            }
            StmtKind::Block(block) => out.push(JStmt::Block(self.lower_block(block)?)),
            StmtKind::Function(function) => {
                return Err(LowerError::unsupported(
                    format!("nested function declaration `{}`", function.name),
                    stmt.span,
                ))
            }
            StmtKind::TagInvocation(tag) => self.lower_tag(tag, out)?,
        }
        Ok(())
    }

    /// A plain assignment to an unbound name declares a local: `Object x = v;`.
    /// `local.x = v` does the same for a `local` scope name not yet declared.
    fn declared_target<'e>(&self, expr: &'e Expr) -> Option<(&'e Ident, &'e Expr)> {
        let ExprKind::Assign {
            op: AssignOp::Assign,
            target,
            value,
        } = &expr.kind
        else {
            return None;
        };
        match &target.kind {
            ExprKind::Ident(ident)
                if self.context == BodyContext::Function
                    && Qualifier::from_name(&ident.name).is_none()
                    && self.binding(&ident.key()).is_none() =>
            {
                Some((ident, value))
            }
            ExprKind::Member { object, name }
                if Qualifier::of(object) == Some(Qualifier::Local)
                    && self.scope.local(&name.key()).is_none() =>
            {
                Some((name, value))
            }
            _ => None,
        }
    }

    /// Binds a local that lives for the rest of the body and returns its
    /// Java name. Inside a nested block the declaration is hoisted to the
    /// top of the body and only the assignment stays in place.
    fn declare_body_local(&mut self, ident: &Ident, init: Option<JExpr>, out: &mut Vec<JStmt>) -> String {
        if !self.scope.in_nested_block() {
            let name = self.scope.declare(ident);
            out.push(JStmt::Local {
                ty: JType::object(),
                name: name.clone(),
                init,
            });
            return name;
        }
        let name = self.scope.declare_hoisted(ident);
        self.hoisted.push(JStmt::Local {
            ty: JType::object(),
            name: name.clone(),
            init: Some(JExpr::null()),
        });
        if let Some(init) = init {
            self.scope.note_assigned(&name);
            let assign = JExpr::assign(JAssignOp::Assign, JExpr::name(name.clone()), init);
            out.push(JStmt::Expr(assign));
        }
        name
    }

    /// Java only accepts assignments, updates, calls and instance creation
    /// as statements. Other values are dropped when evaluating them has no
    /// effect, and kept in an unused local otherwise.
    pub(crate) fn push_expr_stmt(&mut self, expr: JExpr, out: &mut Vec<JStmt>) {
        if expr.is_statement_expr() {
            out.push(JStmt::Expr(expr));
        } else if expr.has_side_effects() {
            let name = self.scope.declare_hidden(DISCARDED_NAME);
            out.push(JStmt::Local {
                ty: JType::object(),
                name,
                init: Some(expr),
            });
        }
    }

    fn lower_var_decl(&mut self, name: &Ident, init: Option<&Expr>, out: &mut Vec<JStmt>) -> Result<()> {
        let init = init.map(|init| self.lower_expr(init)).transpose()?;
        if self.context == BodyContext::TopLevel && self.scope.local(&name.key()).is_none() {
            // Top-level `var` writes the shared variables scope.
            if let Some(init) = init {
                let field = self.field_target(name);
                out.push(JStmt::Expr(JExpr::assign(JAssignOp::Assign, field, init)));
            }
            return Ok(());
        }
        self.declare_body_local(name, init, out);
        Ok(())
    }

    fn field_target(&self, name: &Ident) -> JExpr {
        let field = self
            .members
            .field(&name.name)
            .map(|field| field.name.clone())
            .unwrap_or_else(|| name.name.clone());
        JExpr::field(JExpr::This, field)
    }

    fn lower_if(&mut self, stmt: &Stmt) -> Result<JStmt> {
        let StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } = &stmt.kind
        else {
            return Err(LowerError::unsupported(stmt.kind_name(), stmt.span));
        };
        let cond = self.lower_expr(cond)?;
        let then_block = self.lower_block(then_branch)?;
        let else_branch = match else_branch {
            Some(ElseBranch::If(nested)) if matches!(nested.kind, StmtKind::If { .. }) => {
                let nested = self.nested(nested.span, |this| this.lower_if(nested))?;
                Some(JElse::If(Box::new(nested)))
            }
            Some(ElseBranch::If(other)) => {
                let mut stmts = Vec::new();
                self.scope.push_frame();
                let result = self.lower_stmt(other, &mut stmts);
                self.scope.pop_frame();
                result?;
                Some(JElse::Block(JBlock::new(stmts)))
            }
            Some(ElseBranch::Block(block)) => Some(JElse::Block(self.lower_block(block)?)),
            None => None,
        };
        Ok(JStmt::If {
            cond,
            then_block,
            else_branch,
        })
    }

    fn lower_for(
        &mut self,
        init: Option<&ForInit>,
        cond: Option<&Expr>,
        step: Option<&Expr>,
        body: &Block,
        out: &mut Vec<JStmt>,
    ) -> Result<JStmt> {
        let init = init.map(|init| self.lower_for_init(init, out)).transpose()?;
        let cond = cond.map(|cond| self.lower_expr(cond)).transpose()?;
        let update = step
            .map(|step| self.lower_expr(step))
            .transpose()?
            .into_iter()
            .collect();
        let body = self.lower_block(body)?;
        Ok(JStmt::For {
            init,
            cond,
            update,
            body,
        })
    }

    /// A loop counter outlives its loop, so a declaring initializer becomes
    /// a body local assigned in the loop header.
    fn lower_for_init(&mut self, init: &ForInit, out: &mut Vec<JStmt>) -> Result<JForInit> {
        let (ident, value) = match init {
            ForInit::Var { name, init } => (name, init),
            ForInit::Expr(expr) => match self.declared_target(expr) {
                Some(target) => target,
                None => return Ok(JForInit::Exprs(vec![self.lower_expr(expr)?])),
            },
        };
        let value = self.lower_expr(value)?;
        let name = self.declare_body_local(ident, None, out);
        self.scope.note_assigned(&name);
        let assign = JExpr::assign(JAssignOp::Assign, JExpr::name(name), value);
        Ok(JForInit::Exprs(vec![assign]))
    }

    /// `for (Object var : iterable)`; the loop variable is always fresh.
    /// A query loop also makes `query.column` read the current row.
    fn lower_for_each(
        &mut self,
        var: &Ident,
        iterable: JExpr,
        body: &Block,
        query: Option<String>,
    ) -> Result<JStmt> {
        self.scope.push_frame();
        let name = self.scope.declare(var);
        if let Some(query) = &query {
            self.query_rows.push((query.clone(), name.clone()));
        }
        let body = self.lower_block(body);
        if query.is_some() {
            self.query_rows.pop();
        }
        self.scope.pop_frame();
        Ok(JStmt::ForEach {
            ty: JType::object(),
            name,
            iterable,
            body: body?,
        })
    }

    fn lower_case(&mut self, case: &SwitchCase) -> Result<JSwitchCase> {
        let labels = case
            .values
            .iter()
            .map(|value| self.lower_expr(value))
            .collect::<Result<Vec<_>>>()?;
        let mut body = Vec::new();
        self.scope.push_frame();
        let result = self.lower_stmts(&case.body, &mut body);
        self.scope.pop_frame();
        result?;
        Ok(JSwitchCase { labels, body })
    }

    fn lower_catch(&mut self, catch: &CatchClause) -> Result<JCatch> {
        let ty = catch_type(catch.exception_type.as_ref(), &mut self.support);
        self.scope.push_frame();
        let name = self.scope.declare(&catch.var);
        self.catch_vars.push(name.clone());
        let mut stmts = Vec::new();
        let result = self.lower_stmts(&catch.body.stmts, &mut stmts);
        self.catch_vars.pop();
        self.scope.pop_frame();
        result?;
        Ok(JCatch {
            ty,
            name,
            body: JBlock::new(stmts),
        })
    }

    /// Exception messages must be strings.
    fn lower_message(&mut self, message: &Expr) -> Result<JExpr> {
        let is_text = matches!(
            message.kind,
            ExprKind::Template(_)
                | ExprKind::Binary {
                    op: BinaryOp::Concat,
                    ..
                }
        );
        let lowered = self.lower_expr(message)?;
        if is_text || lowered.is_string_literal() {
            Ok(lowered)
        } else {
            Ok(JExpr::static_call("String", "valueOf", vec![lowered]))
        }
    }

    fn lower_tag(&mut self, tag: &TagInvocation, out: &mut Vec<JStmt>) -> Result<()> {
        let mut attributes = Vec::with_capacity(tag.attributes.len());
        for attribute in &tag.attributes {
            let value = match &attribute.value {
                Some(value) => self.lower_expr(value)?,
                None => JExpr::bool(true),
            };
            attributes.push((attribute.name.name.clone(), value));
        }
        let attributes = self.support.map_of(attributes);
        let name = JExpr::string(tag.name.name.clone());
        let Some(body) = &tag.body else {
            out.push(JStmt::Expr(self.support.call("tag", vec![name, attributes])));
            return Ok(());
        };
        out.push(JStmt::Expr(
            self.support.call("tagStart", vec![name.clone(), attributes]),
        ));
        // The body is emitted inline, so its locals share the current block.
        self.lower_stmts(&body.stmts, out)?;
        out.push(JStmt::Expr(self.support.call("tagEnd", vec![name])));
        Ok(())
    }
}

fn print_call(value: JExpr) -> JExpr {
    let out = JExpr::field(JExpr::name("System"), "out");
    JExpr::call(out, "print", vec![value])
}
