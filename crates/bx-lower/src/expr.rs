use bx_core::ast::{
    Argument, AssignOp, BinaryOp, Expr, ExprKind, Ident, Literal, TemplatePart, UnaryOp,
};
use bx_core::span::Span;
use bx_java::ast::{JAssignOp, JBinaryOp, JExpr, JType, JUnaryOp};

use crate::error::{LowerError, LowerErrorKind, Result};
use crate::resolve::CallArgs;
use crate::runtime::OBJECTS;
use crate::scope::{Binding, MethodSig};
use crate::Lowerer;

/// Scope qualifiers that may prefix a name, e.g. `variables.count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Qualifier {
    Variables,
    This,
    Arguments,
    Local,
}

impl Qualifier {
    pub(crate) fn of(expr: &Expr) -> Option<Self> {
        let ident = expr.as_ident()?;
        Self::from_name(&ident.name)
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "variables" => Some(Qualifier::Variables),
            "this" => Some(Qualifier::This),
            "arguments" => Some(Qualifier::Arguments),
            "local" => Some(Qualifier::Local),
            _ => None,
        }
    }
}

/// Operand of a flattened `&` chain or string template.
enum ConcatPart<'e> {
    Text(&'e str),
    Expr(&'e Expr),
}

impl Lowerer<'_> {
    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> Result<JExpr> {
        self.nested(expr.span, |this| this.lower_expr_inner(expr))
    }

    fn lower_expr_inner(&mut self, expr: &Expr) -> Result<JExpr> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(lower_literal(literal)),
            ExprKind::Template(_) => self.lower_concat(expr),
            ExprKind::Ident(ident) => self.lower_ident(ident),
            ExprKind::Member { object, name } => self.lower_member(object, name),
            ExprKind::Index { object, index } => {
                let object = self.lower_expr(object)?;
                let index = self.lower_expr(index)?;
                Ok(self.support.call("get", vec![object, index]))
            }
            ExprKind::Call { callee, args } => self.lower_call(callee, args, expr.span),
            ExprKind::New { class, args } => {
                let args = self.lower_args(args)?.into_values();
                Ok(JExpr::new_object(JType::class(class.text.clone()), args))
            }
            ExprKind::Binary {
                op: BinaryOp::Concat,
                ..
            } => self.lower_concat(expr),
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.lower_expr(lhs)?;
                let rhs = self.lower_expr(rhs)?;
                Ok(self.lower_binary(*op, lhs, rhs))
            }
            ExprKind::Unary { op, operand } => {
                let operand = if op.is_update() {
                    self.lower_target(operand)?
                } else {
                    self.lower_expr(operand)?
                };
                Ok(JExpr::unary(unary_op(*op), operand))
            }
            ExprKind::Assign { op, target, value } => self.lower_assign(*op, target, value, expr.span),
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond = self.lower_expr(cond)?;
                let then_expr = self.lower_expr(then_expr)?;
                let else_expr = self.lower_expr(else_expr)?;
                Ok(JExpr::conditional(cond, then_expr, else_expr))
            }
            ExprKind::Elvis { lhs, rhs } => {
                let lhs = self.lower_expr(lhs)?;
                let rhs = self.lower_expr(rhs)?;
                let objects = self.support.java(OBJECTS);
                Ok(JExpr::static_call(&objects, "requireNonNullElse", vec![lhs, rhs]))
            }
            ExprKind::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.lower_expr(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(self.support.list_of(items))
            }
            ExprKind::Struct(entries) => {
                let mut lowered = Vec::with_capacity(entries.len());
                for entry in entries {
                    lowered.push((entry.key.name.clone(), self.lower_expr(&entry.value)?));
                }
                Ok(self.support.map_of(lowered))
            }
            ExprKind::Closure(closure) => self.lower_closure(closure),
        }
    }

    /// Binding of a bare name: local, then parameter, then a closure's
    /// enclosing bodies, then member.
    pub(crate) fn binding(&self, key: &str) -> Option<Binding> {
        if let Some(name) = self.scope.local(key) {
            return Some(Binding::Local(name.to_string()));
        }
        if let Some(name) = self.scope.param(key) {
            return Some(Binding::Param(name.to_string()));
        }
        if let Some(name) = self.scope.enclosing(key) {
            return Some(Binding::Captured(name.to_string()));
        }
        if let Some(field) = self.members.field(key) {
            return Some(Binding::Field(field.name.clone()));
        }
        self.members
            .method(key)
            .map(|method| Binding::Method(method.name.clone()))
    }

    fn lower_ident(&mut self, ident: &Ident) -> Result<JExpr> {
        match Qualifier::from_name(&ident.name) {
            Some(Qualifier::This) => return Ok(JExpr::This),
            Some(_) => {
                return Err(LowerError::unsupported(
                    format!("bare `{}` scope reference", ident.name),
                    ident.span,
                ))
            }
            None => {}
        }
        match self.binding(&ident.key()) {
            Some(Binding::Local(name)) | Some(Binding::Param(name)) => Ok(JExpr::name(name)),
            Some(Binding::Captured(name)) => {
                self.scope.note_captured(&ident.key(), &name, ident.span);
                Ok(JExpr::name(name))
            }
            Some(Binding::Field(name)) => Ok(JExpr::field(JExpr::This, name)),
            Some(Binding::Method(_)) => Err(LowerError::unsupported(
                format!("reference to function `{}` as a value", ident.name),
                ident.span,
            )),
            None => self
                .options
                .resolver
                .read(&ident.name, &mut self.support)
                .map_err(|kind| LowerError::new(kind, ident.span)),
        }
    }

    fn lower_member(&mut self, object: &Expr, name: &Ident) -> Result<JExpr> {
        if let Some(row) = self.query_row(object) {
            let column = JExpr::string(name.name.clone());
            return Ok(self.support.call("get", vec![JExpr::name(row), column]));
        }
        match Qualifier::of(object) {
            Some(Qualifier::Variables) | Some(Qualifier::This) => {
                if self.members.method(&name.name).is_some() && self.members.field(&name.name).is_none() {
                    return Err(LowerError::unsupported(
                        format!("reference to function `{}` as a value", name.name),
                        name.span,
                    ));
                }
                Ok(JExpr::field(JExpr::This, self.field_name(name)))
            }
            Some(Qualifier::Arguments) => self
                .scope
                .param(&name.key())
                .map(JExpr::name)
                .ok_or_else(|| {
                    LowerError::new(
                        LowerErrorKind::UnknownArgument {
                            name: name.name.clone(),
                        },
                        name.span,
                    )
                }),
            Some(Qualifier::Local) => self
                .scope
                .local(&name.key())
                .map(JExpr::name)
                .ok_or_else(|| undeclared_local(name)),
            None => {
                let object = self.lower_expr(object)?;
                Ok(JExpr::field(object, name.name.clone()))
            }
        }
    }

    /// Row variable of the innermost query loop over `query`, if any.
    fn query_row(&self, query: &Expr) -> Option<String> {
        let key = query_key(query)?;
        self.query_rows
            .iter()
            .rev()
            .find(|(looped, _)| *looped == key)
            .map(|(_, row)| row.clone())
    }

    /// Declared spelling of a member field, or the name as written.
    fn field_name(&self, name: &Ident) -> String {
        self.members
            .field(&name.name)
            .map(|field| field.name.clone())
            .unwrap_or_else(|| name.name.clone())
    }

    /// Assignable place: locals, parameters, fields and member fields.
    pub(crate) fn lower_target(&mut self, target: &Expr) -> Result<JExpr> {
        let place = match &target.kind {
            ExprKind::Ident(ident) if Qualifier::from_name(&ident.name).is_none() => {
                match self.binding(&ident.key()) {
                    Some(Binding::Local(name)) | Some(Binding::Param(name)) => JExpr::name(name),
                    Some(Binding::Field(name)) => JExpr::field(JExpr::This, name),
                    Some(Binding::Captured(_)) => {
                        return Err(LowerError::unsupported(
                            format!("assignment to `{}` of the enclosing function", ident.name),
                            ident.span,
                        ))
                    }
                    Some(Binding::Method(_)) => {
                        return Err(LowerError::unsupported(
                            format!("assignment to function `{}`", ident.name),
                            ident.span,
                        ))
                    }
                    None => {
                        return Err(LowerError::unsupported(
                            format!("assignment to undeclared `{}` inside an expression", ident.name),
                            ident.span,
                        ))
                    }
                }
            }
            ExprKind::Member { object, name } if self.query_row(object).is_some() => {
                return Err(LowerError::unsupported(
                    format!("update of query column `{}`", name.name),
                    target.span,
                ))
            }
            ExprKind::Member { object, name } => self.lower_member(object, name)?,
            _ => {
                return Err(LowerError::unsupported(
                    format!("assignment to {}", target.kind_name()),
                    target.span,
                ))
            }
        };
        if let JExpr::Name(name) = &place {
            self.scope.note_assigned(name);
        }
        Ok(place)
    }

    fn lower_assign(&mut self, op: AssignOp, target: &Expr, value: &Expr, span: Span) -> Result<JExpr> {
        if let ExprKind::Index { object, index } = &target.kind {
            if op != AssignOp::Assign {
                return Err(LowerError::unsupported("compound assignment to an indexed element", span));
            }
            let object = self.lower_expr(object)?;
            let index = self.lower_expr(index)?;
            let value = self.lower_expr(value)?;
            return Ok(self.support.call("set", vec![object, index, value]));
        }
        if let ExprKind::Member { object, name } = &target.kind {
            if let Some(row) = self.query_row(object) {
                if op != AssignOp::Assign {
                    return Err(LowerError::unsupported("compound assignment to a query column", span));
                }
                let column = JExpr::string(name.name.clone());
                let value = self.lower_expr(value)?;
                return Ok(self.support.call("set", vec![JExpr::name(row), column, value]));
            }
        }
        let target = self.lower_target(target)?;
        let value = self.lower_expr(value)?;
        Ok(JExpr::assign(assign_op(op), target, value))
    }

    fn lower_binary(&mut self, op: BinaryOp, lhs: JExpr, rhs: JExpr) -> JExpr {
        let op = match op {
            BinaryOp::Add => JBinaryOp::Add,
            BinaryOp::Sub => JBinaryOp::Sub,
            BinaryOp::Mul => JBinaryOp::Mul,
            BinaryOp::Div => JBinaryOp::Div,
            BinaryOp::Mod => JBinaryOp::Rem,
            BinaryOp::Eq => JBinaryOp::Eq,
            BinaryOp::Ne => JBinaryOp::Ne,
            BinaryOp::Lt => JBinaryOp::Lt,
            BinaryOp::Le => JBinaryOp::Le,
            BinaryOp::Gt => JBinaryOp::Gt,
            BinaryOp::Ge => JBinaryOp::Ge,
            BinaryOp::And => JBinaryOp::And,
            BinaryOp::Or => JBinaryOp::Or,
            BinaryOp::Xor => JBinaryOp::Xor,
            BinaryOp::Pow => return JExpr::static_call("Math", "pow", vec![lhs, rhs]),
            BinaryOp::Contains => return self.support.call("contains", vec![lhs, rhs]),
            BinaryOp::NotContains => {
                let contains = self.support.call("contains", vec![lhs, rhs]);
                return JExpr::unary(JUnaryOp::Not, contains);
            }
            // Flattened by `lower_concat` before reaching here.
            BinaryOp::Concat => JBinaryOp::Add,
        };
        JExpr::binary(op, lhs, rhs)
    }

    /// `&` chains and templates become one left-to-right `+` chain that is
    /// guaranteed to start as string concatenation.
    fn lower_concat(&mut self, expr: &Expr) -> Result<JExpr> {
        let mut operands = Vec::new();
        for part in concat_parts(expr) {
            operands.push(match part {
                ConcatPart::Text(text) => JExpr::string(text),
                ConcatPart::Expr(expr) => self.lower_expr(expr)?,
            });
        }
        let starts_as_string = operands.iter().take(2).any(JExpr::is_string_literal);
        if !starts_as_string {
            operands.insert(0, JExpr::string(""));
        }
        let mut operands = operands.into_iter();
        let first = operands.next().unwrap_or_else(|| JExpr::string(""));
        Ok(operands.fold(first, |acc, next| JExpr::binary(JBinaryOp::Add, acc, next)))
    }

    fn lower_call(&mut self, callee: &Expr, args: &[Argument], span: Span) -> Result<JExpr> {
        match &callee.kind {
            ExprKind::Ident(ident) => match self.binding(&ident.key()) {
                Some(Binding::Method(_)) => self.lower_member_call(&ident.name, args, span),
                Some(_) => {
                    let function = self.lower_ident(ident)?;
                    self.lower_invoke(function, args, span)
                }
                None => {
                    let args = self.lower_args(args)?;
                    self.options
                        .resolver
                        .call(&ident.name, args, &mut self.support)
                        .map_err(|kind| LowerError::new(kind, ident.span))
                }
            },
            ExprKind::Member { object, name } => match Qualifier::of(object) {
                Some(Qualifier::Variables) | Some(Qualifier::This) => {
                    if self.members.method(&name.name).is_some() {
                        self.lower_member_call(&name.name, args, span)
                    } else {
                        let args = self.lower_args(args)?.into_values();
                        Ok(JExpr::call(JExpr::This, name.name.clone(), args))
                    }
                }
                Some(Qualifier::Arguments) | Some(Qualifier::Local) => {
                    let function = self.lower_member(object, name)?;
                    self.lower_invoke(function, args, span)
                }
                None => {
                    let object = self.lower_expr(object)?;
                    let args = self.lower_args(args)?.into_values();
                    Ok(JExpr::call(object, name.name.clone(), args))
                }
            },
            _ => Err(LowerError::unsupported(
                format!("call through {}", callee.kind_name()),
                callee.span,
            )),
        }
    }

    /// Call of a closure held in a variable: `Runtime.invoke(f, args...)`.
    fn lower_invoke(&mut self, function: JExpr, args: &[Argument], span: Span) -> Result<JExpr> {
        if args.iter().any(|arg| arg.name.is_some()) {
            return Err(LowerError::unsupported("named arguments to a closure call", span));
        }
        let mut values = vec![function];
        values.extend(self.lower_args(args)?.into_values());
        Ok(self.support.call("invoke", values))
    }

    /// `this.f(...)` with arguments in parameter order; unfilled parameters
    /// are passed `null`.
    fn lower_member_call(&mut self, name: &str, args: &[Argument], span: Span) -> Result<JExpr> {
        let Some(sig) = self.members.method(name).cloned() else {
            return Err(LowerError::new(
                LowerErrorKind::Unresolved {
                    name: name.to_string(),
                },
                span,
            ));
        };
        let args = self.order_arguments(&sig, args)?;
        Ok(JExpr::call(JExpr::This, sig.name, args))
    }

    fn order_arguments(&mut self, sig: &MethodSig, args: &[Argument]) -> Result<Vec<JExpr>> {
        let mut slots: Vec<Option<JExpr>> = vec![None; sig.params.len()];
        let mut extra = Vec::new();
        let mut next_positional = 0;
        for arg in args {
            let value = self.lower_expr(&arg.value)?;
            match &arg.name {
                Some(arg_name) => {
                    let position = sig.params.iter().position(|param| *param == arg_name.key());
                    match position {
                        Some(index) => slots[index] = Some(value),
                        None => {
                            return Err(LowerError::new(
                                LowerErrorKind::UnknownArgument {
                                    name: arg_name.name.clone(),
                                },
                                arg_name.span,
                            ))
                        }
                    }
                }
                None if next_positional < slots.len() => {
                    slots[next_positional] = Some(value);
                    next_positional += 1;
                }
                None => extra.push(value),
            }
        }
        let mut ordered: Vec<JExpr> = slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(JExpr::null))
            .collect();
        ordered.extend(extra);
        Ok(ordered)
    }

    pub(crate) fn lower_args(&mut self, args: &[Argument]) -> Result<CallArgs> {
        if args.iter().any(|arg| arg.name.is_some()) {
            let mut named = Vec::with_capacity(args.len());
            for (position, arg) in args.iter().enumerate() {
                let key = arg
                    .name
                    .as_ref()
                    .map(|name| name.name.clone())
                    .unwrap_or_else(|| (position + 1).to_string());
                named.push((key, self.lower_expr(&arg.value)?));
            }
            return Ok(CallArgs::Named(named));
        }
        let positional = args
            .iter()
            .map(|arg| self.lower_expr(&arg.value))
            .collect::<Result<Vec<_>>>()?;
        Ok(CallArgs::Positional(positional))
    }
}

fn concat_parts(expr: &Expr) -> Vec<ConcatPart<'_>> {
    let mut parts = Vec::new();
    let mut stack = vec![expr];
    while let Some(expr) = stack.pop() {
        match &expr.kind {
            ExprKind::Binary {
                op: BinaryOp::Concat,
                lhs,
                rhs,
            } => {
                stack.push(rhs);
                stack.push(lhs);
            }
            ExprKind::Template(template) => {
                for part in template {
                    parts.push(match part {
                        TemplatePart::Text(text) => ConcatPart::Text(text),
                        TemplatePart::Hole(hole) => ConcatPart::Expr(hole),
                    });
                }
            }
            _ => parts.push(ConcatPart::Expr(expr)),
        }
    }
    parts
}

/// Name a query loop iterates, when its columns can be reached by name:
/// `q`, or `q` behind a scope qualifier.
pub(crate) fn query_key(query: &Expr) -> Option<String> {
    match &query.kind {
        ExprKind::Ident(ident) if Qualifier::from_name(&ident.name).is_none() => Some(ident.key()),
        ExprKind::Member { object, name } if Qualifier::of(object).is_some() => Some(name.key()),
        _ => None,
    }
}

pub(crate) fn lower_literal(literal: &Literal) -> JExpr {
    match literal {
        Literal::Null => JExpr::null(),
        Literal::Bool(value) => JExpr::bool(*value),
        Literal::Number(text) => JExpr::number(text.clone()),
        Literal::String(text) => JExpr::string(text.clone()),
    }
}

fn unary_op(op: UnaryOp) -> JUnaryOp {
    match op {
        UnaryOp::Neg => JUnaryOp::Neg,
        UnaryOp::Plus => JUnaryOp::Plus,
        UnaryOp::Not => JUnaryOp::Not,
        UnaryOp::PreInc => JUnaryOp::PreInc,
        UnaryOp::PreDec => JUnaryOp::PreDec,
        UnaryOp::PostInc => JUnaryOp::PostInc,
        UnaryOp::PostDec => JUnaryOp::PostDec,
    }
}

fn assign_op(op: AssignOp) -> JAssignOp {
    match op {
        AssignOp::Assign => JAssignOp::Assign,
        AssignOp::Add | AssignOp::Concat => JAssignOp::Add,
        AssignOp::Sub => JAssignOp::Sub,
        AssignOp::Mul => JAssignOp::Mul,
        AssignOp::Div => JAssignOp::Div,
    }
}

pub(crate) fn undeclared_local(name: &Ident) -> LowerError {
    LowerError::new(
        LowerErrorKind::UndeclaredLocal {
            name: name.name.clone(),
        },
        name.span,
    )
}
