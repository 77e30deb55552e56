//! Read-only traversal over the source tree.

use crate::ast::{
    Block, Closure, ElseBranch, Expr, ExprKind, ForInit, Function, Stmt, StmtKind, TemplatePart,
};

/// Override a `visit_*` method to observe nodes; call the matching `walk_*`
/// to keep descending.
pub trait Visitor {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_function(&mut self, function: &Function) {
        for param in &function.params {
            if let Some(default) = &param.default {
                self.visit_expr(default);
            }
        }
        walk_block(self, &function.body);
    }

    fn visit_closure(&mut self, closure: &Closure) {
        for param in &closure.params {
            if let Some(default) = &param.default {
                self.visit_expr(default);
            }
        }
        walk_block(self, &closure.body);
    }
}

pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &Block) {
    for stmt in &block.stmts {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Expr(expr) | StmtKind::Output(expr) => visitor.visit_expr(expr),
        StmtKind::VarDecl { init, .. } => {
            if let Some(init) = init {
                visitor.visit_expr(init);
            }
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(cond);
            walk_block(visitor, then_branch);
            match else_branch {
                Some(ElseBranch::If(stmt)) => visitor.visit_stmt(stmt),
                Some(ElseBranch::Block(block)) => walk_block(visitor, block),
                None => {}
            }
        }
        StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
            visitor.visit_expr(cond);
            walk_block(visitor, body);
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            match init {
                Some(ForInit::Var { init, .. }) => visitor.visit_expr(init),
                Some(ForInit::Expr(expr)) => visitor.visit_expr(expr),
                None => {}
            }
            if let Some(cond) = cond {
                visitor.visit_expr(cond);
            }
            if let Some(step) = step {
                visitor.visit_expr(step);
            }
            walk_block(visitor, body);
        }
        StmtKind::ForIn {
            collection, body, ..
        } => {
            visitor.visit_expr(collection);
            walk_block(visitor, body);
        }
        StmtKind::QueryLoop { query, body, .. } => {
            visitor.visit_expr(query);
            walk_block(visitor, body);
        }
        StmtKind::Switch { subject, cases } => {
            visitor.visit_expr(subject);
            for case in cases {
                for value in &case.values {
                    visitor.visit_expr(value);
                }
                for stmt in &case.body {
                    visitor.visit_stmt(stmt);
                }
            }
        }
        StmtKind::Try {
            body,
            catches,
            finally,
        } => {
            walk_block(visitor, body);
            for catch in catches {
                walk_block(visitor, &catch.body);
            }
            if let Some(finally) = finally {
                walk_block(visitor, finally);
            }
        }
        StmtKind::Throw(value) | StmtKind::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        StmtKind::Rethrow | StmtKind::Break | StmtKind::Continue => {}
        StmtKind::Block(block) => walk_block(visitor, block),
        StmtKind::Function(function) => visitor.visit_function(function),
        StmtKind::TagInvocation(tag) => {
            for attr in &tag.attributes {
                if let Some(value) = &attr.value {
                    visitor.visit_expr(value);
                }
            }
            if let Some(body) = &tag.body {
                walk_block(visitor, body);
            }
        }
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Ident(_) => {}
        ExprKind::Template(parts) => {
            for part in parts {
                if let TemplatePart::Hole(hole) = part {
                    visitor.visit_expr(hole);
                }
            }
        }
        ExprKind::Member { object, .. } => visitor.visit_expr(object),
        ExprKind::Index { object, index } => {
            visitor.visit_expr(object);
            visitor.visit_expr(index);
        }
        ExprKind::Call { callee, args } => {
            visitor.visit_expr(callee);
            for arg in args {
                visitor.visit_expr(&arg.value);
            }
        }
        ExprKind::New { args, .. } => {
            for arg in args {
                visitor.visit_expr(&arg.value);
            }
        }
        ExprKind::Binary { lhs, rhs, .. } | ExprKind::Elvis { lhs, rhs } => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }
        ExprKind::Unary { operand, .. } => visitor.visit_expr(operand),
        ExprKind::Assign { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        ExprKind::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            visitor.visit_expr(cond);
            visitor.visit_expr(then_expr);
            visitor.visit_expr(else_expr);
        }
        ExprKind::Array(items) => {
            for item in items {
                visitor.visit_expr(item);
            }
        }
        ExprKind::Struct(entries) => {
            for entry in entries {
                visitor.visit_expr(&entry.value);
            }
        }
        ExprKind::Closure(closure) => visitor.visit_closure(closure),
    }
}
