use bx_core::ast::{
    Argument, AssignOp, BinaryOp, DottedName, Expr, ExprKind, Ident, Literal, StructEntry,
    TemplatePart, UnaryOp,
};
use bx_core::span::Span;

use super::{PResult, Parser, SyntaxError};
use crate::lexer::{Keyword, TokenKind};

const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
/// Operand level of prefix `not`: binds looser than comparisons.
const PREC_NOT_OPERAND: u8 = 3;
const PREC_COMPARE: u8 = 3;
const PREC_CONCAT: u8 = 4;
const PREC_ADD: u8 = 5;
const PREC_MUL: u8 = 6;
const PREC_POW: u8 = 7;

struct BinOpMatch {
    prec: u8,
    op: BinaryOp,
    right_assoc: bool,
    /// Tokens the operator spans, e.g. 3 for `does not contain`.
    width: usize,
}

impl<'a> Parser<'a> {
    /// Full expression including assignment.
    pub(crate) fn parse_expr(&mut self) -> PResult<Expr> {
        self.nested(|p| p.parse_assignment())
    }

    /// Expression without assignment or ternary, as used for attribute
    /// values in `component extends="Base" accessors=true {`.
    pub(crate) fn parse_operand(&mut self) -> PResult<Expr> {
        self.nested(|p| p.parse_expr_prec(PREC_OR))
    }

    fn parse_assignment(&mut self) -> PResult<Expr> {
        let target = self.parse_ternary()?;
        let Some(op) = self.peek_assign_op() else {
            return Ok(target);
        };
        if !is_assignable(&target) {
            return Err(SyntaxError::new(
                "invalid assignment target",
                target.span,
            ));
        }
        self.advance();
        let value = self.parse_expr()?;
        let span = target.span.to(value.span);
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        ))
    }

    fn peek_assign_op(&self) -> Option<AssignOp> {
        let token = self.peek();
        if token.kind != TokenKind::Symbol {
            return None;
        }
        let op = match token.lexeme.as_str() {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::Add,
            "-=" => AssignOp::Sub,
            "*=" => AssignOp::Mul,
            "/=" => AssignOp::Div,
            "&=" => AssignOp::Concat,
            _ => return None,
        };
        Some(op)
    }

    fn parse_ternary(&mut self) -> PResult<Expr> {
        let cond = self.parse_expr_prec(PREC_OR)?;
        if self.eat_symbol("?:") {
            let rhs = self.nested(|p| p.parse_ternary())?;
            let span = cond.span.to(rhs.span);
            return Ok(Expr::new(
                ExprKind::Elvis {
                    lhs: Box::new(cond),
                    rhs: Box::new(rhs),
                },
                span,
            ));
        }
        if !self.eat_symbol("?") {
            return Ok(cond);
        }
        let then_expr = self.parse_expr()?;
        self.expect_symbol(":")?;
        let else_expr = self.nested(|p| p.parse_ternary())?;
        let span = cond.span.to(else_expr.span);
        Ok(Expr::new(
            ExprKind::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    /// Precedence climbing over binary operators.
    pub(crate) fn parse_expr_prec(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut left = self.parse_prefix()?;
        while let Some(found) = self.peek_binop() {
            if found.prec < min_prec {
                break;
            }
            for _ in 0..found.width {
                self.advance();
            }
            let next_min = if found.right_assoc {
                found.prec
            } else {
                found.prec + 1
            };
            let right = self.nested(|p| p.parse_expr_prec(next_min))?;
            let span = left.span.to(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op: found.op,
                    lhs: Box::new(left),
                    rhs: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn peek_binop(&self) -> Option<BinOpMatch> {
        let token = self.peek();
        let single = |prec, op| {
            Some(BinOpMatch {
                prec,
                op,
                right_assoc: false,
                width: 1,
            })
        };
        match token.kind {
            TokenKind::Symbol => match token.lexeme.as_str() {
                "||" => single(PREC_OR, BinaryOp::Or),
                "&&" => single(PREC_AND, BinaryOp::And),
                "==" => single(PREC_COMPARE, BinaryOp::Eq),
                "!=" => single(PREC_COMPARE, BinaryOp::Ne),
                "<" => single(PREC_COMPARE, BinaryOp::Lt),
                "<=" => single(PREC_COMPARE, BinaryOp::Le),
                ">" => single(PREC_COMPARE, BinaryOp::Gt),
                ">=" => single(PREC_COMPARE, BinaryOp::Ge),
                "&" => single(PREC_CONCAT, BinaryOp::Concat),
                "+" => single(PREC_ADD, BinaryOp::Add),
                "-" => single(PREC_ADD, BinaryOp::Sub),
                "*" => single(PREC_MUL, BinaryOp::Mul),
                "/" => single(PREC_MUL, BinaryOp::Div),
                "%" => single(PREC_MUL, BinaryOp::Mod),
                "^" => Some(BinOpMatch {
                    prec: PREC_POW,
                    op: BinaryOp::Pow,
                    right_assoc: true,
                    width: 1,
                }),
                _ => None,
            },
            TokenKind::Keyword(keyword) => match keyword {
                Keyword::Or => single(PREC_OR, BinaryOp::Or),
                Keyword::Xor => single(PREC_OR, BinaryOp::Xor),
                Keyword::And => single(PREC_AND, BinaryOp::And),
                Keyword::Eq => single(PREC_COMPARE, BinaryOp::Eq),
                Keyword::Is if self.peek_at(1).is_keyword(Keyword::Not) => Some(BinOpMatch {
                    prec: PREC_COMPARE,
                    op: BinaryOp::Ne,
                    right_assoc: false,
                    width: 2,
                }),
                Keyword::Is => single(PREC_COMPARE, BinaryOp::Eq),
                Keyword::Neq => single(PREC_COMPARE, BinaryOp::Ne),
                Keyword::Lt => single(PREC_COMPARE, BinaryOp::Lt),
                Keyword::Lte | Keyword::Le => single(PREC_COMPARE, BinaryOp::Le),
                Keyword::Gt => single(PREC_COMPARE, BinaryOp::Gt),
                Keyword::Gte | Keyword::Ge => single(PREC_COMPARE, BinaryOp::Ge),
                Keyword::Contains => single(PREC_COMPARE, BinaryOp::Contains),
                Keyword::Mod => single(PREC_MUL, BinaryOp::Mod),
                _ => None,
            },
            TokenKind::Ident
                if token.is_word("does")
                    && self.peek_at(1).is_keyword(Keyword::Not)
                    && self.peek_at(2).is_word("contain") =>
            {
                Some(BinOpMatch {
                    prec: PREC_COMPARE,
                    op: BinaryOp::NotContains,
                    right_assoc: false,
                    width: 3,
                })
            }
            _ => None,
        }
    }

    fn parse_prefix(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        let op = match token.kind {
            TokenKind::Keyword(Keyword::Not) => Some((UnaryOp::Not, Some(PREC_NOT_OPERAND))),
            TokenKind::Symbol => match token.lexeme.as_str() {
                "!" => Some((UnaryOp::Not, Some(PREC_NOT_OPERAND))),
                "-" => Some((UnaryOp::Neg, None)),
                "+" => Some((UnaryOp::Plus, None)),
                "++" => Some((UnaryOp::PreInc, None)),
                "--" => Some((UnaryOp::PreDec, None)),
                _ => None,
            },
            _ => None,
        };
        let Some((op, operand_prec)) = op else {
            let primary = self.parse_primary()?;
            return self.parse_postfix(primary);
        };
        self.advance();
        let operand = match operand_prec {
            Some(prec) => self.nested(|p| p.parse_expr_prec(prec))?,
            None => self.nested(|p| p.parse_prefix())?,
        };
        if op.is_update() && !is_assignable(&operand) {
            return Err(SyntaxError::new(
                "increment target must be a variable",
                operand.span,
            ));
        }
        let span = token.span.to(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> PResult<Expr> {
        loop {
            if self.eat_symbol(".") {
                let name = self.expect_name()?;
                let span = expr.span.to(name.span);
                expr = Expr::new(
                    ExprKind::Member {
                        object: Box::new(expr),
                        name,
                    },
                    span,
                );
            } else if self.eat_symbol("[") {
                let index = self.parse_expr()?;
                self.expect_symbol("]")?;
                let span = self.span_from(expr.span);
                expr = Expr::new(
                    ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else if self.at_symbol("(") {
                let args = self.parse_arguments()?;
                let span = self.span_from(expr.span);
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                );
            } else if (self.at_symbol("++") || self.at_symbol("--")) && is_assignable(&expr) {
                let token = self.advance();
                let op = if token.lexeme == "++" {
                    UnaryOp::PostInc
                } else {
                    UnaryOp::PostDec
                };
                let span = expr.span.to(token.span);
                expr = Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(expr),
                    },
                    span,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    /// `(a, b)` or `(name = a, other: b)`.
    pub(crate) fn parse_arguments(&mut self) -> PResult<Vec<Argument>> {
        self.expect_symbol("(")?;
        let mut args = Vec::new();
        if self.eat_symbol(")") {
            return Ok(args);
        }
        loop {
            let named = matches!(self.peek().kind, TokenKind::Ident | TokenKind::Keyword(_))
                && (self.peek_at(1).is_symbol("=") || self.peek_at(1).is_symbol(":"));
            let name = if named {
                let name = self.expect_name()?;
                self.advance();
                Some(name)
            } else {
                None
            };
            let value = self.parse_expr()?;
            args.push(Argument { name, value });
            if self.eat_symbol(",") {
                continue;
            }
            self.expect_symbol(")")?;
            return Ok(args);
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Literal(Literal::Number(token.lexeme)),
                    token.span,
                ))
            }
            TokenKind::StringStart => self.parse_string(),
            TokenKind::HashOpen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_kind(TokenKind::HashClose, "closing `#`")?;
                Ok(inner)
            }
            TokenKind::Ident if self.peek_at(1).is_symbol("=>") => self.parse_arrow(),
            TokenKind::Ident => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Ident(Ident::new(token.lexeme, token.span)),
                    token.span,
                ))
            }
            TokenKind::Keyword(Keyword::True) | TokenKind::Keyword(Keyword::False) => {
                self.advance();
                let value = token.is_keyword(Keyword::True);
                Ok(Expr::new(ExprKind::Literal(Literal::Bool(value)), token.span))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Null), token.span))
            }
            TokenKind::Keyword(Keyword::New) => self.parse_new(),
            TokenKind::Keyword(Keyword::Function) => self.parse_closure(),
            TokenKind::Symbol if token.lexeme == "(" && self.at_arrow_params() => self.parse_arrow(),
            TokenKind::Symbol if token.lexeme == "(" => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            TokenKind::Symbol if token.lexeme == "[" => self.parse_array(),
            TokenKind::Symbol if token.lexeme == "{" => self.parse_struct(),
            _ => Err(self.unexpected("expression")),
        }
    }

    /// String literal, or a template when it contains `#...#` holes.
    pub(crate) fn parse_string(&mut self) -> PResult<Expr> {
        let start = self.expect_kind(TokenKind::StringStart, "string")?.span;
        let mut parts: Vec<TemplatePart> = Vec::new();
        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::StringText => {
                    self.advance();
                    push_text(&mut parts, &token.lexeme);
                }
                TokenKind::HashOpen => {
                    self.advance();
                    let hole = self.parse_expr()?;
                    self.expect_kind(TokenKind::HashClose, "closing `#`")?;
                    parts.push(TemplatePart::Hole(hole));
                }
                TokenKind::StringEnd => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("end of string")),
            }
        }
        let span = self.span_from(start);
        Ok(template_expr(parts, span))
    }

    fn parse_new(&mut self) -> PResult<Expr> {
        let start = self.expect_keyword(Keyword::New, "new")?;
        let class = self.parse_dotted_name()?;
        let args = if self.at_symbol("(") {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        let span = self.span_from(start);
        Ok(Expr::new(ExprKind::New { class, args }, span))
    }

    pub(crate) fn parse_dotted_name(&mut self) -> PResult<DottedName> {
        let first = self.expect_name()?;
        let mut text = first.name;
        let mut span = first.span;
        while self.at_symbol(".")
            && matches!(
                self.peek_at(1).kind,
                TokenKind::Ident | TokenKind::Keyword(_)
            )
        {
            self.advance();
            let next = self.expect_name()?;
            text.push('.');
            text.push_str(&next.name);
            span = span.to(next.span);
        }
        Ok(DottedName::new(text, span))
    }

    fn parse_array(&mut self) -> PResult<Expr> {
        let start = self.expect_symbol("[")?;
        let mut items = Vec::new();
        while !self.at_symbol("]") {
            items.push(self.parse_expr()?);
            if !self.eat_symbol(",") {
                break;
            }
        }
        self.expect_symbol("]")?;
        Ok(Expr::new(ExprKind::Array(items), self.span_from(start)))
    }

    fn parse_struct(&mut self) -> PResult<Expr> {
        let start = self.expect_symbol("{")?;
        let mut entries = Vec::new();
        while !self.at_symbol("}") {
            let key = self.parse_struct_key()?;
            if !self.eat_symbol(":") {
                self.expect_symbol("=")?;
            }
            let value = self.parse_expr()?;
            entries.push(StructEntry { key, value });
            if !self.eat_symbol(",") {
                break;
            }
        }
        self.expect_symbol("}")?;
        Ok(Expr::new(ExprKind::Struct(entries), self.span_from(start)))
    }

    fn parse_struct_key(&mut self) -> PResult<Ident> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Ident | TokenKind::Keyword(_) | TokenKind::Number => {
                self.advance();
                Ok(Ident::new(token.lexeme, token.span))
            }
            TokenKind::StringStart => {
                let key = self.parse_string()?;
                match key.as_str_literal() {
                    Some(text) => Ok(Ident::new(text, key.span)),
                    None => Err(SyntaxError::new(
                        "struct keys cannot be interpolated",
                        key.span,
                    )),
                }
            }
            _ => Err(self.unexpected("struct key")),
        }
    }
}

pub(crate) fn push_text(parts: &mut Vec<TemplatePart>, text: &str) {
    if let Some(TemplatePart::Text(last)) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(TemplatePart::Text(text.to_string()));
    }
}

/// Collapses hole-free templates into plain string literals.
pub(crate) fn template_expr(parts: Vec<TemplatePart>, span: Span) -> Expr {
    if parts
        .iter()
        .all(|part| matches!(part, TemplatePart::Text(_)))
    {
        let text: String = parts
            .into_iter()
            .filter_map(|part| match part {
                TemplatePart::Text(text) => Some(text),
                TemplatePart::Hole(_) => None,
            })
            .collect();
        return Expr::new(ExprKind::Literal(Literal::String(text)), span);
    }
    Expr::new(ExprKind::Template(parts), span)
}

pub(crate) fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Index { .. }
    )
}
