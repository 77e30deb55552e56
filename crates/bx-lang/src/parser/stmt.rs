use bx_core::ast::{
    Argument, Attribute, Block, CatchClause, ElseBranch, Expr, ForInit, Ident, Stmt, StmtKind,
    SwitchCase, TypeHint,
};

use super::{PResult, Parser, SyntaxError};
use crate::lexer::{Keyword, Token, TokenKind};

impl<'a> Parser<'a> {
    /// One script statement. `Ok(None)` for an empty statement.
    pub(crate) fn parse_statement(&mut self) -> PResult<Option<Stmt>> {
        self.nested(|p| p.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> PResult<Option<Stmt>> {
        let token = self.peek().clone();
        let stmt = match token.kind {
            TokenKind::Symbol if token.lexeme == ";" => {
                self.advance();
                return Ok(None);
            }
            TokenKind::Symbol if token.lexeme == "{" => {
                let block = self.parse_block()?;
                let span = block.span;
                Stmt::new(StmtKind::Block(block), span)
            }
            TokenKind::Keyword(Keyword::Var) => self.parse_var_decl()?,
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::While) => self.parse_while()?,
            TokenKind::Keyword(Keyword::Do) => self.parse_do_while()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch()?,
            TokenKind::Keyword(Keyword::Try) => self.parse_try()?,
            TokenKind::Keyword(Keyword::Throw) => self.parse_throw()?,
            TokenKind::Keyword(Keyword::Rethrow) => {
                self.advance();
                self.expect_semi()?;
                Stmt::new(StmtKind::Rethrow, self.span_from(token.span))
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                self.expect_semi()?;
                Stmt::new(StmtKind::Break, self.span_from(token.span))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                self.expect_semi()?;
                Stmt::new(StmtKind::Continue, self.span_from(token.span))
            }
            TokenKind::Keyword(Keyword::Return) => self.parse_return()?,
            _ if self.at_function_decl() => {
                let function = self.parse_script_function()?;
                let span = function.span;
                Stmt::new(StmtKind::Function(Box::new(function)), span)
            }
            TokenKind::Ident if self.at_component_start() => {
                return Err(SyntaxError::new(
                    "a component must be the only top-level declaration in its file",
                    token.span,
                ));
            }
            TokenKind::Ident if is_script_tag_name(&token) && self.peek_at(1).is_symbol("(") => {
                match self.try_parse_script_tag()? {
                    Some(stmt) => stmt,
                    None => self.parse_expr_statement()?,
                }
            }
            _ => self.parse_expr_statement()?,
        };
        Ok(Some(stmt))
    }

    pub(crate) fn parse_block(&mut self) -> PResult<Block> {
        let start = self.expect_symbol("{")?;
        let stmts = self.parse_statements(|token| token.is_symbol("}"));
        self.expect_symbol("}")?;
        Ok(Block::new(stmts, self.span_from(start)))
    }

    /// Loop and branch bodies: a braced block or a single statement.
    fn parse_body(&mut self) -> PResult<Block> {
        if self.at_symbol("{") {
            return self.parse_block();
        }
        let start = self.peek().span;
        let stmt = self.parse_statement()?;
        Ok(Block::new(stmt.into_iter().collect(), self.span_from(start)))
    }

    fn parse_expr_statement(&mut self) -> PResult<Stmt> {
        let expr = self.parse_expr()?;
        self.expect_semi()?;
        let span = expr.span;
        Ok(Stmt::new(StmtKind::Expr(expr), span))
    }

    fn parse_var_decl(&mut self) -> PResult<Stmt> {
        let start = self.expect_keyword(Keyword::Var, "var")?;
        let name = self.parse_var_name()?;
        let init = if self.eat_symbol("=") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect_semi()?;
        Ok(Stmt::new(
            StmtKind::VarDecl { name, init },
            self.span_from(start),
        ))
    }

    /// Name after `var`, allowing the redundant `local.` prefix.
    pub(crate) fn parse_var_name(&mut self) -> PResult<Ident> {
        if self.peek().is_word("local") && self.peek_at(1).is_symbol(".") {
            self.advance();
            self.advance();
        }
        self.expect_name()
    }

    fn parse_paren_expr(&mut self) -> PResult<Expr> {
        self.expect_symbol("(")?;
        let expr = self.parse_expr()?;
        self.expect_symbol(")")?;
        Ok(expr)
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let start = self.expect_keyword(Keyword::If, "if")?;
        let cond = self.parse_paren_expr()?;
        let then_branch = self.parse_body()?;
        let else_branch = if self.eat_keyword(Keyword::Else) {
            if self.at_keyword(Keyword::If) {
                let nested = self.nested(|p| p.parse_if())?;
                Some(ElseBranch::If(Box::new(nested)))
            } else {
                Some(ElseBranch::Block(self.parse_body()?))
            }
        } else {
            None
        };
        Ok(Stmt::new(
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            self.span_from(start),
        ))
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        let start = self.expect_keyword(Keyword::While, "while")?;
        let cond = self.parse_paren_expr()?;
        let body = self.parse_body()?;
        Ok(Stmt::new(
            StmtKind::While { cond, body },
            self.span_from(start),
        ))
    }

    fn parse_do_while(&mut self) -> PResult<Stmt> {
        let start = self.expect_keyword(Keyword::Do, "do")?;
        let body = self.parse_body()?;
        self.expect_keyword(Keyword::While, "while")?;
        let cond = self.parse_paren_expr()?;
        self.expect_semi()?;
        Ok(Stmt::new(
            StmtKind::DoWhile { body, cond },
            self.span_from(start),
        ))
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let start = self.expect_keyword(Keyword::For, "for")?;
        self.expect_symbol("(")?;

        let declared_in = self.at_keyword(Keyword::Var)
            && self.peek_at(1).kind == TokenKind::Ident
            && self.peek_at(2).is_keyword(Keyword::In);
        let bare_in =
            self.peek().kind == TokenKind::Ident && self.peek_at(1).is_keyword(Keyword::In);
        if declared_in || bare_in {
            if declared_in {
                self.advance();
            }
            let var = self.expect_ident()?;
            self.expect_keyword(Keyword::In, "in")?;
            let collection = self.parse_expr()?;
            self.expect_symbol(")")?;
            let body = self.parse_body()?;
            return Ok(Stmt::new(
                StmtKind::ForIn {
                    var,
                    declared: declared_in,
                    collection,
                    body,
                },
                self.span_from(start),
            ));
        }

        let init = if self.at_symbol(";") {
            None
        } else if self.eat_keyword(Keyword::Var) {
            let name = self.parse_var_name()?;
            self.expect_symbol("=")?;
            let init = self.parse_expr()?;
            Some(ForInit::Var { name, init })
        } else {
            Some(ForInit::Expr(self.parse_expr()?))
        };
        self.expect_symbol(";")?;
        let cond = if self.at_symbol(";") {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_symbol(";")?;
        let step = if self.at_symbol(")") {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_symbol(")")?;
        let body = self.parse_body()?;
        Ok(Stmt::new(
            StmtKind::For {
                init,
                cond,
                step,
                body,
            },
            self.span_from(start),
        ))
    }

    fn parse_switch(&mut self) -> PResult<Stmt> {
        let start = self.expect_keyword(Keyword::Switch, "switch")?;
        let subject = self.parse_paren_expr()?;
        self.expect_symbol("{")?;
        let mut cases = Vec::new();
        while !self.at_symbol("}") && !self.at_eof() {
            let case_start = self.peek().span;
            let mut values = Vec::new();
            if self.eat_keyword(Keyword::Case) {
                values.push(self.parse_operand()?);
            } else if !self.eat_keyword(Keyword::Default) {
                return Err(self.unexpected("`case` or `default`"));
            }
            self.expect_symbol(":")?;
            let body = self.parse_statements(|token| {
                token.is_keyword(Keyword::Case)
                    || token.is_keyword(Keyword::Default)
                    || token.is_symbol("}")
            });
            cases.push(SwitchCase {
                values,
                body,
                span: self.span_from(case_start),
            });
        }
        self.expect_symbol("}")?;
        Ok(Stmt::new(
            StmtKind::Switch { subject, cases },
            self.span_from(start),
        ))
    }

    fn parse_try(&mut self) -> PResult<Stmt> {
        let start = self.expect_keyword(Keyword::Try, "try")?;
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.at_keyword(Keyword::Catch) {
            let catch_start = self.advance().span;
            self.expect_symbol("(")?;
            let (exception_type, var) = self.parse_catch_binding()?;
            self.expect_symbol(")")?;
            let body = self.parse_block()?;
            catches.push(CatchClause {
                exception_type,
                var,
                body,
                span: self.span_from(catch_start),
            });
        }
        let finally = if self.eat_keyword(Keyword::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if catches.is_empty() && finally.is_none() {
            return Err(self.unexpected("`catch` or `finally`"));
        }
        Ok(Stmt::new(
            StmtKind::Try {
                body,
                catches,
                finally,
            },
            self.span_from(start),
        ))
    }

    /// `any e`, `java.io.IOException e`, `"MyError" e` or just `e`.
    fn parse_catch_binding(&mut self) -> PResult<(Option<TypeHint>, Ident)> {
        if self.at_kind(TokenKind::StringStart) {
            let ty = self.parse_string()?;
            let Some(name) = ty.as_str_literal() else {
                return Err(SyntaxError::new(
                    "catch type cannot be interpolated",
                    ty.span,
                ));
            };
            let hint = TypeHint::new(name, ty.span);
            return Ok((Some(hint), self.expect_ident()?));
        }
        let first = self.parse_dotted_name()?;
        if self.at_symbol(")") {
            return Ok((None, Ident::new(first.text, first.span)));
        }
        let var = self.expect_ident()?;
        Ok((Some(TypeHint::new(first.text, first.span)), var))
    }

    fn parse_throw(&mut self) -> PResult<Stmt> {
        let start = self.expect_keyword(Keyword::Throw, "throw")?;
        if self.at_symbol("(") && self.peek_at(2).is_symbol("=") {
            let args = self.parse_arguments()?;
            self.expect_semi()?;
            let attributes = args_to_attributes(args)?;
            let name = Ident::new("throw", start);
            return self.tag_statement(name, attributes, None, self.span_from(start));
        }
        let value = if self.at_symbol(";") || self.at_symbol("}") {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_semi()?;
        Ok(Stmt::new(StmtKind::Throw(value), self.span_from(start)))
    }

    fn parse_return(&mut self) -> PResult<Stmt> {
        let start = self.expect_keyword(Keyword::Return, "return")?;
        let value = if self.at_symbol(";")
            || self.at_symbol("}")
            || self.at_kind(TokenKind::TagClose)
            || self.at_eof()
        {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_semi()?;
        Ok(Stmt::new(StmtKind::Return(value), self.span_from(start)))
    }

    /// `cfloop(from = 1, to = 3, index = "i") { ... }` and friends. Returns
    /// `None` (with the cursor restored) when the call turns out to be an
    /// ordinary function call.
    fn try_parse_script_tag(&mut self) -> PResult<Option<Stmt>> {
        let checkpoint = self.pos;
        let head = self.advance();
        let args = self.parse_arguments()?;
        let all_named = !args.is_empty() && args.iter().all(|arg| arg.name.is_some());
        let has_body = self.at_symbol("{");
        if !has_body && !(all_named && (self.at_symbol(";") || self.at_symbol("}"))) {
            self.pos = checkpoint;
            return Ok(None);
        }
        let attributes = args_to_attributes(args)?;
        let body = if has_body {
            Some(self.parse_block()?)
        } else {
            self.expect_semi()?;
            None
        };
        let name = Ident::new(head.lexeme[2..].to_ascii_lowercase(), head.span);
        let span = self.span_from(head.span);
        self.tag_statement(name, attributes, body, span).map(Some)
    }
}

fn is_script_tag_name(token: &Token) -> bool {
    token.lexeme.len() > 2
        && token.lexeme[..2].eq_ignore_ascii_case("cf")
        && token.lexeme[2..].starts_with(|c: char| c.is_ascii_alphabetic())
}

fn args_to_attributes(args: Vec<Argument>) -> PResult<Vec<Attribute>> {
    args.into_iter()
        .map(|arg| match arg.name {
            Some(name) => {
                let span = name.span.to(arg.value.span);
                Ok(Attribute::new(name, Some(arg.value), span))
            }
            None => Err(SyntaxError::new(
                "tag attributes must be named",
                arg.value.span,
            )),
        })
        .collect()
}

