//! Tag markup: `<cfset>`, `<cfif>`, `<cfloop>` and the rest, normalized
//! into the same statement nodes the script syntax produces.

use bx_core::ast::{
    find_attribute, AssignOp, Attribute, BinaryOp, Block, CatchClause, ElseBranch, Expr,
    ExprKind, ForInit, Function, Ident, Import, Literal, Param, ProgramKind, Script, Stmt,
    StmtKind, SwitchCase, TagInvocation, TemplatePart, TypeHint, UnaryOp,
};
use bx_core::source::SourceFile;
use bx_core::span::Span;

use super::expr::{push_text, template_expr};
use super::items::{
    access_attribute, is_truthy, property_from_attributes, ComponentBuilder,
};
use super::{PResult, Parser, SyntaxError};
use crate::lexer::{self, StartMode, Token, TokenKind};

/// Tags that only make sense inside a specific parent.
const NESTED_ONLY_TAGS: &[(&str, &str)] = &[
    ("elseif", "cfif"),
    ("else", "cfif"),
    ("catch", "cftry"),
    ("finally", "cftry"),
    ("case", "cfswitch"),
    ("defaultcase", "cfswitch"),
    ("argument", "cffunction"),
    ("property", "cfcomponent"),
];

const NUMERIC_TYPES: &[&str] = &["numeric", "number", "double", "int", "integer", "long", "float"];

/// Name given to the exception inside `<cfcatch>`.
const CATCH_VARIABLE: &str = "cfcatch";

impl<'a> Parser<'a> {
    pub(crate) fn parse_template_file(&mut self) -> Option<ProgramKind> {
        self.template = true;
        self.skip_blank_text();
        let imports = self.parse_tag_imports();
        self.skip_blank_text();
        if self.peek().is_tag_open("component") {
            let component = self.guard(|p| p.parse_tag_component(imports))?;
            self.skip_blank_text();
            if !self.at_eof() {
                let err = SyntaxError::new(
                    "a component must be the only top-level declaration in its file",
                    self.peek().span,
                );
                self.report(err);
            }
            return Some(ProgramKind::Component(component));
        }
        let body = self.parse_statements(|_| false);
        Some(ProgramKind::Script(Script { imports, body }))
    }

    fn skip_blank_text(&mut self) {
        while self.at_kind(TokenKind::Text) && self.peek().lexeme.trim().is_empty() {
            self.advance();
        }
    }

    fn parse_tag_imports(&mut self) -> Vec<Import> {
        let mut imports = Vec::new();
        while self.peek().is_tag_open("import") {
            let result = self.parse_tag_import();
            match result {
                Ok(import) => imports.push(import),
                Err(err) => {
                    self.report(err);
                    self.recover_statement();
                }
            }
            self.skip_blank_text();
        }
        imports
    }

    fn parse_tag_import(&mut self) -> PResult<Import> {
        let start = self.advance().span;
        let (attributes, _) = self.parse_tag_attributes()?;
        let span = self.span_from(start);
        let path = find_attribute(&attributes, "path")
            .and_then(Attribute::text)
            .ok_or_else(|| SyntaxError::new("`<cfimport>` needs a `path` attribute", span))?;
        Ok(Import {
            path: bx_core::ast::DottedName::new(path, span),
            span,
        })
    }

    /// One template element: a run of text and `#...#` output, or a tag.
    pub(crate) fn parse_template_item(&mut self) -> PResult<Vec<Stmt>> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Text | TokenKind::HashOpen => {
                Ok(self.parse_output_run()?.into_iter().collect())
            }
            TokenKind::TagOpen => self.parse_tag(),
            TokenKind::TagClose => Err(SyntaxError::new(
                format!("unexpected closing tag `</cf{}>`", token.lexeme),
                token.span,
            )),
            _ => Err(self.unexpected("tag or text")),
        }
    }

    /// Adjacent text and holes become one output statement. Whitespace-only
    /// runs produce nothing.
    fn parse_output_run(&mut self) -> PResult<Option<Stmt>> {
        let start = self.peek().span;
        let mut parts = Vec::new();
        loop {
            if self.at_kind(TokenKind::Text) {
                let text = self.advance();
                push_text(&mut parts, &text.lexeme);
            } else if self.at_kind(TokenKind::HashOpen) {
                self.advance();
                let hole = self.parse_expr()?;
                self.expect_kind(TokenKind::HashClose, "closing `#`")?;
                parts.push(TemplatePart::Hole(hole));
            } else {
                break;
            }
        }
        let blank = parts.iter().all(|part| match part {
            TemplatePart::Text(text) => text.trim().is_empty(),
            TemplatePart::Hole(_) => false,
        });
        if blank {
            return Ok(None);
        }
        let span = self.span_from(start);
        Ok(Some(Stmt::new(
            StmtKind::Output(template_expr(parts, span)),
            span,
        )))
    }

    fn parse_tag(&mut self) -> PResult<Vec<Stmt>> {
        let open = self.advance();
        let name = open.lexeme.clone();
        let stmt = match name.as_str() {
            "set" => self.parse_tag_set(open.span)?,
            "if" => self.parse_tag_if(open.span)?,
            "return" => {
                let value = if self.at_tag_end() {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect_tag_end()?;
                Stmt::new(StmtKind::Return(value), self.span_from(open.span))
            }
            "output" => return self.parse_tag_output(open.span),
            "script" => return self.parse_tag_script(),
            "break" | "continue" | "rethrow" => {
                self.expect_tag_end()?;
                let kind = match name.as_str() {
                    "break" => StmtKind::Break,
                    "continue" => StmtKind::Continue,
                    _ => StmtKind::Rethrow,
                };
                Stmt::new(kind, self.span_from(open.span))
            }
            "try" => self.parse_tag_try(open.span)?,
            "switch" => self.parse_tag_switch(open.span)?,
            "function" => {
                let function = self.parse_tag_function(open.span)?;
                let span = function.span;
                Stmt::new(StmtKind::Function(Box::new(function)), span)
            }
            "component" => {
                return Err(SyntaxError::new(
                    "a component must be the only top-level declaration in its file",
                    open.span,
                ))
            }
            "import" => {
                return Err(SyntaxError::new(
                    "`<cfimport>` must come before any other content",
                    open.span,
                ))
            }
            _ => {
                if let Some((_, parent)) = NESTED_ONLY_TAGS.iter().find(|(tag, _)| *tag == name) {
                    return Err(SyntaxError::new(
                        format!("`<cf{}>` is only allowed inside `<{}>`", name, parent),
                        open.span,
                    ));
                }
                self.parse_tag_generic(&open)?
            }
        };
        Ok(vec![stmt])
    }

    fn at_tag_end(&self) -> bool {
        self.at_kind(TokenKind::TagEnd) || self.at_kind(TokenKind::TagSelfClose)
    }

    /// Consumes `>` or `/>`, returning whether the tag closed itself.
    fn expect_tag_end(&mut self) -> PResult<bool> {
        match self.peek().kind {
            TokenKind::TagEnd => {
                self.advance();
                Ok(false)
            }
            TokenKind::TagSelfClose => {
                self.advance();
                Ok(true)
            }
            _ => Err(self.unexpected("`>`")),
        }
    }

    fn expect_tag_close(&mut self, name: &str) -> PResult<Span> {
        if self.peek().is_tag_close(name) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&format!("`</cf{}>`", name)))
        }
    }

    /// Statements up to (not including) `</cfNAME>`, which is then consumed.
    fn parse_tag_body(&mut self, name: &str, start: Span) -> PResult<Block> {
        let stmts = self.parse_statements(|token| token.is_tag_close(name));
        self.expect_tag_close(name)?;
        Ok(Block::new(stmts, self.span_from(start)))
    }

    fn parse_tag_attributes(&mut self) -> PResult<(Vec<Attribute>, bool)> {
        let mut attributes = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::TagEnd | TokenKind::TagSelfClose => {
                    let self_closed = self.expect_tag_end()?;
                    return Ok((attributes, self_closed));
                }
                TokenKind::Ident => {
                    let token = self.advance();
                    let name = Ident::new(token.lexeme, token.span);
                    let value = if self.eat_symbol("=") {
                        Some(self.parse_attribute_value()?)
                    } else {
                        None
                    };
                    let span = self.span_from(name.span);
                    attributes.push(Attribute::new(name, value, span));
                }
                _ => return Err(self.unexpected("attribute or `>`")),
            }
        }
    }

    fn parse_attribute_value(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::StringStart => {
                let value = self.parse_string()?;
                Ok(unwrap_single_hole(value))
            }
            TokenKind::HashOpen => {
                self.advance();
                let value = self.parse_expr()?;
                self.expect_kind(TokenKind::HashClose, "closing `#`")?;
                Ok(value)
            }
            TokenKind::Ident => {
                self.advance();
                Ok(Expr::string(token.lexeme, token.span))
            }
            TokenKind::Number => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Literal(Literal::Number(token.lexeme)),
                    token.span,
                ))
            }
            _ => Err(self.unexpected("attribute value")),
        }
    }

    fn parse_tag_set(&mut self, start: Span) -> PResult<Stmt> {
        let kind = if self.eat_keyword(lexer::Keyword::Var) {
            let name = self.parse_var_name()?;
            let init = if self.eat_symbol("=") {
                Some(self.parse_expr()?)
            } else {
                None
            };
            StmtKind::VarDecl { name, init }
        } else {
            StmtKind::Expr(self.parse_expr()?)
        };
        self.expect_tag_end()?;
        Ok(Stmt::new(kind, self.span_from(start)))
    }

    fn parse_tag_if(&mut self, start: Span) -> PResult<Stmt> {
        let cond = self.parse_expr()?;
        self.expect_tag_end()?;
        let body_start = self.prev_span();
        let stmts = self.parse_statements(is_if_boundary);
        let then_branch = Block::new(stmts, self.span_from(body_start));
        let else_branch = self.parse_tag_else()?;
        self.expect_tag_close("if")?;
        Ok(Stmt::new(
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            self.span_from(start),
        ))
    }

    /// `<cfelseif>` chains nest as else-if statements; the caller consumes
    /// the single `</cfif>`.
    fn parse_tag_else(&mut self) -> PResult<Option<ElseBranch>> {
        if self.peek().is_tag_open("elseif") {
            let start = self.advance().span;
            let cond = self.parse_expr()?;
            self.expect_tag_end()?;
            let body_start = self.prev_span();
            let stmts = self.parse_statements(is_if_boundary);
            let then_branch = Block::new(stmts, self.span_from(body_start));
            let else_branch = self.nested(|p| p.parse_tag_else())?;
            let stmt = Stmt::new(
                StmtKind::If {
                    cond,
                    then_branch,
                    else_branch,
                },
                self.span_from(start),
            );
            return Ok(Some(ElseBranch::If(Box::new(stmt))));
        }
        if self.peek().is_tag_open("else") {
            let start = self.advance().span;
            self.expect_tag_end()?;
            let stmts = self.parse_statements(|token| token.is_tag_close("if"));
            return Ok(Some(ElseBranch::Block(Block::new(
                stmts,
                self.span_from(start),
            ))));
        }
        Ok(None)
    }

    /// `<cfoutput query="q">` loops; a plain `<cfoutput>` just enables
    /// interpolation, so its body is spliced inline.
    fn parse_tag_output(&mut self, start: Span) -> PResult<Vec<Stmt>> {
        let (attributes, self_closed) = self.parse_tag_attributes()?;
        if self_closed {
            return Ok(Vec::new());
        }
        let body = self.parse_tag_body("output", start)?;
        match find_attribute(&attributes, "query").and_then(|attr| attr.value.clone()) {
            Some(query) => Ok(vec![Stmt::new(
                StmtKind::QueryLoop {
                    query: variable_reference(query),
                    item: None,
                    body,
                },
                self.span_from(start),
            )]),
            None => Ok(body.stmts),
        }
    }

    fn parse_tag_script(&mut self) -> PResult<Vec<Stmt>> {
        if self.expect_tag_end()? {
            return Ok(Vec::new());
        }
        self.template = false;
        let stmts = self.parse_statements(|token| token.is_tag_close("script"));
        self.template = true;
        self.expect_tag_close("script")?;
        Ok(stmts)
    }

    fn parse_tag_try(&mut self, start: Span) -> PResult<Stmt> {
        self.expect_tag_end()?;
        let body_start = self.prev_span();
        let stmts = self.parse_statements(|token| {
            token.is_tag_open("catch") || token.is_tag_open("finally") || token.is_tag_close("try")
        });
        let body = Block::new(stmts, self.span_from(body_start));
        let mut catches = Vec::new();
        let mut finally = None;
        loop {
            self.skip_blank_text();
            if self.peek().is_tag_open("catch") {
                let catch_start = self.advance().span;
                let (attributes, self_closed) = self.parse_tag_attributes()?;
                let exception_type = find_attribute(&attributes, "type")
                    .and_then(|attr| attr.text().map(|text| TypeHint::new(text, attr.span)));
                let body = if self_closed {
                    Block::new(Vec::new(), self.span_from(catch_start))
                } else {
                    self.parse_tag_body("catch", catch_start)?
                };
                catches.push(CatchClause {
                    exception_type,
                    var: Ident::new(CATCH_VARIABLE, catch_start),
                    body,
                    span: self.span_from(catch_start),
                });
            } else if self.peek().is_tag_open("finally") && finally.is_none() {
                let finally_start = self.advance().span;
                self.expect_tag_end()?;
                finally = Some(self.parse_tag_body("finally", finally_start)?);
            } else {
                break;
            }
        }
        self.expect_tag_close("try")?;
        if catches.is_empty() && finally.is_none() {
            return Err(SyntaxError::new(
                "`<cftry>` needs a `<cfcatch>` or `<cffinally>`",
                start,
            ));
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

    fn parse_tag_switch(&mut self, start: Span) -> PResult<Stmt> {
        let (attributes, self_closed) = self.parse_tag_attributes()?;
        let subject = find_attribute(&attributes, "expression")
            .and_then(|attr| attr.value.clone())
            .ok_or_else(|| SyntaxError::new("`<cfswitch>` needs an `expression`", start))?;
        let mut cases = Vec::new();
        if !self_closed {
            loop {
                self.skip_blank_text();
                let case_start = self.peek().span;
                if self.peek().is_tag_open("case") {
                    self.advance();
                    let (attributes, _) = self.parse_tag_attributes()?;
                    let values = case_values(&attributes, case_start)?;
                    let body = self.parse_tag_body("case", case_start)?;
                    cases.push(SwitchCase {
                        values,
                        body: body.stmts,
                        span: self.span_from(case_start),
                    });
                } else if self.peek().is_tag_open("defaultcase") {
                    self.advance();
                    self.expect_tag_end()?;
                    let body = self.parse_tag_body("defaultcase", case_start)?;
                    cases.push(SwitchCase {
                        values: Vec::new(),
                        body: body.stmts,
                        span: self.span_from(case_start),
                    });
                } else {
                    break;
                }
            }
            self.expect_tag_close("switch")?;
        }
        Ok(Stmt::new(
            StmtKind::Switch { subject, cases },
            self.span_from(start),
        ))
    }

    pub(crate) fn parse_tag_function(&mut self, start: Span) -> PResult<Function> {
        let (attributes, self_closed) = self.parse_tag_attributes()?;
        let name = find_attribute(&attributes, "name")
            .and_then(|attr| attr.text().map(|text| Ident::new(text, attr.span)))
            .ok_or_else(|| SyntaxError::new("`<cffunction>` needs a `name`", start))?;
        let access = access_attribute(&attributes)?;
        let return_type = find_attribute(&attributes, "returntype")
            .and_then(|attr| attr.text().map(|text| TypeHint::new(text, attr.span)));
        let rest: Vec<Attribute> = attributes
            .into_iter()
            .filter(|attr| !["name", "access", "returntype"].iter().any(|n| attr.name.is(n)))
            .collect();
        if self_closed {
            return Err(SyntaxError::new("`<cffunction>` must have a body", start));
        }

        let mut params = Vec::new();
        self.skip_blank_text();
        while self.peek().is_tag_open("argument") {
            let arg_start = self.advance().span;
            let (attributes, self_closed) = self.parse_tag_attributes()?;
            if !self_closed && self.peek().is_tag_close("argument") {
                self.advance();
            }
            params.push(param_from_attributes(attributes, self.span_from(arg_start))?);
            self.skip_blank_text();
        }

        let body = self.parse_tag_body("function", start)?;
        Ok(Function {
            name,
            access,
            return_type,
            params,
            attributes: rest,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_tag_component(&mut self, imports: Vec<Import>) -> PResult<bx_core::ast::Component> {
        let start = self.advance().span;
        let (attributes, self_closed) = self.parse_tag_attributes()?;
        let mut builder = ComponentBuilder::new(imports, attributes)?;
        if self_closed {
            return Ok(builder.finish(self.span_from(start)));
        }
        loop {
            self.skip_blank_text();
            if self.at_eof() || self.peek().is_tag_close("component") {
                break;
            }
            let before = self.pos;
            if let Err(err) = self.parse_tag_member(&mut builder) {
                let fatal = err.fatal;
                self.report(err);
                if fatal {
                    break;
                }
                self.recover_statement();
                if self.pos == before {
                    self.advance();
                }
            }
        }
        self.expect_tag_close("component")?;
        Ok(builder.finish(self.span_from(start)))
    }

    fn parse_tag_member(&mut self, builder: &mut ComponentBuilder) -> PResult<()> {
        if self.peek().is_tag_open("property") {
            let start = self.advance().span;
            let (attributes, self_closed) = self.parse_tag_attributes()?;
            if !self_closed && self.peek().is_tag_close("property") {
                self.advance();
            }
            let attributes = coerce_default(attributes);
            let property = property_from_attributes(attributes, self.span_from(start))?;
            builder.properties.push(property);
            return Ok(());
        }
        for stmt in self.nested(|p| p.parse_template_item())? {
            builder.push_stmt(stmt);
        }
        Ok(())
    }

    fn parse_tag_generic(&mut self, open: &Token) -> PResult<Stmt> {
        let (attributes, self_closed) = self.parse_tag_attributes()?;
        let body = if !self_closed && self.has_close_tag(&open.lexeme) {
            Some(self.parse_tag_body(&open.lexeme, open.span)?)
        } else {
            None
        };
        let name = Ident::new(open.lexeme.clone(), open.span);
        let span = self.span_from(open.span);
        self.tag_statement(name, attributes, body, span)
    }

    /// Whether a `</cfNAME>` closing the tag just opened appears later,
    /// accounting for nested tags of the same name.
    fn has_close_tag(&self, name: &str) -> bool {
        let mut depth = 0usize;
        let mut i = self.pos;
        while let Some(token) = self.tokens.get(i) {
            match token.kind {
                TokenKind::TagOpen if token.lexeme == name => {
                    let end = self.tokens[i..]
                        .iter()
                        .position(|t| matches!(t.kind, TokenKind::TagEnd | TokenKind::TagSelfClose))
                        .map(|offset| i + offset);
                    match end {
                        Some(end) => {
                            if self.tokens[end].kind == TokenKind::TagEnd {
                                depth += 1;
                            }
                            i = end;
                        }
                        None => return false,
                    }
                }
                TokenKind::TagClose if token.lexeme == name => {
                    if depth == 0 {
                        return true;
                    }
                    depth -= 1;
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
        false
    }

    /// Shared by tag markup and the `cfNAME(...)` script form: loops and
    /// throws get dedicated nodes, anything else stays a tag invocation.
    pub(crate) fn tag_statement(
        &mut self,
        name: Ident,
        attributes: Vec<Attribute>,
        body: Option<Block>,
        span: Span,
    ) -> PResult<Stmt> {
        match name.key().as_str() {
            "loop" => self.build_loop(attributes, body, span),
            "throw" => {
                let message = find_attribute(&attributes, "message").and_then(|a| a.value.clone());
                Ok(Stmt::new(StmtKind::Throw(message), span))
            }
            "rethrow" => Ok(Stmt::new(StmtKind::Rethrow, span)),
            _ => Ok(Stmt::new(
                StmtKind::TagInvocation(TagInvocation {
                    name,
                    attributes,
                    body,
                }),
                span,
            )),
        }
    }

    fn build_loop(
        &mut self,
        attributes: Vec<Attribute>,
        body: Option<Block>,
        span: Span,
    ) -> PResult<Stmt> {
        let body = body.unwrap_or_else(|| Block::new(Vec::new(), span));
        let attr = |name: &str| find_attribute(&attributes, name).and_then(|a| a.value.clone());

        if let (Some(index), Some(from), Some(to)) = (attr("index"), attr("from"), attr("to")) {
            let var = loop_variable(&index)?;
            let step = attr("step").map(coerce_number);
            let descending = step.as_ref().is_some_and(is_negative);
            let var_expr = || Expr::new(ExprKind::Ident(var.clone()), var.span);
            let init = ForInit::Expr(Expr::new(
                ExprKind::Assign {
                    op: AssignOp::Assign,
                    target: Box::new(var_expr()),
                    value: Box::new(coerce_number(from)),
                },
                span,
            ));
            let cond = Expr::new(
                ExprKind::Binary {
                    op: if descending { BinaryOp::Ge } else { BinaryOp::Le },
                    lhs: Box::new(var_expr()),
                    rhs: Box::new(coerce_number(to)),
                },
                span,
            );
            let step = match step {
                Some(step) => ExprKind::Assign {
                    op: AssignOp::Add,
                    target: Box::new(var_expr()),
                    value: Box::new(step),
                },
                None => ExprKind::Unary {
                    op: UnaryOp::PostInc,
                    operand: Box::new(var_expr()),
                },
            };
            return Ok(Stmt::new(
                StmtKind::For {
                    init: Some(init),
                    cond: Some(cond),
                    step: Some(Expr::new(step, span)),
                    body,
                },
                span,
            ));
        }

        for source in ["array", "collection"] {
            if let Some(collection) = attr(source) {
                let var = attr("item")
                    .or_else(|| attr("index"))
                    .ok_or_else(|| {
                        SyntaxError::new(
                            format!("`<cfloop {}>` needs an `item` or `index`", source),
                            span,
                        )
                    })?;
                return Ok(Stmt::new(
                    StmtKind::ForIn {
                        var: loop_variable(&var)?,
                        declared: false,
                        collection,
                        body,
                    },
                    span,
                ));
            }
        }

        if let Some(condition) = attr("condition") {
            let cond = self.reparse_condition(condition)?;
            return Ok(Stmt::new(StmtKind::While { cond, body }, span));
        }

        if let Some(list) = attr("list") {
            let var = attr("index")
                .or_else(|| attr("item"))
                .ok_or_else(|| SyntaxError::new("`<cfloop list>` needs an `index`", span))?;
            let mut args = vec![bx_core::ast::Argument {
                name: None,
                value: list,
            }];
            if let Some(delimiters) = attr("delimiters") {
                args.push(bx_core::ast::Argument {
                    name: None,
                    value: delimiters,
                });
            }
            let collection = Expr::new(
                ExprKind::Call {
                    callee: Box::new(Expr::ident("listToArray", span)),
                    args,
                },
                span,
            );
            return Ok(Stmt::new(
                StmtKind::ForIn {
                    var: loop_variable(&var)?,
                    declared: false,
                    collection,
                    body,
                },
                span,
            ));
        }

        if let Some(query) = attr("query") {
            return Ok(Stmt::new(
                StmtKind::QueryLoop {
                    query: variable_reference(query),
                    item: None,
                    body,
                },
                span,
            ));
        }

        Err(SyntaxError::new(
            "`<cfloop>` needs from/to, array, collection, condition, list or query",
            span,
        ))
    }

    /// `condition="i lte 10"` holds script source inside a string. It is
    /// parsed in place so spans still point into the original file.
    fn reparse_condition(&self, condition: Expr) -> PResult<Expr> {
        let Some(text) = condition.as_str_literal() else {
            return Ok(condition);
        };
        let at = condition.span.lo as usize + 1;
        let prefix: String = self
            .source
            .text
            .get(..at)
            .unwrap_or_default()
            .chars()
            .map(|c| if c == '\n' { '\n' } else { ' ' })
            .collect();
        let file = SourceFile::new(
            self.source.id,
            self.source.name.clone(),
            format!("{}{}", prefix, text),
        );
        let tokens = lexer::lex_with(&file, StartMode::Script)
            .map_err(|err| SyntaxError::new(err.kind.to_string(), err.span))?;
        let mut parser = Parser::new(&file, tokens, self.options);
        parser.depth = self.depth;
        parser.stack = self.stack;
        let expr = parser.parse_expr()?;
        if !parser.at_eof() {
            return Err(parser.unexpected("end of loop condition"));
        }
        Ok(expr)
    }
}

fn is_if_boundary(token: &Token) -> bool {
    token.is_tag_open("elseif") || token.is_tag_open("else") || token.is_tag_close("if")
}

/// `"#expr#"` as an attribute value means the expression itself.
fn unwrap_single_hole(expr: Expr) -> Expr {
    let span = expr.span;
    match expr.kind {
        ExprKind::Template(mut parts) if parts.len() == 1 => match parts.pop() {
            Some(TemplatePart::Hole(inner)) => inner,
            other => Expr::new(ExprKind::Template(other.into_iter().collect()), span),
        },
        kind => Expr::new(kind, span),
    }
}

fn loop_variable(expr: &Expr) -> PResult<Ident> {
    match &expr.kind {
        ExprKind::Literal(Literal::String(text)) if is_simple_name(text) => {
            Ok(Ident::new(text.clone(), expr.span))
        }
        ExprKind::Ident(ident) => Ok(ident.clone()),
        _ => Err(SyntaxError::new(
            "loop variable must be a plain name",
            expr.span,
        )),
    }
}

fn is_simple_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// `query="q"` names a variable; `a.b` becomes member access.
fn variable_reference(expr: Expr) -> Expr {
    let Some(text) = expr.as_str_literal() else {
        return expr;
    };
    let span = expr.span;
    let mut segments = text.split('.');
    let Some(first) = segments.next() else {
        return expr;
    };
    segments.fold(Expr::ident(first, span), |object, segment| {
        Expr::new(
            ExprKind::Member {
                object: Box::new(object),
                name: Ident::new(segment, span),
            },
            span,
        )
    })
}

/// Numeric attribute text such as `from="1"` becomes a number literal.
fn coerce_number(expr: Expr) -> Expr {
    let Some(text) = expr.as_str_literal() else {
        return expr;
    };
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let numeric = digits.starts_with(|c: char| c.is_ascii_digit()) && digits.parse::<f64>().is_ok();
    if !numeric {
        return expr;
    }
    let number = Expr::new(ExprKind::Literal(Literal::Number(digits.to_string())), expr.span);
    if negative {
        Expr::new(
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(number),
            },
            expr.span,
        )
    } else {
        number
    }
}

fn coerce_boolean(expr: Expr) -> Expr {
    let value = match expr.as_str_literal().map(str::to_ascii_lowercase).as_deref() {
        Some("true") | Some("yes") => true,
        Some("false") | Some("no") => false,
        _ => return expr,
    };
    Expr::new(ExprKind::Literal(Literal::Bool(value)), expr.span)
}

fn coerce_for_type(expr: Expr, type_hint: Option<&str>) -> Expr {
    match type_hint.map(str::to_ascii_lowercase) {
        Some(ty) if NUMERIC_TYPES.contains(&ty.as_str()) => coerce_number(expr),
        Some(ty) if ty == "boolean" => coerce_boolean(expr),
        _ => expr,
    }
}

fn is_negative(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Unary {
            op: UnaryOp::Neg,
            ..
        }
    )
}

/// Tag defaults are always written as strings; typed ones get real literals.
fn coerce_default(attributes: Vec<Attribute>) -> Vec<Attribute> {
    let type_hint = find_attribute(&attributes, "type")
        .and_then(Attribute::text)
        .map(str::to_string);
    attributes
        .into_iter()
        .map(|mut attr| {
            if attr.name.is("default") {
                attr.value = attr
                    .value
                    .map(|value| coerce_for_type(value, type_hint.as_deref()));
            }
            attr
        })
        .collect()
}

fn param_from_attributes(attributes: Vec<Attribute>, span: Span) -> PResult<Param> {
    let attributes = coerce_default(attributes);
    let mut name = None;
    let mut type_hint = None;
    let mut required = false;
    let mut default = None;
    let mut rest = Vec::new();
    for attr in attributes {
        if attr.name.is("name") {
            name = attr.text().map(|text| Ident::new(text, attr.span));
        } else if attr.name.is("type") {
            type_hint = attr.text().map(|text| TypeHint::new(text, attr.span));
        } else if attr.name.is("required") {
            required = attr.value.as_ref().is_some_and(is_truthy);
        } else if attr.name.is("default") {
            default = attr.value;
        } else {
            rest.push(attr);
        }
    }
    let name = name.ok_or_else(|| SyntaxError::new("`<cfargument>` needs a `name`", span))?;
    Ok(Param {
        name,
        required,
        type_hint,
        default,
        attributes: rest,
        span,
    })
}

/// `value="a,b"` lists several labels for one case.
fn case_values(attributes: &[Attribute], span: Span) -> PResult<Vec<Expr>> {
    let value = find_attribute(attributes, "value")
        .and_then(|attr| attr.value.clone())
        .ok_or_else(|| SyntaxError::new("`<cfcase>` needs a `value`", span))?;
    let Some(text) = value.as_str_literal() else {
        return Ok(vec![value]);
    };
    let delimiters = find_attribute(attributes, "delimiters")
        .and_then(Attribute::text)
        .unwrap_or(",");
    Ok(text
        .split(|c: char| delimiters.contains(c))
        .map(|part| coerce_number(Expr::string(part, value.span)))
        .collect())
}
