use bx_core::ast::{
    find_attribute, Access, Attribute, Block, Closure, Component, DottedName, Expr, ExprKind,
    Function, Ident, Import, Literal, Param, Property, Stmt, StmtKind, TypeHint,
};
use bx_core::span::Span;

use super::{PResult, Parser, SyntaxError};
use crate::lexer::{Keyword, TokenKind};

/// Words that may precede `function` in a declaration.
const MAX_DECL_PREFIX_WORDS: usize = 2;

impl<'a> Parser<'a> {
    /// Leading `import a.b.C;` lines of a script file.
    pub(crate) fn parse_imports(&mut self) -> Vec<Import> {
        let mut imports = Vec::new();
        while self.peek().is_word("import")
            && matches!(
                self.peek_at(1).kind,
                TokenKind::Ident | TokenKind::Keyword(_)
            )
        {
            match self.parse_import() {
                Ok(import) => imports.push(import),
                Err(err) => {
                    self.report(err);
                    self.recover_statement();
                }
            }
        }
        imports
    }

    fn parse_import(&mut self) -> PResult<Import> {
        let start = self.advance().span;
        let mut path = self.parse_dotted_name()?;
        if self.at_symbol(".") && self.peek_at(1).is_symbol("*") {
            self.advance();
            let star = self.advance().span;
            path = DottedName::new(format!("{}.*", path.text), path.span.to(star));
        }
        self.expect_semi()?;
        Ok(Import {
            path,
            span: self.span_from(start),
        })
    }

    /// `component` opening a declaration rather than a variable named so.
    pub(crate) fn at_component_start(&self) -> bool {
        if !self.peek().is_word("component") {
            return false;
        }
        let next = self.peek_at(1);
        !["=", ".", "(", "[", ";"]
            .iter()
            .any(|symbol| next.is_symbol(symbol))
    }

    pub(crate) fn parse_script_component(&mut self, imports: Vec<Import>) -> PResult<Component> {
        let start = self.expect_ident()?.span;
        let attributes = self.parse_decl_attributes(|p| p.at_symbol("{"))?;
        self.expect_symbol("{")?;
        let mut builder = ComponentBuilder::new(imports, attributes)?;

        while !self.at_symbol("}") && !self.at_eof() {
            let before = self.pos;
            if let Err(err) = self.parse_component_member(&mut builder) {
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
        self.expect_symbol("}")?;
        Ok(builder.finish(self.span_from(start)))
    }

    fn parse_component_member(&mut self, builder: &mut ComponentBuilder) -> PResult<()> {
        if self.peek().is_word("property")
            && matches!(
                self.peek_at(1).kind,
                TokenKind::Ident | TokenKind::Keyword(_)
            )
        {
            let property = self.parse_script_property()?;
            builder.properties.push(property);
            return Ok(());
        }
        if let Some(stmt) = self.parse_statement()? {
            builder.push_stmt(stmt);
        }
        Ok(())
    }

    /// `property name="x" type="string";` or `property string x default="";`.
    fn parse_script_property(&mut self) -> PResult<Property> {
        let start = self.advance().span;
        let mut attributes = Vec::new();
        if !self.peek_at(1).is_symbol("=") {
            let first = self.parse_dotted_name()?;
            if matches!(
                self.peek().kind,
                TokenKind::Ident | TokenKind::Keyword(_)
            ) && !self.peek_at(1).is_symbol("=")
            {
                let name = self.expect_name()?;
                attributes.push(synthetic_attribute("type", &first.text, first.span));
                attributes.push(synthetic_attribute("name", &name.name, name.span));
            } else {
                attributes.push(synthetic_attribute("name", &first.text, first.span));
            }
        }
        let rest = self.parse_decl_attributes(|p| p.at_symbol(";") || p.at_symbol("}"))?;
        attributes.extend(rest);
        self.expect_semi()?;
        property_from_attributes(attributes, self.span_from(start))
    }

    /// True at `[access] [type] function name(` or `[access] function type name(`.
    pub(crate) fn at_function_decl(&self) -> bool {
        let mut i = 0;
        let mut words = 0;
        while self.peek_at(i).kind == TokenKind::Ident {
            i = self.skip_dotted(i);
            words += 1;
            if words > MAX_DECL_PREFIX_WORDS {
                return false;
            }
        }
        if !self.peek_at(i).is_keyword(Keyword::Function) {
            return false;
        }
        let name = i + 1;
        if self.is_name_at(name) && self.peek_at(name + 1).is_symbol("(") {
            return true;
        }
        // Return type written after the keyword.
        if self.peek_at(name).kind != TokenKind::Ident {
            return false;
        }
        let name = self.skip_dotted(name);
        self.is_name_at(name) && self.peek_at(name + 1).is_symbol("(")
    }

    /// Index just past the dotted name starting at `i`.
    fn skip_dotted(&self, mut i: usize) -> usize {
        i += 1;
        while self.peek_at(i).is_symbol(".") && self.peek_at(i + 1).kind == TokenKind::Ident {
            i += 2;
        }
        i
    }

    fn is_name_at(&self, i: usize) -> bool {
        matches!(
            self.peek_at(i).kind,
            TokenKind::Ident | TokenKind::Keyword(_)
        )
    }

    pub(crate) fn parse_script_function(&mut self) -> PResult<Function> {
        let start = self.peek().span;
        let mut access = None;
        let mut return_type = None;
        while !self.at_keyword(Keyword::Function) {
            let word = self.parse_dotted_name()?;
            match Access::from_name(&word.text) {
                Some(found) if access.is_none() && return_type.is_none() => access = Some(found),
                _ if return_type.is_none() => {
                    return_type = Some(TypeHint::new(word.text, word.span));
                }
                _ => {
                    return Err(SyntaxError::new(
                        format!("unexpected `{}` before `function`", word.text),
                        word.span,
                    ))
                }
            }
        }
        self.expect_keyword(Keyword::Function, "function")?;
        if !self.peek_at(1).is_symbol("(") {
            let word = self.parse_dotted_name()?;
            if return_type.is_some() {
                return Err(SyntaxError::new(
                    format!("return type given twice at `{}`", word.text),
                    word.span,
                ));
            }
            return_type = Some(TypeHint::new(word.text, word.span));
        }
        let name = self.expect_name()?;
        let params = self.parse_params()?;
        let attributes = self.parse_decl_attributes(|p| p.at_symbol("{"))?;
        if access.is_none() {
            access = access_attribute(&attributes)?;
        }
        if return_type.is_none() {
            return_type = find_attribute(&attributes, "returntype")
                .and_then(|attr| attr.text().map(|text| TypeHint::new(text, attr.span)));
        }
        let body = self.parse_block()?;
        Ok(Function {
            name,
            access,
            return_type,
            params,
            attributes,
            body,
            span: self.span_from(start),
        })
    }

    /// `function (params) [attrs] { body }` used as a value.
    pub(crate) fn parse_closure(&mut self) -> PResult<Expr> {
        let start = self.expect_keyword(Keyword::Function, "function")?;
        let params = self.parse_params()?;
        // Attributes such as `output=false` carry no meaning for a closure.
        self.parse_decl_attributes(|p| p.at_symbol("{"))?;
        let body = self.parse_closure_body(|p| p.parse_block())?;
        let closure = Closure { params, body };
        Ok(Expr::new(ExprKind::Closure(Box::new(closure)), self.span_from(start)))
    }

    /// `(params) => body` or `name => body`. An expression body is returned.
    pub(crate) fn parse_arrow(&mut self) -> PResult<Expr> {
        let start = self.peek().span;
        let params = if self.at_symbol("(") {
            self.parse_params()?
        } else {
            let name = self.expect_name()?;
            vec![Param {
                span: name.span,
                name,
                required: false,
                type_hint: None,
                default: None,
                attributes: Vec::new(),
            }]
        };
        self.expect_symbol("=>")?;
        let body = if self.at_symbol("{") {
            self.parse_closure_body(|p| p.parse_block())?
        } else {
            let value = self.parse_expr()?;
            let span = value.span;
            Block::new(vec![Stmt::new(StmtKind::Return(Some(value)), span)], span)
        };
        let closure = Closure { params, body };
        Ok(Expr::new(ExprKind::Closure(Box::new(closure)), self.span_from(start)))
    }

    /// Whether a parenthesized parameter list followed by `=>` starts here.
    pub(crate) fn at_arrow_params(&self) -> bool {
        let mut depth = 0usize;
        let mut i = 0;
        loop {
            let token = self.peek_at(i);
            match token.kind {
                TokenKind::Eof => return false,
                TokenKind::Symbol if token.lexeme == "(" => depth += 1,
                TokenKind::Symbol if token.lexeme == ")" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return self.peek_at(i + 1).is_symbol("=>");
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }

    /// A closure body is script even inside tag markup.
    fn parse_closure_body(&mut self, f: impl FnOnce(&mut Self) -> PResult<Block>) -> PResult<Block> {
        let template = std::mem::replace(&mut self.template, false);
        let body = self.nested(f);
        self.template = template;
        body
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        self.expect_symbol("(")?;
        let mut params = Vec::new();
        while !self.at_symbol(")") {
            params.push(self.parse_param()?);
            if !self.eat_symbol(",") {
                break;
            }
        }
        self.expect_symbol(")")?;
        Ok(params)
    }

    /// `[required] [type] name [= default] [attr=value ...]`.
    fn parse_param(&mut self) -> PResult<Param> {
        let start = self.peek().span;
        let required = self.peek().is_word("required")
            && matches!(
                self.peek_at(1).kind,
                TokenKind::Ident | TokenKind::Keyword(_)
            );
        if required {
            self.advance();
        }
        let first = self.parse_dotted_name()?;
        let (type_hint, name) = if matches!(
            self.peek().kind,
            TokenKind::Ident | TokenKind::Keyword(_)
        ) {
            let name = self.expect_name()?;
            (Some(TypeHint::new(first.text, first.span)), name)
        } else {
            (None, Ident::new(first.text, first.span))
        };
        let default = if self.eat_symbol("=") {
            Some(self.parse_operand()?)
        } else {
            None
        };
        let attributes = self.parse_decl_attributes(|p| p.at_symbol(",") || p.at_symbol(")"))?;
        Ok(Param {
            name,
            required,
            type_hint,
            default,
            attributes,
            span: self.span_from(start),
        })
    }

    /// `name=value` pairs and bare flags up to `stop`.
    pub(crate) fn parse_decl_attributes(
        &mut self,
        stop: impl Fn(&Self) -> bool,
    ) -> PResult<Vec<Attribute>> {
        let mut attributes = Vec::new();
        while !stop(self) && !self.at_eof() {
            let name = self.parse_dotted_name()?;
            let name = Ident::new(name.text, name.span);
            let value = if self.eat_symbol("=") || self.eat_symbol(":") {
                Some(self.parse_operand()?)
            } else {
                None
            };
            let span = self.span_from(name.span);
            attributes.push(Attribute::new(name, value, span));
        }
        Ok(attributes)
    }
}

/// Collects component members from either surface syntax.
pub(crate) struct ComponentBuilder {
    extends: Option<DottedName>,
    implements: Vec<DottedName>,
    imports: Vec<Import>,
    attributes: Vec<Attribute>,
    pub(crate) properties: Vec<Property>,
    pub(crate) functions: Vec<Function>,
    body: Vec<Stmt>,
}

impl ComponentBuilder {
    pub(crate) fn new(imports: Vec<Import>, attributes: Vec<Attribute>) -> PResult<Self> {
        let mut extends = None;
        let mut implements = Vec::new();
        let mut rest = Vec::new();
        for attr in attributes {
            if attr.name.is("extends") {
                extends = Some(dotted_attribute(&attr)?);
            } else if attr.name.is("implements") {
                let joined = dotted_attribute(&attr)?;
                implements.extend(
                    joined
                        .text
                        .split(',')
                        .map(str::trim)
                        .filter(|part| !part.is_empty())
                        .map(|part| DottedName::new(part, joined.span)),
                );
            } else {
                rest.push(attr);
            }
        }
        Ok(Self {
            extends,
            implements,
            imports,
            attributes: rest,
            properties: Vec::new(),
            functions: Vec::new(),
            body: Vec::new(),
        })
    }

    /// Function declarations become members; everything else runs in the
    /// pseudo-constructor.
    pub(crate) fn push_stmt(&mut self, stmt: Stmt) {
        match stmt.kind {
            StmtKind::Function(function) => self.functions.push(*function),
            kind => self.body.push(Stmt::new(kind, stmt.span)),
        }
    }

    pub(crate) fn finish(self, span: Span) -> Component {
        Component {
            extends: self.extends,
            implements: self.implements,
            imports: self.imports,
            attributes: self.attributes,
            properties: self.properties,
            functions: self.functions,
            body: self.body,
            span,
        }
    }
}

fn dotted_attribute(attr: &Attribute) -> PResult<DottedName> {
    match attr.value.as_ref() {
        Some(value) => match &value.kind {
            ExprKind::Literal(Literal::String(text)) => Ok(DottedName::new(text.trim(), value.span)),
            ExprKind::Ident(ident) => Ok(DottedName::new(ident.name.clone(), ident.span)),
            _ => dotted_from_expr(value).ok_or_else(|| {
                SyntaxError::new(
                    format!("`{}` expects a type name", attr.name),
                    value.span,
                )
            }),
        },
        None => Err(SyntaxError::new(
            format!("`{}` expects a value", attr.name),
            attr.span,
        )),
    }
}

/// `a.b.C` written without quotes parses as member access.
fn dotted_from_expr(expr: &Expr) -> Option<DottedName> {
    match &expr.kind {
        ExprKind::Ident(ident) => Some(DottedName::new(ident.name.clone(), expr.span)),
        ExprKind::Member { object, name } => {
            let head = dotted_from_expr(object)?;
            Some(DottedName::new(
                format!("{}.{}", head.text, name.name),
                expr.span,
            ))
        }
        _ => None,
    }
}

pub(crate) fn access_attribute(attributes: &[Attribute]) -> PResult<Option<Access>> {
    let Some(attr) = find_attribute(attributes, "access") else {
        return Ok(None);
    };
    let text = attr.text().unwrap_or_default();
    Access::from_name(text).map(Some).ok_or_else(|| {
        SyntaxError::new(format!("unknown access level `{}`", text), attr.span)
    })
}

pub(crate) fn synthetic_attribute(name: &str, value: &str, span: Span) -> Attribute {
    Attribute::new(Ident::new(name, span), Some(Expr::string(value, span)), span)
}

/// Builds a property from its attribute list (`name`, `type`, `default`).
pub(crate) fn property_from_attributes(
    attributes: Vec<Attribute>,
    span: Span,
) -> PResult<Property> {
    let mut name = None;
    let mut type_hint = None;
    let mut default = None;
    let mut rest = Vec::new();
    for attr in attributes {
        if attr.name.is("name") {
            let text = attr
                .text()
                .ok_or_else(|| SyntaxError::new("property name must be a plain string", attr.span))?;
            name = Some(Ident::new(text, attr.span));
        } else if attr.name.is("type") {
            type_hint = attr.text().map(|text| TypeHint::new(text, attr.span));
        } else if attr.name.is("default") {
            default = attr.value;
        } else {
            rest.push(attr);
        }
    }
    let name = name.ok_or_else(|| SyntaxError::new("property is missing a name", span))?;
    Ok(Property {
        name,
        type_hint,
        default,
        attributes: rest,
        span,
    })
}

/// `required="true"`, `required="yes"` and `required=true` all count.
pub(crate) fn is_truthy(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Literal(Literal::Bool(value)) => *value,
        ExprKind::Literal(Literal::String(text)) => {
            matches!(text.to_ascii_lowercase().as_str(), "true" | "yes" | "1")
        }
        ExprKind::Literal(Literal::Number(text)) => text != "0",
        _ => false,
    }
}
