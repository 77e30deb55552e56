use serde::{Deserialize, Serialize};

use crate::ast::{Block, DottedName, Expr, Ident, Stmt, TypeHint};
use crate::span::Span;

/// Root of a parsed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub kind: ProgramKind,
    /// File name the program was parsed from, when it came from a file.
    pub source_name: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProgramKind {
    Script(Script),
    Component(Component),
}

/// Free top-level statements of a template or script file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub imports: Vec<Import>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub path: DottedName,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub extends: Option<DottedName>,
    pub implements: Vec<DottedName>,
    pub imports: Vec<Import>,
    /// Remaining annotations, e.g. `hint`, `name`, `accessors`.
    pub attributes: Vec<Attribute>,
    pub properties: Vec<Property>,
    pub functions: Vec<Function>,
    /// Statements outside any function (the pseudo-constructor).
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Component {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find_attribute(&self.attributes, name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: Ident,
    pub type_hint: Option<TypeHint>,
    pub default: Option<Expr>,
    pub attributes: Vec<Attribute>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    Public,
    Private,
    Package,
    Remote,
}

impl Access {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "public" => Some(Access::Public),
            "private" => Some(Access::Private),
            "package" => Some(Access::Package),
            "remote" => Some(Access::Remote),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: Ident,
    pub access: Option<Access>,
    /// `None` for untyped functions; their target type is settled by lowering.
    pub return_type: Option<TypeHint>,
    pub params: Vec<Param>,
    pub attributes: Vec<Attribute>,
    pub body: Block,
    pub span: Span,
}

impl Function {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find_attribute(&self.attributes, name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Ident,
    pub required: bool,
    pub type_hint: Option<TypeHint>,
    pub default: Option<Expr>,
    pub attributes: Vec<Attribute>,
    pub span: Span,
}

/// `name=value` pair on a tag, component, function or property. A bare
/// flag such as `output` in `function f() output {}` has no value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: Ident,
    pub value: Option<Expr>,
    pub span: Span,
}

impl Attribute {
    pub fn new(name: Ident, value: Option<Expr>, span: Span) -> Self {
        Self { name, value, span }
    }

    /// Value text when the value is a plain string (or bare word) literal.
    pub fn text(&self) -> Option<&str> {
        self.value.as_ref().and_then(Expr::as_str_literal)
    }
}

pub fn find_attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attributes.iter().find(|attr| attr.name.is(name))
}
